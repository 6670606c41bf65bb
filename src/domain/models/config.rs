use serde::{Deserialize, Serialize};

use super::sync::SyncReason;

/// Main configuration structure for Proofsync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sync scheduler debounce configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Suggestion ranking configuration
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Local state file configuration
    #[serde(default)]
    pub state: StateConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Per-reason debounce delays in milliseconds
///
/// Startup and programmatic applies run immediately; diagnostics bursts are
/// the noisiest trigger and wait the longest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    #[serde(default)]
    pub startup_ms: u64,

    #[serde(default = "default_activate_ms")]
    pub activate_ms: u64,

    #[serde(default = "default_save_ms")]
    pub save_ms: u64,

    #[serde(default = "default_diagnostics_ms")]
    pub diagnostics_ms: u64,

    #[serde(default)]
    pub apply_ms: u64,
}

const fn default_activate_ms() -> u64 {
    150
}

const fn default_save_ms() -> u64 {
    250
}

const fn default_diagnostics_ms() -> u64 {
    400
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            startup_ms: 0,
            activate_ms: default_activate_ms(),
            save_ms: default_save_ms(),
            diagnostics_ms: default_diagnostics_ms(),
            apply_ms: 0,
        }
    }
}

impl SchedulerConfig {
    /// Debounce delay for a trigger reason.
    pub fn debounce_ms(&self, reason: SyncReason) -> u64 {
        match reason {
            SyncReason::Startup => self.startup_ms,
            SyncReason::Activate => self.activate_ms,
            SyncReason::Save => self.save_ms,
            SyncReason::Diagnostics => self.diagnostics_ms,
            SyncReason::Apply => self.apply_ms,
        }
    }
}

/// Weights of the blended suggestion score
///
/// These are an empirical starting point, not a tuned optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingWeights {
    #[serde(default = "default_global_weight")]
    pub global: f64,
    #[serde(default = "default_category_weight")]
    pub category_match: f64,
    #[serde(default = "default_sample_weight")]
    pub sample_confidence: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_local_weight")]
    pub node_local: f64,
    #[serde(default = "default_signature_weight")]
    pub goal_signature: f64,
}

const fn default_global_weight() -> f64 {
    0.45
}

const fn default_category_weight() -> f64 {
    0.20
}

const fn default_sample_weight() -> f64 {
    0.15
}

const fn default_recency_weight() -> f64 {
    0.10
}

const fn default_local_weight() -> f64 {
    0.10
}

const fn default_signature_weight() -> f64 {
    0.08
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            global: default_global_weight(),
            category_match: default_category_weight(),
            sample_confidence: default_sample_weight(),
            recency: default_recency_weight(),
            node_local: default_local_weight(),
            goal_signature: default_signature_weight(),
        }
    }
}

impl RankingWeights {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.global,
            self.category_match,
            self.sample_confidence,
            self.recency,
            self.node_local,
            self.goal_signature,
        ]
    }
}

/// Suggestion ranking and cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankingConfig {
    #[serde(default)]
    pub weights: RankingWeights,

    /// Candidates with fewer samples are dropped
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,

    /// Maximum suggestions kept per obligation
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Cached slots older than this are dropped on every write
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached obligations
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

const fn default_min_sample_size() -> u64 {
    1
}

const fn default_limit() -> usize {
    5
}

const fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

const fn default_cache_max_entries() -> usize {
    200
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            min_sample_size: default_min_sample_size(),
            limit: default_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

/// Local state file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StateConfig {
    /// Path of the JSON state file used by the CLI
    #[serde(default = "default_state_path")]
    pub path: String,
}

fn default_state_path() -> String {
    ".proofsync/state.json".to_string()
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}
