//! Candidate scoring and ordering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::models::{
    success_rate, ErrorCategory, PatternEntry, RankingConfig, RankingWeights, SuggestionEntry,
};

use super::ledger::LocalStats;

const RECENCY_HALF_LIFE_MS: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// What the ranker knows about the obligation being ranked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RankTarget {
    pub node_id: String,
    pub category: ErrorCategory,
    pub goal_signature: Option<String>,
}

/// One tactic under consideration, from either pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub category: ErrorCategory,
    pub tactic_key: String,
    /// Raw success rate: the pattern score, or the local rate for
    /// ledger-only candidates
    pub raw_score: f64,
    pub sample_size: u64,
    pub last_seen: Option<DateTime<Utc>>,
    pub local: LocalStats,
    pub goal_signature: Option<String>,
}

impl Candidate {
    fn from_pattern(entry: &PatternEntry, local: Option<&LocalStats>) -> Self {
        Self {
            category: entry.category,
            tactic_key: entry.tactic_key.clone(),
            raw_score: entry.score,
            sample_size: entry.sample_size(),
            last_seen: Some(entry.last_updated),
            local: local.cloned().unwrap_or_default(),
            goal_signature: entry.goal_signature.clone(),
        }
    }

    fn from_local(category: ErrorCategory, tactic_key: &str, local: &LocalStats) -> Self {
        Self {
            category,
            tactic_key: tactic_key.to_string(),
            raw_score: success_rate(local.successes, local.attempts),
            sample_size: local.attempts,
            last_seen: local.last_attempt_at,
            local: local.clone(),
            goal_signature: None,
        }
    }
}

/// Merge the global pattern pool with the obligation's own ledger.
///
/// Ledger aggregates whose `(category, tacticKey)` already has a pattern
/// entry only feed that candidate's node-local term.
pub fn collect_candidates<'a>(
    patterns: impl IntoIterator<Item = &'a PatternEntry>,
    local: &BTreeMap<(ErrorCategory, String), LocalStats>,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = patterns
        .into_iter()
        .map(|entry| {
            let stats = local.get(&(entry.category, entry.tactic_key.clone()));
            Candidate::from_pattern(entry, stats)
        })
        .collect();

    for ((category, tactic_key), stats) in local {
        let known = candidates
            .iter()
            .any(|c| c.category == *category && &c.tactic_key == tactic_key);
        if !known {
            candidates.push(Candidate::from_local(*category, tactic_key, stats));
        }
    }

    candidates
}

/// `log2(n + 1) / 4`, clamped to `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
pub fn sample_confidence(sample_size: u64) -> f64 {
    ((sample_size as f64 + 1.0).log2() / 4.0).clamp(0.0, 1.0)
}

/// `1 / (1 + age / 7 days)`; future timestamps count as fresh.
#[allow(clippy::cast_precision_loss)]
pub fn recency(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last_seen) = last_seen else {
        return 0.0;
    };
    let age_ms = (now - last_seen).num_milliseconds().max(0) as f64;
    1.0 / (1.0 + age_ms / RECENCY_HALF_LIFE_MS)
}

fn node_local_confidence(local: &LocalStats) -> f64 {
    if local.attempts == 0 {
        return 0.0;
    }
    0.5 * sample_confidence(local.attempts) + 0.5 * success_rate(local.successes, local.attempts)
}

/// A candidate with its blended score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub category_match: bool,
    pub score: f64,
}

pub fn score(
    candidate: Candidate,
    target: &RankTarget,
    weights: &RankingWeights,
    now: DateTime<Utc>,
) -> ScoredCandidate {
    let category_match = candidate.category == target.category;
    let signature_match = matches!(
        (&candidate.goal_signature, &target.goal_signature),
        (Some(a), Some(b)) if a == b
    );

    let blended = weights.global * candidate.raw_score
        + weights.category_match * f64::from(u8::from(category_match))
        + weights.sample_confidence * sample_confidence(candidate.sample_size)
        + weights.recency * recency(candidate.last_seen, now)
        + weights.node_local * node_local_confidence(&candidate.local)
        + weights.goal_signature * f64::from(u8::from(signature_match));

    ScoredCandidate {
        candidate,
        category_match,
        score: if blended.is_finite() { blended.clamp(0.0, 1.0) } else { 0.0 },
    }
}

/// Exact-category candidates first, then blended score, raw score, global
/// sample size and local sample size (all descending), then tactic key and
/// category ascending.
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.category_match
        .cmp(&a.category_match)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| b.candidate.raw_score.total_cmp(&a.candidate.raw_score))
        .then_with(|| b.candidate.sample_size.cmp(&a.candidate.sample_size))
        .then_with(|| b.candidate.local.attempts.cmp(&a.candidate.local.attempts))
        .then_with(|| a.candidate.tactic_key.cmp(&b.candidate.tactic_key))
        .then_with(|| a.candidate.category.as_str().cmp(b.candidate.category.as_str()))
}

/// Score, filter, order and truncate candidates into suggestion entries.
pub fn rank_candidates(
    candidates: Vec<Candidate>,
    target: &RankTarget,
    config: &RankingConfig,
    now: DateTime<Utc>,
) -> Vec<SuggestionEntry> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|c| c.sample_size >= config.min_sample_size)
        .map(|c| score(c, target, &config.weights, now))
        .collect();

    scored.sort_by(compare);
    scored.truncate(config.limit);

    scored
        .into_iter()
        .map(|s| SuggestionEntry {
            node_id: target.node_id.clone(),
            tactic_key: s.candidate.tactic_key,
            score: s.score,
            sample_size: s.candidate.sample_size,
            success_rate: s.candidate.raw_score,
            source_category: Some(s.candidate.category),
            generated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(category: ErrorCategory, key: &str, successes: u64, failures: u64, now: DateTime<Utc>) -> PatternEntry {
        let mut entry = PatternEntry::new(category, key, now);
        for _ in 0..successes {
            entry.observe(true, now);
        }
        for _ in 0..failures {
            entry.observe(false, now);
        }
        entry
    }

    fn target(category: ErrorCategory) -> RankTarget {
        RankTarget {
            node_id: "decl-1".to_string(),
            category,
            goal_signature: None,
        }
    }

    #[test]
    fn test_sample_confidence_curve() {
        assert_eq!(sample_confidence(0), 0.0);
        assert!((sample_confidence(1) - 0.25).abs() < 1e-9);
        assert!((sample_confidence(15) - 1.0).abs() < 1e-9);
        assert_eq!(sample_confidence(1_000), 1.0);
    }

    #[test]
    fn test_recency_decay() {
        let now = Utc::now();
        assert_eq!(recency(Some(now), now), 1.0);
        assert!((recency(Some(now - chrono::Duration::days(7)), now) - 0.5).abs() < 1e-9);
        assert_eq!(recency(Some(now + chrono::Duration::days(1)), now), 1.0);
        assert_eq!(recency(None, now), 0.0);
    }

    #[test]
    fn test_category_match_ranks_first() {
        let now = Utc::now();
        let candidates = collect_candidates(
            &[
                pattern(ErrorCategory::Other, "omega", 10, 0, now),
                pattern(ErrorCategory::TacticFailed, "simp", 1, 3, now),
            ],
            &BTreeMap::new(),
        );
        let ranked = rank_candidates(
            candidates,
            &target(ErrorCategory::TacticFailed),
            &RankingConfig::default(),
            now,
        );
        assert_eq!(ranked[0].tactic_key, "simp");
        assert_eq!(ranked[1].tactic_key, "omega");
    }

    #[test]
    fn test_local_pool_skips_known_patterns() {
        let now = Utc::now();
        let mut local = BTreeMap::new();
        let stats = LocalStats { successes: 1, attempts: 2, last_attempt_at: Some(now) };
        local.insert((ErrorCategory::TacticFailed, "simp".to_string()), stats.clone());
        local.insert((ErrorCategory::TacticFailed, "ring".to_string()), stats);

        let candidates = collect_candidates(
            &[pattern(ErrorCategory::TacticFailed, "simp", 1, 1, now)],
            &local,
        );
        assert_eq!(candidates.len(), 2);
        let simp = candidates.iter().find(|c| c.tactic_key == "simp").unwrap();
        assert_eq!(simp.sample_size, 2);
        assert_eq!(simp.local.attempts, 2);
        let ring = candidates.iter().find(|c| c.tactic_key == "ring").unwrap();
        assert_eq!(ring.raw_score, 0.5);
    }

    #[test]
    fn test_min_sample_size_and_limit() {
        let now = Utc::now();
        let patterns: Vec<PatternEntry> = (0..8)
            .map(|i| pattern(ErrorCategory::Other, &format!("t{i}"), i, 1, now))
            .collect();
        let config = RankingConfig {
            min_sample_size: 3,
            limit: 4,
            ..RankingConfig::default()
        };
        let ranked = rank_candidates(
            collect_candidates(&patterns, &BTreeMap::new()),
            &target(ErrorCategory::Other),
            &config,
            now,
        );
        assert_eq!(ranked.len(), 4);
        assert!(ranked.iter().all(|e| e.sample_size >= 3));
        assert_eq!(ranked[0].tactic_key, "t7");
    }

    #[test]
    fn test_ties_break_on_tactic_key() {
        let now = Utc::now();
        let ranked = rank_candidates(
            collect_candidates(
                &[
                    pattern(ErrorCategory::Other, "zeta", 1, 1, now),
                    pattern(ErrorCategory::Other, "alpha", 1, 1, now),
                ],
                &BTreeMap::new(),
            ),
            &target(ErrorCategory::Other),
            &RankingConfig::default(),
            now,
        );
        assert_eq!(ranked[0].tactic_key, "alpha");
    }

    #[test]
    fn test_score_clamped_with_heavy_weights() {
        let now = Utc::now();
        let config = RankingConfig {
            weights: RankingWeights {
                global: 5.0,
                ..RankingWeights::default()
            },
            ..RankingConfig::default()
        };
        let ranked = rank_candidates(
            collect_candidates(&[pattern(ErrorCategory::Other, "simp", 4, 0, now)], &BTreeMap::new()),
            &target(ErrorCategory::Other),
            &config,
            now,
        );
        assert_eq!(ranked[0].score, 1.0);
    }
}
