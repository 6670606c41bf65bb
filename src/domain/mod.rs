//! Domain layer for Proofsync
//!
//! This module contains the proof-state models, the patch protocol, and the
//! ports that external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
