//! Core reconciliation logic.
//!
//! This module contains:
//! - ClaimBuilder: emissions record → desired claims
//! - ClaimComparator / ClaimFinder: series and exact-claim identity
//! - Reconcile: per-pair outcomes and the add/remove diff
//! - ClaimWriter: bulk apply and single-claim upsert
//! - SyncService: the pipeline wired over injected adapters
//! - RetryPolicy: backoff for whole sync runs

pub mod builder;
pub mod comparator;
pub mod finder;
pub mod reconcile;
pub mod retry;
pub mod service;
pub mod writer;

// Re-export commonly used types
pub use builder::{format_total, ClaimBuilder};
pub use comparator::ClaimComparator;
pub use finder::{locate, ClaimFinder, FoundClaim};
pub use reconcile::{classify, plan, ClaimDiff, ClaimOutcome, ReconciliationEngine};
pub use retry::RetryPolicy;
pub use service::{SkipReason, SyncMode, SyncOutcome, SyncService};
pub use writer::{ClaimWriter, UpsertOutcome};
