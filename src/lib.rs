//! footprint-sync - Verified emissions to Wikibase claims
//!
//! Publishes a company's verified greenhouse-gas figures as time-bounded
//! carbon-footprint statements on a Wikibase instance, keeping at most one
//! live statement per (scope, category) series.
//!
//! # Architecture
//!
//! Every run is a reconciliation:
//! - Desired claims are rebuilt from the latest emissions record
//! - Published claims in the same series are classified against them
//! - The resulting add/remove diff is written as one bulk edit
//!
//! Repeated runs converge; there is no local state.
//!
//! # Modules
//!
//! - `adapters`: External systems (Wikibase, emissions API)
//! - `core`: Builder, reconciliation, writer, sync service
//! - `domain`: Data structures (Claim, ExistingClaim, EmissionsRecord, Vocabulary)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Preview changes for two companies
//! footprint-sync sync Q52825 Q1127440 --dry-run
//!
//! # Apply them
//! footprint-sync sync Q52825 Q1127440
//!
//! # Inspect what is published
//! footprint-sync claims Q52825
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{EmissionsApiClient, EmissionsSource, StatementStore, WikibaseClient};
pub use crate::core::{ClaimDiff, SyncMode, SyncOutcome, SyncService};
pub use domain::{Claim, ClaimError, ExistingClaim, ItemId, Vocabulary};
