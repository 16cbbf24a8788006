//! Adapter interfaces for external systems.
//!
//! The sync talks to two collaborators: the statement store holding the
//! published claims (a Wikibase instance) and the emissions source holding
//! verified company figures. Both sit behind traits so tests can swap in
//! in-memory fakes.

pub mod emissions_api;
pub mod wikibase;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Claim, EmissionsRecord, ExistingClaim, ItemId, RemoveInstruction};

// Re-export the HTTP adapters
pub use emissions_api::{EmissionsApiClient, EmissionsApiConfig};
pub use wikibase::{WikibaseClient, WikibaseConfig};

/// Read/write access to published statements
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// All statements of an entity under one property
    async fn get_claims(&self, entity: &ItemId, property: &str) -> Result<Vec<ExistingClaim>>;

    /// Create a statement with its qualifiers and one reference; returns its GUID
    async fn create_claim(&self, entity: &ItemId, claim: &Claim) -> Result<String>;

    /// Add and remove statements in a single edit
    async fn edit_claims(
        &self,
        entity: &ItemId,
        add: &[Claim],
        remove: &[RemoveInstruction],
    ) -> Result<()>;

    /// Replace a statement's main value
    async fn update_claim(&self, guid: &str, value: &str) -> Result<()>;

    /// Attach a new reference to a statement
    async fn create_reference(&self, guid: &str, url: &str) -> Result<()>;

    /// Overwrite the reference identified by `hash`
    async fn update_reference(&self, guid: &str, url: &str, hash: &str) -> Result<()>;
}

/// Supplier of verified emissions per company
#[async_trait]
pub trait EmissionsSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Latest emissions record for the company, if it has one
    async fn latest_emissions(&self, entity: &ItemId) -> Result<Option<EmissionsRecord>>;
}
