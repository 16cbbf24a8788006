//! Sync service: emissions source → claims → diff → store.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument};

use super::builder::ClaimBuilder;
use super::reconcile::{ClaimDiff, ReconciliationEngine};
use super::writer::{ClaimWriter, UpsertOutcome};
use crate::adapters::{EmissionsSource, StatementStore};
use crate::domain::{Claim, ExistingClaim, ItemId, Vocabulary};

/// Whether a sync writes its diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Apply,
    DryRun,
}

/// Why an entity was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source has no record for the company
    NoEmissions,
    /// The record lacks a start or end date
    MissingPeriod,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEmissions => write!(f, "no emissions record"),
            Self::MissingPeriod => write!(f, "incomplete reporting period"),
        }
    }
}

/// Result of syncing one entity
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    /// The diff that was applied (or, in dry-run, would have been)
    Reconciled { diff: ClaimDiff },
}

/// Reconciles published claims with the emissions source
pub struct SyncService {
    store: Arc<dyn StatementStore>,
    emissions: Arc<dyn EmissionsSource>,
    vocabulary: Vocabulary,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn StatementStore>,
        emissions: Arc<dyn EmissionsSource>,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            store,
            emissions,
            vocabulary,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Bring one entity's carbon-footprint claims in line with its latest record
    #[instrument(skip(self, entity), fields(entity = %entity, store = self.store.name()))]
    pub async fn sync_entity(&self, entity: &ItemId, mode: SyncMode) -> Result<SyncOutcome> {
        let Some(record) = self.emissions.latest_emissions(entity).await? else {
            info!(source = self.emissions.name(), "No emissions record, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::NoEmissions));
        };

        let Some(desired) = ClaimBuilder::new(&self.vocabulary).build(&record) else {
            info!("Reporting period incomplete, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::MissingPeriod));
        };

        let properties = &self.vocabulary.properties;
        let diff = ReconciliationEngine::new(self.store.as_ref(), properties)
            .diff(entity, &desired)
            .await?;

        match mode {
            SyncMode::Apply => {
                ClaimWriter::new(self.store.as_ref(), properties)
                    .apply(entity, &diff.add, &diff.remove)
                    .await?;
            }
            SyncMode::DryRun => {
                info!(add = diff.add.len(), remove = diff.remove.len(), "Dry run, not writing");
            }
        }

        Ok(SyncOutcome::Reconciled { diff })
    }

    /// Create or update one claim by its exact (dates, scope, category)
    #[instrument(skip(self, entity, claim), fields(entity = %entity))]
    pub async fn upsert_claim(&self, entity: &ItemId, claim: &Claim) -> Result<UpsertOutcome> {
        ClaimWriter::new(self.store.as_ref(), &self.vocabulary.properties)
            .upsert(entity, claim)
            .await
    }

    /// Published carbon-footprint claims of an entity
    pub async fn existing_claims(&self, entity: &ItemId) -> Result<Vec<ExistingClaim>> {
        self.store
            .get_claims(entity, &self.vocabulary.properties.carbon_footprint)
            .await
    }
}
