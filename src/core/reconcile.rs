//! Claim reconciliation.
//!
//! For each desired claim, every published claim in the same series is
//! classified by how its period relates to the desired one. The outcomes
//! decide which published claims go and whether the desired one is added.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::comparator::ClaimComparator;
use crate::adapters::StatementStore;
use crate::domain::{
    from_wire_date, vocabulary::Properties, Claim, ClaimError, ExistingClaim, ItemId,
    RemoveInstruction,
};

/// How one published claim relates to a desired claim of the same series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Published claim is open-ended or ends earlier; it goes
    Superseded,
    /// Published claim ends later; the desired claim is dropped
    Stale,
    /// Same dates, different value; replace
    SamePeriodChanged,
    /// Same dates, same value; nothing to do
    SamePeriodUnchanged,
    /// Same end, different start; the desired claim wins
    Irregular,
}

impl ClaimOutcome {
    /// Whether the desired claim may still be added
    pub fn keeps_desired(self) -> bool {
        !matches!(self, Self::Stale | Self::SamePeriodUnchanged)
    }

    /// Whether the published claim is queued for removal
    pub fn removes_existing(self) -> bool {
        matches!(
            self,
            Self::Superseded | Self::SamePeriodChanged | Self::Irregular
        )
    }
}

/// Classify one (desired, published) pair of the same series
pub fn classify(properties: &Properties, desired: &Claim, existing: &ExistingClaim) -> ClaimOutcome {
    let Some(existing_end) = qualifier_date(existing, &properties.end_time) else {
        return ClaimOutcome::Superseded;
    };

    if existing_end < desired.end_date {
        return ClaimOutcome::Superseded;
    }
    if existing_end > desired.end_date {
        return ClaimOutcome::Stale;
    }

    if qualifier_date(existing, &properties.start_time) != Some(desired.start_date) {
        return ClaimOutcome::Irregular;
    }

    if existing.value.as_deref() == Some(desired.wire_amount().as_str()) {
        ClaimOutcome::SamePeriodUnchanged
    } else {
        ClaimOutcome::SamePeriodChanged
    }
}

/// A time qualifier as a date; unreadable values count as missing
fn qualifier_date(existing: &ExistingClaim, property: &str) -> Option<DateTime<Utc>> {
    let value = existing.qualifiers.first_value(property)?;

    let parsed = value
        .as_time()
        .ok_or_else(|| ClaimError::InvalidWireDate(format!("{:?}", value)))
        .and_then(from_wire_date);

    match parsed {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(guid = %existing.guid, property, "Ignoring date qualifier: {}", e);
            None
        }
    }
}

/// Claims to add and statements to remove
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimDiff {
    pub add: Vec<Claim>,
    pub remove: Vec<RemoveInstruction>,
}

impl ClaimDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Pure diff of desired claims against published ones
pub fn plan(properties: &Properties, desired: &[Claim], existing: &[ExistingClaim]) -> ClaimDiff {
    let comparator = ClaimComparator::new(properties);
    let mut diff = ClaimDiff::default();
    let mut removed: HashSet<&str> = HashSet::new();

    for claim in desired {
        let mut add = true;

        for published in existing
            .iter()
            .filter(|published| comparator.same_series(claim, published))
        {
            let outcome = classify(properties, claim, published);
            debug!(guid = %published.guid, ?outcome, "Classified published claim");

            if !outcome.keeps_desired() {
                add = false;
            }
            if outcome.removes_existing() && removed.insert(published.guid.as_str()) {
                diff.remove.push(RemoveInstruction::new(published.guid.clone()));
            }
        }

        // At most once, however many published claims it replaces
        if add {
            diff.add.push(claim.clone());
        }
    }

    diff
}

/// Computes diffs against the live store
pub struct ReconciliationEngine<'a> {
    store: &'a dyn StatementStore,
    properties: &'a Properties,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(store: &'a dyn StatementStore, properties: &'a Properties) -> Self {
        Self { store, properties }
    }

    /// Read the entity's published claims and plan against them
    pub async fn diff(&self, entity: &ItemId, desired: &[Claim]) -> Result<ClaimDiff> {
        let existing = self
            .store
            .get_claims(entity, &self.properties.carbon_footprint)
            .await?;

        let diff = plan(self.properties, desired, &existing);

        info!(
            %entity,
            published = existing.len(),
            desired = desired.len(),
            add = diff.add.len(),
            remove = diff.remove.len(),
            "Computed claim diff"
        );

        Ok(diff)
    }
}
