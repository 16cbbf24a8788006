//! Exact lookup of one published claim by dates, scope and category.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::comparator::qualifier_matches;
use crate::adapters::StatementStore;
use crate::domain::{to_wire_date, vocabulary::Properties, ExistingClaim, ItemId, Qualifiers};

/// A located claim and the reference to reuse on update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundClaim {
    pub guid: String,
    pub reference_hash: Option<String>,
}

pub struct ClaimFinder<'a> {
    store: &'a dyn StatementStore,
    properties: &'a Properties,
}

impl<'a> ClaimFinder<'a> {
    pub fn new(store: &'a dyn StatementStore, properties: &'a Properties) -> Self {
        Self { store, properties }
    }

    /// Fetch the entity's claims and return the first exact match
    pub async fn find(
        &self,
        entity: &ItemId,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        scope: Option<&ItemId>,
        category: Option<&ItemId>,
    ) -> Result<Option<FoundClaim>> {
        let existing = self
            .store
            .get_claims(entity, &self.properties.carbon_footprint)
            .await?;

        Ok(locate(self.properties, &existing, start, end, scope, category))
    }
}

/// Pure half of [`ClaimFinder::find`]
pub fn locate(
    properties: &Properties,
    existing: &[ExistingClaim],
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    scope: Option<&ItemId>,
    category: Option<&ItemId>,
) -> Option<FoundClaim> {
    let start = to_wire_date(start);
    let end = to_wire_date(end);

    existing
        .iter()
        .find(|claim| {
            time_equals(&claim.qualifiers, &properties.start_time, &start)
                && time_equals(&claim.qualifiers, &properties.end_time, &end)
                && qualifier_matches(scope, &claim.qualifiers, &properties.scope_role)
                && qualifier_matches(category, &claim.qualifiers, &properties.category_part)
        })
        .map(|claim| FoundClaim {
            guid: claim.guid.clone(),
            reference_hash: claim.references.first().map(|r| r.hash.clone()),
        })
}

fn time_equals(qualifiers: &Qualifiers, property: &str, wire: &str) -> bool {
    qualifiers
        .first_value(property)
        .and_then(|value| value.as_time())
        == Some(wire)
}
