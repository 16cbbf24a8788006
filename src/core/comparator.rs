//! Series identity: do two claims describe the same kind of figure?

use crate::domain::{vocabulary::Properties, Claim, ExistingClaim, ItemId, Qualifiers};

/// Compares claims by (scope, category), ignoring dates
pub struct ClaimComparator<'a> {
    properties: &'a Properties,
}

impl<'a> ClaimComparator<'a> {
    pub fn new(properties: &'a Properties) -> Self {
        Self { properties }
    }

    /// True if `existing` belongs to the same (scope, category) series as `desired`
    pub fn same_series(&self, desired: &Claim, existing: &ExistingClaim) -> bool {
        qualifier_matches(
            desired.scope.as_ref(),
            &existing.qualifiers,
            &self.properties.scope_role,
        ) && qualifier_matches(
            desired.category.as_ref(),
            &existing.qualifiers,
            &self.properties.category_part,
        )
    }
}

/// Item qualifier agreement: both absent, or both present and equal
pub(crate) fn qualifier_matches(
    desired: Option<&ItemId>,
    qualifiers: &Qualifiers,
    property: &str,
) -> bool {
    match (desired, qualifiers.first_value(property)) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(_), None) => false,
        (Some(id), Some(value)) => value.as_item() == Some(id.as_str()),
    }
}
