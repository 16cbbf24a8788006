//! Claim value objects.
//!
//! A [`Claim`] is a statement we want to publish. An [`ExistingClaim`] is a
//! read-only snapshot of a statement already held by the store, with its
//! qualifiers kept as an explicit property → values mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::date::to_wire_date;

/// Validation errors for claims and their identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("Cannot have a category without a scope")]
    CategoryWithoutScope,

    #[error("Invalid item id '{0}' (expected Q<number>)")]
    InvalidItemId(String),

    #[error("Invalid store date '{0}' (expected +YYYY-MM-DDThh:mm:ssZ)")]
    InvalidWireDate(String),

    #[error("Unknown scope 3 category: {0}")]
    UnknownCategory(u8),
}

/// A Wikibase item identifier such as `Q42`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse and validate a `Q<number>` literal
    pub fn parse(raw: &str) -> Result<Self, ClaimError> {
        let digits = raw
            .strip_prefix('Q')
            .ok_or_else(|| ClaimError::InvalidItemId(raw.to_string()))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClaimError::InvalidItemId(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// Built-in ids only; skips validation
    pub(crate) fn from_static(raw: &'static str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ClaimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// A desired carbon-footprint statement, rebuilt on every run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claim {
    /// Decimal value in tonnes CO2e, e.g. "1234.5"
    pub value: String,

    /// Start of the reporting period (whole seconds)
    pub start_date: DateTime<Utc>,

    /// End of the reporting period (whole seconds)
    pub end_date: DateTime<Utc>,

    /// Provenance: the report this figure was taken from
    pub reference_url: String,

    /// Scope item (resolved through the vocabulary)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ItemId>,

    /// Scope 3 category item (resolved through the vocabulary)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ItemId>,
}

impl Claim {
    /// Create an unscoped claim. Dates are truncated to whole seconds.
    pub fn new(
        value: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        reference_url: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            start_date: start_date.trunc_subsecs(0),
            end_date: end_date.trunc_subsecs(0),
            reference_url: reference_url.into(),
            scope: None,
            category: None,
        }
    }

    /// Attach a scope qualifier
    pub fn with_scope(mut self, scope: ItemId) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Attach a category qualifier
    pub fn with_category(mut self, category: ItemId) -> Self {
        self.category = Some(category);
        self
    }

    /// A category only makes sense inside a scope
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.category.is_some() && self.scope.is_none() {
            return Err(ClaimError::CategoryWithoutScope);
        }
        Ok(())
    }

    /// Start date in store wire format
    pub fn wire_start(&self) -> String {
        to_wire_date(&self.start_date)
    }

    /// End date in store wire format
    pub fn wire_end(&self) -> String {
        to_wire_date(&self.end_date)
    }

    /// Value as a signed store amount
    pub fn wire_amount(&self) -> String {
        to_wire_amount(&self.value)
    }
}

/// Store amounts always carry an explicit sign: "100" → "+100"
pub fn to_wire_amount(value: &str) -> String {
    if value.starts_with('+') || value.starts_with('-') {
        value.to_string()
    } else {
        format!("+{}", value)
    }
}

/// A single qualifier value as read from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum QualifierValue {
    /// Time value in wire format, e.g. "+2023-01-01T00:00:00Z"
    Time(String),

    /// Item reference, e.g. "Q124883250"
    Item(String),

    /// Any other datatype, or a somevalue/novalue snak
    Other,
}

impl QualifierValue {
    pub fn as_time(&self) -> Option<&str> {
        match self {
            Self::Time(time) => Some(time),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&str> {
        match self {
            Self::Item(id) => Some(id),
            _ => None,
        }
    }
}

/// Qualifiers of a statement: property id → ordered values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifiers(BTreeMap<String, Vec<QualifierValue>>);

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a property
    pub fn insert(&mut self, property: impl Into<String>, value: QualifierValue) {
        self.0.entry(property.into()).or_default().push(value);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, property: impl Into<String>, value: QualifierValue) -> Self {
        self.insert(property, value);
        self
    }

    /// True if the property carries at least one value
    pub fn has_qualifier(&self, property: &str) -> bool {
        self.0.get(property).is_some_and(|values| !values.is_empty())
    }

    /// First value under the property, if any
    pub fn first_value(&self, property: &str) -> Option<&QualifierValue> {
        self.0.get(property).and_then(|values| values.first())
    }
}

/// A provenance reference attached to a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub hash: String,
    pub url: Option<String>,
}

/// Snapshot of a statement already published in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingClaim {
    /// Statement GUID, e.g. "Q42$F078E5B3-..."
    pub guid: String,

    /// Signed amount, e.g. "+100". None for somevalue/novalue statements.
    pub value: Option<String>,

    pub qualifiers: Qualifiers,

    pub references: Vec<Reference>,
}

impl ExistingClaim {
    pub fn new(guid: impl Into<String>, value: Option<String>) -> Self {
        Self {
            guid: guid.into(),
            value,
            qualifiers: Qualifiers::new(),
            references: Vec::new(),
        }
    }

    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }
}

/// Instruction to drop a statement during a bulk edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveInstruction {
    pub guid: String,
    pub remove: bool,
}

impl RemoveInstruction {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            remove: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_id_parsing() {
        assert_eq!(ItemId::parse("Q42").unwrap().as_str(), "Q42");
        assert!(ItemId::parse("Q").is_err());
        assert!(ItemId::parse("P580").is_err());
        assert!(ItemId::parse("Q12a").is_err());
        assert!(matches!(
            "42".parse::<ItemId>(),
            Err(ClaimError::InvalidItemId(_))
        ));
    }

    #[test]
    fn test_claim_truncates_subseconds() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let end = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let claim = Claim::new("100", start, end, "https://example.com/report.pdf");

        assert_eq!(claim.wire_start(), "+2023-01-01T00:00:00Z");
        assert_eq!(claim.wire_end(), "+2023-12-31T00:00:00Z");
    }

    #[test]
    fn test_category_requires_scope() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let category = ItemId::parse("Q1").unwrap();

        let claim = Claim::new("1", start, end, "u").with_category(category.clone());
        assert_eq!(claim.validate(), Err(ClaimError::CategoryWithoutScope));

        let scoped = claim.with_scope(ItemId::parse("Q2").unwrap());
        assert!(scoped.validate().is_ok());
    }

    #[test]
    fn test_wire_amount_sign() {
        assert_eq!(to_wire_amount("100"), "+100");
        assert_eq!(to_wire_amount("+100"), "+100");
        assert_eq!(to_wire_amount("-3.5"), "-3.5");
    }

    #[test]
    fn test_qualifier_accessors() {
        let qualifiers = Qualifiers::new()
            .with("P580", QualifierValue::Time("+2023-01-01T00:00:00Z".into()))
            .with("P3831", QualifierValue::Item("Q1".into()))
            .with("P3831", QualifierValue::Item("Q2".into()));

        assert!(qualifiers.has_qualifier("P580"));
        assert!(!qualifiers.has_qualifier("P582"));
        assert_eq!(
            qualifiers.first_value("P3831").and_then(QualifierValue::as_item),
            Some("Q1")
        );
        assert_eq!(
            qualifiers.first_value("P580").and_then(QualifierValue::as_item),
            None
        );
    }
}
