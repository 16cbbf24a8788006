//! Verified emissions aggregate, as supplied by the emissions source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who verified a figure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verifier {
    #[serde(default)]
    pub name: String,
}

/// Per-metric metadata; only verification matters to the sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub verified_by: Option<Verifier>,
}

impl Metadata {
    pub fn verified_by(name: impl Into<String>) -> Self {
        Self {
            verified_by: Some(Verifier { name: name.into() }),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified_by.is_some()
    }
}

/// Date range an emissions figure covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPeriod {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, rename = "reportURL")]
    pub report_url: Option<String>,
}

impl ReportingPeriod {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>, report_url: impl Into<String>) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            report_url: Some(report_url.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope1 {
    #[serde(default)]
    pub total: Option<f64>,

    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope2 {
    /// Market-based
    #[serde(default)]
    pub mb: Option<f64>,

    /// Location-based
    #[serde(default)]
    pub lb: Option<f64>,

    /// Unknown mix
    #[serde(default)]
    pub unknown: Option<f64>,

    /// Period for the unknown-mix figure, when it differs from the parent
    #[serde(default)]
    pub reporting_period: Option<ReportingPeriod>,

    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope3Category {
    /// GHG Protocol category number, 1..=16
    pub category: u8,

    #[serde(default)]
    pub total: Option<f64>,

    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope3 {
    #[serde(default)]
    pub categories: Vec<Scope3Category>,
}

/// Latest emissions record for one company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsRecord {
    #[serde(default)]
    pub reporting_period: ReportingPeriod,

    #[serde(default)]
    pub scope1: Option<Scope1>,

    #[serde(default)]
    pub scope2: Option<Scope2>,

    #[serde(default)]
    pub scope3: Option<Scope3>,
}
