//! Maps a verified emissions record onto the claims we want published.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{
    Claim, EmissionsRecord, Metadata, ReportingPeriod, Scope, Vocabulary, OTHER_CATEGORY,
};

/// Builds the desired claim list for one record
pub struct ClaimBuilder<'a> {
    vocabulary: &'a Vocabulary,
}

/// Dates and report a claim is published under
#[derive(Clone, Copy)]
struct Period<'r> {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    url: Option<&'r str>,
}

impl<'r> Period<'r> {
    fn from_reporting(period: &'r ReportingPeriod) -> Option<Self> {
        Some(Self {
            start: period.start_date?,
            end: period.end_date?,
            url: period.report_url.as_deref(),
        })
    }

    /// A nested period overrides dates only when it has both of them;
    /// its URL wins whenever it has one
    fn overridden_by(self, nested: Option<&'r ReportingPeriod>) -> Self {
        let Some(nested) = nested else {
            return self;
        };

        let url = nested.report_url.as_deref().or(self.url);
        match (nested.start_date, nested.end_date) {
            (Some(start), Some(end)) => Self { start, end, url },
            _ => Self { url, ..self },
        }
    }
}

impl<'a> ClaimBuilder<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Desired claims in publishing order.
    ///
    /// Returns `None` when the record lacks a start or end date; such
    /// records are skipped as a whole. A figure with no report URL from
    /// any source is dropped on its own, since every claim needs one reference.
    pub fn build(&self, record: &EmissionsRecord) -> Option<Vec<Claim>> {
        let Some(period) = Period::from_reporting(&record.reporting_period) else {
            debug!("Reporting period incomplete, skipping record");
            return None;
        };

        let mut claims = Vec::new();

        if let Some(scope1) = &record.scope1 {
            if let Some(total) = verified(scope1.total, &scope1.metadata) {
                claims.extend(self.scoped(total, period, Scope::Scope1));
            }
        }

        if let Some(scope2) = &record.scope2 {
            if let Some(total) = verified(scope2.mb, &scope2.metadata) {
                claims.extend(self.scoped(total, period, Scope::Scope2MarketBased));
            }
            if let Some(total) = verified(scope2.lb, &scope2.metadata) {
                claims.extend(self.scoped(total, period, Scope::Scope2LocationBased));
            }
            if let Some(total) = verified(scope2.unknown, &scope2.metadata) {
                let own = period.overridden_by(scope2.reporting_period.as_ref());
                claims.extend(self.scoped(total, own, Scope::Scope2UnknownMix));
            }
        }

        if let Some(scope3) = &record.scope3 {
            for category in &scope3.categories {
                if category.category == OTHER_CATEGORY {
                    continue;
                }
                let Some(total) = verified(category.total, &category.metadata) else {
                    continue;
                };

                match self.vocabulary.category(category.category) {
                    Ok(id) => claims.extend(
                        self.scoped(total, period, Scope::Scope3)
                            .map(|claim| claim.with_category(id.clone())),
                    ),
                    Err(e) => warn!(category = category.category, "Skipping figure: {}", e),
                }
            }
        }

        debug!(count = claims.len(), "Built desired claims");
        Some(claims)
    }

    fn scoped(&self, total: f64, period: Period<'_>, scope: Scope) -> Option<Claim> {
        let Some(url) = period.url else {
            warn!(?scope, "No report URL for figure, skipping");
            return None;
        };

        Some(
            Claim::new(format_total(total), period.start, period.end, url)
                .with_scope(self.vocabulary.scope(scope).clone()),
        )
    }
}

fn verified(total: Option<f64>, metadata: &Metadata) -> Option<f64> {
    if metadata.is_verified() {
        total
    } else {
        None
    }
}

/// Shortest decimal form: 100.0 → "100", 12.5 → "12.5"
pub fn format_total(total: f64) -> String {
    total.to_string()
}
