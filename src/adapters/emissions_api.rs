//! Emissions source backed by the company emissions REST API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmissionsSource;
use crate::domain::{EmissionsRecord, ItemId, ReportingPeriod, Scope1, Scope2, Scope3};

/// Connection settings for the emissions API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsApiConfig {
    /// Base URL, e.g. "https://api.example.org/api"
    pub api_url: String,
    /// Sent as a bearer token when set
    pub api_token: Option<String>,
}

impl Default for EmissionsApiConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            api_token: None,
        }
    }
}

/// Company as returned by `GET /companies/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(default)]
    pub wikidata_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub reporting_periods: Vec<CompanyReportingPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReportingPeriod {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, rename = "reportURL")]
    pub report_url: Option<String>,

    #[serde(default)]
    pub emissions: Option<PeriodEmissions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodEmissions {
    #[serde(default)]
    pub scope1: Option<Scope1>,

    #[serde(default)]
    pub scope2: Option<Scope2>,

    #[serde(default)]
    pub scope3: Option<Scope3>,
}

impl Company {
    /// Emissions of the period with the latest end date
    pub fn latest_emissions(self) -> Option<EmissionsRecord> {
        let period = self
            .reporting_periods
            .into_iter()
            .max_by_key(|period| period.end_date)?;
        let emissions = period.emissions?;

        Some(EmissionsRecord {
            reporting_period: ReportingPeriod {
                start_date: period.start_date,
                end_date: period.end_date,
                report_url: period.report_url,
            },
            scope1: emissions.scope1,
            scope2: emissions.scope2,
            scope3: emissions.scope3,
        })
    }
}

/// HTTP client for the emissions API
pub struct EmissionsApiClient {
    config: EmissionsApiConfig,
    client: reqwest::Client,
}

impl EmissionsApiClient {
    /// Create a new client
    pub fn new(config: EmissionsApiConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build emissions API HTTP client")?;

        Ok(Self { config, client })
    }

    fn company_url(&self, entity: &ItemId) -> String {
        format!(
            "{}/companies/{}",
            self.config.api_url.trim_end_matches('/'),
            entity
        )
    }

    /// Fetch a company; `None` if the API does not know it
    pub async fn fetch_company(&self, entity: &ItemId) -> Result<Option<Company>> {
        let url = self.company_url(entity);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach emissions API at {}", url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%entity, "Company not found");
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Emissions API returned {} for {}: {}", status, entity, text);
        }

        let company = response
            .json()
            .await
            .with_context(|| format!("Failed to parse company {}", entity))?;

        Ok(Some(company))
    }
}

#[async_trait]
impl EmissionsSource for EmissionsApiClient {
    fn name(&self) -> &str {
        "emissions-api"
    }

    async fn latest_emissions(&self, entity: &ItemId) -> Result<Option<EmissionsRecord>> {
        let company = self.fetch_company(entity).await?;
        Ok(company.and_then(Company::latest_emissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_url_trims_trailing_slash() {
        let client = EmissionsApiClient::new(
            EmissionsApiConfig {
                api_url: "https://api.example.org/api/".to_string(),
                api_token: None,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.company_url(&ItemId::parse("Q42").unwrap()),
            "https://api.example.org/api/companies/Q42"
        );
    }

    #[test]
    fn test_latest_period_wins() {
        let company: Company = serde_json::from_str(
            r#"{
                "wikidataId": "Q42",
                "name": "Example AB",
                "reportingPeriods": [
                    {
                        "startDate": "2023-01-01T00:00:00.000Z",
                        "endDate": "2023-12-31T00:00:00.000Z",
                        "reportURL": "https://example.com/2023.pdf",
                        "emissions": { "scope1": { "total": 20, "metadata": {} } }
                    },
                    {
                        "startDate": "2022-01-01T00:00:00.000Z",
                        "endDate": "2022-12-31T00:00:00.000Z",
                        "reportURL": "https://example.com/2022.pdf",
                        "emissions": { "scope1": { "total": 10, "metadata": {} } }
                    }
                ]
            }"#,
        )
        .unwrap();

        let record = company.latest_emissions().unwrap();
        assert_eq!(
            record.reporting_period.report_url.as_deref(),
            Some("https://example.com/2023.pdf")
        );
        assert_eq!(record.scope1.unwrap().total, Some(20.0));
    }

    #[test]
    fn test_company_without_emissions() {
        let company: Company = serde_json::from_str(
            r#"{ "wikidataId": "Q42", "reportingPeriods": [
                { "startDate": "2023-01-01T00:00:00Z", "endDate": "2023-12-31T00:00:00Z" }
            ] }"#,
        )
        .unwrap();
        assert!(company.latest_emissions().is_none());

        let empty: Company = serde_json::from_str(r#"{ "wikidataId": "Q42" }"#).unwrap();
        assert!(empty.latest_emissions().is_none());
    }
}
