//! Wikibase adapter speaking the MediaWiki Action API.
//!
//! Reads go through `wbgetclaims`; writes use `wbeditentity` for bulk
//! edits and `wbsetclaim` / `wbsetclaimvalue` / `wbsetreference` for the
//! single-statement path. Every write carries a CSRF token, fetched on first
//! use and again after the wiki rejects it (after a bot-password login when
//! credentials are configured).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::StatementStore;
use crate::domain::{
    to_wire_amount, Claim, ExistingClaim, ItemId, QualifierValue, Qualifiers, Reference,
    RemoveInstruction, Vocabulary,
};

/// Connection settings for a Wikibase instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikibaseConfig {
    /// Action API endpoint
    pub api_url: String,
    /// Bot-password user name (e.g. "Garbo@footprint-sync")
    pub username: Option<String>,
    pub password: Option<String>,
    /// Prefix for entity concept URIs (units, calendar models)
    pub concept_uri_base: String,
    pub user_agent: String,
    pub edit_summary: String,
}

impl Default for WikibaseConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.wikidata.org/w/api.php".to_string(),
            username: None,
            password: None,
            concept_uri_base: "http://www.wikidata.org/entity/".to_string(),
            user_agent: format!("footprint-sync/{}", env!("CARGO_PKG_VERSION")),
            edit_summary: "Update carbon footprint statements".to_string(),
        }
    }
}

/// Wikibase Action API client
pub struct WikibaseClient {
    config: WikibaseConfig,
    vocabulary: Vocabulary,
    client: reqwest::Client,
    /// Cached CSRF token (fetched on first write)
    csrf_token: Mutex<Option<String>>,
}

/// Error envelope: `{"error": {"code": ..., "info": ...}}`
#[derive(Debug, Deserialize, Error)]
#[error("Wikibase API error ({code}): {info}")]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

impl ApiError {
    /// The CSRF token or the login session it belongs to is no longer valid
    fn is_session_error(&self) -> bool {
        matches!(self.code.as_str(), "badtoken" | "notloggedin" | "assertuserfailed")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    query: TokenQuery,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    tokens: Tokens,
}

#[derive(Debug, Deserialize)]
struct Tokens {
    csrftoken: Option<String>,
    logintoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    login: LoginResult,
}

#[derive(Debug, Deserialize)]
struct LoginResult {
    result: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Statement as returned by `wbgetclaims`
#[derive(Debug, Deserialize)]
struct WireStatement {
    id: String,
    mainsnak: WireSnak,
    #[serde(default)]
    qualifiers: HashMap<String, Vec<WireSnak>>,
    #[serde(default)]
    references: Vec<WireReference>,
}

#[derive(Debug, Deserialize)]
struct WireSnak {
    /// Absent for somevalue/novalue snaks
    #[serde(default)]
    datavalue: Option<WireDataValue>,
}

#[derive(Debug, Deserialize)]
struct WireDataValue {
    value: Value,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WireReference {
    hash: String,
    #[serde(default)]
    snaks: HashMap<String, Vec<WireSnak>>,
}

impl WireSnak {
    fn qualifier_value(&self) -> QualifierValue {
        let Some(datavalue) = &self.datavalue else {
            return QualifierValue::Other;
        };

        let field = match datavalue.kind.as_str() {
            "time" => "time",
            "wikibase-entityid" => "id",
            _ => return QualifierValue::Other,
        };

        match datavalue.value.get(field).and_then(Value::as_str) {
            Some(raw) if field == "time" => QualifierValue::Time(raw.to_string()),
            Some(raw) => QualifierValue::Item(raw.to_string()),
            None => QualifierValue::Other,
        }
    }

    fn string_value(&self) -> Option<String> {
        self.datavalue
            .as_ref()
            .and_then(|dv| dv.value.as_str())
            .map(str::to_string)
    }
}

impl WikibaseClient {
    /// Create a new client
    pub fn new(config: WikibaseConfig, vocabulary: Vocabulary, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()
            .context("Failed to build Wikibase HTTP client")?;

        Ok(Self {
            config,
            vocabulary,
            client,
            csrf_token: Mutex::new(None),
        })
    }

    /// GET an Action API module
    async fn get(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[("format", "json")])
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to reach Wikibase API at {}", self.config.api_url))?;

        Self::read_body(response).await
    }

    /// POST a form to an Action API module
    async fn post(&self, params: &[(&str, String)]) -> Result<Value> {
        let mut form = params.to_vec();
        form.push(("format", "json".to_string()));

        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("Failed to reach Wikibase API at {}", self.config.api_url))?;

        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Wikibase API returned {}: {}", status, text);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Wikibase response")?;

        // The Action API reports failures with HTTP 200 and an error envelope
        if let Some(error) = body.get("error") {
            let error: ApiError = serde_json::from_value(error.clone())
                .context("Failed to parse Wikibase error envelope")?;
            return Err(error.into());
        }

        Ok(body)
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])
            .await?;
        let tokens: TokenResponse =
            serde_json::from_value(body).context("Unexpected login token response")?;
        let login_token = tokens
            .query
            .tokens
            .logintoken
            .context("Wikibase did not return a login token")?;

        let body = self
            .post(&[
                ("action", "login".to_string()),
                ("lgname", username.to_string()),
                ("lgpassword", password.to_string()),
                ("lgtoken", login_token),
            ])
            .await?;
        let login: LoginResponse =
            serde_json::from_value(body).context("Unexpected login response")?;

        if login.login.result != "Success" {
            anyhow::bail!(
                "Wikibase login failed for {}: {}",
                username,
                login.login.reason.unwrap_or(login.login.result)
            );
        }

        info!(user = %username, "Logged in to Wikibase");
        Ok(())
    }

    async fn csrf_token(&self) -> Result<String> {
        let mut cached = self.csrf_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            self.login(username, password).await?;
        }

        let body = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")])
            .await?;
        let tokens: TokenResponse =
            serde_json::from_value(body).context("Unexpected CSRF token response")?;
        let token = tokens
            .query
            .tokens
            .csrftoken
            .context("Wikibase did not return a CSRF token")?;

        *cached = Some(token.clone());
        Ok(token)
    }

    /// POST a write action with token and edit summary
    async fn write(&self, action: &str, mut params: Vec<(&str, String)>) -> Result<Value> {
        let token = self.csrf_token().await?;

        params.push(("action", action.to_string()));
        params.push(("summary", self.config.edit_summary.clone()));
        params.push(("token", token));

        debug!(action, "Wikibase write");
        let result = self.post(&params).await;

        if let Err(e) = &result {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_error) {
                warn!(action, "Wikibase rejected the session, dropping cached token");
                *self.csrf_token.lock().await = None;
            }
        }

        result.with_context(|| format!("Wikibase {} failed", action))
    }

    fn concept_uri(&self, id: &ItemId) -> String {
        format!("{}{}", self.config.concept_uri_base, id)
    }

    fn amount_value(&self, value: &str) -> Value {
        json!({
            "amount": to_wire_amount(value),
            "unit": self.vocabulary.unit_uri(&self.config.concept_uri_base),
        })
    }

    fn time_snak(&self, property: &str, time: String) -> Value {
        json!({
            "snaktype": "value",
            "property": property,
            "datavalue": {
                "type": "time",
                "value": {
                    "time": time,
                    "timezone": 0,
                    "before": 0,
                    "after": 0,
                    "precision": 11,
                    "calendarmodel": self.concept_uri(&self.vocabulary.entities.gregorian_calendar),
                },
            },
        })
    }

    fn item_snak(property: &str, id: &ItemId) -> Value {
        json!({
            "snaktype": "value",
            "property": property,
            "datavalue": {
                "type": "wikibase-entityid",
                "value": { "entity-type": "item", "id": id.as_str() },
            },
        })
    }

    fn reference_snaks(&self, url: &str) -> Value {
        let property = &self.vocabulary.properties.reference_url;
        let mut snaks = Map::new();
        snaks.insert(
            property.clone(),
            json!([{
                "snaktype": "value",
                "property": property,
                "datavalue": { "type": "string", "value": url },
            }]),
        );
        Value::Object(snaks)
    }

    /// Full statement JSON for a claim; `guid` is omitted for bulk adds
    fn statement_json(&self, claim: &Claim, guid: Option<&str>) -> Value {
        let properties = &self.vocabulary.properties;

        let mut qualifiers = Map::new();
        qualifiers.insert(
            properties.start_time.clone(),
            json!([self.time_snak(&properties.start_time, claim.wire_start())]),
        );
        qualifiers.insert(
            properties.end_time.clone(),
            json!([self.time_snak(&properties.end_time, claim.wire_end())]),
        );
        if let Some(scope) = &claim.scope {
            qualifiers.insert(
                properties.scope_role.clone(),
                json!([Self::item_snak(&properties.scope_role, scope)]),
            );
        }
        if let Some(category) = &claim.category {
            qualifiers.insert(
                properties.category_part.clone(),
                json!([Self::item_snak(&properties.category_part, category)]),
            );
        }

        let mut statement = json!({
            "type": "statement",
            "rank": "normal",
            "mainsnak": {
                "snaktype": "value",
                "property": properties.carbon_footprint,
                "datavalue": { "type": "quantity", "value": self.amount_value(&claim.value) },
            },
            "qualifiers": Value::Object(qualifiers),
            "references": [{ "snaks": self.reference_snaks(&claim.reference_url) }],
        });

        if let Some(guid) = guid {
            statement["id"] = json!(guid);
        }

        statement
    }

    fn to_existing(&self, statement: WireStatement) -> ExistingClaim {
        let value = statement
            .mainsnak
            .datavalue
            .as_ref()
            .filter(|dv| dv.kind == "quantity")
            .and_then(|dv| dv.value.get("amount"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut qualifiers = Qualifiers::new();
        for (property, snaks) in &statement.qualifiers {
            for snak in snaks {
                qualifiers.insert(property.clone(), snak.qualifier_value());
            }
        }

        let reference_property = &self.vocabulary.properties.reference_url;
        let references = statement
            .references
            .into_iter()
            .map(|reference| {
                let url = reference
                    .snaks
                    .get(reference_property)
                    .and_then(|snaks| snaks.first())
                    .and_then(WireSnak::string_value);
                Reference {
                    hash: reference.hash,
                    url,
                }
            })
            .collect();

        ExistingClaim {
            guid: statement.id,
            value,
            qualifiers,
            references,
        }
    }
}

#[async_trait]
impl StatementStore for WikibaseClient {
    fn name(&self) -> &str {
        "wikibase"
    }

    async fn get_claims(&self, entity: &ItemId, property: &str) -> Result<Vec<ExistingClaim>> {
        let body = self
            .get(&[
                ("action", "wbgetclaims"),
                ("entity", entity.as_str()),
                ("property", property),
            ])
            .await
            .with_context(|| format!("Failed to fetch {} claims for {}", property, entity))?;

        // An entity without statements comes back as `"claims": []`
        let statements: Vec<WireStatement> = match body.get("claims").and_then(|c| c.get(property)) {
            Some(list) => serde_json::from_value(list.clone())
                .with_context(|| format!("Failed to parse {} statements for {}", property, entity))?,
            None => Vec::new(),
        };

        debug!(%entity, count = statements.len(), "Fetched statements");
        Ok(statements
            .into_iter()
            .map(|statement| self.to_existing(statement))
            .collect())
    }

    async fn create_claim(&self, entity: &ItemId, claim: &Claim) -> Result<String> {
        let guid = format!("{}${}", entity, Uuid::new_v4().to_string().to_uppercase());
        let statement = self.statement_json(claim, Some(&guid));

        self.write("wbsetclaim", vec![("claim", statement.to_string())])
            .await?;

        info!(%guid, "Created statement");
        Ok(guid)
    }

    async fn edit_claims(
        &self,
        entity: &ItemId,
        add: &[Claim],
        remove: &[RemoveInstruction],
    ) -> Result<()> {
        let mut claims: Vec<Value> = add
            .iter()
            .map(|claim| self.statement_json(claim, None))
            .collect();
        claims.extend(
            remove
                .iter()
                .map(|instruction| json!({ "id": instruction.guid, "remove": "" })),
        );

        let data = json!({ "claims": claims });
        self.write(
            "wbeditentity",
            vec![("id", entity.to_string()), ("data", data.to_string())],
        )
        .await?;

        info!(%entity, added = add.len(), removed = remove.len(), "Edited statements");
        Ok(())
    }

    async fn update_claim(&self, guid: &str, value: &str) -> Result<()> {
        self.write(
            "wbsetclaimvalue",
            vec![
                ("claim", guid.to_string()),
                ("snaktype", "value".to_string()),
                ("value", self.amount_value(value).to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn create_reference(&self, guid: &str, url: &str) -> Result<()> {
        self.write(
            "wbsetreference",
            vec![
                ("statement", guid.to_string()),
                ("snaks", self.reference_snaks(url).to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_reference(&self, guid: &str, url: &str, hash: &str) -> Result<()> {
        self.write(
            "wbsetreference",
            vec![
                ("statement", guid.to_string()),
                ("snaks", self.reference_snaks(url).to_string()),
                ("reference", hash.to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}
