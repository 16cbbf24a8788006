//! Command-line interface for footprint-sync.
//!
//! Provides commands for syncing companies, inspecting published claims,
//! upserting a single claim, and showing the resolved configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::adapters::{EmissionsApiClient, WikibaseClient};
use crate::config::{self, ResolvedConfig};
use crate::core::{ClaimDiff, SyncMode, SyncOutcome, SyncService, UpsertOutcome};
use crate::domain::{category_label, Claim, ExistingClaim, ItemId, QualifierValue, Scope, Vocabulary};

/// footprint-sync - Publish verified emissions as Wikibase claims
#[derive(Parser, Debug)]
#[command(name = "footprint-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile carbon-footprint claims for one or more companies
    Sync {
        /// Company item ids (e.g. Q42)
        #[arg(required = true)]
        entities: Vec<String>,

        /// Print the plan without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// List published carbon-footprint claims of a company
    Claims {
        /// Company item id
        entity: String,
    },

    /// Create or update a single claim
    Set {
        /// Company item id
        entity: String,

        /// Period start (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: String,

        /// Period end (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        end: String,

        /// Value in tonnes CO2e
        #[arg(long)]
        value: String,

        /// Report the value was taken from
        #[arg(long)]
        reference_url: String,

        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,

        /// Scope 3 category number (1-15)
        #[arg(long)]
        category: Option<u8>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Scope for CLI (maps to Scope)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    #[value(name = "1")]
    Scope1,

    /// Scope 2, market-based
    #[value(name = "2-mb")]
    Scope2MarketBased,

    /// Scope 2, location-based
    #[value(name = "2-lb")]
    Scope2LocationBased,

    /// Scope 2, unknown mix
    #[value(name = "2")]
    Scope2UnknownMix,

    #[value(name = "3")]
    Scope3,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Scope1 => Scope::Scope1,
            ScopeArg::Scope2MarketBased => Scope::Scope2MarketBased,
            ScopeArg::Scope2LocationBased => Scope::Scope2LocationBased,
            ScopeArg::Scope2UnknownMix => Scope::Scope2UnknownMix,
            ScopeArg::Scope3 => Scope::Scope3,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sync { entities, dry_run } => {
                sync_entities(&entities, dry_run).await
            }
            Commands::Claims { entity } => {
                show_claims(&entity).await
            }
            Commands::Set {
                entity,
                start,
                end,
                value,
                reference_url,
                scope,
                category,
            } => {
                set_claim(&entity, &start, &end, value, reference_url, scope, category).await
            }
            Commands::Config => {
                show_config()
            }
        }
    }
}

/// Build the service from resolved configuration
fn build_service(cfg: &ResolvedConfig) -> Result<SyncService> {
    let store = WikibaseClient::new(cfg.wikibase.clone(), cfg.vocabulary.clone(), cfg.timeout())?;
    let emissions = EmissionsApiClient::new(cfg.emissions.clone(), cfg.timeout())?;

    Ok(SyncService::new(
        Arc::new(store),
        Arc::new(emissions),
        cfg.vocabulary.clone(),
    ))
}

fn parse_entity(raw: &str) -> Result<ItemId> {
    ItemId::parse(raw).with_context(|| format!("Invalid company id: {}", raw))
}

/// Accepts a bare date (midnight UTC) or a full RFC 3339 timestamp
fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD)", raw))
}

/// Sync each entity in turn; one failure does not stop the rest
async fn sync_entities(raw_entities: &[String], dry_run: bool) -> Result<()> {
    let entities = raw_entities
        .iter()
        .map(|raw| parse_entity(raw))
        .collect::<Result<Vec<_>>>()?;

    let cfg = config::config()?;
    let service = build_service(cfg)?;
    let mode = if dry_run { SyncMode::DryRun } else { SyncMode::Apply };

    let mut failures = 0usize;

    for entity in &entities {
        let label = entity.to_string();
        let result = cfg
            .retry
            .run(&label, || service.sync_entity(entity, mode))
            .await;

        match result {
            Ok(SyncOutcome::Skipped(reason)) => {
                println!("{}: skipped ({})", entity, reason);
            }
            Ok(SyncOutcome::Reconciled { diff }) => {
                print_diff(entity, &diff, service.vocabulary(), dry_run);
            }
            Err(e) => {
                failures += 1;
                error!(%entity, "Sync failed: {:#}", e);
                println!("{}: failed", entity);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} companies failed to sync", failures, entities.len());
    }

    Ok(())
}

fn print_diff(entity: &ItemId, diff: &ClaimDiff, vocabulary: &Vocabulary, dry_run: bool) {
    if diff.is_empty() {
        println!("{}: up to date", entity);
        return;
    }

    let (add, remove) = if dry_run {
        ("would add", "would remove")
    } else {
        ("added", "removed")
    };
    println!(
        "{}: {} {}, {} {}",
        entity,
        add,
        diff.add.len(),
        remove,
        diff.remove.len()
    );

    for claim in &diff.add {
        println!("  + {}", describe_claim(claim, vocabulary));
    }
    for instruction in &diff.remove {
        println!("  - {}", instruction.guid);
    }
}

fn describe_series(scope: Option<&str>, category: Option<&str>, vocabulary: &Vocabulary) -> String {
    let scope = match scope {
        Some(id) => vocabulary
            .scope_of(id)
            .map(|scope| scope.label().to_string())
            .unwrap_or_else(|| id.to_string()),
        None => "unscoped".to_string(),
    };

    match category {
        Some(id) => match vocabulary.category_of(id) {
            Some(number) => format!("{} / {}. {}", scope, number, category_label(number)),
            None => format!("{} / {}", scope, id),
        },
        None => scope,
    }
}

fn describe_claim(claim: &Claim, vocabulary: &Vocabulary) -> String {
    format!(
        "{} t CO2e, {} to {} [{}] ({})",
        claim.value,
        claim.start_date.format("%Y-%m-%d"),
        claim.end_date.format("%Y-%m-%d"),
        describe_series(
            claim.scope.as_ref().map(ItemId::as_str),
            claim.category.as_ref().map(ItemId::as_str),
            vocabulary
        ),
        claim.reference_url
    )
}

fn time_qualifier(claim: &ExistingClaim, property: &str) -> String {
    claim
        .qualifiers
        .first_value(property)
        .and_then(QualifierValue::as_time)
        .map(|time| time.trim_start_matches('+').chars().take(10).collect())
        .unwrap_or_else(|| "?".to_string())
}

/// List published claims
async fn show_claims(raw_entity: &str) -> Result<()> {
    let entity = parse_entity(raw_entity)?;
    let cfg = config::config()?;
    let service = build_service(cfg)?;
    let vocabulary = service.vocabulary();
    let properties = &vocabulary.properties;

    let claims = service.existing_claims(&entity).await?;

    if claims.is_empty() {
        println!("No {} claims on {}", properties.carbon_footprint, entity);
        return Ok(());
    }

    println!("{:<12} {:<12} {:<14} {:<40} {}", "START", "END", "VALUE", "SERIES", "GUID");
    println!("{}", "-".repeat(110));

    for claim in &claims {
        let series = describe_series(
            claim
                .qualifiers
                .first_value(&properties.scope_role)
                .and_then(QualifierValue::as_item),
            claim
                .qualifiers
                .first_value(&properties.category_part)
                .and_then(QualifierValue::as_item),
            vocabulary,
        );

        println!(
            "{:<12} {:<12} {:<14} {:<40} {}",
            time_qualifier(claim, &properties.start_time),
            time_qualifier(claim, &properties.end_time),
            claim.value.as_deref().unwrap_or("-"),
            series,
            claim.guid
        );
    }

    Ok(())
}

/// Upsert one claim
async fn set_claim(
    raw_entity: &str,
    start: &str,
    end: &str,
    value: String,
    reference_url: String,
    scope: Option<ScopeArg>,
    category: Option<u8>,
) -> Result<()> {
    let entity = parse_entity(raw_entity)?;
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let cfg = config::config()?;
    let service = build_service(cfg)?;
    let vocabulary = service.vocabulary();

    let mut claim = Claim::new(value, start, end, reference_url);
    if let Some(scope) = scope {
        claim = claim.with_scope(vocabulary.scope(scope.into()).clone());
    }
    if let Some(category) = category {
        claim = claim.with_category(vocabulary.category(category)?.clone());
    }

    match service.upsert_claim(&entity, &claim).await? {
        UpsertOutcome::Created { guid } => println!("Created {}", guid),
        UpsertOutcome::Updated { guid } => println!("Updated {}", guid),
    }

    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?.redacted();

    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    print!(
        "{}",
        serde_yaml::to_string(&cfg).context("Failed to render configuration")?
    );

    Ok(())
}
