//! Shared fixtures: an in-memory statement store and emissions source.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use footprint_sync::adapters::{EmissionsSource, StatementStore};
use footprint_sync::domain::{
    to_wire_amount, Claim, EmissionsRecord, ExistingClaim, ItemId, Metadata, QualifierValue,
    Qualifiers, Reference, RemoveInstruction, ReportingPeriod, Scope, Scope1, Scope2, Scope3,
    Scope3Category, Vocabulary,
};

pub const REPORT_URL: &str = "https://example.com/report.pdf";

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn entity() -> ItemId {
    ItemId::parse("Q42").unwrap()
}

/// Store write as observed by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateClaim { guid: String },
    EditClaims { added: usize, removed: Vec<String> },
    UpdateClaim { guid: String, value: String },
    CreateReference { guid: String, url: String },
    UpdateReference { guid: String, url: String, hash: String },
}

/// In-memory statement store that applies writes
pub struct FakeStore {
    vocabulary: Vocabulary,
    claims: Mutex<HashMap<String, Vec<ExistingClaim>>>,
    calls: Mutex<Vec<StoreCall>>,
    reads: AtomicU32,
    next_id: AtomicU32,
    failing_writes: AtomicU32,
}

impl FakeStore {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            claims: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            reads: AtomicU32::new(0),
            next_id: AtomicU32::new(1),
            failing_writes: AtomicU32::new(0),
        }
    }

    pub fn with_claims(self, entity: &ItemId, claims: Vec<ExistingClaim>) -> Self {
        self.claims
            .lock()
            .unwrap()
            .insert(entity.to_string(), claims);
        self
    }

    pub fn claims(&self, entity: &ItemId) -> Vec<ExistingClaim> {
        self.claims
            .lock()
            .unwrap()
            .get(entity.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make the next `count` writes fail
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn record_write(&self, call: StoreCall) -> Result<()> {
        let failing = self.failing_writes.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_writes.store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("simulated write failure");
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }

    fn new_guid(&self, entity: &ItemId) -> String {
        format!("{}$FAKE-{}", entity, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn published(&self, guid: String, claim: &Claim) -> ExistingClaim {
        let hash = format!("ref-{}", guid);
        published_claim(&self.vocabulary, guid, claim).with_reference(Reference {
            hash,
            url: Some(claim.reference_url.clone()),
        })
    }

    fn with_claim<T>(&self, guid: &str, f: impl FnOnce(&mut ExistingClaim) -> T) -> Result<T> {
        let mut claims = self.claims.lock().unwrap();
        let claim = claims
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|claim| claim.guid == guid)
            .ok_or_else(|| anyhow::anyhow!("no such statement: {}", guid))?;
        Ok(f(claim))
    }
}

#[async_trait]
impl StatementStore for FakeStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn get_claims(&self, entity: &ItemId, property: &str) -> Result<Vec<ExistingClaim>> {
        assert_eq!(property, self.vocabulary.properties.carbon_footprint);
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.claims(entity))
    }

    async fn create_claim(&self, entity: &ItemId, claim: &Claim) -> Result<String> {
        let guid = self.new_guid(entity);
        self.record_write(StoreCall::CreateClaim { guid: guid.clone() })?;

        let published = self.published(guid.clone(), claim);
        self.claims
            .lock()
            .unwrap()
            .entry(entity.to_string())
            .or_default()
            .push(published);
        Ok(guid)
    }

    async fn edit_claims(
        &self,
        entity: &ItemId,
        add: &[Claim],
        remove: &[RemoveInstruction],
    ) -> Result<()> {
        self.record_write(StoreCall::EditClaims {
            added: add.len(),
            removed: remove.iter().map(|r| r.guid.clone()).collect(),
        })?;

        let added: Vec<_> = add
            .iter()
            .map(|claim| self.published(self.new_guid(entity), claim))
            .collect();

        let mut claims = self.claims.lock().unwrap();
        let list = claims.entry(entity.to_string()).or_default();
        list.retain(|claim| !remove.iter().any(|r| r.remove && r.guid == claim.guid));
        list.extend(added);
        Ok(())
    }

    async fn update_claim(&self, guid: &str, value: &str) -> Result<()> {
        self.record_write(StoreCall::UpdateClaim {
            guid: guid.to_string(),
            value: value.to_string(),
        })?;
        self.with_claim(guid, |claim| claim.value = Some(to_wire_amount(value)))
    }

    async fn create_reference(&self, guid: &str, url: &str) -> Result<()> {
        self.record_write(StoreCall::CreateReference {
            guid: guid.to_string(),
            url: url.to_string(),
        })?;
        self.with_claim(guid, |claim| {
            claim.references.push(Reference {
                hash: format!("ref-{}", guid),
                url: Some(url.to_string()),
            })
        })
    }

    async fn update_reference(&self, guid: &str, url: &str, hash: &str) -> Result<()> {
        self.record_write(StoreCall::UpdateReference {
            guid: guid.to_string(),
            url: url.to_string(),
            hash: hash.to_string(),
        })?;
        self.with_claim(guid, |claim| {
            for reference in claim.references.iter_mut().filter(|r| r.hash == hash) {
                reference.url = Some(url.to_string());
            }
        })
    }
}

/// In-memory emissions source
#[derive(Default)]
pub struct FakeEmissions {
    records: Mutex<HashMap<String, EmissionsRecord>>,
    failing_reads: AtomicU32,
}

impl FakeEmissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, entity: &ItemId, record: EmissionsRecord) -> Self {
        self.set_record(entity, record);
        self
    }

    pub fn set_record(&self, entity: &ItemId, record: EmissionsRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(entity.to_string(), record);
    }

    /// Make the next `count` reads fail
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmissionsSource for FakeEmissions {
    fn name(&self) -> &str {
        "fake"
    }

    async fn latest_emissions(&self, entity: &ItemId) -> Result<Option<EmissionsRecord>> {
        let failing = self.failing_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reads.store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("simulated source outage");
        }
        Ok(self.records.lock().unwrap().get(entity.as_str()).cloned())
    }
}

/// Desired claim in a scope (and optional scope 3 category)
pub fn desired(
    vocabulary: &Vocabulary,
    value: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    scope: Scope,
    category: Option<u8>,
) -> Claim {
    let claim = Claim::new(value, start, end, REPORT_URL).with_scope(vocabulary.scope(scope).clone());
    match category {
        Some(category) => claim.with_category(vocabulary.category(category).unwrap().clone()),
        None => claim,
    }
}

/// Snapshot of `claim` as the store would return it
pub fn published_claim(vocabulary: &Vocabulary, guid: impl Into<String>, claim: &Claim) -> ExistingClaim {
    let properties = &vocabulary.properties;
    let mut qualifiers = Qualifiers::new()
        .with(properties.start_time.clone(), QualifierValue::Time(claim.wire_start()))
        .with(properties.end_time.clone(), QualifierValue::Time(claim.wire_end()));
    if let Some(scope) = &claim.scope {
        qualifiers.insert(properties.scope_role.clone(), QualifierValue::Item(scope.to_string()));
    }
    if let Some(category) = &claim.category {
        qualifiers.insert(
            properties.category_part.clone(),
            QualifierValue::Item(category.to_string()),
        );
    }

    ExistingClaim::new(guid, Some(claim.wire_amount())).with_qualifiers(qualifiers)
}

/// Published claim with explicit wire dates; `end = None` leaves END_TIME off
pub fn published(
    vocabulary: &Vocabulary,
    guid: &str,
    value: &str,
    start: &str,
    end: Option<&str>,
    scope: Scope,
    category: Option<u8>,
) -> ExistingClaim {
    let properties = &vocabulary.properties;
    let mut qualifiers = Qualifiers::new()
        .with(properties.start_time.clone(), QualifierValue::Time(start.to_string()))
        .with(
            properties.scope_role.clone(),
            QualifierValue::Item(vocabulary.scope(scope).to_string()),
        );
    if let Some(end) = end {
        qualifiers.insert(properties.end_time.clone(), QualifierValue::Time(end.to_string()));
    }
    if let Some(category) = category {
        qualifiers.insert(
            properties.category_part.clone(),
            QualifierValue::Item(vocabulary.category(category).unwrap().to_string()),
        );
    }

    ExistingClaim::new(guid, Some(to_wire_amount(value))).with_qualifiers(qualifiers)
}

/// A fully verified record for 2023
pub fn verified_record() -> EmissionsRecord {
    let verified = || Metadata::verified_by("Reviewer");

    EmissionsRecord {
        reporting_period: ReportingPeriod::new(date(2023, 1, 1), date(2023, 12, 31), REPORT_URL),
        scope1: Some(Scope1 {
            total: Some(1200.0),
            metadata: verified(),
        }),
        scope2: Some(Scope2 {
            mb: Some(300.0),
            lb: Some(450.5),
            unknown: None,
            reporting_period: None,
            metadata: verified(),
        }),
        scope3: Some(Scope3 {
            categories: vec![
                Scope3Category {
                    category: 1,
                    total: Some(5000.0),
                    metadata: verified(),
                },
                Scope3Category {
                    category: 6,
                    total: Some(42.0),
                    metadata: verified(),
                },
                Scope3Category {
                    category: 16,
                    total: Some(7.0),
                    metadata: verified(),
                },
            ],
        }),
    }
}

/// Claims in one (scope, category) series
pub fn series<'a>(
    vocabulary: &Vocabulary,
    claims: &'a [ExistingClaim],
    scope: Scope,
    category: Option<u8>,
) -> Vec<&'a ExistingClaim> {
    let properties = &vocabulary.properties;
    let scope_id = vocabulary.scope(scope).to_string();
    let category_id = category.map(|c| vocabulary.category(c).unwrap().to_string());

    claims
        .iter()
        .filter(|claim| {
            claim
                .qualifiers
                .first_value(&properties.scope_role)
                .and_then(QualifierValue::as_item)
                == Some(scope_id.as_str())
                && claim
                    .qualifiers
                    .first_value(&properties.category_part)
                    .and_then(QualifierValue::as_item)
                    == category_id.as_deref()
        })
        .collect()
}
