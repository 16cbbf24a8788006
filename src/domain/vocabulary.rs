//! Property and entity ids the sync speaks in.
//!
//! Everything here is resolved once at startup (defaults target Wikidata,
//! every id can be overridden from config) and passed by reference to the
//! components that need it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::claim::{ClaimError, ItemId};

/// Scope 3 category "other" is tracked upstream but never published
pub const OTHER_CATEGORY: u8 = 16;

/// GHG Protocol emission scopes we publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Scope1,
    Scope2MarketBased,
    Scope2LocationBased,
    /// Scope 2 where the reporter did not say which method was used
    Scope2UnknownMix,
    Scope3,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::Scope1,
        Scope::Scope2MarketBased,
        Scope::Scope2LocationBased,
        Scope::Scope2UnknownMix,
        Scope::Scope3,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scope1 => "scope 1",
            Self::Scope2MarketBased => "scope 2 (market-based)",
            Self::Scope2LocationBased => "scope 2 (location-based)",
            Self::Scope2UnknownMix => "scope 2",
            Self::Scope3 => "scope 3",
        }
    }
}

/// Human-readable name of a scope 3 category
pub fn category_label(category: u8) -> &'static str {
    match category {
        1 => "purchased goods and services",
        2 => "capital goods",
        3 => "fuel- and energy-related activities",
        4 => "upstream transportation and distribution",
        5 => "waste generated in operations",
        6 => "business travel",
        7 => "employee commuting",
        8 => "upstream leased assets",
        9 => "downstream transportation and distribution",
        10 => "processing of sold products",
        11 => "use of sold products",
        12 => "end-of-life treatment of sold products",
        13 => "downstream leased assets",
        14 => "franchises",
        15 => "investments",
        OTHER_CATEGORY => "other",
        _ => "unknown",
    }
}

/// Property ids used for the statement and its qualifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub carbon_footprint: String,
    pub start_time: String,
    pub end_time: String,
    /// "object of statement has role", carries the scope
    pub scope_role: String,
    /// "applies to part", carries the scope 3 category
    pub category_part: String,
    pub reference_url: String,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            carbon_footprint: "P5991".to_string(),
            start_time: "P580".to_string(),
            end_time: "P582".to_string(),
            scope_role: "P3831".to_string(),
            category_part: "P518".to_string(),
            reference_url: "P854".to_string(),
        }
    }
}

/// Fixed entity ids: unit, calendar and scope items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub tonne_co2e: ItemId,
    pub gregorian_calendar: ItemId,
    pub scope_1: ItemId,
    pub scope_2_market_based: ItemId,
    pub scope_2_location_based: ItemId,
    /// Scope 2 with unknown mix
    pub scope_2: ItemId,
    pub scope_3: ItemId,
}

impl Default for Entities {
    fn default() -> Self {
        Self {
            tonne_co2e: item("Q57084755"),
            gregorian_calendar: item("Q1985727"),
            scope_1: item("Q124883250"),
            scope_2_market_based: item("Q124883330"),
            scope_2_location_based: item("Q124883327"),
            scope_2: item("Q124883301"),
            scope_3: item("Q124883354"),
        }
    }
}

/// Default category → item translation
pub fn default_categories() -> BTreeMap<u8, ItemId> {
    [
        (1, "Q124883366"),
        (2, "Q124883369"),
        (3, "Q124883372"),
        (4, "Q124883375"),
        (5, "Q124883378"),
        (6, "Q124883381"),
        (7, "Q124883384"),
        (8, "Q124883387"),
        (9, "Q124883390"),
        (10, "Q124883393"),
        (11, "Q124883396"),
        (12, "Q124883399"),
        (13, "Q124883402"),
        (14, "Q124883405"),
        (15, "Q124883408"),
    ]
    .into_iter()
    .map(|(category, id)| (category, item(id)))
    .collect()
}

fn item(raw: &'static str) -> ItemId {
    ItemId::from_static(raw)
}

/// The full id vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub properties: Properties,
    pub entities: Entities,
    pub categories: BTreeMap<u8, ItemId>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            properties: Properties::default(),
            entities: Entities::default(),
            categories: default_categories(),
        }
    }
}

impl Vocabulary {
    /// Fill in any category an override left out
    pub fn with_default_categories(mut self) -> Self {
        for (category, id) in default_categories() {
            self.categories.entry(category).or_insert(id);
        }
        self
    }

    /// Item id for a scope
    pub fn scope(&self, scope: Scope) -> &ItemId {
        match scope {
            Scope::Scope1 => &self.entities.scope_1,
            Scope::Scope2MarketBased => &self.entities.scope_2_market_based,
            Scope::Scope2LocationBased => &self.entities.scope_2_location_based,
            Scope::Scope2UnknownMix => &self.entities.scope_2,
            Scope::Scope3 => &self.entities.scope_3,
        }
    }

    /// Item id for a scope 3 category; category 16 has no item
    pub fn category(&self, category: u8) -> Result<&ItemId, ClaimError> {
        if category == OTHER_CATEGORY {
            return Err(ClaimError::UnknownCategory(category));
        }
        self.categories
            .get(&category)
            .ok_or(ClaimError::UnknownCategory(category))
    }

    /// Reverse lookup, for display
    pub fn scope_of(&self, id: &str) -> Option<Scope> {
        Scope::ALL
            .into_iter()
            .find(|scope| self.scope(*scope).as_str() == id)
    }

    /// Reverse lookup, for display
    pub fn category_of(&self, id: &str) -> Option<u8> {
        self.categories
            .iter()
            .find(|(_, item)| item.as_str() == id)
            .map(|(category, _)| *category)
    }

    /// Unit concept URI for quantity values
    pub fn unit_uri(&self, concept_uri_base: &str) -> String {
        format!("{}{}", concept_uri_base, self.entities.tonne_co2e)
    }
}
