//! Domain types for footprint-sync.
//!
//! This module contains the core data structures:
//! - Claim: desired and existing statements, qualifiers, references
//! - Emissions: the verified aggregate we publish from
//! - Vocabulary: property and entity ids resolved at startup
//! - Date: store wire-format conversion

pub mod claim;
pub mod date;
pub mod emissions;
pub mod vocabulary;

// Re-export commonly used types
pub use claim::{
    to_wire_amount, Claim, ClaimError, ExistingClaim, ItemId, QualifierValue, Qualifiers,
    Reference, RemoveInstruction,
};
pub use date::{from_wire_date, to_wire_date};
pub use emissions::{
    EmissionsRecord, Metadata, ReportingPeriod, Scope1, Scope2, Scope3, Scope3Category, Verifier,
};
pub use vocabulary::{category_label, Entities, Properties, Scope, Vocabulary, OTHER_CATEGORY};
