//! Study-tracker domain model.
//!
//! # Responsibility
//! - Define explicit record structs for every persisted entity.
//! - Validate at the boundary: constructors and deserialization reject
//!   out-of-range data instead of coercing it.
//!
//! # Invariants
//! - Grade and progress records are keyed by subject name in their books.
//! - Goals and reminders carry stable ids. Records persisted without an id
//!   get one derived from their content, so repeated loads agree.

pub mod date;
pub mod goal;
pub mod grade;
pub mod profile;
pub mod progress;
pub mod reminder;
pub mod validation;

use std::collections::BTreeMap;
use uuid::Uuid;

/// Grade records grouped by subject name, in insertion order per subject.
pub type GradeBook = BTreeMap<String, Vec<grade::GradeRecord>>;

/// Progress records grouped by subject name.
pub type ProgressLog = BTreeMap<String, Vec<progress::ProgressRecord>>;

const DERIVED_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_2d8e_7a41_4c1b_9e63_d2a8_41b7_0c55);

/// Name-based (v5) id over `kind` and `parts`; equal input gives equal ids.
pub fn derived_id(kind: &str, parts: &[&str]) -> Uuid {
    let mut name = String::from(kind);
    for part in parts {
        name.push('\u{1f}');
        name.push_str(part);
    }
    Uuid::new_v5(&DERIVED_ID_NAMESPACE, name.as_bytes())
}
