//! Repository layer.
//!
//! # Responsibility
//! - Define per-entity data access contracts.
//! - Keep JSON file layout and SQLite details out of services.
//!
//! # Invariants
//! - Writes validate before touching disk.
//! - Repositories return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to transport errors.

pub mod json_store;
pub mod legacy_goals;
pub mod model_repo;
pub mod study_repo;
