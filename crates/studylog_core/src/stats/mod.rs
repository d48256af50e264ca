//! Grade statistics.
//!
//! # Responsibility
//! - Pure functions over score slices and grade records.
//! - No IO; callers load records through repositories first.
//!
//! # See also
//! - `crate::service::grade_service` for the repository-backed entry points.

pub mod aggregate;
pub mod required;
pub mod trend;
