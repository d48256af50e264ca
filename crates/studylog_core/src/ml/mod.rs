//! Grade-prediction pipeline.
//!
//! # Responsibility
//! - Feature extraction, splitting, scaling, candidate regressors, scoring.
//! - `pipeline::GradePredictor` is the only entry point services use.
//!
//! # Invariants
//! - Every random step takes an explicit seed.

pub mod ensemble;
pub mod features;
pub mod linear;
pub mod metrics;
pub mod pipeline;
pub mod regressor;
pub mod scaler;
pub mod split;
pub mod tree;
