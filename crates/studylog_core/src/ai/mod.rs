//! AI-assisted study helpers.
//!
//! # Responsibility
//! - Build prompts from typed inputs and delegate to an injected
//!   [`client::TextGenerator`].
//! - Pick reasoning effort, retry transient failures and interpret finish
//!   reasons in one place.
//!
//! # Invariants
//! - Prompt and output text never reach the log; only sizes and codes do.
//! - Nothing in this module talks to the network directly.

pub mod assistant;
pub mod client;
pub mod effort;
pub mod retry;
