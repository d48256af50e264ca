//! Record lookup over the loaded grade book.
//!
//! # Responsibility
//! - Narrow grade records by period, subject, kind, score range and keyword.
//! - Keep ordering rules for filtered views inside core.

pub mod grade_filter;
