//! Engines that turn stored artifacts into answers
//!
//! - [`QueryEngine`]: nearest-neighbor retrieval within one namespace
//! - [`SummaryEngine`]: condenses a whole namespace via a summarizer

pub mod query;
pub mod summary;

pub use query::QueryEngine;
pub use summary::SummaryEngine;
