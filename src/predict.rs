//! Predictive text.
//!
//! Frequency-ranked n-gram tables (orders 1 through 5) and the backoff engine
//! that turns a typed prefix plus sentence context into word suggestions.

pub mod engine;
pub mod table;

pub use engine::{
    filter_by_prefix, merge_dedup, NGramLevel, PredictiveEngine, Suggestions,
    DEFAULT_MAX_RESULTS,
};
pub use table::{NGramTable, DEFAULT_UNIGRAMS};
