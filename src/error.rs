//! Malformed upstream records
//!
//! Missing data and invalid requests are absorbed by the core and show up as
//! empty or zeroed output. A record that violates the feed contract is the one
//! failure that propagates to the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("order {index}: unknown order type '{value}'")]
    UnknownSide { index: usize, value: String },

    #[error("order {index}: unknown seller status '{value}'")]
    UnknownStatus { index: usize, value: String },

    #[error("order {index}: quantity must be positive")]
    ZeroQuantity { index: usize },

    #[error("statistic {index}: invalid timestamp '{value}': {source}")]
    Timestamp {
        index: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("statistic {index}: median price is not a finite number")]
    NonFiniteMedian { index: usize },

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}
