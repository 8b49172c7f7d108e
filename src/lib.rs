//! wfm-oracle Library
//!
//! Fair-price oracle and trade matcher for warframe.market

pub mod config;
pub mod error;
pub mod market;
pub mod matcher;
pub mod oracle;
pub mod persistence;
pub mod types;
