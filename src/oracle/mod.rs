//! Oracle module - Fair price derivation from trade statistics
//!
//! Selects statistics buckets by time and rank, then reduces them to a single
//! fair price per good.

mod preset;
mod reducer;
mod window;

pub use preset::OraclePreset;
pub use reducer::{oracle_price, reduce, Strategy, DEFAULT_ORACLE_HOURS, DEFAULT_ORACLE_RATIO};
pub use window::{select, Horizon, StatHistory};
