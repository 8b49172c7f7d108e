//! CSV Persistence Module
//!
//! Saves ranked trade options so a shopping session can be reviewed later.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::matcher::{trade_message, MatchResult};
use crate::types::{GoodId, TradeOption};

/// One ranked option as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOptionRecord {
    pub rank: usize,
    pub seller: String,
    pub reputation: i64,
    pub profile_url: String,
    /// `name xQ @ P` entries joined by `; `
    pub goods: String,
    pub good_count: usize,
    /// Units across all goods
    pub units: u64,
    pub total_price: u64,
    pub total_variation: f64,
    pub message: String,
}

/// Writes ranked trade options to `<data_dir>/best_trades_<timestamp>.csv`
pub struct TradeExporter {
    data_dir: PathBuf,
}

impl TradeExporter {
    /// Create an exporter, creating the data directory if needed
    pub fn new(data_dir: &str) -> Result<Self> {
        let data_dir = PathBuf::from(data_dir);
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Build the on-disk rows for `ranked`, which must come from `result`
    pub fn records(
        result: &MatchResult,
        ranked: &[&TradeOption],
        names: &HashMap<GoodId, String>,
    ) -> Vec<TradeOptionRecord> {
        ranked
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let seller = result.sellers.get(&option.seller_id);
                let goods = option
                    .items
                    .iter()
                    .map(|(good, item)| {
                        let name = names.get(good).map(String::as_str).unwrap_or(good);
                        format!("{} x{} @ {}", name, item.quantity, item.price)
                    })
                    .collect::<Vec<_>>()
                    .join("; ");

                TradeOptionRecord {
                    rank: i + 1,
                    seller: seller
                        .map(|s| s.display_name.clone())
                        .unwrap_or_else(|| option.seller_id.clone()),
                    reputation: seller.map(|s| s.reputation).unwrap_or(0),
                    profile_url: seller
                        .and_then(|s| s.profile_url.clone())
                        .unwrap_or_default(),
                    goods,
                    good_count: option.good_count(),
                    units: option.unit_count(),
                    total_price: option.total_price,
                    total_variation: option.total_variation,
                    message: seller
                        .map(|s| trade_message(s, option, names))
                        .unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Write a new timestamped file and return its path
    pub fn export(
        &self,
        result: &MatchResult,
        ranked: &[&TradeOption],
        names: &HashMap<GoodId, String>,
    ) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let path = self.data_dir.join(format!("best_trades_{}.csv", stamp));

        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let records = Self::records(result, ranked, names);
        for record in &records {
            writer
                .serialize(record)
                .context("Failed to write trade option record")?;
        }
        writer.flush().context("Failed to flush trade writer")?;

        info!(path = %path.display(), options = records.len(), "Saved best trades");
        Ok(path)
    }

    /// Read back a file written by [`TradeExporter::export`]
    pub fn load(path: &Path) -> Result<Vec<TradeOptionRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row.context("Failed to parse trade option record")?);
        }
        Ok(records)
    }
}
