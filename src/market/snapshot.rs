//! Market Snapshot - Immutable, versioned view of fetched market data
//!
//! Readers clone an `Arc<MarketSnapshot>` and work on it without locking.
//! Refreshes build a complete replacement off to the side and swap it in
//! wholesale, so a reader never observes a half-refreshed snapshot.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::orderbook::OrderBook;
use super::rest::MarketSource;
use super::types::CatalogItem;
use crate::oracle::{OraclePreset, StatHistory};
use crate::types::{GoodId, Order, RankFilter};

/// Fetched data for one good
#[derive(Debug, Clone)]
pub struct GoodData {
    pub book: OrderBook,
    pub history: StatHistory,
    pub fetched_at: DateTime<Utc>,
}

/// Catalog tag of arcane enhancements
pub const ARCANE_TAG: &str = "arcane_enhancement";

/// Base-rank copies fused into one max-rank arcane
pub const ARCANE_FUSION_COPIES: u32 = 21;

/// Quotes of one good at base rank and at its max rank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankQuotes {
    pub base: f64,
    /// `None` for goods without ranks
    pub max_rank: Option<f64>,
    pub arcane: bool,
}

impl RankQuotes {
    /// Max-rank price spread over the copies fused into it (arcanes only)
    pub fn max_rank_per_copy(&self) -> Option<f64> {
        if !self.arcane {
            return None;
        }
        self.max_rank
            .map(|price| price / f64::from(ARCANE_FUSION_COPIES))
    }

    /// Cost of buying every base copy a max-rank arcane needs
    pub fn fusion_cost(&self) -> Option<f64> {
        if !self.arcane || self.max_rank.is_none() {
            return None;
        }
        Some(self.base * f64::from(ARCANE_FUSION_COPIES))
    }
}

/// Catalog plus whatever goods have been fetched so far
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    version: u64,
    taken_at: Option<DateTime<Utc>>,
    /// slug -> catalog entry
    catalog: HashMap<GoodId, CatalogItem>,
    /// lowercase display name -> slug
    names: HashMap<String, GoodId>,
    goods: HashMap<GoodId, GoodData>,
}

impl MarketSnapshot {
    /// Snapshot with a catalog and no fetched goods
    pub fn from_catalog(version: u64, catalog: Vec<CatalogItem>) -> Self {
        let names = catalog
            .iter()
            .map(|c| (c.name.to_lowercase(), c.slug.clone()))
            .collect();
        Self {
            version,
            taken_at: Some(Utc::now()),
            catalog: catalog.into_iter().map(|c| (c.slug.clone(), c)).collect(),
            names,
            goods: HashMap::new(),
        }
    }

    /// Next version: same catalog, `fetched` goods replacing older copies
    pub fn with_goods(&self, fetched: impl IntoIterator<Item = (GoodId, GoodData)>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.taken_at = Some(Utc::now());
        next.goods.extend(fetched);
        next
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    pub fn catalog_item(&self, slug: &str) -> Option<&CatalogItem> {
        self.catalog.get(slug)
    }

    /// Look a good up by slug or by display name (case-insensitive)
    pub fn resolve(&self, query: &str) -> Option<&CatalogItem> {
        let query = query.trim();
        if let Some(item) = self.catalog.get(query) {
            return Some(item);
        }
        self.names
            .get(&query.to_lowercase())
            .and_then(|slug| self.catalog.get(slug))
    }

    /// Catalog entries whose name contains `text`, sorted by name
    pub fn search(&self, text: &str) -> Vec<&CatalogItem> {
        let needle = text.trim().to_lowercase();
        let mut hits: Vec<&CatalogItem> = self
            .catalog
            .values()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits
    }

    pub fn good(&self, slug: &str) -> Option<&GoodData> {
        self.goods.get(slug)
    }

    pub fn is_fetched(&self, slug: &str) -> bool {
        self.goods.contains_key(slug)
    }

    /// Quote one fetched good at `ranks`; `None` if it was never fetched
    pub fn quote(&self, slug: &str, preset: OraclePreset, ranks: &RankFilter) -> Option<f64> {
        self.goods
            .get(slug)
            .map(|g| preset.quote(&g.history, &g.book, ranks))
    }

    /// Fair price of every fetched good among `slugs`. Unfetched goods are
    /// left out; the matcher treats them as price 0.
    pub fn fair_prices<'a>(
        &self,
        slugs: impl IntoIterator<Item = &'a GoodId>,
        preset: OraclePreset,
    ) -> HashMap<GoodId, f64> {
        let ranks = RankFilter::base();
        slugs
            .into_iter()
            .filter_map(|slug| self.quote(slug, preset, &ranks).map(|p| (slug.clone(), p)))
            .collect()
    }

    /// Base-rank quote plus, for rank-bearing goods, the max-rank quote
    pub fn rank_quotes(&self, slug: &str, preset: OraclePreset) -> Option<RankQuotes> {
        let base = self.quote(slug, preset, &RankFilter::base())?;
        let item = self.catalog.get(slug);
        let max_rank = item
            .filter(|c| c.is_rank_bearing())
            .and_then(|c| c.max_rank)
            .and_then(|rank| self.quote(slug, preset, &RankFilter::exactly(rank)));

        Some(RankQuotes {
            base,
            max_rank,
            arcane: item.map_or(false, |c| c.has_tag(ARCANE_TAG)),
        })
    }

    /// Live base-rank sell orders of every fetched good among `slugs`.
    /// A fetched good with no live sells still gets an (empty) entry.
    pub fn live_offers<'a>(
        &self,
        slugs: impl IntoIterator<Item = &'a GoodId>,
    ) -> HashMap<GoodId, Vec<Order>> {
        let ranks = RankFilter::base();
        slugs
            .into_iter()
            .filter_map(|slug| {
                self.goods
                    .get(slug)
                    .map(|g| (slug.clone(), g.book.live_sells(&ranks).cloned().collect()))
            })
            .collect()
    }
}

/// Shared holder of the current snapshot
pub struct SnapshotStore {
    current: RwLock<Arc<MarketSnapshot>>,
    /// Serializes refreshers so two refreshes never build on the same base
    refresh: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            refresh: Mutex::new(()),
        }
    }

    /// The snapshot in effect right now
    pub async fn current(&self) -> Arc<MarketSnapshot> {
        self.current.read().await.clone()
    }

    async fn publish(&self, next: MarketSnapshot) -> Arc<MarketSnapshot> {
        let next = Arc::new(next);
        *self.current.write().await = next.clone();
        next
    }

    /// Replace the catalog. Previously fetched goods are dropped.
    pub async fn refresh_catalog<S>(&self, source: &S) -> Result<Arc<MarketSnapshot>>
    where
        S: MarketSource + ?Sized,
    {
        let _guard = self.refresh.lock().await;
        let base_version = self.current.read().await.version();

        let catalog = source.fetch_catalog().await?;
        info!(items = catalog.len(), "Fetched item catalog");

        let next = MarketSnapshot::from_catalog(base_version + 1, catalog);
        Ok(self.publish(next).await)
    }

    /// Fetch orders and statistics for `slugs` with at most `workers`
    /// requests in flight, then publish a new snapshot containing them.
    ///
    /// Slugs missing from the catalog are skipped. Any fetch failure aborts
    /// the refresh and leaves the current snapshot untouched.
    pub async fn refresh_goods<S>(
        &self,
        source: &S,
        slugs: &[GoodId],
        workers: usize,
    ) -> Result<Arc<MarketSnapshot>>
    where
        S: MarketSource + ?Sized,
    {
        let _guard = self.refresh.lock().await;
        let base = self.current().await;

        let targets: BTreeSet<&GoodId> = slugs
            .iter()
            .filter(|slug| {
                let known = base.catalog_item(slug).is_some();
                if !known {
                    debug!(good = %slug, "Skipping good missing from catalog");
                }
                known
            })
            .collect();

        info!(goods = targets.len(), workers, "Refreshing goods");

        let fetched: Vec<(GoodId, GoodData)> = stream::iter(targets)
            .map(|slug| async move {
                let orders = source.fetch_orders(slug).await?;
                let history = source.fetch_statistics(slug).await?;
                debug!(good = %slug, orders = orders.len(), "Fetched good");
                Ok::<_, anyhow::Error>((
                    slug.clone(),
                    GoodData {
                        book: OrderBook::new(orders),
                        history,
                        fetched_at: Utc::now(),
                    },
                ))
            })
            .buffer_unordered(workers.max(1))
            .try_collect()
            .await?;

        let next = base.with_goods(fetched);
        info!(version = next.version(), "Published market snapshot");
        Ok(self.publish(next).await)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(MarketSnapshot::default())
    }
}
