//! End-to-end tests: feed payloads -> snapshot -> oracle -> matcher

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;

    use wfm_oracle::market::{
        decode_catalog, decode_orders, decode_statistics, CatalogItem, MarketSource, SnapshotStore,
    };
    use wfm_oracle::matcher::{match_trades, rank_options, trade_message, TradeMatcher};
    use wfm_oracle::oracle::{reduce, OraclePreset, StatHistory, Strategy};
    use wfm_oracle::types::{GoodId, Order, TakenItem, TimestampedStat};

    fn basis() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn user(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "ingameName": format!("{}_ign", id),
            "slug": id.to_lowercase(),
            "reputation": 10,
            "status": status,
        })
    }

    fn order(item: &str, kind: &str, price: u32, qty: u32, seller: &str, status: &str) -> serde_json::Value {
        json!({
            "id": format!("{}-{}-{}", item, seller, price),
            "itemId": item,
            "type": kind,
            "visible": true,
            "platinum": price,
            "quantity": qty,
            "rank": 0,
            "user": user(seller, status),
        })
    }

    fn hourly_stats(points: &[(i64, u64, f64)]) -> String {
        let hourly: Vec<serde_json::Value> = points
            .iter()
            .map(|(hours_ago, volume, median)| {
                json!({
                    "datetime": (basis() - Duration::hours(*hours_ago)).to_rfc3339(),
                    "volume": volume,
                    "median": median,
                })
            })
            .collect();
        json!({ "payload": { "statistics_closed": { "48hours": hourly, "90days": [] } } }).to_string()
    }

    /// Serves canned payloads per slug
    struct FixtureSource {
        catalog: String,
        orders: HashMap<String, String>,
        statistics: HashMap<String, String>,
    }

    #[async_trait]
    impl MarketSource for FixtureSource {
        async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
            Ok(decode_catalog(&self.catalog)?)
        }

        async fn fetch_orders(&self, slug: &str) -> Result<Vec<Order>> {
            let body = self.orders.get(slug).context("no orders fixture")?;
            Ok(decode_orders(body)?)
        }

        async fn fetch_statistics(&self, slug: &str) -> Result<StatHistory> {
            let body = self.statistics.get(slug).context("no statistics fixture")?;
            Ok(decode_statistics(body)?.with_basis_time(basis()))
        }
    }

    fn fixture() -> FixtureSource {
        let catalog = json!({
            "data": [
                { "id": "x", "slug": "x_good", "tags": ["mod"], "maxRank": 10,
                  "i18n": { "en": { "name": "X Good" } } },
                { "id": "y", "slug": "y_good", "tags": [],
                  "i18n": { "en": { "name": "Y Good" } } },
                { "id": "z", "slug": "z_good", "tags": [],
                  "i18n": { "en": { "name": "Z Good" } } }
            ]
        })
        .to_string();

        let x_orders = json!({ "data": [
            order("x", "sell", 9, 5, "S1", "ingame"),
            order("x", "sell", 8, 5, "S1", "ingame"),
            order("x", "sell", 1, 5, "S9", "offline"),
            order("x", "buy", 30, 1, "B1", "ingame"),
        ]})
        .to_string();
        let y_orders = json!({ "data": [order("y", "sell", 12, 2, "S2", "ingame")] }).to_string();
        let z_orders = json!({ "data": [] }).to_string();

        // 20 trades at 10 inside the window, one expensive bucket outside it
        let x_stats = hourly_stats(&[(1, 5, 10.0), (2, 5, 10.0), (3, 5, 10.0), (4, 5, 10.0), (50, 9, 100.0)]);
        let y_stats = hourly_stats(&[(1, 10, 10.0)]);
        let z_stats = hourly_stats(&[]);

        FixtureSource {
            catalog,
            orders: HashMap::from([
                ("x_good".to_string(), x_orders),
                ("y_good".to_string(), y_orders),
                ("z_good".to_string(), z_orders),
            ]),
            statistics: HashMap::from([
                ("x_good".to_string(), x_stats),
                ("y_good".to_string(), y_stats),
                ("z_good".to_string(), z_stats),
            ]),
        }
    }

    fn slugs(names: &[&str]) -> Vec<GoodId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ============================================================================
    // Oracle
    // ============================================================================

    #[test]
    fn test_top_k_avg_over_expanded_window() {
        let window = vec![
            TimestampedStat { timestamp: basis(), volume: 2, median_price: 10.0, rank: 0 },
            TimestampedStat { timestamp: basis(), volume: 1, median_price: 20.0, rank: 0 },
        ];
        let price = reduce(&window, Strategy::TopKAvg, 1.0);
        assert!((price - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(reduce(&[], Strategy::TopKAvg, 1.0), 0.0);
    }

    #[tokio::test]
    async fn test_fair_prices_from_payloads() {
        let source = fixture();
        let store = SnapshotStore::default();
        store.refresh_catalog(&source).await.unwrap();
        let snapshot = store
            .refresh_goods(&source, &slugs(&["x_good", "y_good", "z_good"]), 2)
            .await
            .unwrap();

        let wanted = slugs(&["x_good", "y_good", "z_good"]);
        let fair = snapshot.fair_prices(&wanted, OraclePreset::Default48h);
        assert_eq!(fair["x_good"], 10.0);
        assert_eq!(fair["y_good"], 10.0);
        assert_eq!(fair["z_good"], 0.0);

        let lowest = snapshot.fair_prices(&wanted, OraclePreset::CurrentLowestSell);
        assert_eq!(lowest["x_good"], 8.0);
        assert_eq!(lowest["z_good"], 0.0);
    }

    // ============================================================================
    // Matching
    // ============================================================================

    #[tokio::test]
    async fn test_cheap_seller_bundle_end_to_end() {
        let source = fixture();
        let store = SnapshotStore::default();
        store.refresh_catalog(&source).await.unwrap();
        let wanted = slugs(&["x_good"]);
        let snapshot = store.refresh_goods(&source, &wanted, 2).await.unwrap();

        let want = HashMap::from([("x_good".to_string(), 3)]);
        let result = match_trades(
            &want,
            &snapshot.fair_prices(&wanted, OraclePreset::Default48h),
            &snapshot.live_offers(&wanted),
        );

        // offline seller and buyer never show up; S1 keeps only its 8 offer
        assert_eq!(result.sellers.len(), 1);
        assert_eq!(result.options.len(), 1);
        let option = &result.options[0];
        assert_eq!(option.seller_id, "S1");
        assert_eq!(option.items["x_good"], TakenItem { price: 8, quantity: 3, rank: 0 });
        assert_eq!(option.total_price, 24);
        assert_eq!(option.total_variation, -6.0);
    }

    #[tokio::test]
    async fn test_pricey_seller_per_unit_options() {
        let source = fixture();
        let store = SnapshotStore::default();
        store.refresh_catalog(&source).await.unwrap();
        let wanted = slugs(&["y_good"]);
        let snapshot = store.refresh_goods(&source, &wanted, 2).await.unwrap();

        let want = HashMap::from([("y_good".to_string(), 2)]);
        let result = match_trades(
            &want,
            &snapshot.fair_prices(&wanted, OraclePreset::Default48h),
            &snapshot.live_offers(&wanted),
        );

        let variations: Vec<f64> = result.options.iter().map(|o| o.total_variation).collect();
        assert_eq!(variations, vec![2.0, 4.0]);
        assert!(result.options.iter().all(|o| o.seller_id == "S2"));
    }

    #[tokio::test]
    async fn test_ranked_shopping_list_and_message() {
        let source = fixture();
        let store = SnapshotStore::default();
        store.refresh_catalog(&source).await.unwrap();
        let wanted = slugs(&["x_good", "y_good", "z_good"]);
        let snapshot = store.refresh_goods(&source, &wanted, 3).await.unwrap();

        let want = HashMap::from([
            ("x_good".to_string(), 2),
            ("y_good".to_string(), 1),
            ("z_good".to_string(), 1),
            ("not_a_good".to_string(), 4),
        ]);
        let matcher = TradeMatcher::new("https://warframe.market");
        let result = matcher.match_trades(
            &want,
            &snapshot.fair_prices(&wanted, OraclePreset::Default48h),
            &snapshot.live_offers(&wanted),
        );

        let ranked = rank_options(&result, 10, false);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].seller_id, "S1");
        assert_eq!(ranked[0].total_variation, -4.0);
        assert_eq!(ranked[1].seller_id, "S2");

        let names: HashMap<GoodId, String> = wanted
            .iter()
            .map(|s| (s.clone(), snapshot.catalog_item(s).unwrap().name.clone()))
            .collect();
        let seller = &result.sellers["S1"];
        assert_eq!(seller.profile_url.as_deref(), Some("https://warframe.market/profile/s1"));
        assert_eq!(
            trade_message(seller, ranked[0], &names),
            "/w S1_ign Hi! I want to buy: \"X Good\" x2 for 8 platinum each, with a total of 8*2 = 16 platinum. (warframe.market)"
        );

        assert!(rank_options(&result, 10, true).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_refresh() {
        let mut source = fixture();
        source.orders.insert(
            "y_good".to_string(),
            json!({ "data": [order("y", "swap", 12, 2, "S2", "ingame")] }).to_string(),
        );
        let store = SnapshotStore::default();
        let before = store.refresh_catalog(&source).await.unwrap();

        let err = store
            .refresh_goods(&source, &slugs(&["x_good", "y_good"]), 2)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("swap"));
        assert_eq!(store.current().await.version(), before.version());
    }
}
