//! wfm-oracle - warframe.market price oracle and trade finder
//!
//! Usage:
//!   wfm-oracle price "Loyal Companion" manifold_bond
//!   wfm-oracle orders "Loyal Companion" -k 10
//!   wfm-oracle trade loyal_companion=2 "Manifold Bond=1" --top 5 --save

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wfm_oracle::config::AppConfig;
use wfm_oracle::market::{MarketClient, MarketSnapshot, SnapshotStore};
use wfm_oracle::matcher::{rank_options, trade_message, TradeMatcher};
use wfm_oracle::oracle::{reduce, Horizon, OraclePreset, Strategy};
use wfm_oracle::persistence::TradeExporter;
use wfm_oracle::types::{GoodId, RankFilter};

#[derive(Parser, Debug)]
#[command(name = "wfm-oracle")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Quote fair prices for goods
    Price {
        /// Good slugs or display names
        #[arg(required = true)]
        goods: Vec<String>,
        /// Oracle preset (defaults to the configured one)
        #[arg(long)]
        preset: Option<String>,
    },
    /// Show the best live offers for one good
    Orders {
        good: String,
        /// Levels per side
        #[arg(short, default_value_t = 5)]
        k: usize,
        /// Include orders of every rank, not just the base rank
        #[arg(long)]
        all_ranks: bool,
    },
    /// Find the best sellers for a shopping list
    Trade {
        /// Entries of the form `good=quantity` (quantity defaults to 1)
        #[arg(required = true)]
        want: Vec<String>,
        /// Options to show
        #[arg(long)]
        top: Option<usize>,
        /// Hide options covering a single good
        #[arg(long)]
        ignore_single: bool,
        /// Save the ranked options as CSV
        #[arg(long)]
        save: bool,
    },
}

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Good")]
    name: String,
    #[tabled(rename = "Fair")]
    fair: String,
    #[tabled(rename = "R.Max")]
    max_rank: String,
    #[tabled(rename = "RMP/21")]
    max_rank_per_copy: String,
    #[tabled(rename = "P*21")]
    fusion_cost: String,
    #[tabled(rename = "Window")]
    custom: String,
    #[tabled(rename = "Volume")]
    volume: u64,
    #[tabled(rename = "Vol 90d")]
    volume_90d: u64,
    #[tabled(rename = "Lowest Sell")]
    lowest_sell: String,
    #[tabled(rename = "Highest Buy")]
    highest_buy: String,
    #[tabled(rename = "Link")]
    link: String,
}

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "Side")]
    side: &'static str,
    #[tabled(rename = "Price")]
    price: u32,
    #[tabled(rename = "Quantity")]
    quantity: u32,
}

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Seller")]
    seller: String,
    #[tabled(rename = "Rep")]
    reputation: i64,
    #[tabled(rename = "Goods")]
    goods: String,
    #[tabled(rename = "Total")]
    total_price: u64,
    #[tabled(rename = "Variation")]
    variation: String,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn fmt_price(price: f64) -> String {
    if price.is_finite() {
        format!("{:.2}", price)
    } else {
        "-".to_string()
    }
}

fn fmt_opt(price: Option<f64>) -> String {
    price.map(fmt_price).unwrap_or_else(|| "-".to_string())
}

/// Split `good=quantity`; a bare good means quantity 1
fn parse_want(entry: &str) -> Result<(String, i64)> {
    match entry.rsplit_once('=') {
        Some((good, qty)) => {
            let qty = qty
                .trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid quantity in '{}'", entry))?;
            Ok((good.trim().to_string(), qty))
        }
        None => Ok((entry.trim().to_string(), 1)),
    }
}

fn resolve_all(snapshot: &MarketSnapshot, queries: &[String]) -> Result<Vec<GoodId>> {
    queries
        .iter()
        .map(|q| match snapshot.resolve(q) {
            Some(item) => Ok(item.slug.clone()),
            None => {
                let hints: Vec<&str> = snapshot
                    .search(q)
                    .iter()
                    .take(5)
                    .map(|c| c.name.as_str())
                    .collect();
                if hints.is_empty() {
                    bail!("Unknown good '{}'", q)
                } else {
                    bail!("Unknown good '{}', did you mean: {}", q, hints.join(", "))
                }
            }
        })
        .collect()
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).to_string();
    for line in table.lines() {
        println!("  {}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = AppConfig::load()?;
    info!(config = %config.digest(), "wfm-oracle starting");

    let client = MarketClient::new(&config.market, &config.fetch)?;
    let store = SnapshotStore::default();
    let catalog = store.refresh_catalog(&client).await?;

    match cli.command {
        Commands::Price { goods, preset } => {
            let preset = match preset {
                Some(name) => OraclePreset::from_name(&name)
                    .with_context(|| format!("Unknown oracle preset '{}'", name))?,
                None => config.oracle_preset()?,
            };
            let slugs = resolve_all(&catalog, &goods)?;
            let snapshot = store
                .refresh_goods(&client, &slugs, config.fetch.workers)
                .await?;
            print_prices(&snapshot, &slugs, preset, &config);
        }
        Commands::Orders { good, k, all_ranks } => {
            let slugs = resolve_all(&catalog, &[good])?;
            let snapshot = store
                .refresh_goods(&client, &slugs, config.fetch.workers)
                .await?;
            let ranks = if all_ranks {
                RankFilter::any()
            } else {
                RankFilter::base()
            };
            print_orders(&snapshot, &slugs[0], k, &ranks);
        }
        Commands::Trade {
            want,
            top,
            ignore_single,
            save,
        } => {
            let mut wanted: HashMap<GoodId, i64> = HashMap::new();
            for entry in &want {
                let (query, qty) = parse_want(entry)?;
                let slug = resolve_all(&catalog, &[query])?.remove(0);
                *wanted.entry(slug).or_insert(0) += qty;
            }
            let slugs: Vec<GoodId> = wanted.keys().cloned().collect();
            let snapshot = store
                .refresh_goods(&client, &slugs, config.fetch.workers)
                .await?;

            run_trade(
                &snapshot,
                &wanted,
                top.unwrap_or(config.matcher.best_n),
                ignore_single || config.matcher.ignore_single_item_sellers,
                save,
                &config,
            )?;
        }
    }

    Ok(())
}

fn print_prices(snapshot: &MarketSnapshot, slugs: &[GoodId], preset: OraclePreset, config: &AppConfig) {
    let ranks = RankFilter::base();

    let rows: Vec<PriceRow> = slugs
        .iter()
        .filter_map(|slug| {
            let good = snapshot.good(slug)?;
            let quotes = snapshot.rank_quotes(slug, preset)?;
            let window = good
                .history
                .window(Horizon::LastHours(config.oracle.hours), None, &ranks);
            Some(PriceRow {
                name: display_name(snapshot, slug),
                fair: fmt_price(quotes.base),
                max_rank: fmt_opt(quotes.max_rank),
                max_rank_per_copy: fmt_opt(quotes.max_rank_per_copy()),
                fusion_cost: fmt_opt(quotes.fusion_cost()),
                custom: fmt_price(reduce(&window, Strategy::TopKAvg, config.oracle.ratio)),
                volume: good
                    .history
                    .volume_for_last_hours(config.oracle.hours, None, &ranks),
                volume_90d: good.history.volume_for_last_days(90, None, &ranks),
                lowest_sell: fmt_price(good.book.lowest_live_sell(&ranks)),
                highest_buy: fmt_price(good.book.highest_live_buy(&ranks)),
                link: snapshot
                    .catalog_item(slug)
                    .map(|c| c.market_url(&config.market.site_url))
                    .unwrap_or_default(),
            })
        })
        .collect();

    println!();
    println!(
        "  Fair = {}, Window = top {:.0}% avg over {}h",
        preset,
        config.oracle.ratio * 100.0,
        config.oracle.hours
    );
    print_table(rows);
    println!();
}

fn print_orders(snapshot: &MarketSnapshot, slug: &GoodId, k: usize, ranks: &RankFilter) {
    let Some(good) = snapshot.good(slug) else {
        println!("  No data for {}", slug);
        return;
    };

    let mut rows: Vec<LevelRow> = good
        .book
        .bottom_k_sell(k, ranks)
        .into_iter()
        .map(|(price, quantity)| LevelRow {
            side: "SELL",
            price,
            quantity,
        })
        .collect();
    rows.extend(
        good.book
            .top_k_buy(k, ranks)
            .into_iter()
            .map(|(price, quantity)| LevelRow {
                side: "BUY",
                price,
                quantity,
            }),
    );

    println!();
    println!("  {}", display_name(snapshot, slug));
    print_table(rows);
    println!();
}

fn run_trade(
    snapshot: &Arc<MarketSnapshot>,
    wanted: &HashMap<GoodId, i64>,
    best_n: usize,
    ignore_single: bool,
    save: bool,
    config: &AppConfig,
) -> Result<()> {
    let preset = config.oracle_preset()?;
    let fair = snapshot.fair_prices(wanted.keys(), preset);
    let offers = snapshot.live_offers(wanted.keys());
    let names: HashMap<GoodId, String> = wanted
        .keys()
        .map(|slug| (slug.clone(), display_name(snapshot, slug)))
        .collect();

    let matcher = TradeMatcher::new(config.market.site_url.clone());
    let result = matcher.match_trades(wanted, &fair, &offers);
    let ranked = rank_options(&result, best_n, ignore_single);

    info!(
        sellers = result.sellers.len(),
        options = result.options.len(),
        shown = ranked.len(),
        "Matched trades"
    );

    if ranked.is_empty() {
        println!("  No matching sellers online.");
        return Ok(());
    }

    let rows: Vec<OptionRow> = ranked
        .iter()
        .enumerate()
        .map(|(i, option)| OptionRow {
            rank: i + 1,
            seller: result
                .sellers
                .get(&option.seller_id)
                .map(|s| s.display_name.clone())
                .unwrap_or_else(|| option.seller_id.clone()),
            reputation: result
                .sellers
                .get(&option.seller_id)
                .map(|s| s.reputation)
                .unwrap_or(0),
            goods: option
                .items
                .iter()
                .map(|(g, item)| {
                    let name = names.get(g).map(String::as_str).unwrap_or(g);
                    format!("{} x{} @ {}", name, item.quantity, item.price)
                })
                .collect::<Vec<_>>()
                .join(", "),
            total_price: option.total_price,
            variation: format!("{:+.2}", option.total_variation),
        })
        .collect();

    println!();
    print_table(rows);

    if let Some(seller) = result.sellers.get(&ranked[0].seller_id) {
        println!();
        if let Some(url) = &seller.profile_url {
            println!("  Profile: {}", url);
        }
        println!("  Message: {}", trade_message(seller, ranked[0], &names));
    }
    println!();

    if save {
        if !config.persistence.csv_enabled {
            bail!("CSV export is disabled (persistence.csv_enabled = false)");
        }
        let exporter = TradeExporter::new(&config.persistence.data_dir)?;
        let path = exporter.export(&result, &ranked, &names)?;
        println!("  Best trades saved to {}", path.display());
    }

    Ok(())
}

fn display_name(snapshot: &MarketSnapshot, slug: &str) -> String {
    snapshot
        .catalog_item(slug)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| slug.to_string())
}
