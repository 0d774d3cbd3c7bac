use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use depthglobe_rs::config::AppConfig;
use depthglobe_rs::engine::histogram::HistogramBuilder;
use depthglobe_rs::geo::clusterer::{MarkerClusterer, Placement};
use depthglobe_rs::geo::projector::{project, unproject, MARKER_RADIUS};
use depthglobe_rs::geo::venues::{find_venue, register_venues, Venue};
use depthglobe_rs::market_data::adapters::http::HttpSnapshotSource;
use depthglobe_rs::market_data::adapters::SnapshotSource;
use depthglobe_rs::market_data::normaliser::Normaliser;
use depthglobe_rs::market_data::pipeline::DepthPipeline;
use depthglobe_rs::market_data::profiles::AssetProfiles;
use depthglobe_rs::market_data::poller::spawn_depth_poller;
use depthglobe_rs::render::{DepthRenderer, TextDepthRenderer};
use depthglobe_rs::telemetry;

#[derive(Debug, Parser)]
#[command(name = "depthglobe", about = "Order-book depth histograms and exchange globe markers")]
struct Cli {
    /// TOML config file; missing file means built-in defaults
    #[arg(long, default_value = "depthglobe.toml")]
    config: PathBuf,

    /// Override the order-book backend URL
    #[arg(long)]
    base_url: Option<String>,

    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

// Helper function to print every marker with its globe position
fn print_placements(placements: &[Placement], venues: &[Venue]) {
    println!("\n=== Exchange Markers ===");
    for p in placements {
        let location = find_venue(venues, &p.entity_id).map(|v| v.location.as_str()).unwrap_or("?");
        let pos = p.position(MARKER_RADIUS);
        println!(
            "{:<10} {:<20} slot {} -> ({:.4}, {:.4}) xyz ({:.2}, {:.2}, {:.2})",
            p.entity_id, location, p.group_index, p.adjusted_lat, p.adjusted_lon, pos.x, pos.y, pos.z
        );
    }
    println!("========================\n");
}

// Reject an unknown exchange or symbol before any request goes out
fn validate_target(venues: &[Venue], profiles: &AssetProfiles, exchange: &str, symbol: &str) -> Result<(), String> {
    if find_venue(venues, exchange).is_none() {
        return Err(format!("Unknown exchange '{}'. Type 'venues' for the list.", exchange));
    }
    if !profiles.contains(symbol) {
        return Err(format!("No asset profile for '{}'", symbol));
    }
    Ok(())
}

// Globe position plus the coordinate read back from it; poles lose their longitude
fn describe_projection(lat: f64, lon: f64, radius: f64) -> String {
    let p = project(lat, lon, radius);
    let (back_lat, back_lon) = unproject(&p);
    format!("({:.6}, {:.6}, {:.6}) -> lat {:.6}, lon {:.6}", p.x, p.y, p.z, back_lat, back_lon)
}

fn print_help() {
    println!("Available commands:");
    println!("  venues                              - List exchange markers");
    println!("  depth <exchange> <symbol>           - Fetch one snapshot and draw its depth");
    println!("  watch <exchange> <symbol> <seconds> - Poll and redraw for a while");
    println!("  project <lat> <lon> [radius]        - Globe position for a coordinate");
    println!("  quit, q                             - Exit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_filter);

    let mut cfg = AppConfig::load(Some(&cli.config)).context("loading configuration")?;
    if let Some(url) = cli.base_url {
        cfg.source_base_url = url;
    }
    telemetry::init_metrics(cfg.metrics_port)?;

    // Unknown or malformed profiles stop us here, not on the first snapshot.
    let profiles = cfg.asset_profiles().context("validating asset profiles")?;
    info!(symbols = ?profiles.symbols().collect::<Vec<_>>(), "Asset profiles loaded");

    let clusterer = MarkerClusterer::new(cfg.marker_offset_deg);
    let placements = register_venues(&clusterer, &cfg.venues).context("registering venues")?;

    let pipeline = Arc::new(DepthPipeline::new(
        profiles,
        Normaliser::new(cfg.max_levels_per_side),
        HistogramBuilder::new(cfg.max_bins),
    ));
    let source = Arc::new(HttpSnapshotSource::new(&cfg.source_base_url, &cfg.quote, cfg.http_timeout())?);
    let mut renderer = TextDepthRenderer::default();

    // CLI loop
    loop {
        print!("\ndepthglobe> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim().to_lowercase();
        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts.as_slice() {
            ["help"] | ["h"] => print_help(),
            ["venues"] => print_placements(&placements, &cfg.venues),
            ["depth", exchange, symbol] => {
                if let Err(msg) = validate_target(&cfg.venues, pipeline.profiles(), exchange, symbol) {
                    println!("{}", msg);
                    continue;
                }
                match source.fetch(exchange, symbol).await {
                    Ok(raw) => match pipeline.process(exchange, symbol, &raw) {
                        Ok(view) => print!("{}", renderer.render(&view)),
                        Err(e) => println!("Skipping this snapshot: {}", e),
                    },
                    Err(e) => println!("Fetch failed: {}", e),
                }
            }
            ["watch", exchange, symbol, secs] => {
                let Ok(secs) = secs.parse::<u64>() else {
                    println!("Usage: watch <exchange> <symbol> <seconds>");
                    continue;
                };
                if let Err(msg) = validate_target(&cfg.venues, pipeline.profiles(), exchange, symbol) {
                    println!("{}", msg);
                    continue;
                }
                let (tx, mut rx) = watch::channel(None);
                let handle = spawn_depth_poller(source.clone(), pipeline.clone(), exchange, symbol, cfg.poll_interval(), tx);
                let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
                while let Ok(Ok(())) = tokio::time::timeout_at(deadline, rx.changed()).await {
                    let latest = rx.borrow_and_update().clone();
                    if let Some(view) = latest {
                        print!("{}", renderer.render(&view));
                    }
                }
                handle.abort();
            }
            ["project", lat, lon, rest @ ..] if rest.len() <= 1 => {
                let radius = rest.first().map_or(Ok(MARKER_RADIUS), |r| r.parse::<f64>());
                match (lat.parse::<f64>(), lon.parse::<f64>(), radius) {
                    (Ok(lat), Ok(lon), Ok(radius)) => println!("{}", describe_projection(lat, lon, radius)),
                    _ => println!("Invalid numbers"),
                }
            }
            ["quit"] | ["q"] | ["exit"] => {
                println!("Goodbye!");
                break;
            }
            [] => continue,
            _ => println!("Unknown command. Type 'help' for available commands."),
        }
    }

    Ok(())
}
