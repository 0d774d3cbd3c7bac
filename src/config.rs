//! Application configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `DEPTHGLOBE_*` environment variables (`__` separates nested keys, e.g.
//! `DEPTHGLOBE_ASSETS__BTC__TICK_SIZE=0.1`). Asset entries overlay the
//! built-in table one field at a time; other keys replace their default.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};

use crate::engine::histogram::DEFAULT_MAX_BINS;
use crate::geo::clusterer::DEFAULT_OFFSET_DEG;
use crate::geo::venues::{default_venues, Venue};
use crate::market_data::normaliser::DEFAULT_MAX_LEVELS;
use crate::market_data::profiles::{default_raw_profiles, overlay_profiles, AssetOverride, AssetProfiles, ProfileError};

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Order-book backend, e.g. "http://127.0.0.1:5000".
    pub source_base_url: String,
    /// Quote currency appended to every symbol request.
    pub quote: String,
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    pub max_levels_per_side: usize,
    pub max_bins: usize,
    /// Ring radius for co-located markers, in degrees.
    pub marker_offset_deg: f64,
    pub metrics_port: u16,
    /// Per-symbol overrides on top of the built-in asset table.
    pub assets: BTreeMap<String, AssetOverride>,
    pub venues: Vec<Venue>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_base_url: "http://127.0.0.1:5000".into(),
            quote: "USDT".into(),
            poll_interval_ms: 1_000,
            http_timeout_ms: 5_000,
            max_levels_per_side: DEFAULT_MAX_LEVELS,
            max_bins: DEFAULT_MAX_BINS,
            marker_offset_deg: DEFAULT_OFFSET_DEG,
            metrics_port: 9000,
            assets: BTreeMap::new(),
            venues: default_venues(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (skipped if missing) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, env_source())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Built-in table with the configured overrides applied, validated.
    /// Any bad entry fails the whole load.
    pub fn asset_profiles(&self) -> Result<AssetProfiles, ProfileError> {
        AssetProfiles::from_raw(&overlay_profiles(&default_raw_profiles(), &self.assets)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("DEPTHGLOBE").prefix_separator("_").separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.max_levels_per_side, 50);
        assert_eq!(cfg.venues.len(), 10);
        assert_eq!(cfg.asset_profiles().unwrap().len(), 4);
    }

    #[test]
    fn test_toml_overrides() {
        let cfg = AppConfig::from_toml_str(
            r#"
            poll_interval_ms = 250
            quote = "USDC"

            [assets.DOGE]
            tick_size = "0.00001"
            padding = "0.0001"
            decimals = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.quote, "USDC");
        assert_eq!(cfg.marker_offset_deg, 1.5);

        let profiles = cfg.asset_profiles().unwrap();
        assert_eq!(profiles.get("doge").unwrap().tick_size, dec!(0.00001));
        // Adding an asset keeps the built-in ones.
        assert_eq!(profiles.symbols().collect::<Vec<_>>(), vec!["BTC", "DOGE", "ETH", "SOL", "XRP"]);
    }

    #[test]
    fn test_toml_partial_asset_entry() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [assets.SOL]
            padding = "0.05"
            "#,
        )
        .unwrap();
        let sol = *cfg.asset_profiles().unwrap().get("SOL").unwrap();
        assert_eq!(sol.padding, dec!(0.05));
        assert_eq!(sol.tick_size, dec!(0.0001));
        assert_eq!(sol.decimals, 2);
    }

    #[test]
    fn test_env_single_field_override() {
        let vars = config::Map::from([
            ("DEPTHGLOBE_ASSETS__BTC__TICK_SIZE".to_string(), "0.1".to_string()),
            ("DEPTHGLOBE_QUOTE".to_string(), "USDC".to_string()),
        ]);
        let cfg = AppConfig::load_with_env(None, env_source().source(Some(vars))).unwrap();
        assert_eq!(cfg.quote, "USDC");

        let profiles = cfg.asset_profiles().unwrap();
        let btc = profiles.get("BTC").unwrap();
        assert_eq!(btc.tick_size, dec!(0.1));
        assert_eq!(btc.padding, dec!(0.01));
        assert_eq!(btc.decimals, 2);
        assert_eq!(profiles.len(), 4);
    }

    #[test]
    fn test_invalid_profile_fails_fast() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [assets.ADA]
            tick_size = "-1"
            padding = "0"
            decimals = 4
            "#,
        )
        .unwrap();
        assert!(cfg.asset_profiles().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = AppConfig::load(Some(Path::new("/nonexistent/depthglobe.toml"))).unwrap();
        assert_eq!(cfg.quote, AppConfig::default().quote);
    }
}
