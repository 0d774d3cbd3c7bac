//! Per-asset histogram profiles.
//!
//! The table is built and validated once at startup; lookups of symbols that
//! are not in it fail instead of falling back to a default.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::engine::types::{AggregationError, AggregationResult};

/// Highest scale `rust_decimal` can represent.
pub const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("{symbol}: invalid decimal for {field}: {value:?}")]
    InvalidDecimal { symbol: String, field: &'static str, value: String },

    #[error("tick size must be positive, got {0}")]
    NonPositiveTick(Decimal),

    #[error("padding must not be negative, got {0}")]
    NegativePadding(Decimal),

    #[error("precision {0} exceeds the maximum of 28")]
    PrecisionTooLarge(u32),

    #[error("empty asset symbol")]
    EmptySymbol,

    #[error("{symbol}: {field} is required for an asset without a built-in profile")]
    MissingField { symbol: String, field: &'static str },

    #[error("{symbol}: {source}")]
    Invalid { symbol: String, source: Box<ProfileError> },
}

/// Bucket width, span padding and key precision for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetProfile {
    pub tick_size: Decimal,
    pub padding: Decimal,
    pub decimals: u32,
}

impl AssetProfile {
    pub fn new(tick_size: Decimal, padding: Decimal, decimals: u32) -> Result<Self, ProfileError> {
        if tick_size <= Decimal::ZERO {
            return Err(ProfileError::NonPositiveTick(tick_size));
        }
        if padding < Decimal::ZERO {
            return Err(ProfileError::NegativePadding(padding));
        }
        if decimals > MAX_DECIMALS {
            return Err(ProfileError::PrecisionTooLarge(decimals));
        }
        Ok(Self { tick_size, padding, decimals })
    }
}

// Config-file shape: decimals as strings so nothing goes through f64.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawAssetProfile {
    pub tick_size: String,
    pub padding: String,
    pub decimals: u32,
}

impl RawAssetProfile {
    pub fn new(tick_size: &str, padding: &str, decimals: u32) -> Self {
        Self { tick_size: tick_size.into(), padding: padding.into(), decimals }
    }

    pub fn validate(&self, symbol: &str) -> Result<AssetProfile, ProfileError> {
        let parse = |field: &'static str, value: &str| {
            Decimal::from_str(value.trim()).map_err(|_| ProfileError::InvalidDecimal {
                symbol: symbol.to_string(),
                field,
                value: value.to_string(),
            })
        };
        let tick_size = parse("tick_size", &self.tick_size)?;
        let padding = parse("padding", &self.padding)?;
        AssetProfile::new(tick_size, padding, self.decimals).map_err(|e| ProfileError::Invalid {
            symbol: symbol.to_string(),
            source: Box::new(e),
        })
    }
}

/// Config-layer entry for one asset. Fields left out keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetOverride {
    pub tick_size: Option<String>,
    pub padding: Option<String>,
    pub decimals: Option<u32>,
}

impl AssetOverride {
    pub fn full(tick_size: &str, padding: &str, decimals: u32) -> Self {
        Self { tick_size: Some(tick_size.into()), padding: Some(padding.into()), decimals: Some(decimals) }
    }

    fn apply(&self, symbol: &str, base: Option<&RawAssetProfile>) -> Result<RawAssetProfile, ProfileError> {
        let missing = |field: &'static str| ProfileError::MissingField { symbol: symbol.to_string(), field };
        Ok(RawAssetProfile {
            tick_size: self
                .tick_size
                .clone()
                .or_else(|| base.map(|b| b.tick_size.clone()))
                .ok_or_else(|| missing("tick_size"))?,
            padding: self
                .padding
                .clone()
                .or_else(|| base.map(|b| b.padding.clone()))
                .ok_or_else(|| missing("padding"))?,
            decimals: self.decimals.or(base.map(|b| b.decimals)).ok_or_else(|| missing("decimals"))?,
        })
    }
}

/// Overlay configured entries field by field onto `base`. Symbols match
/// after normalisation, so `btc` in the environment updates `BTC`.
pub fn overlay_profiles(
    base: &BTreeMap<String, RawAssetProfile>,
    overrides: &BTreeMap<String, AssetOverride>,
) -> Result<BTreeMap<String, RawAssetProfile>, ProfileError> {
    let mut merged: BTreeMap<String, RawAssetProfile> =
        base.iter().map(|(symbol, raw)| (normalise_symbol(symbol), raw.clone())).collect();
    for (symbol, entry) in overrides {
        let key = normalise_symbol(symbol);
        if key.is_empty() {
            return Err(ProfileError::EmptySymbol);
        }
        let raw = entry.apply(&key, merged.get(&key))?;
        merged.insert(key, raw);
    }
    Ok(merged)
}

/// Built-in table used when no configuration overrides it.
pub fn default_raw_profiles() -> BTreeMap<String, RawAssetProfile> {
    BTreeMap::from([
        ("BTC".to_string(), RawAssetProfile::new("0.01", "0.01", 2)),
        ("ETH".to_string(), RawAssetProfile::new("0.01", "0.01", 2)),
        ("SOL".to_string(), RawAssetProfile::new("0.0001", "0.01", 2)),
        ("XRP".to_string(), RawAssetProfile::new("0.0001", "0.0001", 4)),
    ])
}

/// "btc", "BTC/USDT" and "btc-usdt" all map to "BTC".
pub fn normalise_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .split(['/', '-'])
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetProfiles {
    profiles: BTreeMap<String, AssetProfile>,
}

impl AssetProfiles {
    pub fn defaults() -> Self {
        // The built-in table is static and known-valid.
        Self::from_raw(&default_raw_profiles()).unwrap_or_default()
    }

    pub fn from_raw(raw: &BTreeMap<String, RawAssetProfile>) -> Result<Self, ProfileError> {
        let mut profiles = BTreeMap::new();
        for (symbol, entry) in raw {
            let key = normalise_symbol(symbol);
            if key.is_empty() {
                return Err(ProfileError::EmptySymbol);
            }
            profiles.insert(key.clone(), entry.validate(&key)?);
        }
        Ok(Self { profiles })
    }

    pub fn insert(&mut self, symbol: &str, profile: AssetProfile) -> Result<(), ProfileError> {
        let key = normalise_symbol(symbol);
        if key.is_empty() {
            return Err(ProfileError::EmptySymbol);
        }
        self.profiles.insert(key, profile);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> AggregationResult<&AssetProfile> {
        self.profiles
            .get(&normalise_symbol(symbol))
            .ok_or_else(|| AggregationError::UnknownAssetProfile { symbol: symbol.to_string() })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.profiles.contains_key(&normalise_symbol(symbol))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
