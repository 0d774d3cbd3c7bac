// Exchange locations shown on the globe.

use tracing::info;

use crate::geo::clusterer::{GeoError, MarkerClusterer, Placement};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Venue {
    pub id: String,   // e.g. "binance", used in snapshot requests
    pub name: String, // e.g. "Binance"
    pub lat: f64,
    pub lon: f64,
    pub location: String,
}

impl Venue {
    pub fn new(id: &str, name: &str, lat: f64, lon: f64, location: &str) -> Self {
        Self { id: id.into(), name: name.into(), lat, lon, location: location.into() }
    }
}

const TOKYO: (f64, f64) = (35.6762, 139.6503);
const SAN_FRANCISCO: (f64, f64) = (37.7749, -122.4194);
const SINGAPORE: (f64, f64) = (1.3521, 103.8198);
const HONG_KONG: (f64, f64) = (22.3964, 114.1095);

pub fn default_venues() -> Vec<Venue> {
    let at = |id: &str, name: &str, (lat, lon): (f64, f64), location: &str| Venue::new(id, name, lat, lon, location);
    vec![
        at("binance", "Binance", TOKYO, "Tokyo, Japan"),
        at("coinbase", "Coinbase", SAN_FRANCISCO, "San Francisco, USA"),
        at("kraken", "Kraken", SAN_FRANCISCO, "San Francisco, USA"),
        at("kucoin", "KuCoin", SINGAPORE, "Singapore"),
        at("huobi", "Huobi", TOKYO, "Tokyo, Japan"),
        at("bitfinex", "Bitfinex", HONG_KONG, "Hong Kong"),
        at("bybit", "Bybit", SINGAPORE, "Singapore"),
        at("okx", "OKX", TOKYO, "Tokyo, Japan"),
        at("gate", "Gate.io", TOKYO, "Tokyo, Japan"),
        at("mexc", "MEXC", SINGAPORE, "Singapore"),
    ]
}

pub fn find_venue<'a>(venues: &'a [Venue], id: &str) -> Option<&'a Venue> {
    venues.iter().find(|v| v.id.eq_ignore_ascii_case(id))
}

/// Register venues in table order; the order decides each marker's slot.
pub fn register_venues(clusterer: &MarkerClusterer, venues: &[Venue]) -> Result<Vec<Placement>, GeoError> {
    let placements = venues
        .iter()
        .map(|v| clusterer.register(&v.id, v.lat, v.lon))
        .collect::<Result<Vec<_>, _>>()?;
    info!(venues = placements.len(), groups = clusterer.group_count(), "Registered venue markers");
    Ok(placements)
}
