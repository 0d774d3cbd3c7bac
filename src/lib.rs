//! Order-book depth aggregation and globe marker placement.
//!
//! The core is synchronous and pure: snapshots go through tick estimation
//! and histogram bucketing, exchanges are fanned out around shared cities.
//! Fetching and drawing are left to collaborators behind small traits.

pub mod config;
pub mod engine;
pub mod geo;
pub mod market_data;
pub mod render;
pub mod telemetry;
