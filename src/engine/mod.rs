pub mod types;      // levels, bins, histogram, errors
pub mod tick;       // observed tick size
pub mod histogram;  // fixed-width depth buckets
