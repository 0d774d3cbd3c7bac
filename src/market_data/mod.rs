// Market data module entrypoint
pub mod adapters;    // snapshot sources (HTTP backend)
pub mod normaliser;  // converts wire strings -> decimal levels
pub mod profiles;    // per-asset tick/padding/precision table
pub mod latest;      // last-snapshot-wins slot
pub mod pipeline;    // snapshot -> DepthView
pub mod poller;      // fixed-cadence polling loop
