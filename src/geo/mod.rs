// Globe placement entrypoint
pub mod projector;  // lat/lon -> cartesian
pub mod clusterer;  // ring offsets for co-located markers
pub mod venues;     // default exchange locations
