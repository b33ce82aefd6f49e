//! Station configuration
//!
//! Persisted parameters and the per-run snapshots derived from them. The
//! record is stored as postcard binary data when the `serde` feature is on.

mod station;
mod types;

pub use station::{
    ConfigError, Hold, ParameterStore, StationParameters, MAX_PATTERNS, MAX_SERIALIZED_SIZE,
    PARAMETERS_MAGIC, PARAMETERS_VERSION,
};
pub use types::{Channels, Pattern, ProcessConfig, SetpointMode, TuningConfig, EMPTY_PATTERN};
