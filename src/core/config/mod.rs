//! Gateway configuration.
//!
//! `types` holds the resolved structs the rest of the service consumes,
//! `raw` the TOML deserialization shapes, `load` the file/env resolution.

mod load;
mod raw;
mod types;

pub use load::{EnvOverrides, expand_home, load, load_from};
pub use types::{
    AuthConfig, CompletionConfig, Config, SearchConfig, ServerConfig, StorageConfig,
    TelemetryConfig, UsageConfig,
};
