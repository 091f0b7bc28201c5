//! Configuration for screenlet hosts.
//!
//! Settings are read from a TOML file and shared through [`ConfigStore`].

mod loader;
mod store;
mod types;

pub use loader::ConfigError;
pub use store::ConfigStore;
pub use types::{AuthConfig, CacheConfig, Config, FormConfig, ListConfig, ServerConfig};
