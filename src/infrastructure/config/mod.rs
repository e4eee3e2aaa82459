//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration and credential validation

pub mod loader;

pub use loader::{ConfigLoader, CONFIG_DIR, ENV_PREFIX};
