//! Configuration loading
//!
//! Layers defaults, an optional file and environment variables into a
//! validated [`lorekeep_domain::Config`].

pub mod loader;

pub use loader::{load, load_from_env_overrides, load_from_file, probe_config_paths};
