//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and loading
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that collect every problem found

mod defaults;
mod types;
pub mod validation;

pub use types::{
    Config, ConfigError, DirectoryConfig, ListenConfig, RaffleConfig, ServerConfig, StoreBackend,
    StoreConfig,
};
pub use validation::ValidationError as ConfigValidationError;
