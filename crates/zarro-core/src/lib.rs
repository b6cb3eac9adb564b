//! zarro core - configuration and environment resolution
//!
//! This crate provides the error types, the project configuration loader and
//! the [`EnvironmentRegistry`] that every zarro task resolves its settings
//! through.

pub mod config;
pub mod env;
pub mod error;

pub use config::{Config, DiscoveryConfig, TasksConfig, TestsConfig};
pub use env::{EnvVarDescriptor, EnvironmentRegistry, EnvironmentVariable, IntoNames};
pub use error::{ConfigError, EnvError, Result, ZarroError};
