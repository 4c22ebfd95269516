//! Configuration system for the field-upload controller.
//!
//! This crate provides configuration loading, saving, and default values
//! for the upload controller. It includes:
//!
//! - The upload endpoint and anti-forgery nonces
//! - Localized message templates (`%n` placeholders)
//! - Timing knobs such as the progress-bar reset delay
//! - Environment variable substitution for YAML config files

pub mod config;
pub mod defaults;
pub mod env_vars;
mod error;
pub mod strings;

pub use config::{Config, LogLevel, UploadNonces};
pub use env_vars::substitute_variables;
pub use error::ConfigError;
pub use strings::UploadStrings;
