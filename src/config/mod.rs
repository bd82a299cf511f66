//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → policy table built once, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload, the header policy is
//!   fixed for the life of the process
//! - All fields have defaults so an empty file is a working config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, override_bind_address, parse_config, ConfigError};
pub use schema::{
    GatewayConfig, HeaderConfig, ListenerConfig, LogFormat, ObservabilityConfig, PolicyConfig,
    SecurityConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
