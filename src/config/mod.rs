//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FailoverConfig (validated, immutable)
//!     → handed to the domain adapters at construction
//! ```
//!
//! # Design Decisions
//! - Endpoint lists are static; there is no runtime discovery or hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::FailoverConfig;
pub use schema::ObservabilityConfig;
pub use schema::OracleServiceConfig;
pub use schema::RpcServiceConfig;
pub use schema::SwitcherSettings;
pub use schema::TrackerPolicyConfig;
