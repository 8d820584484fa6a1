//! Typeweave - declared types with feature composition for a dynamic object model
//!
//! Types are described at runtime: features are defined, merged from other
//! types with `expand`/`inherit`, and conversions between unrelated types
//! are registered and resolved on demand. `Any` is the universal ancestor
//! providing structural comparison and duplication.

// Core modules
pub mod core;
pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod registry;
pub mod root;
pub mod util;

// Re-export commonly used items
pub use self::core::{Feature, OrderedAssociation, Routine, Value};
pub use config::EngineConfig;
pub use errors::{ConfigError, ContractError, FaultKind, Result};
pub use infrastructure::{init_logging, LogConfig, LogFormat, LogOutput};
pub use registry::{Instance, TypeDescriptor, TypeRegistry};
pub use root::any;
pub use util::{once, stable, ActionStack};
