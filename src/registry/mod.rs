//! The type engine
//!
//! Declares types, composes their features, allocates instances and
//! resolves conversions between unrelated types.

pub mod catalog;
pub mod conversion;
pub mod descriptor;
pub mod instance;

pub use catalog::TypeRegistry;
pub use conversion::ConversionEntries;
pub use descriptor::TypeDescriptor;
pub use instance::Instance;
