//! Core building blocks of the object model
//!
//! Values, features and the ordered association used for conversion
//! registries.

pub mod feature;
pub mod table;
pub mod value;

pub use feature::{Feature, Routine, RoutineBody};
pub use table::OrderedAssociation;
pub use value::{ListRef, MapRef, Value};
