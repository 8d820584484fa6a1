//! Small supporting utilities

pub mod action_stack;
pub mod once;

pub use action_stack::{Action, ActionStack};
pub use once::{once, stable};
