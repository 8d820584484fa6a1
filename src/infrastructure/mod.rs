//! Infrastructure shared by every part of the engine

pub mod logging;

pub use logging::{init_dev_logging, init_file_logging, init_logging, LogConfig, LogFormat, LogOutput};
