//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

pub use logging::init_logging;
pub use time::TimeParser;
