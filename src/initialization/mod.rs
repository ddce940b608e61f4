//! Process-level setup.
//!
//! The library itself only logs through the `log` facade; binaries (and tests
//! that want output) install a logger here.

mod logger;

pub use logger::init_logger_with;
