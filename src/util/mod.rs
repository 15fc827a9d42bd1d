//! Basic types: errors, time.

pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{is_valid_time, samples_crossed, Time, TimeRange, INVALID_TIME};
