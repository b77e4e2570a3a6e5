//! Error types for timeline construction.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// Timeline durations come from configuration, never from user input, so
    /// hitting this is a programming error in the caller.
    #[error("timeline duration must be greater than zero (got {duration:?})")]
    InvalidDuration { duration: Duration },
}
