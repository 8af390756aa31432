//! Typed failures of the automation engine

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("config key '{path}' is missing")]
    ConfigMissingKey { path: String },

    #[error("config key '{path}' is not {expected}")]
    ConfigShape { path: String, expected: &'static str },

    #[error("no window titled '{title}' found")]
    WindowNotFound { title: String },

    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("invalid day range {start}..={end} (start must be >= 1 and end >= start)")]
    InvalidDayRange { start: u32, end: u32 },

    #[error("stopped by user")]
    UserAbort,

    #[error("host did not finish after {attempts} polls every {interval:?}")]
    Timeout { attempts: u32, interval: Duration },
}

impl MacroError {
    pub fn action(action: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ActionFailed {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

pub type MacroResult<T> = std::result::Result<T, MacroError>;
