//! Error types for the vacancy intake bot.

use std::time::Duration;

use crate::intake::catalog::VacancyId;
use crate::intake::state::Stage;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Vacancy catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The id came from a callback payload and no longer (or never) existed.
    #[error("Vacancy {id} not found")]
    NotFound { id: VacancyId },

    #[error("Vacancy {id} is defined more than once")]
    DuplicateId { id: VacancyId },

    #[error("Vacancy catalog is empty")]
    Empty,

    #[error("Failed to parse vacancy catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Internal state machine errors. Never shown verbatim to the user.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Application incomplete: missing {missing}")]
    IncompleteApplication { missing: &'static str },

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

/// Errors returned by a lead sink (the CRM webhook).
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("CRM unreachable: {0}")]
    Unreachable(String),

    #[error("CRM timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("CRM rejected lead with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response from CRM: {0}")]
    InvalidResponse(String),
}

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}
