/// Errors internal to the notification subsystem.
///
/// These never cross the dispatcher boundary: channels convert them into
/// `"failed"` delivery outcomes and log the detail. They surface only
/// from channel construction (e.g. a bad SMTP relay host at startup).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or invalid.
    #[error("notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// An HTTP request to an external endpoint failed.
    #[error("notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("notify: endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// SMTP transport error while sending email.
    #[error("notify: SMTP error: {0}")]
    Smtp(String),

    /// A recipient address could not be parsed.
    #[error("notify: invalid address '{0}'")]
    Address(String),
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
