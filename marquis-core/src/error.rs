use std::time::Duration;

use thiserror::Error;

/// The named lock primitive could not be created at all.
///
/// Distinct from "already held": that case is a normal [`crate::lock::Ownership`].
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create named lock `{name}`: {reason}")]
    CreateFailed { name: String, reason: String },
    #[error("named locks are not supported on this platform")]
    Unsupported,
}

/// Delivery of a forwarded URI to the running instance failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("receiver did not answer within {0:?}")]
    Timeout(Duration),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Problems building or reading a data-copy payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload tag {found:#x} does not match {expected:#x}")]
    ForeignTag { expected: usize, found: usize },
    #[error("payload byte length {0} is not a whole number of UTF-16 units")]
    OddLength(usize),
    #[error("payload is not null-terminated")]
    MissingTerminator,
    #[error("payload is not valid UTF-16")]
    InvalidUtf16,
    #[error("payload of {0} bytes exceeds the message size limit")]
    TooLarge(usize),
}

/// An environment override could not be applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
    #[error("{key}={value} is not a valid value: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
