// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the drain pipeline.

use std::time::Duration;

/// Configuration could not be loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

/// A frame in the request body could not be read.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The octet count is missing or not a number. The rest of the body can't be
    /// resynchronized.
    #[error("invalid frame length: {0}")]
    InvalidLength(String),

    /// The octet count points past the end of the body.
    #[error("frame of {expected} bytes truncated to {available}")]
    Truncated { expected: usize, available: usize },

    /// The frame was fully read but its syslog header is unusable.
    #[error("malformed syslog header: {0}")]
    MalformedHeader(String),
}

impl FrameError {
    /// Whether reading can continue with the next frame.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::MalformedHeader(_))
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unterminated quoted value for key {0}")]
    UnterminatedQuote(String),

    #[error("invalid value {value:?} for key {key}")]
    InvalidValue { key: String, value: String },
}

/// Why a platform line was skipped instead of producing an event.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("error parsing time {0:?}")]
    Timestamp(String),

    #[error("logfmt unmarshal error: {0}")]
    Decode(#[from] DecodeError),

    #[error("unable to parse dyno error message: {0:?}")]
    DynoError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("channel group {0} is closed")]
    Closed(String),

    #[error("channel group {lane} still full after {timeout:?}")]
    Timeout { lane: String, timeout: Duration },
}

/// Failure talking to the metrics sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("sink did not answer within {0:?}")]
    Timeout(Duration),

    #[error("sink rejected the message: {0}")]
    Rejected(String),

    #[error("undecodable response: {0}")]
    Protocol(#[from] prost::DecodeError),

    #[error("not connected")]
    NotConnected,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization required")]
    Missing,

    #[error("Authorization header is malformed")]
    Malformed,

    #[error("Only Basic Authorization is accepted")]
    UnsupportedScheme,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Incorrect token")]
    IncorrectPassword,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::InvalidConfig("LANES must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: LANES must be greater than 0"
        );
        assert_eq!(AuthError::IncorrectPassword.to_string(), "Incorrect token");
    }

    #[test]
    fn test_frame_error_recoverable() {
        assert!(FrameError::MalformedHeader("no procid".into()).is_recoverable());
        assert!(!FrameError::InvalidLength("abc".into()).is_recoverable());
        assert!(!FrameError::Truncated {
            expected: 10,
            available: 3
        }
        .is_recoverable());
    }
}
