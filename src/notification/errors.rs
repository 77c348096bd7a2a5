//! # Notification Error Types
//!
//! Errors raised while delivering an order notification. Transport errors
//! describe a single delivery attempt; dispatch errors describe the outcome of
//! the whole retry sequence.

use thiserror::Error;

/// Failure of a single mail delivery attempt
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The mail server rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The server could not be reached or dropped the connection
    #[error("connection failed: {0}")]
    Connection(String),
    /// The server did not answer within the configured timeout
    #[error("timed out: {0}")]
    Timeout(String),
    /// The server permanently refused the message
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Connection(_) | TransportError::Timeout(_))
    }
}

/// Final outcome of a failed notification dispatch
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    /// A non-retryable failure, no further attempts were made
    #[error("delivery failed on attempt {attempt}: {source}")]
    Fatal { attempt: u32, source: TransportError },
    /// Every attempt failed with a transient error
    #[error("delivery failed after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: TransportError },
}

impl DispatchError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            DispatchError::Fatal { source: TransportError::Auth(_), .. }
                | DispatchError::Exhausted { source: TransportError::Auth(_), .. }
        )
    }

    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            DispatchError::Fatal {
                source: TransportError::Connection(_) | TransportError::Timeout(_),
                ..
            } | DispatchError::Exhausted {
                source: TransportError::Connection(_) | TransportError::Timeout(_),
                ..
            }
        )
    }
}
