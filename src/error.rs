//! Error taxonomy for the call adapter.
//!
//! Remote failures pass through unchanged, cancellation is its own variant so
//! consumers can tell it apart from ordinary completion, and misuse of the
//! call surface is reported eagerly as [`UsageError`].

use crate::calling::ArgumentError;
use crate::connection::RemoteError;
use crate::types::{Type, TypeMismatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    /// The wire primitive reported a failure; never retried or rewrapped.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The ambient cancellation token fired while the call or stream was in
    /// flight.
    #[error("call was cancelled")]
    Cancelled,

    /// A reply or stream element did not decode to the declared payload type.
    #[error("decoding reply: {0}")]
    Decode(#[from] TypeMismatch),

    /// Argument extraction could not derive a value (expression call path).
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Usage(#[from] UsageError),
}

pub type CallResult<T> = Result<T, CallError>;

/// Misuse of the call surface. Resolved eagerly, before any wire traffic.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("contract {contract} has no method named {method:?}")]
    UnknownMethod {
        contract: &'static str,
        method: String,
    },

    #[error("method {method:?} expects {expected} argument(s), got {given}")]
    ArityMismatch {
        method: &'static str,
        expected: usize,
        given: usize,
    },

    #[error("method {method:?} is {shape} and cannot be called as {requested}")]
    ShapeMismatch {
        method: &'static str,
        shape: &'static str,
        requested: &'static str,
    },

    #[error("method {method:?} returns {declared} payloads, not {requested}")]
    PayloadMismatch {
        method: &'static str,
        declared: Type,
        requested: Type,
    },
}

/// Failure to release a single inbound registration. Caught and discarded
/// during receiver teardown so the remaining subscriptions still close.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DisposeError {
    message: String,
}

impl DisposeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
