//! The duplex connection collaborator, as this crate consumes it.
//!
//! The adapter owns none of the wire protocol; it calls exactly one of these
//! primitives per contract method, selected by return shape and call mode.
//! Trait methods return boxed futures so the connection stays object-safe
//! behind `Arc<dyn Connection>`.

use crate::error::{CallError, DisposeError};
use crate::types::{Type, Value};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Raw value stream produced by [`Connection::open_stream`]; item order is
/// the order the remote side produced them.
pub type ValueStream = BoxStream<'static, Result<Value, RemoteError>>;

/// Unpack-and-invoke closure registered for one inbound method. Receives the
/// positional argument values and returns the handler's completion for the
/// wire layer to await.
pub type InboundHandler =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<(), CallError>> + Send + Sync>;

pub trait Connection: Send + Sync {
    /// Fire-and-forget: resolves when the call has been handed to the wire.
    fn send(
        &self,
        call: &str,
        args: Vec<Value>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), RemoteError>>;

    /// Request/response with no payload: resolves when the remote side has
    /// acknowledged the call.
    fn invoke_unit(
        &self,
        call: &str,
        args: Vec<Value>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), RemoteError>>;

    /// Request/response: resolves to the reply value, which the caller
    /// expects to be of `payload` type.
    fn invoke(
        &self,
        call: &str,
        payload: Type,
        args: Vec<Value>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Value, RemoteError>>;

    /// Server push streaming.
    fn open_stream(&self, call: &str, args: Vec<Value>, cancel: CancellationToken) -> ValueStream;

    /// Channel-backed streaming; the receiver is always delivered through a
    /// completion, the adapter unwraps it for non-deferred contract shapes.
    fn open_channel(
        &self,
        call: &str,
        args: Vec<Value>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<mpsc::Receiver<Value>, RemoteError>>;

    /// Register an inbound handler under `name` with the given positional
    /// parameter types.
    fn register_handler(
        &self,
        name: &str,
        params: Vec<Type>,
        handler: InboundHandler,
    ) -> Result<Box<dyn Subscription>, RemoteError>;
}

/// Owns one inbound registration; closing it unregisters the handler.
pub trait Subscription: Send {
    fn close(&mut self) -> Result<(), DisposeError>;
}

/// A failure reported by a wire primitive. Opaque to this crate: it is
/// propagated to the caller unchanged, never retried or suppressed.
#[derive(Debug, Error)]
#[error("remote call failed: {message}")]
pub struct RemoteError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
