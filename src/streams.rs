//! Caller-facing streaming results.
//!
//! Both adapters decode wire values to the declared item type and watch the
//! cancellation token captured when the call was issued. When the token fires
//! mid-consumption they yield [`CallError::Cancelled`] exactly once, distinct
//! from ordinary end-of-stream, and terminate.

use crate::connection::ValueStream;
use crate::error::CallError;
use crate::types::{Decode, Value};
use futures::Stream;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Lazy pull-sequence of server-produced values.
pub struct ServerStream<T> {
    items: ValueStream,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> ServerStream<T> {
    pub(crate) fn new(items: ValueStream, cancel: CancellationToken) -> Self {
        Self {
            items,
            cancelled: Box::pin(cancel.cancelled_owned()),
            done: false,
            _item: PhantomData,
        }
    }
}

impl<T: Decode> Stream for ServerStream<T> {
    type Item = Result<T, CallError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        // Cancellation is checked first so a fired token surfaces before any
        // item the wire may already have buffered.
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.done = true;
            return Poll::Ready(Some(Err(CallError::Cancelled)));
        }
        match this.items.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(value))) => {
                Poll::Ready(Some(T::decode(value).map_err(CallError::from)))
            }
            Poll::Ready(Some(Err(remote))) => {
                this.done = true;
                Poll::Ready(Some(Err(CallError::from(remote))))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Reader side of a channel-backed stream.
pub struct ChannelReader<T> {
    values: mpsc::Receiver<Value>,
    cancel: CancellationToken,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: Decode> ChannelReader<T> {
    pub(crate) fn new(values: mpsc::Receiver<Value>, cancel: CancellationToken) -> Self {
        Self {
            values,
            cancel,
            done: false,
            _item: PhantomData,
        }
    }

    /// Next remote value, `None` once the channel is closed. After the
    /// cancellation token fires this yields [`CallError::Cancelled`] once and
    /// then `None`.
    pub async fn recv(&mut self) -> Option<Result<T, CallError>> {
        if self.done {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.done = true;
                Some(Err(CallError::Cancelled))
            }
            value = self.values.recv() => match value {
                Some(value) => Some(T::decode(value).map_err(CallError::from)),
                None => {
                    self.done = true;
                    None
                }
            },
        }
    }
}
