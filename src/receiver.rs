//! Inbound direction: wiring a local handler to server-originated calls.

use crate::connection::{Connection, Subscription};
use crate::contract::Bindable;
use crate::error::CallResult;
use std::collections::HashMap;
use std::sync::Arc;

/// Register `handler` for every inbound-capable method of contract `C`.
///
/// Only acknowledged methods (`async fn` with no return) are wired; the
/// generated [`Bindable::inbound`] glue decodes each positional argument to
/// its declared type and hands the handler's completion back to the wire
/// layer. If any registration fails the already-registered methods are
/// released before the error is returned.
pub fn bind_receiver<C: Bindable>(
    conn: &dyn Connection,
    handler: Arc<C::Handler>,
) -> CallResult<ReceiverSet> {
    let mut subs = HashMap::new();
    for method in C::inbound(handler) {
        match conn.register_handler(method.name, method.params, method.handler) {
            Ok(sub) => {
                tracing::debug!(
                    contract = C::NAME,
                    method = method.name,
                    "bound inbound handler"
                );
                subs.insert(method.name, sub);
            }
            Err(err) => {
                ReceiverSet {
                    subs,
                    disposed: false,
                }
                .dispose();
                return Err(err.into());
            }
        }
    }
    Ok(ReceiverSet {
        subs,
        disposed: false,
    })
}

/// The subscriptions created by one [`bind_receiver`] call. Owned by the
/// binding caller; disposal releases every registration and may be invoked
/// any number of times (explicitly or on drop).
pub struct ReceiverSet {
    subs: HashMap<&'static str, Box<dyn Subscription>>,
    disposed: bool,
}

impl std::fmt::Debug for ReceiverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverSet")
            .field("subs", &self.subs.keys().collect::<Vec<_>>())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl ReceiverSet {
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn is_bound(&self, method: &str) -> bool {
        self.subs.contains_key(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.subs.keys().copied()
    }

    /// Close every subscription. A failing close is logged and discarded so
    /// the remaining registrations are still released.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (method, mut sub) in self.subs.drain() {
            if let Err(err) = sub.close() {
                tracing::warn!(method, error = %err, "failed to release inbound registration");
            }
        }
    }
}

impl Drop for ReceiverSet {
    fn drop(&mut self) {
        self.dispose();
    }
}
