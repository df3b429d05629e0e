//! The outbound call path.
//!
//! A [`CallPlan`] is built once per (contract, policy) pair, classifying
//! every method and resolving its call mode, and cached for the process
//! lifetime. [`ProxyCore`] binds a plan to a connection; the client methods
//! that `contract!` generates forward to the shape-specific entry points
//! here, so steady-state calls never reconsult descriptors.

use crate::connection::{Connection, RemoteError};
use crate::context;
use crate::contract::{
    classify, resolve_mode, CallMode, CallPolicy, Callable, Contract, MethodDescriptor,
    ReturnShape,
};
use crate::error::{CallError, CallResult, UsageError};
use crate::streams::{ChannelReader, ServerStream};
use crate::types::{Decode, Typed, Value};
use futures::executor::block_on;
use futures::future::{self, BoxFuture};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Create a client for contract `C` over `conn`.
///
/// The plan for `(C, policy)` is built on first use and reused afterwards;
/// instances are cheap and per-connection.
pub fn create_proxy<C: Callable>(conn: Arc<dyn Connection>, policy: CallPolicy) -> C::Client {
    C::client(ProxyCore::for_contract::<C>(conn, policy))
}

pub(crate) struct CallPlan {
    contract: &'static str,
    methods: HashMap<&'static str, MethodPlan>,
}

#[derive(Clone, Copy)]
pub(crate) struct MethodPlan {
    pub shape: ReturnShape,
    pub mode: CallMode,
}

impl CallPlan {
    fn build(contract: &'static str, methods: Vec<MethodDescriptor>, policy: CallPolicy) -> Self {
        let methods = methods
            .into_iter()
            .map(|m| {
                let shape = classify(&m.returns);
                let mode = match shape {
                    // The push/request-response choice only exists for
                    // fire-and-forget shapes.
                    ReturnShape::Unit | ReturnShape::Ack => resolve_mode(m.hint, policy),
                    _ => CallMode::Invoke,
                };
                (m.name, MethodPlan { shape, mode })
            })
            .collect();
        Self { contract, methods }
    }

    pub fn get(&self, method: &str) -> Option<MethodPlan> {
        self.methods.get(method).copied()
    }

    fn mode_of(&self, method: &'static str) -> CallResult<CallMode> {
        self.get(method).map(|m| m.mode).ok_or_else(|| {
            UsageError::UnknownMethod {
                contract: self.contract,
                method: method.to_owned(),
            }
            .into()
        })
    }
}

static PLANS: Lazy<RwLock<HashMap<(TypeId, CallPolicy), Arc<CallPlan>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// One plan per (contract, policy), built at most once as far as callers can
/// observe. A racing build may happen; only the first inserted plan is kept.
pub(crate) fn plan_for<C: Contract>(policy: CallPolicy) -> Arc<CallPlan> {
    let key = (TypeId::of::<C>(), policy);
    if let Some(plan) = PLANS.read().get(&key) {
        return plan.clone();
    }
    let built = Arc::new(CallPlan::build(C::NAME, C::methods(), policy));
    tracing::debug!(
        contract = C::NAME,
        ?policy,
        methods = built.methods.len(),
        "built call plan"
    );
    PLANS.write().entry(key).or_insert(built).clone()
}

/// A connection handle paired with a baked call plan. Generated client types
/// wrap one of these; every entry point captures the ambient cancellation
/// token at call time.
pub struct ProxyCore {
    conn: Arc<dyn Connection>,
    plan: Arc<CallPlan>,
}

impl ProxyCore {
    pub(crate) fn for_contract<C: Contract>(conn: Arc<dyn Connection>, policy: CallPolicy) -> Self {
        Self {
            conn,
            plan: plan_for::<C>(policy),
        }
    }

    /// Fire-and-forget with a synchronous contract method: drains the wire
    /// completion before returning so a failure is observed at the call site.
    pub fn fire(&self, method: &'static str, args: Vec<Value>) -> CallResult<()> {
        block_on(self.ack(method, args))
    }

    /// Fire-and-forget returning the completion; push or acknowledged
    /// request/response per the plan's resolved mode.
    pub fn ack(&self, method: &'static str, args: Vec<Value>) -> BoxFuture<'static, CallResult<()>> {
        let cancel = context::current();
        let mode = match self.plan.mode_of(method) {
            Ok(mode) => mode,
            Err(err) => return Box::pin(future::ready(Err(err))),
        };
        let fut = match mode {
            CallMode::Send => self.conn.send(method, args, cancel.clone()),
            CallMode::Invoke => self.conn.invoke_unit(method, args, cancel.clone()),
        };
        Box::pin(guarded(cancel, fut))
    }

    /// Request/response decoding the reply to `R`.
    pub fn invoke<R: Decode + Typed>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> BoxFuture<'static, CallResult<R>> {
        let cancel = context::current();
        let fut = self.conn.invoke(method, R::wire_type(), args, cancel.clone());
        Box::pin(async move {
            let value = guarded(cancel, fut).await?;
            R::decode(value).map_err(CallError::from)
        })
    }

    /// Request/response with a synchronous contract method: blocks until the
    /// reply settles.
    pub fn invoke_blocking<R: Decode + Typed>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> CallResult<R> {
        block_on(self.invoke(method, args))
    }

    pub fn stream<T: Decode>(&self, method: &'static str, args: Vec<Value>) -> ServerStream<T> {
        let cancel = context::current();
        let items = self.conn.open_stream(method, args, cancel.clone());
        ServerStream::new(items, cancel)
    }

    /// Deferred stream shape: the underlying primitive is synchronous, the
    /// completion wrapper is immediately ready.
    pub fn stream_deferred<T: Decode + Send + 'static>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> BoxFuture<'static, CallResult<ServerStream<T>>> {
        Box::pin(future::ready(Ok(self.stream(method, args))))
    }

    /// Channel shape with a synchronous contract method: unwraps the
    /// completion in place.
    pub fn channel<T: Decode>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> CallResult<ChannelReader<T>> {
        block_on(self.channel_deferred(method, args))
    }

    pub fn channel_deferred<T: Decode>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> BoxFuture<'static, CallResult<ChannelReader<T>>> {
        let cancel = context::current();
        let fut = self.conn.open_channel(method, args, cancel.clone());
        Box::pin(async move {
            let values = guarded(cancel.clone(), fut).await?;
            Ok(ChannelReader::new(values, cancel))
        })
    }
}

/// Await a wire future, surfacing ambient cancellation as its own error.
async fn guarded<T>(
    cancel: CancellationToken,
    fut: BoxFuture<'static, Result<T, RemoteError>>,
) -> CallResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallError::Cancelled),
        result = fut => result.map_err(CallError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::contract! {
        pub contract Planned {
            client PlannedClient;
            handler PlannedHandler;

            fn poke(message: String);
            #[always_invoke]
            async fn confirm(message: String);
            async fn ask(question: String) -> String;
        }
    }

    #[test]
    fn plans_are_reused_per_policy() {
        let a = plan_for::<Planned>(CallPolicy::Send);
        let b = plan_for::<Planned>(CallPolicy::Send);
        assert!(Arc::ptr_eq(&a, &b));

        let c = plan_for::<Planned>(CallPolicy::Invoke);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn plan_bakes_shape_and_mode() {
        let plan = plan_for::<Planned>(CallPolicy::Send);

        let poke = plan.get("poke").unwrap();
        assert_eq!(poke.shape, ReturnShape::Unit);
        assert_eq!(poke.mode, CallMode::Send);

        let confirm = plan.get("confirm").unwrap();
        assert_eq!(confirm.shape, ReturnShape::Ack);
        assert_eq!(confirm.mode, CallMode::Invoke);

        let ask = plan.get("ask").unwrap();
        assert!(matches!(ask.shape, ReturnShape::Response { blocking: false, .. }));
        assert_eq!(ask.mode, CallMode::Invoke);
    }
}
