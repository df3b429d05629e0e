//! Contract metadata: method descriptors, the declared-return-type
//! vocabulary, the return-shape classifier and the call-mode policy.
//!
//! A contract is declared once with [`contract!`](crate::contract) and
//! described by a table of [`MethodDescriptor`]s. Everything here is resolved
//! when a proxy or receiver is built, never per call.

use crate::connection::InboundHandler;
use crate::proxy::ProxyCore;
use crate::types::Type;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// A statically declared remote interface. Implemented by the marker type
/// that `contract!` generates; identity is the marker's [`TypeId`].
pub trait Contract: 'static {
    const NAME: &'static str;

    /// The method table, in declaration order.
    fn methods() -> Vec<MethodDescriptor>;
}

/// Contracts with a generated client type (the outbound direction).
pub trait Callable: Contract {
    type Client;

    fn client(core: ProxyCore) -> Self::Client;
}

/// Contracts with a generated handler trait (the inbound direction).
///
/// Only acknowledged fire-and-forget methods (`async fn` with no return) are
/// part of the handler surface; other shapes are not valid inbound calls.
pub trait Bindable: Contract {
    type Handler: ?Sized + Send + Sync + 'static;

    /// One unpack-and-invoke closure per handler method.
    fn inbound(handler: Arc<Self::Handler>) -> Vec<InboundMethod>;
}

/// A handler method ready for registration with the connection.
pub struct InboundMethod {
    pub name: &'static str,
    pub params: Vec<Type>,
    pub handler: InboundHandler,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub params: Vec<ParamDescriptor>,
    pub returns: ReturnDecl,
    pub hint: Option<ModeHint>,
}

#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub ty: Type,
}

/// Declared return type of a contract method. This is the whole vocabulary;
/// a declaration outside it fails at `contract!` expansion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnDecl {
    /// `fn m(..)`: no return, caller blocks until the wire settles.
    Unit,
    /// `async fn m(..)`: bare completion.
    Completion,
    /// `async fn m(..) -> ..`: completion wrapping a payload.
    CompletionOf(PayloadDecl),
    /// `fn m(..) -> stream T`.
    Sequence(Type),
    /// `fn m(..) -> channel T`.
    Channel(Type),
    /// `fn m(..) -> T`: synchronous request/response.
    Plain(Type),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDecl {
    Value(Type),
    Sequence(Type),
    Channel(Type),
}

/// What a method's call actually does on the wire, derived once from its
/// [`ReturnDecl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Fire-and-forget, drained synchronously at the call site.
    Unit,
    /// Fire-and-forget returning the completion to await.
    Ack,
    /// Request/response; `blocking` when the contract method is synchronous.
    Response { payload: Type, blocking: bool },
    /// Server-produced pull stream; `deferred` when wrapped in a completion.
    Stream { item: Type, deferred: bool },
    /// Channel-backed stream; `deferred` when the completion is returned
    /// rather than unwrapped in place.
    Channel { item: Type, deferred: bool },
}

impl ReturnShape {
    pub fn name(&self) -> &'static str {
        match self {
            ReturnShape::Unit => "fire-and-forget",
            ReturnShape::Ack => "acknowledged",
            ReturnShape::Response { .. } => "request-response",
            ReturnShape::Stream { .. } => "server-stream",
            ReturnShape::Channel { .. } => "push-channel",
        }
    }
}

/// Classify a declared return type. Pure and total over the vocabulary.
pub fn classify(decl: &ReturnDecl) -> ReturnShape {
    match decl {
        ReturnDecl::Unit => ReturnShape::Unit,
        ReturnDecl::Completion => ReturnShape::Ack,
        ReturnDecl::CompletionOf(payload) => match payload {
            PayloadDecl::Sequence(item) => ReturnShape::Stream {
                item: *item,
                deferred: true,
            },
            PayloadDecl::Channel(item) => ReturnShape::Channel {
                item: *item,
                deferred: true,
            },
            PayloadDecl::Value(payload) => ReturnShape::Response {
                payload: *payload,
                blocking: false,
            },
        },
        ReturnDecl::Sequence(item) => ReturnShape::Stream {
            item: *item,
            deferred: false,
        },
        ReturnDecl::Channel(item) => ReturnShape::Channel {
            item: *item,
            deferred: false,
        },
        ReturnDecl::Plain(payload) => ReturnShape::Response {
            payload: *payload,
            blocking: true,
        },
    }
}

/// Per-method override of the registration-wide call-mode policy. Only
/// meaningful for [`ReturnShape::Unit`] and [`ReturnShape::Ack`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeHint {
    AlwaysSend,
    AlwaysInvoke,
}

/// Registration-wide default for fire-and-forget shapes: push the call, or
/// await a server acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallPolicy {
    #[default]
    Send,
    Invoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Send,
    Invoke,
}

/// Resolution order: `AlwaysSend` wins over everything, then `AlwaysInvoke`,
/// then the registration default.
pub fn resolve_mode(hint: Option<ModeHint>, policy: CallPolicy) -> CallMode {
    match hint {
        Some(ModeHint::AlwaysSend) => CallMode::Send,
        Some(ModeHint::AlwaysInvoke) => CallMode::Invoke,
        None => match policy {
            CallPolicy::Send => CallMode::Send,
            CallPolicy::Invoke => CallMode::Invoke,
        },
    }
}

/// Name-to-descriptor index for one contract, built once and shared.
///
/// Both the expression call path and the receiver binder resolve methods (and
/// their parameter names) through this; the mapping is invariant for the
/// contract's lifetime so the lookup table is cached process-wide.
pub(crate) struct MethodIndex {
    pub contract: &'static str,
    by_name: HashMap<&'static str, Arc<MethodDescriptor>>,
}

impl MethodIndex {
    pub fn get(&self, method: &str) -> Option<&Arc<MethodDescriptor>> {
        self.by_name.get(method)
    }
}

static METHOD_INDEXES: Lazy<RwLock<HashMap<TypeId, Arc<MethodIndex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub(crate) fn method_index<C: Contract>() -> Arc<MethodIndex> {
    let key = TypeId::of::<C>();
    if let Some(index) = METHOD_INDEXES.read().get(&key) {
        return index.clone();
    }
    // Built outside the lock; a racing build is fine as long as only one
    // result is ever cached and observed.
    let built = Arc::new(MethodIndex {
        contract: C::NAME,
        by_name: C::methods()
            .into_iter()
            .map(|m| (m.name, Arc::new(m)))
            .collect(),
    });
    METHOD_INDEXES
        .write()
        .entry(key)
        .or_insert(built)
        .clone()
}
