//! Call a remote duplex endpoint through a statically declared contract,
//! with no per-method marshaling code.
//!
//! Declare the contract once with [`contract!`]; the expansion produces a
//! client type whose methods pack their arguments into wire [`Value`]s and
//! forward to one of the connection's generic primitives, picked by the
//! method's return shape. The same declaration yields the handler trait and
//! unpack glue for the inbound direction, wired up by [`bind_receiver`].
//!
//! The connection itself (framing, transport, reconnection) is not this
//! crate's concern: anything implementing [`Connection`] works, and tests
//! typically use a scripted fake.
//!
//! Cancellation is ambient: wrap the synchronous start of a call in
//! [`with_cancellation`] and every wire primitive issued inside the scope
//! observes the token, including streams consumed after the scope exits.

pub mod calling;
pub mod connection;
pub mod context;
pub mod contract;
pub mod error;
mod macros;
pub mod proxy;
pub mod receiver;
pub mod streams;
pub mod types;

pub use calling::{ArgExpr, ArgumentError, CallExpr, CallParameter, EvalError, RawProxy};
pub use connection::{Connection, InboundHandler, RemoteError, Subscription, ValueStream};
pub use context::{current, with_cancellation, with_cancellation_async};
pub use contract::{
    classify, resolve_mode, Bindable, CallMode, CallPolicy, Callable, Contract, InboundMethod,
    MethodDescriptor, ModeHint, ParamDescriptor, PayloadDecl, ReturnDecl, ReturnShape,
};
pub use error::{CallError, CallResult, DisposeError, UsageError};
pub use proxy::{create_proxy, ProxyCore};
pub use receiver::{bind_receiver, ReceiverSet};
pub use streams::{ChannelReader, ServerStream};
pub use types::{Decode, Encode, Type, TypeMismatch, Typed, Value};

// Generated client and handler signatures name this future type.
pub use futures::future::BoxFuture;
