//! Expression-described calls.
//!
//! The generated client packs already-evaluated arguments directly. This
//! module is the other marshaling strategy: the caller describes the call
//! (target method plus one [`ArgExpr`] per argument) and the values are
//! recovered by a small interpreter. Constants are used as-is, field reads on
//! a captured record resolve without evaluation, and only genuinely computed
//! arguments run their thunk, with one permissive-conversion retry before the
//! call fails.
//!
//! [`RawProxy`] routes such descriptions through the same wire entry points
//! as the generated clients, re-resolving the method on every invocation. It
//! trades steady-state speed for not needing any generated type.

use crate::connection::Connection;
use crate::contract::{classify, CallPolicy, Contract, MethodDescriptor, MethodIndex, ReturnShape};
use crate::contract::method_index;
use crate::error::{CallError, CallResult, UsageError};
use crate::proxy::ProxyCore;
use crate::types::{Decode, Encode, Type, Typed, TypeMismatch, Value};
use futures::future::{self, BoxFuture};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

pub type EvalError = Box<dyn std::error::Error + Send + Sync>;

/// One argument of a described call.
pub enum ArgExpr {
    /// Literal value; used directly, never evaluated.
    Const(Value),
    /// Field read on a captured record; resolved by direct access.
    Member { base: Value, field: &'static str },
    /// Arbitrary computation, deferred until extraction.
    Computed(Box<dyn Fn() -> Result<Value, EvalError> + Send + Sync>),
}

impl ArgExpr {
    pub fn constant(value: impl Encode) -> Self {
        ArgExpr::Const(value.encode())
    }

    pub fn member(base: Value, field: &'static str) -> Self {
        ArgExpr::Member { base, field }
    }

    pub fn computed(f: impl Fn() -> Result<Value, EvalError> + Send + Sync + 'static) -> Self {
        ArgExpr::Computed(Box::new(f))
    }
}

/// A call description: target method plus ordered argument expressions.
pub struct CallExpr {
    pub(crate) method: &'static str,
    pub(crate) args: Vec<ArgExpr>,
}

impl CallExpr {
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, expr: ArgExpr) -> Self {
        self.args.push(expr);
        self
    }
}

/// A named positional argument value, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParameter {
    pub name: &'static str,
    pub value: Value,
}

/// Extraction could not produce a value for one argument; the underlying
/// evaluation failure is chained as the cause.
#[derive(Debug, Error)]
#[error("could not derive a value for argument {name:?} of {method:?}")]
pub struct ArgumentError {
    name: &'static str,
    method: &'static str,
    #[source]
    source: EvalError,
}

#[derive(Debug, Error)]
#[error("record has no field {0:?}")]
struct MissingField(&'static str);

/// Interpret the argument expressions of `call` against `method`'s parameter
/// list. Parameter names come from the cached descriptor, positionally.
pub(crate) fn extract_args(
    method: &MethodDescriptor,
    args: &[ArgExpr],
) -> CallResult<Vec<CallParameter>> {
    if args.len() != method.params.len() {
        return Err(UsageError::ArityMismatch {
            method: method.name,
            expected: method.params.len(),
            given: args.len(),
        }
        .into());
    }
    method
        .params
        .iter()
        .zip(args)
        .map(|(param, expr)| {
            let value = derive_value(expr, param.ty).map_err(|source| ArgumentError {
                name: param.name,
                method: method.name,
                source,
            })?;
            Ok(CallParameter {
                name: param.name,
                value,
            })
        })
        .collect()
}

fn derive_value(expr: &ArgExpr, declared: Type) -> Result<Value, EvalError> {
    match expr {
        ArgExpr::Const(value) => Ok(value.clone()),
        ArgExpr::Member { base, field } => match base {
            Value::Record(fields) => fields
                .get(*field)
                .cloned()
                .ok_or_else(|| MissingField(*field).into()),
            other => Err(TypeMismatch::new(other.clone(), Type::Record).into()),
        },
        ArgExpr::Computed(thunk) => {
            let strict = thunk().and_then(|value| {
                if value.wire_type() == declared {
                    Ok(value)
                } else {
                    Err(TypeMismatch::new(value, declared).into())
                }
            });
            match strict {
                Ok(value) => Ok(value),
                // One more attempt, maximally permissive; its failure is the
                // cause the caller sees.
                Err(_) => thunk().and_then(|value| {
                    value.coerce(declared).map_err(EvalError::from)
                }),
            }
        }
    }
}

/// Proxy over call descriptions. No generated type is involved: the method is
/// re-resolved through the contract's cached index on every invocation, and
/// behavior matches the generated client for identical arguments.
pub struct RawProxy<C: Contract> {
    core: ProxyCore,
    index: Arc<MethodIndex>,
    _contract: PhantomData<fn() -> C>,
}

impl<C: Contract> RawProxy<C> {
    pub fn new(conn: Arc<dyn Connection>, policy: CallPolicy) -> Self {
        Self {
            core: ProxyCore::for_contract::<C>(conn, policy),
            index: method_index::<C>(),
            _contract: PhantomData,
        }
    }

    fn resolve(&self, call: &CallExpr) -> CallResult<(Arc<MethodDescriptor>, Vec<Value>)> {
        let desc = self.index.get(call.method).cloned().ok_or_else(|| {
            CallError::from(UsageError::UnknownMethod {
                contract: self.index.contract,
                method: call.method.to_owned(),
            })
        })?;
        let params = extract_args(&desc, &call.args)?;
        Ok((desc, params.into_iter().map(|p| p.value).collect()))
    }

    fn prepare_fire(&self, call: &CallExpr) -> CallResult<(&'static str, Vec<Value>)> {
        let (desc, values) = self.resolve(call)?;
        match classify(&desc.returns) {
            ReturnShape::Unit | ReturnShape::Ack => Ok((desc.name, values)),
            other => Err(UsageError::ShapeMismatch {
                method: desc.name,
                shape: other.name(),
                requested: "fire-and-forget",
            }
            .into()),
        }
    }

    fn prepare_invoke(&self, call: &CallExpr, requested: Type) -> CallResult<(&'static str, Vec<Value>)> {
        let (desc, values) = self.resolve(call)?;
        match classify(&desc.returns) {
            ReturnShape::Response { payload, .. } => {
                if payload == requested {
                    Ok((desc.name, values))
                } else {
                    Err(UsageError::PayloadMismatch {
                        method: desc.name,
                        declared: payload,
                        requested,
                    }
                    .into())
                }
            }
            other => Err(UsageError::ShapeMismatch {
                method: desc.name,
                shape: other.name(),
                requested: "request-response",
            }
            .into()),
        }
    }

    /// Fire-and-forget; push or acknowledged per the registration policy and
    /// the method's mode hint, exactly like the generated client.
    pub fn execute(&self, call: &CallExpr) -> BoxFuture<'static, CallResult<()>> {
        match self.prepare_fire(call) {
            Ok((name, values)) => self.core.ack(name, values),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }

    /// Fire-and-forget, drained before returning.
    pub fn execute_blocking(&self, call: &CallExpr) -> CallResult<()> {
        let (name, values) = self.prepare_fire(call)?;
        self.core.fire(name, values)
    }

    /// Request/response decoding the reply to `R`.
    pub fn invoke<R: Decode + Typed + Send + 'static>(&self, call: &CallExpr) -> BoxFuture<'static, CallResult<R>> {
        match self.prepare_invoke(call, R::wire_type()) {
            Ok((name, values)) => self.core.invoke(name, values),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }

    /// Request/response, blocking until the reply settles.
    pub fn invoke_blocking<R: Decode + Typed>(&self, call: &CallExpr) -> CallResult<R> {
        let (name, values) = self.prepare_invoke(call, R::wire_type())?;
        self.core.invoke_blocking(name, values)
    }
}
