//! Scripted in-memory connection used by the integration tests: records
//! every wire call, serves configured replies and streams, and exposes the
//! registered inbound handlers for direct dispatch.
#![allow(dead_code)]

use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wirecall::{
    CallError, Connection, DisposeError, InboundHandler, RemoteError, Subscription, Type, Value,
    ValueStream,
};

wirecall::contract! {
    /// Exercises every return shape and both mode hints.
    pub contract Bar {
        client BarClient;
        handler BarHandler;

        fn set_status(status: String);
        async fn ping(x: String);
        #[always_send]
        async fn nudge(x: String);
        #[always_invoke]
        async fn commit(x: String);
        async fn bump(amount: i64);
        async fn echo(x: String) -> String;
        fn version() -> i64;
        fn ticks(from: i64) -> stream i64;
        async fn ticks_later(from: i64) -> stream i64;
        fn feed(room: String) -> channel i64;
        async fn feed_later(room: String) -> channel i64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Send,
    InvokeUnit,
    Invoke,
    Stream,
    Channel,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub name: String,
    pub args: Vec<Value>,
}

type HandlerMap = Arc<Mutex<HashMap<String, (Vec<Type>, InboundHandler)>>>;

#[derive(Default)]
pub struct FakeConnection {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<String, Value>>,
    streams: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<String>>,
    refused: Mutex<HashSet<String>>,
    failing_close: Mutex<HashSet<String>>,
    handlers: HandlerMap,
    closed: Arc<Mutex<Vec<String>>>,
}

impl FakeConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, value: Value) {
        self.replies.lock().unwrap().insert(method.to_owned(), value);
    }

    pub fn stream_items(&self, method: &str, items: Vec<Value>) {
        self.streams.lock().unwrap().insert(method.to_owned(), items);
    }

    /// Make send/invoke calls to `method` fail.
    pub fn fail_call(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_owned());
    }

    /// Make handler registration for `method` fail.
    pub fn refuse_register(&self, method: &str) {
        self.refused.lock().unwrap().insert(method.to_owned());
    }

    /// Make closing the subscription for `method` fail (the registration is
    /// still released).
    pub fn fail_close(&self, method: &str) {
        self.failing_close.lock().unwrap().insert(method.to_owned());
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn is_registered(&self, method: &str) -> bool {
        self.handlers.lock().unwrap().contains_key(method)
    }

    pub fn handler_params(&self, method: &str) -> Option<Vec<Type>> {
        self.handlers
            .lock()
            .unwrap()
            .get(method)
            .map(|(params, _)| params.clone())
    }

    /// Deliver an inbound call to the registered handler, as the wire layer
    /// would.
    pub async fn dispatch(&self, method: &str, args: Vec<Value>) -> Result<(), CallError> {
        let handler = {
            let handlers = self.handlers.lock().unwrap();
            let (_, handler) = handlers.get(method).expect("no handler registered");
            handler.clone()
        };
        (*handler)(args).await
    }

    fn record(&self, kind: CallKind, name: &str, args: &[Value]) {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            name: name.to_owned(),
            args: args.to_vec(),
        });
    }

    fn unit_result(&self, name: &str) -> Result<(), RemoteError> {
        if self.failing.lock().unwrap().contains(name) {
            Err(RemoteError::new(format!("{name} refused")))
        } else {
            Ok(())
        }
    }
}

impl Connection for FakeConnection {
    fn send(
        &self,
        call: &str,
        args: Vec<Value>,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.record(CallKind::Send, call, &args);
        Box::pin(future::ready(self.unit_result(call)))
    }

    fn invoke_unit(
        &self,
        call: &str,
        args: Vec<Value>,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.record(CallKind::InvokeUnit, call, &args);
        Box::pin(future::ready(self.unit_result(call)))
    }

    fn invoke(
        &self,
        call: &str,
        _payload: Type,
        args: Vec<Value>,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Value, RemoteError>> {
        self.record(CallKind::Invoke, call, &args);
        let result = if self.failing.lock().unwrap().contains(call) {
            Err(RemoteError::new(format!("{call} refused")))
        } else {
            self.replies
                .lock()
                .unwrap()
                .get(call)
                .cloned()
                .ok_or_else(|| RemoteError::new(format!("no scripted reply for {call}")))
        };
        Box::pin(future::ready(result))
    }

    fn open_stream(&self, call: &str, args: Vec<Value>, _cancel: CancellationToken) -> ValueStream {
        self.record(CallKind::Stream, call, &args);
        let items = self
            .streams
            .lock()
            .unwrap()
            .get(call)
            .cloned()
            .unwrap_or_default();
        stream::iter(items.into_iter().map(Ok)).boxed()
    }

    fn open_channel(
        &self,
        call: &str,
        args: Vec<Value>,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<mpsc::Receiver<Value>, RemoteError>> {
        self.record(CallKind::Channel, call, &args);
        let items = self
            .streams
            .lock()
            .unwrap()
            .get(call)
            .cloned()
            .unwrap_or_default();
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            tx.try_send(item).expect("scripted channel overflow");
        }
        Box::pin(future::ready(Ok(rx)))
    }

    fn register_handler(
        &self,
        name: &str,
        params: Vec<Type>,
        handler: InboundHandler,
    ) -> Result<Box<dyn Subscription>, RemoteError> {
        if self.refused.lock().unwrap().contains(name) {
            return Err(RemoteError::new(format!("registration refused for {name}")));
        }
        self.handlers
            .lock()
            .unwrap()
            .insert(name.to_owned(), (params, handler));
        Ok(Box::new(FakeSubscription {
            name: name.to_owned(),
            handlers: self.handlers.clone(),
            closed: self.closed.clone(),
            fail: self.failing_close.lock().unwrap().contains(name),
        }))
    }
}

pub struct FakeSubscription {
    name: String,
    handlers: HandlerMap,
    closed: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl Subscription for FakeSubscription {
    fn close(&mut self) -> Result<(), DisposeError> {
        self.handlers.lock().unwrap().remove(&self.name);
        self.closed.lock().unwrap().push(self.name.clone());
        if self.fail {
            Err(DisposeError::new(format!("close failed for {}", self.name)))
        } else {
            Ok(())
        }
    }
}
