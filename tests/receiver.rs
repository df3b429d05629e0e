mod support;

use futures::future::{self, BoxFuture};
use std::sync::{Arc, Mutex};
use support::*;
use wirecall::{bind_receiver, CallError, CallResult, Type, UsageError, Value};

/// Records every inbound invocation it receives.
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingHandler {
    fn seen(&self) -> Vec<(&'static str, String)> {
        self.seen.lock().unwrap().clone()
    }
}

impl BarHandler for RecordingHandler {
    fn ping(&self, x: String) -> BoxFuture<'_, CallResult<()>> {
        self.seen.lock().unwrap().push(("ping", x));
        Box::pin(future::ready(Ok(())))
    }

    fn nudge(&self, x: String) -> BoxFuture<'_, CallResult<()>> {
        self.seen.lock().unwrap().push(("nudge", x));
        Box::pin(future::ready(Ok(())))
    }

    fn commit(&self, x: String) -> BoxFuture<'_, CallResult<()>> {
        self.seen.lock().unwrap().push(("commit", x));
        Box::pin(future::ready(Ok(())))
    }

    fn bump(&self, amount: i64) -> BoxFuture<'_, CallResult<()>> {
        self.seen.lock().unwrap().push(("bump", amount.to_string()));
        Box::pin(future::ready(Ok(())))
    }
}

#[test]
fn binds_only_acknowledged_methods() {
    let fake = FakeConnection::new();
    let set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();

    assert_eq!(set.len(), 4);
    for method in ["ping", "nudge", "commit", "bump"] {
        assert!(set.is_bound(method));
        assert!(fake.is_registered(method));
    }
    // Unit, request/response and streaming shapes are not inbound calls.
    for method in ["set_status", "echo", "version", "ticks", "feed"] {
        assert!(!set.is_bound(method));
        assert!(!fake.is_registered(method));
    }
}

#[test]
fn registers_the_declared_parameter_types() {
    let fake = FakeConnection::new();
    let _set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();

    assert_eq!(fake.handler_params("ping").unwrap(), vec![Type::String]);
    assert_eq!(fake.handler_params("bump").unwrap(), vec![Type::Int]);
}

#[tokio::test]
async fn inbound_call_unpacks_and_invokes_the_handler() {
    let fake = FakeConnection::new();
    let handler = Arc::new(RecordingHandler::default());
    let _set = bind_receiver::<Bar>(&*fake, handler.clone()).unwrap();

    fake.dispatch("ping", vec![Value::String("hi".to_owned())])
        .await
        .unwrap();
    fake.dispatch("bump", vec![Value::Int(3)]).await.unwrap();

    assert_eq!(
        handler.seen(),
        vec![("ping", "hi".to_owned()), ("bump", "3".to_owned())]
    );
}

#[tokio::test]
async fn inbound_call_rejects_a_mistyped_argument() {
    let fake = FakeConnection::new();
    let handler = Arc::new(RecordingHandler::default());
    let _set = bind_receiver::<Bar>(&*fake, handler.clone()).unwrap();

    let err = fake
        .dispatch("ping", vec![Value::Int(3)])
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Decode(_)));
    assert!(handler.seen().is_empty());
}

#[tokio::test]
async fn inbound_call_rejects_wrong_arity() {
    let fake = FakeConnection::new();
    let _set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();

    let err = fake.dispatch("ping", vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Usage(UsageError::ArityMismatch {
            expected: 1,
            given: 0,
            ..
        })
    ));
}

#[test]
fn dispose_releases_everything_even_when_one_close_fails() {
    let fake = FakeConnection::new();
    fake.fail_close("ping");
    let mut set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();

    set.dispose();

    let mut closed = fake.closed();
    closed.sort();
    assert_eq!(closed, vec!["bump", "commit", "nudge", "ping"]);
    for method in ["ping", "nudge", "commit", "bump"] {
        assert!(!fake.is_registered(method));
    }
}

#[test]
fn dispose_is_idempotent() {
    let fake = FakeConnection::new();
    let mut set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();

    set.dispose();
    set.dispose();
    assert_eq!(fake.closed().len(), 4);
}

#[test]
fn dropping_the_set_disposes() {
    let fake = FakeConnection::new();
    {
        let _set = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap();
    }
    assert_eq!(fake.closed().len(), 4);
}

#[test]
fn failed_registration_tears_down_the_partial_set() {
    let fake = FakeConnection::new();
    fake.refuse_register("commit");

    let err = bind_receiver::<Bar>(&*fake, Arc::new(RecordingHandler::default())).unwrap_err();
    assert!(matches!(err, CallError::Remote(_)));

    // The methods bound before the failure were released again.
    let mut closed = fake.closed();
    closed.sort();
    assert_eq!(closed, vec!["nudge", "ping"]);
}
