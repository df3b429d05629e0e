//! Ambient cancellation context.
//!
//! A task-local slot carries the [`CancellationToken`] for the current
//! logical call. Generated proxy methods read it exactly once, when the call
//! is issued, so a token scoped around the synchronous part of a call applies
//! even if the returned future or stream is consumed later.
//!
//! The slot is task-local rather than thread-local on purpose: tasks
//! multiplexed onto one worker thread must not observe each other's tokens.

use std::future::Future;
use tokio_util::sync::CancellationToken;

tokio::task_local! {
    static CURRENT_CANCEL: CancellationToken;
}

/// The token for the current logical call, or a fresh never-cancelled token
/// when no scope is active.
pub fn current() -> CancellationToken {
    CURRENT_CANCEL
        .try_with(CancellationToken::clone)
        .unwrap_or_default()
}

/// Run `body` with `token` as the ambient cancellation token.
///
/// The previous slot value is restored on every exit path, including panics.
/// Calls issued inside `body` capture the token eagerly, so this works for
/// bodies that merely *start* a call and hand its future or stream back out.
pub fn with_cancellation<R>(token: CancellationToken, body: impl FnOnce() -> R) -> R {
    CURRENT_CANCEL.sync_scope(token, body)
}

/// Async counterpart of [`with_cancellation`]: every poll of `fut` observes
/// `token` as the ambient token.
pub async fn with_cancellation_async<F: Future>(token: CancellationToken, fut: F) -> F::Output {
    CURRENT_CANCEL.scope(token, fut).await
}
