// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cancellation primitives for a single request.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

/// Why a request was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// The caller went away before the result was ready.
    ClientDisconnected,
    /// A deadline set by the host expired.
    Timeout,
    /// The host is shutting down.
    ServerShutdown,
}

impl CancellationReason {
    /// Human-readable description of the reason.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ClientDisconnected => "the client disconnected",
            Self::Timeout => "the request deadline expired",
            Self::ServerShutdown => "the server is shutting down",
        }
    }
}

/// Cancellation flag shared between a request's host and its stages.
///
/// The host keeps one clone and hands another to the
/// [`RequestContext`](crate::RequestContext); stages poll
/// [`RequestContext::check_cancelled`](crate::RequestContext::check_cancelled)
/// or await [`cancelled`](Self::cancelled). Only the first reason sticks.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    reason: OnceLock<CancellationReason>,
    notify: Notify,
}

impl CancellationToken {
    /// Fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                reason: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation without a reason. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Signal cancellation and record `reason` if none was recorded yet.
    pub fn cancel_with(&self, reason: CancellationReason) {
        let _ = self.inner.reason.set(reason);
        self.cancel();
    }

    /// Returns `true` once any clone has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The first recorded reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<CancellationReason> {
        self.inner.reason.get().copied()
    }

    /// Wait until some clone is cancelled. Resolves at once if it already is.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
