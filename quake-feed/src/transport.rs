//! Transport abstraction
//!
//! The engine only needs "GET this URL within this deadline". Keeping that
//! behind a trait lets tests script failures without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use quake_core::{NoResponseKind, RawFailure};

/// Fetches a feed document body
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Issue one GET. `Ok` carries the body of a successful response; any
    /// other outcome is reported as a raw, unclassified failure.
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, RawFailure>;
}

/// Thread-safe reference to a transport
pub type SharedTransport = Arc<dyn FeedTransport>;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Body(String),
    Fail(RawFailure),
    /// Sleep before answering with the inner reply
    Delayed(Duration, Box<ScriptedReply>),
}

/// In-memory transport that replays queued replies in order.
///
/// When the queue runs dry the fallback reply (if any) is repeated,
/// otherwise calls fail with a connection error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Mutex<Option<ScriptedReply>>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that always answers with `body`
    pub fn always(body: impl Into<String>) -> Self {
        let transport = Self::new();
        *transport.fallback.lock() = Some(ScriptedReply::Body(body.into()));
        transport
    }

    pub fn push_body(&self, body: impl Into<String>) -> &Self {
        self.replies.lock().push_back(ScriptedReply::Body(body.into()));
        self
    }

    pub fn push_failure(&self, failure: RawFailure) -> &Self {
        self.replies.lock().push_back(ScriptedReply::Fail(failure));
        self
    }

    pub fn push_reply(&self, reply: ScriptedReply) -> &Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Number of GETs issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs requested, in call order
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<String, RawFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());

        let next = self.replies.lock().pop_front();
        let mut reply = match next.or_else(|| self.fallback.lock().clone()) {
            Some(reply) => reply,
            None => {
                return Err(RawFailure::NoResponse {
                    kind: NoResponseKind::Unclassified,
                    message: "no scripted reply".to_string(),
                })
            }
        };

        loop {
            match reply {
                ScriptedReply::Body(body) => return Ok(body),
                ScriptedReply::Fail(failure) => return Err(failure),
                ScriptedReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fallback() {
        let transport = ScriptedTransport::always("fallback");
        transport
            .push_failure(RawFailure::status(503))
            .push_body("first");

        let timeout = Duration::from_secs(1);
        assert_eq!(
            transport.get("u", timeout).await,
            Err(RawFailure::status(503))
        );
        assert_eq!(transport.get("u", timeout).await.unwrap(), "first");
        assert_eq!(transport.get("u", timeout).await.unwrap(), "fallback");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let transport = ScriptedTransport::new();
        let err = transport.get("u", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RawFailure::NoResponse { .. }));
    }
}
