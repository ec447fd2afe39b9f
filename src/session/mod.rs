//! Transport seam — the session trait the facade is built over
//!
//! The real RPC/pub-sub transport (connection, serialization, reconnection)
//! lives outside this crate. Anything that can issue a call, register a
//! push subscription, and cancel it again can back the facade.

use crate::error::Result;
use crate::types::Payload;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod memory;

pub use memory::MemoryRouter;

/// Shared handle to an established router session
///
/// Implementations are assumed internally safe for concurrent use; the
/// facade issues calls from multiple tasks without extra serialization.
/// Request timeouts are the transport's concern.
#[async_trait]
pub trait Session: Send + Sync {
    /// Issue a synchronous remote call and wait for the reply
    async fn call(
        &self,
        procedure: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Payload>;

    /// Register a push subscription on a topic
    ///
    /// Returns a cancelable handle plus the event stream.
    async fn subscribe(&self, topic: &str)
        -> Result<(SubscriptionHandle, Box<dyn Subscription>)>;

    /// Cancel a push subscription
    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()>;
}

/// Async stream of push events from one topic subscription
#[async_trait]
pub trait Subscription: Send {
    /// Receive the next event; `None` means the stream ended
    async fn next(&mut self) -> Option<Payload>;
}

/// Opaque-cancelable handle to an active subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Unique subscription id (`sub-<uuid>`)
    pub id: String,

    /// Topic the subscription is registered on
    pub topic: String,
}

impl SubscriptionHandle {
    /// Create a handle with a fresh id for a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: format!("sub-{}", uuid::Uuid::new_v4()),
            topic: topic.into(),
        }
    }
}
