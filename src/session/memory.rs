//! In-memory router session for testing and single-process use
//!
//! Implements the management procedures and topic fan-out of a real router
//! entirely in memory. Tests drive it directly: seed realms and sessions,
//! publish events onto topics, inject faults, and inspect the calls and
//! unsubscribes the facade issued.

use super::{Session, Subscription, SubscriptionHandle};
use crate::error::{MgmtError, Result};
use crate::types::{Payload, SessionSummary};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

const TOPIC_CAPACITY: usize = 4096;

/// In-memory router backend
///
/// Cheap to clone; clones share state, so a test can keep a handle while
/// the facade owns the session.
#[derive(Clone, Default)]
pub struct MemoryRouter {
    inner: Arc<RouterState>,
}

#[derive(Default)]
struct RouterState {
    /// Seeded realms in insertion order, each with raw session entries
    realms: RwLock<Vec<(String, Vec<Value>)>>,

    /// Topic fan-out channels
    topics: Mutex<HashMap<String, broadcast::Sender<Payload>>>,

    /// Procedures recorded in call order
    calls: Mutex<Vec<String>>,

    /// Topics unsubscribed, in order
    unsubscribed: Mutex<Vec<String>>,

    /// Currently registered subscriptions (id → topic)
    active: Mutex<HashMap<String, String>>,

    /// Procedure suffixes forced to fail
    failing: Mutex<HashSet<String>>,

    /// Realms whose session.list call fails
    failing_realms: Mutex<HashSet<String>>,

    /// When set, the log-enable reply carries no topic field
    omit_log_topic: AtomicBool,

    /// When set, session.list answers via the `total` kwarg only
    count_via_total: AtomicBool,

    /// Server-side stats emission toggle
    stats_enabled: AtomicBool,

    /// Current server-side log emission target
    log_target: Mutex<Option<(String, u64)>>,
}

impl MemoryRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a realm with typed session summaries
    pub async fn add_realm(&self, name: impl Into<String>, sessions: Vec<SessionSummary>) {
        let entries = sessions
            .into_iter()
            .map(|s| serde_json::to_value(s).unwrap_or(Value::Null))
            .collect();
        self.inner.realms.write().await.push((name.into(), entries));
    }

    /// Inject a raw session entry (possibly malformed) into a realm
    pub async fn add_raw_session(&self, realm: &str, entry: Value) {
        let mut realms = self.inner.realms.write().await;
        if let Some((_, sessions)) = realms.iter_mut().find(|(name, _)| name == realm) {
            sessions.push(entry);
        }
    }

    /// Force every call or subscribe whose procedure/topic ends with `suffix` to fail
    pub async fn fail_procedure(&self, suffix: impl Into<String>) {
        self.inner.failing.lock().await.insert(suffix.into());
    }

    /// Force the session.list call for one realm to fail
    pub async fn fail_realm_queries(&self, realm: impl Into<String>) {
        self.inner.failing_realms.lock().await.insert(realm.into());
    }

    /// Make the log-enable reply omit its topic field
    pub fn omit_log_topic(&self, omit: bool) {
        self.inner.omit_log_topic.store(omit, Ordering::SeqCst);
    }

    /// Answer session counts via the `total` kwarg instead of a list
    pub fn count_via_total_kwarg(&self, enable: bool) {
        self.inner.count_via_total.store(enable, Ordering::SeqCst);
    }

    /// Publish a payload onto a topic (no-op when nobody is subscribed)
    pub async fn publish(&self, topic: &str, payload: Payload) {
        let topics = self.inner.topics.lock().await;
        if let Some(tx) = topics.get(topic) {
            let _ = tx.send(payload);
        }
    }

    /// Publish a plain log line onto a topic
    pub async fn publish_log(&self, topic: &str, message: &str) {
        self.publish(topic, Payload::new().with_arg(message)).await;
    }

    /// Procedures called so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().await.clone()
    }

    /// Topics unsubscribed so far, in order
    pub async fn unsubscribed(&self) -> Vec<String> {
        self.inner.unsubscribed.lock().await.clone()
    }

    /// Topics with a currently registered subscription
    pub async fn active_topics(&self) -> Vec<String> {
        self.inner.active.lock().await.values().cloned().collect()
    }

    /// Whether server-side stats emission is enabled
    pub fn stats_enabled(&self) -> bool {
        self.inner.stats_enabled.load(Ordering::SeqCst)
    }

    /// Current server-side log emission target, if any
    pub async fn log_target(&self) -> Option<(String, u64)> {
        self.inner.log_target.lock().await.clone()
    }

    fn log_topic_for(realm: &str, session_id: u64) -> String {
        format!("io.xconn.mgmt.session.log.{}.{}", realm, session_id)
    }

    async fn should_fail(&self, procedure: &str) -> bool {
        let failing = self.inner.failing.lock().await;
        failing.iter().any(|suffix| procedure.ends_with(suffix))
    }

    async fn handle_realm_list(&self) -> Result<Payload> {
        let realms = self.inner.realms.read().await;
        let names: Vec<Value> = realms
            .iter()
            .map(|(name, _)| Value::String(name.clone()))
            .collect();
        Ok(Payload::new().with_arg(Value::Array(names)))
    }

    async fn handle_session_list(&self, procedure: &str, args: &[Value]) -> Result<Payload> {
        let realm = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if self.inner.failing_realms.lock().await.contains(&realm) {
            return Err(MgmtError::Call {
                procedure: procedure.to_string(),
                reason: format!("realm '{}' unreachable", realm),
            });
        }

        let realms = self.inner.realms.read().await;
        let sessions = realms
            .iter()
            .find(|(name, _)| *name == realm)
            .map(|(_, sessions)| sessions.clone())
            .unwrap_or_default();

        if self.inner.count_via_total.load(Ordering::SeqCst) {
            return Ok(Payload::new().with_kwarg("total", sessions.len() as u64));
        }

        Ok(Payload::new().with_arg(Value::Array(sessions)))
    }

    async fn handle_log_set(&self, args: &[Value], kwargs: &Map<String, Value>) -> Result<Payload> {
        let enable = kwargs.get("enable").and_then(Value::as_bool).unwrap_or(false);

        if !enable {
            *self.inner.log_target.lock().await = None;
            return Ok(Payload::new());
        }

        let realm = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let session_id = args.get(1).and_then(Value::as_u64).unwrap_or_default();

        *self.inner.log_target.lock().await = Some((realm.clone(), session_id));

        if self.inner.omit_log_topic.load(Ordering::SeqCst) {
            return Ok(Payload::new().with_arg(serde_json::json!({})));
        }

        let topic = Self::log_topic_for(&realm, session_id);
        Ok(Payload::new().with_arg(serde_json::json!({ "topic": topic })))
    }
}

#[async_trait]
impl Session for MemoryRouter {
    async fn call(
        &self,
        procedure: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Payload> {
        self.inner.calls.lock().await.push(procedure.to_string());

        if self.should_fail(procedure).await {
            return Err(MgmtError::Call {
                procedure: procedure.to_string(),
                reason: "injected fault".to_string(),
            });
        }

        if procedure.ends_with("realm.list") {
            self.handle_realm_list().await
        } else if procedure.ends_with("session.list") {
            self.handle_session_list(procedure, &args).await
        } else if procedure.ends_with("stats.status.set") {
            let enable = kwargs.get("enable").and_then(Value::as_bool).unwrap_or(false);
            self.inner.stats_enabled.store(enable, Ordering::SeqCst);
            Ok(Payload::new())
        } else if procedure.ends_with("session.log.set") {
            self.handle_log_set(&args, &kwargs).await
        } else {
            Err(MgmtError::Call {
                procedure: procedure.to_string(),
                reason: "no such procedure".to_string(),
            })
        }
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<(SubscriptionHandle, Box<dyn Subscription>)> {
        if self.should_fail(topic).await {
            return Err(MgmtError::Subscribe {
                topic: topic.to_string(),
                reason: "injected fault".to_string(),
            });
        }

        let rx = {
            let mut topics = self.inner.topics.lock().await;
            topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
                .subscribe()
        };

        let handle = SubscriptionHandle::new(topic);
        self.inner
            .active
            .lock()
            .await
            .insert(handle.id.clone(), topic.to_string());

        Ok((handle, Box::new(MemorySubscription { rx })))
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        self.inner.active.lock().await.remove(&handle.id);
        self.inner
            .unsubscribed
            .lock()
            .await
            .push(handle.topic.clone());
        Ok(())
    }
}

/// Event stream backed by a broadcast receiver
struct MemorySubscription {
    rx: broadcast::Receiver<Payload>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Option<Payload> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscription lagged behind topic");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
