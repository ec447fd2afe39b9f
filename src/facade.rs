//! Management facade — the single composed entry point
//!
//! Owns the lifecycle, the bounded log cache, and at most one active
//! subscription per logical stream (session logs, stats). Remote queries
//! are lifecycle-gated passthroughs to the gateway; streams run as worker
//! pairs (event pump + coalescer drain) that stop cooperatively on the
//! shared shutdown signal.
//!
//! Locking discipline: no facade lock is ever held across a sink
//! invocation, and the stream slot lock serializes teardown of a prior
//! subscription with the registration of its replacement.

use crate::cache::SessionLogCache;
use crate::coalesce::StreamCoalescer;
use crate::config::MgmtConfig;
use crate::error::{MgmtError, Result};
use crate::gateway::RemoteGateway;
use crate::lifecycle::LifecycleGuard;
use crate::session::{Session, Subscription, SubscriptionHandle};
use crate::types::{
    LogKey, LogLine, Payload, RealmOverview, RealmStatus, SessionSummary, StatsSnapshot,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Facade over one router management session
///
/// Constructed per remote session; owns all of its own state. `close()`
/// is idempotent and tears everything down race-free.
pub struct ManagementFacade {
    session: Arc<dyn Session>,
    gateway: RemoteGateway,
    config: Arc<MgmtConfig>,
    lifecycle: Arc<LifecycleGuard>,
    log_cache: Arc<SessionLogCache>,
    // Shared so close() can hand slot teardown to a detached task
    active_log: Arc<Mutex<Option<ActiveStream>>>,
    active_stats: Arc<Mutex<Option<ActiveStream>>>,
}

/// A registered push stream: its subscription handle and cancel signal
struct ActiveStream {
    handle: SubscriptionHandle,
    cancel_tx: watch::Sender<bool>,
}

impl ActiveStream {
    fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl ManagementFacade {
    /// Create a facade over a shared session handle
    pub fn new(session: Arc<dyn Session>, config: MgmtConfig) -> Self {
        let config = Arc::new(config);
        let gateway = RemoteGateway::new(Arc::clone(&session), Arc::clone(&config));
        let log_cache = Arc::new(SessionLogCache::new(config.log_cache_cap));

        Self {
            session,
            gateway,
            config,
            lifecycle: Arc::new(LifecycleGuard::new()),
            log_cache,
            active_log: Arc::new(Mutex::new(None)),
            active_stats: Arc::new(Mutex::new(None)),
        }
    }

    /// The retained log history, for replay and inspection
    pub fn log_cache(&self) -> &SessionLogCache {
        &self.log_cache
    }

    /// Whether the facade has been closed
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    /// List the realms hosted by the router
    pub async fn realms(&self) -> Result<Vec<String>> {
        self.lifecycle.check()?;
        self.gateway.realms().await
    }

    /// Count the sessions connected to a realm
    pub async fn sessions_count(&self, realm: &str) -> Result<u64> {
        self.lifecycle.check()?;
        self.gateway.sessions_count(realm).await
    }

    /// Fetch session summaries for a realm
    pub async fn session_details(&self, realm: &str) -> Result<Vec<SessionSummary>> {
        self.lifecycle.check()?;
        self.gateway.session_details(realm).await
    }

    /// Realm list with per-realm session count and status
    ///
    /// A realm whose count query fails is reported Offline with count 0;
    /// it does not fail the overview.
    pub async fn realm_overview(&self) -> Result<Vec<RealmOverview>> {
        self.lifecycle.check()?;
        let realms = self.gateway.realms().await?;

        let mut rows = Vec::with_capacity(realms.len());
        for realm in realms {
            let count = match self.gateway.sessions_count(&realm).await {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(realm = %realm, error = %e, "Session count query failed");
                    None
                }
            };
            rows.push(RealmOverview {
                realm,
                sessions: count.unwrap_or(0),
                status: RealmStatus::classify(count),
            });
        }

        Ok(rows)
    }

    /// Toggle periodic stats emission server-side
    pub async fn enable_stats(&self, enable: bool) -> Result<()> {
        self.lifecycle.check()?;
        self.gateway.set_stats(enable).await
    }

    /// Stream coalesced stats snapshots to a sink
    ///
    /// Enables stats server-side and subscribes the stats topic. Only the
    /// latest snapshot per tick reaches the sink. Long-lived for the
    /// facade lifetime; a second call supersedes the first.
    pub async fn stream_stats<F>(&self, sink: F) -> Result<()>
    where
        F: Fn(StatsSnapshot) + Send + Sync + 'static,
    {
        self.lifecycle.check()?;
        self.gateway.set_stats(true).await?;
        let topic = self.config.stats_topic();

        let mut slot = self.active_stats.lock().await;
        // Close may have won the slot lock while we were on the wire
        self.lifecycle.check()?;
        self.teardown_prior(&mut slot).await;

        let (handle, sub) = self.session.subscribe(&topic).await?;
        self.bail_if_closed(&handle).await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let coalescer = Arc::new(StreamCoalescer::new(self.config.coalesce_capacity));

        self.spawn_pump(
            sub,
            Arc::clone(&coalescer),
            cancel_rx.clone(),
            |event: &Payload, out: &mut Vec<StatsSnapshot>| {
                if let Some(stats) = event.args.first().and_then(StatsSnapshot::from_value) {
                    out.push(stats);
                }
            },
        );

        let _ = coalescer.spawn_drain(
            self.config.coalesce_interval,
            self.lifecycle.watch(),
            cancel_rx,
            move |batch: Vec<StatsSnapshot>| {
                if let Some(last) = batch.last() {
                    sink(*last);
                }
            },
        );

        *slot = Some(ActiveStream { handle, cancel_tx });
        tracing::info!(topic = %topic, "Stats stream started");
        Ok(())
    }

    /// Stream coalesced log batches for one session to a sink
    ///
    /// Enables log emission server-side, subscribes the returned topic,
    /// and replaces any prior active log stream — the prior topic is
    /// unsubscribed before the new subscribe. Returns once subscription
    /// is confirmed; delivery is asynchronous from that point. A
    /// subscribe failure leaves no active subscription.
    pub async fn stream_session_logs<F>(&self, realm: &str, session_id: u64, sink: F) -> Result<()>
    where
        F: Fn(Vec<LogLine>) + Send + Sync + 'static,
    {
        self.lifecycle.check()?;
        let topic = self.gateway.enable_session_logs(realm, session_id).await?;

        let mut slot = self.active_log.lock().await;
        // Close may have won the slot lock while we were on the wire
        self.lifecycle.check()?;
        self.teardown_prior(&mut slot).await;

        let (handle, sub) = self.session.subscribe(&topic).await?;
        if let Err(e) = self.bail_if_closed(&handle).await {
            self.gateway.disable_session_logs().await;
            return Err(e);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let coalescer = Arc::new(StreamCoalescer::new(self.config.coalesce_capacity));

        let key = LogKey::new(realm, session_id);
        let cache = Arc::clone(&self.log_cache);
        self.spawn_log_pump(sub, Arc::clone(&coalescer), cancel_rx.clone(), key, cache);

        let _ = coalescer.spawn_drain(
            self.config.coalesce_interval,
            self.lifecycle.watch(),
            cancel_rx,
            sink,
        );

        *slot = Some(ActiveStream { handle, cancel_tx });
        tracing::info!(topic = %topic, realm, session_id, "Session log stream started");
        Ok(())
    }

    /// Stop the active log stream, if any
    ///
    /// Unsubscribes and asks the router to disable log emission.
    /// Idempotent; safe when nothing is active and after close.
    pub async fn stop_session_logs(&self) -> Result<()> {
        let prev = self.active_log.lock().await.take();

        if let Some(prev) = prev {
            prev.cancel();
            if let Err(e) = self.session.unsubscribe(&prev.handle).await {
                tracing::warn!(topic = %prev.handle.topic, error = %e, "Unsubscribe failed");
            }
            self.gateway.disable_session_logs().await;
            tracing::info!(topic = %prev.handle.topic, "Session log stream stopped");
        }

        Ok(())
    }

    /// Close the facade
    ///
    /// Flips the state, fires the shutdown signal, clears the log cache,
    /// and returns. Subscription teardown runs in a detached task, so an
    /// in-flight remote call (which may hold a stream slot lock) never
    /// delays close. Idempotent and safe to call concurrently with event
    /// delivery and stream starts.
    pub async fn close(&self) {
        if !self.lifecycle.close() {
            return;
        }

        let session = Arc::clone(&self.session);
        let gateway = self.gateway.clone();
        let log_slot = Arc::clone(&self.active_log);
        let stats_slot = Arc::clone(&self.active_stats);
        tokio::spawn(async move {
            if let Some(prev) = log_slot.lock().await.take() {
                prev.cancel();
                if let Err(e) = session.unsubscribe(&prev.handle).await {
                    tracing::warn!(topic = %prev.handle.topic, error = %e, "Unsubscribe failed");
                }
                gateway.disable_session_logs().await;
            }
            if let Some(prev) = stats_slot.lock().await.take() {
                prev.cancel();
                if let Err(e) = session.unsubscribe(&prev.handle).await {
                    tracing::warn!(topic = %prev.handle.topic, error = %e, "Unsubscribe failed");
                }
            }
        });

        self.log_cache.clear().await;
        tracing::info!("Management facade closed");
    }

    /// Undo a subscribe that landed after close was requested
    ///
    /// A stream start that was already past its lifecycle checks when
    /// close flipped the state must not register anything: release the
    /// subscription and report `Closed` instead.
    async fn bail_if_closed(&self, handle: &SubscriptionHandle) -> Result<()> {
        if !self.lifecycle.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.session.unsubscribe(handle).await {
            tracing::warn!(topic = %handle.topic, error = %e, "Unsubscribe failed");
        }
        Err(MgmtError::Closed)
    }

    /// Cancel and unsubscribe the stream in `slot`, leaving it empty
    ///
    /// Caller holds the slot lock, so no new subscription can be issued
    /// while the previous one is being torn down.
    async fn teardown_prior(&self, slot: &mut Option<ActiveStream>) {
        if let Some(prev) = slot.take() {
            prev.cancel();
            if let Err(e) = self.session.unsubscribe(&prev.handle).await {
                tracing::warn!(topic = %prev.handle.topic, error = %e, "Unsubscribe failed");
            }
        }
    }

    /// Pump for the log stream: decode string args, feed cache + coalescer
    fn spawn_log_pump(
        &self,
        mut sub: Box<dyn Subscription>,
        coalescer: Arc<StreamCoalescer<LogLine>>,
        mut cancel: watch::Receiver<bool>,
        key: LogKey,
        cache: Arc<SessionLogCache>,
    ) {
        let mut shutdown = self.lifecycle.watch();
        tokio::spawn(async move {
            if *shutdown.borrow() || *cancel.borrow() {
                return;
            }
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = cancel.changed() => break,
                    event = sub.next() => {
                        let Some(event) = event else { break };
                        for arg in &event.args {
                            if let Some(message) = arg.as_str() {
                                let line = LogLine::new(message);
                                cache.append(&key, line.clone()).await;
                                coalescer.push(line).await;
                            }
                        }
                    }
                }
            }
            tracing::debug!(key = %key, "Log pump stopped");
        });
    }

    /// Generic pump: decode each event into items, feed the coalescer
    fn spawn_pump<T, D>(
        &self,
        mut sub: Box<dyn Subscription>,
        coalescer: Arc<StreamCoalescer<T>>,
        mut cancel: watch::Receiver<bool>,
        decode: D,
    ) where
        T: Send + 'static,
        D: Fn(&Payload, &mut Vec<T>) + Send + 'static,
    {
        let mut shutdown = self.lifecycle.watch();
        tokio::spawn(async move {
            if *shutdown.borrow() || *cancel.borrow() {
                return;
            }
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = cancel.changed() => break,
                    event = sub.next() => {
                        let Some(event) = event else { break };
                        let mut items = Vec::new();
                        decode(&event, &mut items);
                        for item in items {
                            coalescer.push(item).await;
                        }
                    }
                }
            }
        });
    }
}
