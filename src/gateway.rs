//! Typed wrapper over the router management procedures
//!
//! Decoding is lossy-tolerant: list replies may
//! arrive as typed or heterogeneous arrays, absent optional fields fall
//! back to zero-equivalents, and a malformed session entry is skipped
//! rather than failing the whole call. Partial data beats total failure
//! for a monitoring display.

use crate::config::MgmtConfig;
use crate::error::{MgmtError, Result};
use crate::session::Session;
use crate::types::{Payload, SessionSummary};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Thin typed client for the management API
#[derive(Clone)]
pub struct RemoteGateway {
    session: Arc<dyn Session>,
    config: Arc<MgmtConfig>,
}

impl RemoteGateway {
    /// Create a gateway over a shared session handle
    pub fn new(session: Arc<dyn Session>, config: Arc<MgmtConfig>) -> Self {
        Self { session, config }
    }

    /// List the realms hosted by the router
    pub async fn realms(&self) -> Result<Vec<String>> {
        let procedure = self.config.procedure("realm.list");
        let reply = self.session.call(&procedure, vec![], Map::new()).await?;

        for arg in &reply.args {
            if let Some(items) = arg.as_array() {
                let realms: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                if !realms.is_empty() {
                    return Ok(realms);
                }
            }
        }

        Err(MgmtError::Malformed {
            procedure,
            reason: "could not find realm list in response".to_string(),
        })
    }

    /// Count the sessions connected to a realm
    ///
    /// Absent data counts as zero sessions, not as a fault. A numeric
    /// `total` kwarg overrides the list length when present.
    pub async fn sessions_count(&self, realm: &str) -> Result<u64> {
        let reply = self.session_list(realm).await?;

        let mut total = reply.arg_list(0).map(|list| list.len() as u64).unwrap_or(0);
        if let Some(t) = reply.kwarg_u64("total") {
            total = t;
        }

        Ok(total)
    }

    /// Fetch session summaries for a realm, skipping malformed entries
    pub async fn session_details(&self, realm: &str) -> Result<Vec<SessionSummary>> {
        let reply = self.session_list(realm).await?;

        let mut sessions = Vec::new();
        if let Some(entries) = reply.arg_list(0) {
            for entry in entries {
                if !entry.is_object() {
                    tracing::warn!(realm, ?entry, "Unexpected session entry type");
                    continue;
                }
                match serde_json::from_value::<SessionSummary>(entry.clone()) {
                    Ok(summary) => sessions.push(summary),
                    Err(e) => {
                        tracing::warn!(realm, error = %e, "Skipping malformed session entry");
                    }
                }
            }
        }

        Ok(sessions)
    }

    /// Toggle periodic stats emission on the stats topic
    pub async fn set_stats(&self, enable: bool) -> Result<()> {
        let procedure = self.config.procedure("stats.status.set");
        let mut kwargs = Map::new();
        kwargs.insert("enable".to_string(), Value::Bool(enable));
        self.session.call(&procedure, vec![], kwargs).await?;
        Ok(())
    }

    /// Enable server-side log emission for one session
    ///
    /// Returns the dynamically allocated topic to subscribe to.
    pub async fn enable_session_logs(&self, realm: &str, session_id: u64) -> Result<String> {
        let procedure = self.config.procedure("session.log.set");
        let args = vec![
            Value::String(realm.to_string()),
            Value::Number(session_id.into()),
        ];
        let mut kwargs = Map::new();
        kwargs.insert("enable".to_string(), Value::Bool(true));

        let reply = self.session.call(&procedure, args, kwargs).await?;

        for arg in &reply.args {
            if let Some(topic) = arg.get("topic").and_then(Value::as_str) {
                return Ok(topic.to_string());
            }
        }

        Err(MgmtError::NoTopic)
    }

    /// Disable server-side log emission
    ///
    /// Runs on teardown paths; failures are logged, never surfaced.
    pub async fn disable_session_logs(&self) {
        let procedure = self.config.procedure("session.log.set");
        let mut kwargs = Map::new();
        kwargs.insert("enable".to_string(), Value::Bool(false));

        if let Err(e) = self.session.call(&procedure, vec![], kwargs).await {
            tracing::warn!(error = %e, "Failed to disable session logs");
        }
    }

    async fn session_list(&self, realm: &str) -> Result<Payload> {
        let procedure = self.config.procedure("session.list");
        self.session
            .call(&procedure, vec![Value::String(realm.to_string())], Map::new())
            .await
    }
}
