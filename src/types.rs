//! Core data types for the management facade
//!
//! Wire field names are pinned with serde renames for bit-exact
//! interoperability with the deployed router management API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments and keyword arguments of a call reply or push event
///
/// Both remote call results and topic events arrive in this shape.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    /// Positional arguments
    pub args: Vec<Value>,

    /// Keyword arguments
    pub kwargs: Map<String, Value>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set a keyword argument
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Get the positional argument at `idx` as a list, if it is one
    pub fn arg_list(&self, idx: usize) -> Option<&Vec<Value>> {
        self.args.get(idx).and_then(Value::as_array)
    }

    /// Get a keyword argument as an unsigned integer, if present and numeric
    ///
    /// Tolerates floats on the wire (some serializers send counts as f64).
    pub fn kwarg_u64(&self, key: &str) -> Option<u64> {
        let v = self.kwargs.get(key)?;
        v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))
    }
}

/// Immutable snapshot of one connected session within a realm
///
/// Identity is `session_id` within a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Router-assigned session identifier
    #[serde(rename = "sessionID", default)]
    pub session_id: u64,

    /// Authentication identity
    #[serde(rename = "authid", default)]
    pub auth_id: String,

    /// Authentication role
    #[serde(rename = "authrole", default)]
    pub auth_role: String,

    /// Serializer negotiated by the session
    #[serde(default)]
    pub serializer: String,
}

/// Periodic router statistics pushed on the stats topic
///
/// Only the latest snapshot is meaningful; no history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// CPU usage, clamped to [0, 100]
    #[serde(rename = "cpu_usage")]
    pub cpu_usage_percent: f64,

    /// Resident memory in bytes
    #[serde(rename = "res_memory")]
    pub resident_memory_bytes: u64,

    /// Router uptime in seconds
    #[serde(rename = "uptime")]
    pub uptime_seconds: i64,
}

impl StatsSnapshot {
    /// Decode a snapshot from a stats event map
    ///
    /// Tolerant of absent fields (zero fallback) and of uptime arriving
    /// as a float. Returns `None` only when the value is not a map.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;

        let cpu = map
            .get("cpu_usage")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        let memory = map
            .get("res_memory")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let uptime = map
            .get("uptime")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0);

        Some(Self {
            cpu_usage_percent: cpu,
            resident_memory_bytes: memory,
            uptime_seconds: uptime,
        })
    }
}

/// One log line from a remote session, ordered by arrival
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// The log message text
    pub message: String,
}

impl LogLine {
    /// Create a log line
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Cache key for per-session log history
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey {
    /// Realm the session belongs to
    pub realm: String,

    /// Session identifier within the realm
    pub session_id: u64,
}

impl LogKey {
    /// Create a log key
    pub fn new(realm: impl Into<String>, session_id: u64) -> Self {
        Self {
            realm: realm.into(),
            session_id,
        }
    }
}

impl std::fmt::Display for LogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.realm, self.session_id)
    }
}

/// Liveness classification of a realm for display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RealmStatus {
    /// Realm has at least one connected session
    Running,
    /// Realm exists but has no sessions
    Idle,
    /// The session count query failed
    Offline,
}

impl RealmStatus {
    /// Classify from a session count query result
    pub fn classify(count: Option<u64>) -> Self {
        match count {
            Some(n) if n > 0 => Self::Running,
            Some(_) => Self::Idle,
            None => Self::Offline,
        }
    }
}

impl std::fmt::Display for RealmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::Idle => "Idle",
            Self::Offline => "Offline",
        };
        f.write_str(s)
    }
}

/// One row of the realm overview: name, session count, status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmOverview {
    /// Realm name
    pub realm: String,

    /// Connected session count (0 when the query failed)
    pub sessions: u64,

    /// Liveness classification
    pub status: RealmStatus,
}
