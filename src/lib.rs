//! # xtop-mgmt
//!
//! Bounded, coalesced live-telemetry bridge to a router management API.
//!
//! ## Overview
//!
//! `xtop-mgmt` turns the request/response plus publish/subscribe management
//! surface of a remote router into a stream of bounded, coalesced updates
//! suitable for a slow consumer such as a terminal renderer. It issues the
//! remote queries, keeps at most one push subscription per logical stream,
//! buffers high-frequency events with a drop-oldest policy, and guarantees
//! clean, race-free teardown.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use xtop_mgmt::{ManagementFacade, MemoryRouter, MgmtConfig};
//!
//! # async fn example() -> xtop_mgmt::Result<()> {
//! let router = MemoryRouter::new();
//! router.add_realm("realm1", vec![]).await;
//!
//! let facade = ManagementFacade::new(Arc::new(router), MgmtConfig::default());
//!
//! for row in facade.realm_overview().await? {
//!     println!("{}: {} sessions ({})", row.realm, row.sessions, row.status);
//! }
//!
//! facade
//!     .stream_session_logs("realm1", 42, |batch| {
//!         for line in batch {
//!             println!("{}", line.message);
//!         }
//!     })
//!     .await?;
//!
//! facade.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Session** trait — seam for the real RPC/pub-sub transport
//! - **RemoteGateway** — typed, lossy-tolerant wrapper over the management calls
//! - **StreamCoalescer** — bounded drop-oldest buffer with ticked batch delivery
//! - **SessionLogCache** — per-(realm, session) FIFO-bounded log history
//! - **ManagementFacade** — composes the above behind one lifecycle

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod lifecycle;
pub mod session;
pub mod types;

// Re-export core types
pub use cache::{SessionLogCache, DEFAULT_LOG_CACHE_CAP};
pub use coalesce::StreamCoalescer;
pub use config::{MgmtConfig, DEFAULT_PREFIX};
pub use error::{MgmtError, Result};
pub use facade::ManagementFacade;
pub use gateway::RemoteGateway;
pub use lifecycle::LifecycleGuard;
pub use session::{MemoryRouter, Session, Subscription, SubscriptionHandle};
pub use types::{
    LogKey, LogLine, Payload, RealmOverview, RealmStatus, SessionSummary, StatsSnapshot,
};
