//! # pinwatch-core
//!
//! **One consistent snapshot from a fleet of unreliable nodes.**
//!
//! `pinwatch-core` polls the publisher, service-agent and block-builder nodes
//! of a PIN intent network over HTTP, normalizes their loosely-shaped JSON
//! into typed records, and aggregates the result into dashboard figures with
//! cycle-over-cycle deltas.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pinwatch_core::{Monitor, WatchConfig};
//!
//! # async fn run() -> Result<(), pinwatch_core::ConfigError> {
//! let config = WatchConfig::from_env()?;
//! let mut monitor = Monitor::new(&config)?;
//!
//! let report = monitor.refresh().await;
//! println!(
//!     "{}/{} nodes active, {} intents",
//!     report.dashboard.active_node_count,
//!     monitor.registry().len(),
//!     report.dashboard.total_intents,
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Registry → Safe call → Normalizer → Orchestrator → Aggregator → Session
//!
//! - Every call failure is a [`FetchError`] value carried next to its
//!   (defaulted) record, never a panic or an early return.
//! - The orchestrator fans out one task per (node, capability) under a single
//!   batch deadline and always returns a well-formed [`AggregatedSnapshot`].
//! - Agents, intents and matches fall back to flagged demo data when a node
//!   cannot answer; builders and metrics never do.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod monitor;
pub mod node_client;
pub mod normalize;
pub mod registry;
pub mod session;
pub mod synthetic;

pub use aggregate::{CycleCounters, DashboardMetrics, MetricDeltas, aggregate};
pub use client::{RESPONSE_TIME_KEY, SafeCaller};
pub use config::{RetryPolicy, WatchConfig, parse_nodes};
pub use error::{ConfigError, FetchError, FetchErrorKind};
pub use fetch::{FetchOrchestrator, TaskKey, TaskOutput, assemble};
pub use model::{
    AgentRecord, AgentSet, AggregatedSnapshot, BuilderRecord, BuilderSet, ExecutionMetrics,
    FetchMeta, IntentRecord, IntentSet, MatchRecord, MatchSet, NodeHealth, P2pSummary, RecordSet,
    epoch_secs, system_health_score,
};
pub use monitor::{CycleReport, Monitor};
pub use node_client::NodeClient;
pub use normalize::{JsonObject, normalize_timestamp};
pub use registry::{
    Capability, DisplayMeta, EndpointRegistry, NodeDescriptor, NodeRole, default_nodes,
};
pub use session::{HistoryStore, MetricsSample, RollingHistory, SessionContext, SessionSummary};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
