//! Typed records produced by the normalizer and collected into one snapshot.
//!
//! A record whose `error` is set holds safe defaults only (zeros, empty
//! lists). The one exception is demonstration data: records with
//! `is_synthetic = true` are locally generated stand-ins for an unreachable
//! endpoint and never mix with real records in the same [`RecordSet`].

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::FetchError;

/// Latency above which an up node is no longer considered healthy.
pub const HEALTHY_LATENCY_MS: u64 = 5_000;

/// Current wall-clock time in epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Node health
// ---------------------------------------------------------------------------

/// Result of one health probe. Superseded, never mutated, by the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeHealth {
    pub node_id: u32,
    pub is_up: bool,
    pub port: u16,
    pub latency_ms: u64,
    /// Epoch seconds.
    pub checked_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

impl NodeHealth {
    pub fn up(node_id: u32, port: u16, latency_ms: u64, checked_at: u64) -> Self {
        Self {
            node_id,
            is_up: true,
            port,
            latency_ms,
            checked_at,
            error: None,
        }
    }

    pub fn down(node_id: u32, port: u16, checked_at: u64, error: FetchError) -> Self {
        Self {
            node_id,
            is_up: false,
            port,
            latency_ms: 0,
            checked_at,
            error: Some(error),
        }
    }

    /// Counts towards the active-node total.
    pub fn is_active(&self) -> bool {
        self.is_up && self.error.is_none()
    }

    /// Active and answering within [`HEALTHY_LATENCY_MS`].
    pub fn is_healthy(&self) -> bool {
        self.is_active() && self.latency_ms < HEALTHY_LATENCY_MS
    }
}

/// Fraction of nodes that are healthy, in `[0, 1]`.
pub fn system_health_score<'a>(nodes: impl IntoIterator<Item = &'a NodeHealth>) -> f64 {
    let (healthy, total) = nodes.into_iter().fold((0usize, 0usize), |(h, t), n| {
        (h + usize::from(n.is_healthy()), t + 1)
    });
    if total == 0 {
        0.0
    } else {
        healthy as f64 / total as f64
    }
}

// ---------------------------------------------------------------------------
// Per-role records
// ---------------------------------------------------------------------------

/// Status of one service agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub agent_type: String,
    pub status: String,
    pub bids_submitted: u64,
    pub successful_bids: u64,
    /// Decimal amount kept as text to avoid float drift.
    pub earnings: String,
    /// Epoch seconds.
    pub last_activity_at: u64,
    pub is_synthetic: bool,
}

impl AgentRecord {
    /// Successful bids over submitted bids; 0 when nothing was submitted.
    pub fn success_rate(&self) -> f64 {
        if self.bids_submitted == 0 {
            0.0
        } else {
            (self.successful_bids as f64 / self.bids_submitted as f64).min(1.0)
        }
    }
}

/// Status of one block builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderRecord {
    pub builder_id: String,
    pub status: String,
    pub active_sessions: u64,
    pub completed_matches: u64,
    pub bids_received: u64,
    /// Epoch seconds.
    pub last_activity_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRecord {
    pub intent_id: String,
    pub intent_type: String,
    pub status: String,
    pub sender_id: String,
    /// Epoch seconds.
    pub created_at: u64,
    pub broadcast_count: u64,
    pub bid_count: u64,
    pub is_synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub intent_id: String,
    pub winning_agent_id: String,
    /// Decimal amount kept as text.
    pub winning_bid_amount: String,
    pub total_bids: u64,
    pub algorithm: String,
    /// Epoch seconds, normalized from millisecond input when needed.
    pub matched_at: u64,
    pub status: String,
    pub is_synthetic: bool,
}

/// Performance counters reported by one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionMetrics {
    pub total_intents: u64,
    pub active_intents: u64,
    pub total_bids: u64,
    pub active_bids: u64,
    pub completed_matches: u64,
    /// In `[0, 1]`.
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
    pub peers_connected: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

impl ExecutionMetrics {
    /// All-zero metrics carrying `error`.
    pub fn failed(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// P2P view derived from one node's metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct P2pSummary {
    pub connected_peers: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
}

impl P2pSummary {
    pub fn from_metrics(metrics: &ExecutionMetrics) -> Self {
        Self {
            connected_peers: metrics.peers_connected,
            messages_sent: metrics.messages_sent,
            messages_received: metrics.messages_received,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A list of records from one call plus how they were obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSet<T> {
    pub records: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
    /// The records are demonstration data, not what the node reported.
    pub synthetic: bool,
}

impl<T> RecordSet<T> {
    pub fn real(records: Vec<T>) -> Self {
        Self {
            records,
            error: None,
            synthetic: false,
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
            synthetic: false,
        }
    }

    pub fn synthetic(records: Vec<T>, error: Option<FetchError>) -> Self {
        Self {
            records,
            error,
            synthetic: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub type AgentSet = RecordSet<AgentRecord>;
pub type BuilderSet = RecordSet<BuilderRecord>;
pub type IntentSet = RecordSet<IntentRecord>;
pub type MatchSet = RecordSet<MatchRecord>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Bookkeeping for one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchMeta {
    /// Epoch seconds at cycle end.
    pub timestamp: u64,
    pub elapsed_ms: u64,
    pub total_calls: usize,
    pub successful_calls: usize,
    pub errors: Vec<FetchError>,
}

/// Everything one fetch cycle learned, keyed by node id.
///
/// Every bucket is always present; under total failure they hold
/// error-bearing or synthetic entries rather than being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedSnapshot {
    pub health: BTreeMap<u32, NodeHealth>,
    pub agents: BTreeMap<u32, AgentSet>,
    pub builders: BTreeMap<u32, BuilderSet>,
    pub metrics: BTreeMap<u32, ExecutionMetrics>,
    pub intents: BTreeMap<u32, IntentSet>,
    pub matches: Vec<MatchRecord>,
    pub fetch_meta: FetchMeta,
}

impl AggregatedSnapshot {
    /// All agent records across nodes, in node order.
    pub fn all_agents(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values().flat_map(|s| s.records.iter())
    }

    /// All intent records across nodes, in node order.
    pub fn all_intents(&self) -> impl Iterator<Item = &IntentRecord> {
        self.intents.values().flat_map(|s| s.records.iter())
    }

    /// P2P view from the node reporting the most peers.
    pub fn p2p_summary(&self) -> P2pSummary {
        self.metrics
            .values()
            .filter(|m| m.error.is_none())
            .max_by_key(|m| m.peers_connected)
            .map(P2pSummary::from_metrics)
            .unwrap_or_default()
    }

    pub fn health_score(&self) -> f64 {
        system_health_score(self.health.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;

    fn agent(submitted: u64, successful: u64) -> AgentRecord {
        AgentRecord {
            agent_id: "a".into(),
            agent_type: "trading".into(),
            status: "active".into(),
            bids_submitted: submitted,
            successful_bids: successful,
            earnings: "0.0".into(),
            last_activity_at: 0,
            is_synthetic: false,
        }
    }

    #[test]
    fn test_health_flags() {
        let up = NodeHealth::up(1, 8100, 40, 1_700_000_000);
        assert!(up.is_active());
        assert!(up.is_healthy());

        let slow = NodeHealth::up(1, 8100, 6_000, 1_700_000_000);
        assert!(slow.is_active());
        assert!(!slow.is_healthy());

        let down = NodeHealth::down(
            2,
            8101,
            1_700_000_000,
            FetchError::new(FetchErrorKind::ConnectionFailed, "refused"),
        );
        assert!(!down.is_active());
        assert_eq!(down.latency_ms, 0);
    }

    #[test]
    fn test_system_health_score() {
        let nodes = vec![
            NodeHealth::up(1, 1, 10, 0),
            NodeHealth::up(2, 2, 10, 0),
            NodeHealth::down(3, 3, 0, FetchError::timeout("t")),
            NodeHealth::up(4, 4, 9_000, 0),
        ];
        assert!((system_health_score(&nodes) - 0.5).abs() < f64::EPSILON);
        assert_eq!(system_health_score(Vec::<NodeHealth>::new().iter()), 0.0);
    }

    #[test]
    fn test_agent_success_rate() {
        assert_eq!(agent(0, 0).success_rate(), 0.0);
        assert!((agent(10, 4).success_rate() - 0.4).abs() < 1e-12);
        assert_eq!(agent(3, 9).success_rate(), 1.0);
    }

    #[test]
    fn test_failed_metrics_are_zeroed() {
        let m = ExecutionMetrics::failed(FetchError::timeout("t"));
        assert_eq!(m.total_intents, 0);
        assert_eq!(m.success_rate, 0.0);
        assert!(m.error.is_some());
    }

    #[test]
    fn test_record_set_constructors() {
        let failed: BuilderSet = RecordSet::failed(FetchError::timeout("t"));
        assert!(failed.is_empty());
        assert!(!failed.synthetic);

        let demo = RecordSet::synthetic(vec![agent(1, 1)], Some(FetchError::timeout("t")));
        assert_eq!(demo.len(), 1);
        assert!(demo.synthetic);
    }

    #[test]
    fn test_p2p_summary_uses_max_peer_node() {
        let mut snap = AggregatedSnapshot::default();
        snap.metrics.insert(
            1,
            ExecutionMetrics {
                peers_connected: 3,
                messages_sent: 10,
                ..Default::default()
            },
        );
        snap.metrics.insert(
            2,
            ExecutionMetrics {
                peers_connected: 5,
                messages_sent: 20,
                ..Default::default()
            },
        );
        snap.metrics.insert(3, ExecutionMetrics::failed(FetchError::timeout("t")));
        let p2p = snap.p2p_summary();
        assert_eq!(p2p.connected_peers, 5);
        assert_eq!(p2p.messages_sent, 20);
    }

    #[test]
    fn test_empty_snapshot_serializes_all_buckets() {
        let json = serde_json::to_value(AggregatedSnapshot::default()).unwrap();
        for key in ["health", "agents", "builders", "metrics", "intents", "matches", "fetch_meta"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
