//! System-wide dashboard figures and cycle-over-cycle deltas.

use serde::Serialize;

use crate::model::AggregatedSnapshot;

/// The four primary counters carried from one cycle to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleCounters {
    pub active_nodes: u64,
    pub total_intents: u64,
    pub active_bids: u64,
    pub completed_matches: u64,
}

/// Signed change of each primary counter since the previous cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricDeltas {
    pub nodes: i64,
    pub intents: i64,
    pub bids: i64,
    pub matches: i64,
}

impl MetricDeltas {
    /// `current - previous`, or all zero on the first cycle.
    pub fn between(current: &CycleCounters, previous: Option<&CycleCounters>) -> Self {
        let Some(prev) = previous else {
            return Self::default();
        };
        Self {
            nodes: signed_delta(current.active_nodes, prev.active_nodes),
            intents: signed_delta(current.total_intents, prev.total_intents),
            bids: signed_delta(current.active_bids, prev.active_bids),
            matches: signed_delta(current.completed_matches, prev.completed_matches),
        }
    }
}

/// Derived view of one snapshot, recomputed every cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub active_node_count: u64,
    pub total_intents: u64,
    pub active_bids: u64,
    pub completed_matches: u64,
    /// Mean over contributing nodes, in `[0, 1]`.
    pub success_rate: f64,
    /// Floor of the mean over contributing nodes.
    pub avg_response_time_ms: u64,
    /// Largest peer count seen; peers are a shared view, not additive.
    pub peer_count: u64,
    pub deltas: MetricDeltas,
}

impl DashboardMetrics {
    /// The counters the next cycle computes its deltas against.
    pub fn counters(&self) -> CycleCounters {
        CycleCounters {
            active_nodes: self.active_node_count,
            total_intents: self.total_intents,
            active_bids: self.active_bids,
            completed_matches: self.completed_matches,
        }
    }
}

/// Combine per-node metrics into dashboard figures.
///
/// Only error-free metrics contribute. With no contributing node every
/// figure, including the active node count, is zero.
pub fn aggregate(snapshot: &AggregatedSnapshot, previous: Option<&CycleCounters>) -> DashboardMetrics {
    let healthy: Vec<_> = snapshot
        .metrics
        .values()
        .filter(|m| m.error.is_none())
        .collect();

    let mut out = DashboardMetrics::default();
    if !healthy.is_empty() {
        let n = healthy.len() as u64;
        out.active_node_count = snapshot.health.values().filter(|h| h.is_active()).count() as u64;
        out.total_intents = healthy.iter().map(|m| m.total_intents).sum();
        out.active_bids = healthy.iter().map(|m| m.active_bids).sum();
        out.completed_matches = healthy.iter().map(|m| m.completed_matches).sum();
        out.success_rate =
            (healthy.iter().map(|m| m.success_rate).sum::<f64>() / n as f64).clamp(0.0, 1.0);
        out.avg_response_time_ms = healthy.iter().map(|m| m.avg_response_time_ms).sum::<u64>() / n;
        out.peer_count = healthy.iter().map(|m| m.peers_connected).max().unwrap_or(0);
    }
    out.deltas = MetricDeltas::between(&out.counters(), previous);
    out
}

fn signed_delta(current: u64, previous: u64) -> i64 {
    if current >= previous {
        i64::try_from(current - previous).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous - current).map_or(i64::MIN, |d| -d)
    }
}
