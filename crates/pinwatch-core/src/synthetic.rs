//! Demonstration records substituted for unreachable agent, intent and match
//! endpoints.
//!
//! Shapes are deterministic (ids, ordering, spacing in time); magnitudes
//! (bid counts, earnings, amounts) are randomized. Every record produced here
//! has `is_synthetic = true`.

use rand::Rng;

use crate::model::{AgentRecord, IntentRecord, MatchRecord};
use crate::registry::{NodeDescriptor, demo_agent_id};

const INTENT_TYPES: [&str; 4] = ["trade", "swap", "exchange", "data_access"];
const INTENT_SPACING_SECS: u64 = 30;
const MATCH_SPACING_SECS: u64 = 60;
const FALLBACK_AGENT: &str = "demo-agent";

/// One demo agent for the `ordinal`-th service-agent node, shaped by its
/// specialty.
pub fn agents<R: Rng + ?Sized>(
    node: &NodeDescriptor,
    ordinal: usize,
    now: u64,
    rng: &mut R,
) -> Vec<AgentRecord> {
    let specialty = node
        .display
        .specialty
        .clone()
        .unwrap_or_else(|| "service".to_string());
    let (bids, wins, earnings, idle) = if specialty == "trading" {
        (10..=30, 5..=15, 50.0..200.0, 10..=120)
    } else {
        (8..=25, 4..=12, 30.0..150.0, 5..=90)
    };
    let bids_submitted: u64 = rng.random_range(bids);
    let successful_bids: u64 = rng.random_range(wins).min(bids_submitted);
    let earnings: f64 = rng.random_range(earnings);
    let idle: u64 = rng.random_range(idle);

    vec![AgentRecord {
        agent_id: demo_agent_id(node, ordinal),
        agent_type: specialty,
        status: "active".to_string(),
        bids_submitted,
        successful_bids,
        earnings: format!("{earnings:.2}"),
        last_activity_at: now.saturating_sub(idle),
        is_synthetic: true,
    }]
}

/// `limit` broadcast intents from the auto publisher, 30 s apart, newest first.
pub fn intents<R: Rng + ?Sized>(node_id: u32, limit: usize, now: u64, rng: &mut R) -> Vec<IntentRecord> {
    (0..limit)
        .map(|i| IntentRecord {
            intent_id: format!("intent_{node_id}_{:03}", i + 1),
            intent_type: INTENT_TYPES[i % INTENT_TYPES.len()].to_string(),
            status: "INTENT_STATUS_BROADCASTED".to_string(),
            sender_id: "auto-publisher".to_string(),
            created_at: now.saturating_sub(i as u64 * INTENT_SPACING_SECS),
            broadcast_count: i as u64 + 1,
            bid_count: rng.random_range(0..=3),
            is_synthetic: true,
        })
        .collect()
}

/// `limit` completed matches, 60 s apart, won in turn by `agent_ids`.
pub fn matches<R: Rng + ?Sized>(
    agent_ids: &[String],
    limit: usize,
    now: u64,
    rng: &mut R,
) -> Vec<MatchRecord> {
    (0..limit)
        .map(|i| {
            let winner = if agent_ids.is_empty() {
                FALLBACK_AGENT.to_string()
            } else {
                agent_ids[i % agent_ids.len()].clone()
            };
            let amount: f64 = rng.random_range(10.0..50.0);
            MatchRecord {
                match_id: format!("match_{:03}", i + 1),
                intent_id: format!("intent_1_{:03}", i + 10),
                winning_agent_id: winner,
                winning_bid_amount: format!("{amount:.2}"),
                total_bids: rng.random_range(2..=5),
                algorithm: "highest_bid".to_string(),
                matched_at: now.saturating_sub(i as u64 * MATCH_SPACING_SECS),
                status: "completed".to_string(),
                is_synthetic: true,
            }
        })
        .collect()
}
