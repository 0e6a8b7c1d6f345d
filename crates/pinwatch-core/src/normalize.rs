//! Field normalizer: loosely-structured node JSON → typed records.
//!
//! Nodes disagree on spelling (`agentId` vs `agent_id`) and on types
//! (`"12"` vs `12`, seconds vs milliseconds). Every field is resolved through
//! an ordered alias list: each alias is one typed, fallible attempt, and the
//! first attempt that yields a usable value wins. When all attempts fail the
//! field takes its documented default. No single bad field can abort a record.

use serde_json::{Map, Value};

use crate::model::{
    AgentRecord, BuilderRecord, ExecutionMetrics, IntentRecord, MatchRecord,
};

/// A decoded JSON object as returned by the safe call wrapper.
pub type JsonObject = Map<String, Value>;

/// Values above this are not plausible epoch seconds for the current era and
/// are treated as milliseconds (or finer) and scaled down.
pub const MILLIS_THRESHOLD: u64 = 1_000_000_000_000;

/// Per-field alias tables, first spelling tried first.
pub mod fields {
    pub const AGENT_ID: &[&str] = &["agentId", "agent_id"];
    pub const AGENT_TYPE: &[&str] = &["agentType", "agent_type"];
    pub const STATUS: &[&str] = &["status"];
    pub const BIDS_SUBMITTED: &[&str] =
        &["totalBidsSubmitted", "total_bids_submitted", "processedIntents"];
    pub const SUCCESSFUL_BIDS: &[&str] = &["successfulBids", "successful_bids"];
    pub const EARNINGS: &[&str] = &["totalEarnings", "total_earnings"];
    pub const LAST_ACTIVITY: &[&str] = &["lastActivity", "last_activity"];

    pub const BUILDER_ID: &[&str] = &["builder_id", "builderId"];
    pub const ACTIVE_SESSIONS: &[&str] = &["active_sessions", "activeSessions"];
    pub const COMPLETED_MATCHES: &[&str] = &["completed_matches", "completedMatches"];
    pub const BIDS_RECEIVED: &[&str] = &["total_bids_received", "totalBidsReceived"];

    pub const INTENT_ID: &[&str] = &["id", "intent_id", "intentId"];
    pub const INTENT_TYPE: &[&str] = &["type", "intent_type", "intentType"];
    pub const SENDER_ID: &[&str] = &["senderId", "sender_id", "sender"];
    pub const CREATED_AT: &[&str] = &["timestamp", "created_at", "createdAt"];
    pub const BROADCAST_COUNT: &[&str] = &["broadcast_count", "broadcastCount"];
    pub const BID_COUNT: &[&str] = &["bid_count", "bidCount"];

    pub const MATCH_ID: &[&str] = &["match_id", "matchId"];
    pub const MATCH_INTENT_ID: &[&str] = &["intentId", "intent_id"];
    pub const WINNING_AGENT: &[&str] = &["winningAgent", "winning_agent_id", "winner"];
    pub const WINNING_BID: &[&str] = &["winningBid", "winning_bid_amount", "bid_amount"];
    pub const TOTAL_BIDS: &[&str] = &["totalBids", "total_bids_received", "total_bids"];
    pub const ALGORITHM: &[&str] = &["algorithm", "matching_algorithm"];
    pub const MATCHED_AT: &[&str] = &["matchedAt", "matched_at", "timestamp"];

    pub const TOTAL_INTENTS: &[&str] = &["total_intents", "totalIntents"];
    pub const ACTIVE_INTENTS: &[&str] = &["active_intents", "activeIntents"];
    pub const TOTAL_BIDS_METRIC: &[&str] = &["total_bids", "totalBids"];
    pub const ACTIVE_BIDS: &[&str] = &["active_bids", "activeBids"];
    pub const SUCCESS_RATE: &[&str] = &["success_rate", "successRate"];
    pub const AVG_RESPONSE_TIME: &[&str] = &["avg_response_time_ms", "avgResponseTimeMs"];
    pub const PEERS: &[&str] = &["p2p_peers_connected", "peers_connected", "peersConnected"];
    pub const MESSAGES_SENT: &[&str] = &["network_messages_sent", "messages_sent"];
    pub const MESSAGES_RECEIVED: &[&str] = &["network_messages_received", "messages_received"];
}

// ---------------------------------------------------------------------------
// Typed attempts
// ---------------------------------------------------------------------------

/// Non-empty string, or a number rendered as text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer from a number or numeric string; fractions floor.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(float_to_count)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_count))
        }
        _ => None,
    }
}

fn float_to_count(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 0.0 {
        Some(f.floor() as u64)
    } else {
        None
    }
}

fn as_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Decimal amount as text; numbers are rendered, strings must parse.
fn as_decimal(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|_| s.to_string())
        }
        _ => None,
    }
}

fn resolve<T>(obj: &JsonObject, aliases: &[&str], attempt: fn(&Value) -> Option<T>) -> Option<T> {
    aliases
        .iter()
        .find_map(|key| obj.get(*key).and_then(attempt))
}

// ---------------------------------------------------------------------------
// Field accessors
// ---------------------------------------------------------------------------

/// Text field, or `default`.
pub fn text(obj: &JsonObject, aliases: &[&str], default: &str) -> String {
    resolve(obj, aliases, as_text).unwrap_or_else(|| default.to_string())
}

/// Non-negative integer field, or 0.
pub fn count(obj: &JsonObject, aliases: &[&str]) -> u64 {
    count_or(obj, aliases, 0)
}

/// Non-negative integer field, or `default`.
pub fn count_or(obj: &JsonObject, aliases: &[&str], default: u64) -> u64 {
    resolve(obj, aliases, as_count).unwrap_or(default)
}

/// Decimal-as-string field, or `default`.
pub fn decimal(obj: &JsonObject, aliases: &[&str], default: &str) -> String {
    resolve(obj, aliases, as_decimal).unwrap_or_else(|| default.to_string())
}

/// Ratio field clamped to `[0, 1]`, or 0.
pub fn ratio(obj: &JsonObject, aliases: &[&str]) -> f64 {
    resolve(obj, aliases, as_float)
        .map(|f| f.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Timestamp field in epoch seconds, or 0.
pub fn timestamp(obj: &JsonObject, aliases: &[&str]) -> u64 {
    normalize_timestamp(count(obj, aliases))
}

/// Scale an epoch timestamp down to seconds.
///
/// Anything above [`MILLIS_THRESHOLD`] is divided by 1000 until it is not,
/// so millisecond (and finer) input lands in seconds and the result is a
/// fixed point: `normalize_timestamp(normalize_timestamp(t)) == normalize_timestamp(t)`.
pub fn normalize_timestamp(t: u64) -> u64 {
    let mut t = t;
    while t > MILLIS_THRESHOLD {
        t /= 1000;
    }
    t
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn agent_record(obj: &JsonObject) -> AgentRecord {
    use fields::*;
    AgentRecord {
        agent_id: text(obj, AGENT_ID, "unknown"),
        agent_type: text(obj, AGENT_TYPE, "unknown"),
        status: text(obj, STATUS, "unknown"),
        bids_submitted: count(obj, BIDS_SUBMITTED),
        successful_bids: count(obj, SUCCESSFUL_BIDS),
        earnings: decimal(obj, EARNINGS, "0.0"),
        last_activity_at: timestamp(obj, LAST_ACTIVITY),
        is_synthetic: false,
    }
}

pub fn builder_record(obj: &JsonObject) -> BuilderRecord {
    use fields::*;
    BuilderRecord {
        builder_id: text(obj, BUILDER_ID, "unknown"),
        status: text(obj, STATUS, "unknown"),
        active_sessions: count(obj, ACTIVE_SESSIONS),
        completed_matches: count(obj, COMPLETED_MATCHES),
        bids_received: count(obj, BIDS_RECEIVED),
        last_activity_at: timestamp(obj, LAST_ACTIVITY),
    }
}

pub fn intent_record(obj: &JsonObject) -> IntentRecord {
    use fields::*;
    IntentRecord {
        intent_id: text(obj, INTENT_ID, "unknown"),
        intent_type: text(obj, INTENT_TYPE, "unspecified"),
        status: text(obj, STATUS, "unknown"),
        sender_id: text(obj, SENDER_ID, "unknown"),
        created_at: timestamp(obj, CREATED_AT),
        broadcast_count: count_or(obj, BROADCAST_COUNT, 1),
        bid_count: count(obj, BID_COUNT),
        is_synthetic: false,
    }
}

pub fn match_record(obj: &JsonObject) -> MatchRecord {
    use fields::*;
    let intent_id = text(obj, MATCH_INTENT_ID, "unknown");
    let match_id = resolve(obj, MATCH_ID, as_text).unwrap_or_else(|| {
        let short: String = intent_id.chars().take(8).collect();
        format!("match_{short}")
    });
    MatchRecord {
        match_id,
        intent_id,
        winning_agent_id: text(obj, WINNING_AGENT, "unknown"),
        winning_bid_amount: decimal(obj, WINNING_BID, "0.0"),
        total_bids: count(obj, TOTAL_BIDS),
        algorithm: text(obj, ALGORITHM, "unknown"),
        matched_at: timestamp(obj, MATCHED_AT),
        status: text(obj, STATUS, "unknown"),
        is_synthetic: false,
    }
}

pub fn execution_metrics(obj: &JsonObject) -> ExecutionMetrics {
    use fields::*;
    ExecutionMetrics {
        total_intents: count(obj, TOTAL_INTENTS),
        active_intents: count(obj, ACTIVE_INTENTS),
        total_bids: count(obj, TOTAL_BIDS_METRIC),
        active_bids: count(obj, ACTIVE_BIDS),
        completed_matches: count(obj, COMPLETED_MATCHES),
        success_rate: ratio(obj, SUCCESS_RATE),
        avg_response_time_ms: count(obj, AVG_RESPONSE_TIME),
        peers_connected: count(obj, PEERS),
        messages_sent: count(obj, MESSAGES_SENT),
        messages_received: count(obj, MESSAGES_RECEIVED),
        error: None,
    }
}

/// The list under `key`, if present as an array. Non-object items are dropped.
///
/// `None` means the field is absent (or not a list), which callers treat
/// differently from an empty list.
pub fn record_list<'a>(obj: &'a JsonObject, key: &str) -> Option<Vec<&'a JsonObject>> {
    match obj.get(key) {
        Some(Value::Array(items)) => Some(items.iter().filter_map(Value::as_object).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    // -----------------------------------------------------------------------
    // Timestamp normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_seconds_pass_through() {
        assert_eq!(normalize_timestamp(1_700_000_000), 1_700_000_000);
        assert_eq!(normalize_timestamp(0), 0);
        assert_eq!(normalize_timestamp(MILLIS_THRESHOLD), MILLIS_THRESHOLD);
    }

    #[test]
    fn test_millis_scaled_to_seconds() {
        assert_eq!(normalize_timestamp(1_700_000_000_123), 1_700_000_000);
    }

    #[test]
    fn test_micros_scaled_to_seconds() {
        assert_eq!(normalize_timestamp(1_700_000_000_123_456), 1_700_000_000);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            0,
            1,
            999,
            1_700_000_000,
            MILLIS_THRESHOLD,
            MILLIS_THRESHOLD + 1,
            1_700_000_000_000,
            1_700_000_000_000_000,
            u64::MAX,
        ];
        for t in samples {
            let once = normalize_timestamp(t);
            assert_eq!(normalize_timestamp(once), once, "not idempotent for {t}");
            assert!(once <= MILLIS_THRESHOLD);
        }
    }

    // -----------------------------------------------------------------------
    // Coercion
    // -----------------------------------------------------------------------

    #[test]
    fn test_count_malformed_inputs_default_to_zero() {
        let o = obj(json!({
            "a": "not a number",
            "b": null,
            "c": true,
            "d": [],
            "e": -5,
            "f": "",
        }));
        for key in ["a", "b", "c", "d", "e", "f", "missing"] {
            assert_eq!(count(&o, &[key]), 0, "field {key}");
        }
    }

    #[test]
    fn test_count_accepts_numeric_strings_and_floats() {
        let o = obj(json!({"a": "42", "b": " 7 ", "c": 3.9, "d": "12.5"}));
        assert_eq!(count(&o, &["a"]), 42);
        assert_eq!(count(&o, &["b"]), 7);
        assert_eq!(count(&o, &["c"]), 3);
        assert_eq!(count(&o, &["d"]), 12);
    }

    #[test]
    fn test_malformed_first_alias_falls_through() {
        let o = obj(json!({"totalBidsSubmitted": "n/a", "total_bids_submitted": 9}));
        assert_eq!(count(&o, fields::BIDS_SUBMITTED), 9);
    }

    #[test]
    fn test_first_valid_alias_wins() {
        let o = obj(json!({"agentId": "camel", "agent_id": "snake"}));
        assert_eq!(text(&o, fields::AGENT_ID, "unknown"), "camel");
    }

    #[test]
    fn test_ratio_clamped() {
        let o = obj(json!({"a": 1.7, "b": -0.2, "c": "0.25", "d": "bad"}));
        assert_eq!(ratio(&o, &["a"]), 1.0);
        assert_eq!(ratio(&o, &["b"]), 0.0);
        assert_eq!(ratio(&o, &["c"]), 0.25);
        assert_eq!(ratio(&o, &["d"]), 0.0);
    }

    #[test]
    fn test_decimal_accepts_numbers_and_rejects_garbage() {
        let o = obj(json!({"a": 12.5, "b": "99.10", "c": "lots"}));
        assert_eq!(decimal(&o, &["a"], "0.0"), "12.5");
        assert_eq!(decimal(&o, &["b"], "0.0"), "99.10");
        assert_eq!(decimal(&o, &["c"], "0.0"), "0.0");
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    #[test]
    fn test_agent_record_camel_case() {
        let a = agent_record(&obj(json!({
            "agentId": "trading-agent-auto-001",
            "agentType": "trading",
            "status": "active",
            "processedIntents": "17",
            "successfulBids": 6,
            "totalEarnings": "120.50",
            "lastActivity": 1_700_000_000_000u64,
        })));
        assert_eq!(a.agent_id, "trading-agent-auto-001");
        assert_eq!(a.bids_submitted, 17);
        assert_eq!(a.successful_bids, 6);
        assert_eq!(a.earnings, "120.50");
        assert_eq!(a.last_activity_at, 1_700_000_000);
        assert!(!a.is_synthetic);
    }

    #[test]
    fn test_agent_record_empty_object_uses_defaults() {
        let a = agent_record(&JsonObject::new());
        assert_eq!(a.agent_id, "unknown");
        assert_eq!(a.agent_type, "unknown");
        assert_eq!(a.bids_submitted, 0);
        assert_eq!(a.earnings, "0.0");
    }

    #[test]
    fn test_builder_record() {
        let b = builder_record(&obj(json!({
            "builder_id": "builder-1",
            "status": "active",
            "active_sessions": 2,
            "completed_matches": "11",
            "total_bids_received": 40,
            "last_activity": "2024-01-01T00:00:00Z",
        })));
        assert_eq!(b.builder_id, "builder-1");
        assert_eq!(b.completed_matches, 11);
        assert_eq!(b.bids_received, 40);
        assert_eq!(b.last_activity_at, 0);
    }

    #[test]
    fn test_intent_record_defaults() {
        let i = intent_record(&obj(json!({"intent_id": "i-1", "sender": "pub-1"})));
        assert_eq!(i.intent_id, "i-1");
        assert_eq!(i.intent_type, "unspecified");
        assert_eq!(i.sender_id, "pub-1");
        assert_eq!(i.broadcast_count, 1);
        assert_eq!(i.bid_count, 0);
    }

    #[test]
    fn test_match_record_alias_conventions_agree() {
        let primary = match_record(&obj(json!({
            "match_id": "m-1",
            "intent_id": "intent-xyz",
            "winning_agent_id": "agent-7",
            "winning_bid_amount": "25.00",
            "total_bids_received": 4,
            "matching_algorithm": "highest_bid",
            "matched_at": 1_700_000_000,
            "status": "completed",
        })));
        let alternate = match_record(&obj(json!({
            "match_id": "m-1",
            "intentId": "intent-xyz",
            "winningAgent": "agent-7",
            "winningBid": "25.00",
            "totalBids": "4",
            "algorithm": "highest_bid",
            "matchedAt": 1_700_000_000_000u64,
            "status": "completed",
        })));
        assert_eq!(primary, alternate);
    }

    #[test]
    fn test_match_id_derived_from_intent() {
        let m = match_record(&obj(json!({"intentId": "abcdefghijkl"})));
        assert_eq!(m.match_id, "match_abcdefgh");
        let m = match_record(&JsonObject::new());
        assert_eq!(m.match_id, "match_unknown");
    }

    #[test]
    fn test_execution_metrics_mixed_types() {
        let m = execution_metrics(&obj(json!({
            "total_intents": 10,
            "active_intents": "3",
            "total_bids": "garbage",
            "active_bids": 4.0,
            "completed_matches": 2,
            "success_rate": 0.9,
            "avg_response_time_ms": 812.7,
            "p2p_peers_connected": 5,
            "network_messages_sent": 100,
            "network_messages_received": null,
        })));
        assert_eq!(m.total_intents, 10);
        assert_eq!(m.active_intents, 3);
        assert_eq!(m.total_bids, 0);
        assert_eq!(m.active_bids, 4);
        assert_eq!(m.avg_response_time_ms, 812);
        assert_eq!(m.peers_connected, 5);
        assert_eq!(m.messages_received, 0);
        assert!(m.error.is_none());
    }

    #[test]
    fn test_record_list_absent_vs_empty() {
        let o = obj(json!({"agents": [], "other": "x"}));
        assert_eq!(record_list(&o, "agents").map(|v| v.len()), Some(0));
        assert!(record_list(&o, "builders").is_none());
        assert!(record_list(&o, "other").is_none());
    }

    #[test]
    fn test_record_list_skips_non_objects() {
        let o = obj(json!({"intents": [{"id": "a"}, 3, "x", {"id": "b"}]}));
        let list = record_list(&o, "intents").unwrap();
        assert_eq!(list.len(), 2);
    }
}
