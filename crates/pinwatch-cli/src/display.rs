//! Terminal rendering for snapshots and dashboard figures.

use pinwatch_core::{CycleReport, EndpointRegistry, FetchError, NodeHealth, RecordSet};

/// Human label for an `INTENT_STATUS_*` value.
pub fn format_intent_status(status: &str) -> String {
    let label = match status {
        "INTENT_STATUS_UNSPECIFIED" => "Unspecified",
        "INTENT_STATUS_CREATED" => "Created",
        "INTENT_STATUS_VALIDATED" => "Validated",
        "INTENT_STATUS_BROADCASTED" => "Broadcasted",
        "INTENT_STATUS_PROCESSED" => "Processing",
        "INTENT_STATUS_MATCHED" => "Matched",
        "INTENT_STATUS_COMPLETED" => "Completed",
        "INTENT_STATUS_FAILED" => "Failed",
        "INTENT_STATUS_EXPIRED" => "Expired",
        "INTENT_STATUS_UNKNOWN" => "Unknown",
        other => return title_case(other.trim_start_matches("INTENT_STATUS_")),
    };
    label.to_string()
}

fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn status_marker(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "running" | "active" => "🟢",
        "idle" => "🟡",
        "stopped" | "error" => "🔴",
        "offline" => "⚫",
        "pending" => "🔵",
        "completed" => "✅",
        "failed" => "❌",
        _ => "❓",
    }
}

/// `42s ago`, `3m ago`, `2h ago`, `5d ago`; `Never` for a zero timestamp.
pub fn time_ago(timestamp: u64, now: u64) -> String {
    if timestamp == 0 {
        return "Never".to_string();
    }
    let diff = now.saturating_sub(timestamp);
    match diff {
        0..60 => format!("{diff}s ago"),
        60..3600 => format!("{}m ago", diff / 60),
        3600..86400 => format!("{}h ago", diff / 3600),
        _ => format!("{}d ago", diff / 86400),
    }
}

pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// `$12.50`; unparseable amounts render as `$0.00`.
pub fn format_currency(amount: &str) -> String {
    let value = amount.trim().parse::<f64>().unwrap_or(0.0);
    format!("${value:.2}")
}

pub fn format_percentage(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

/// Thousands-separated integer.
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Warning text once a node set has stayed dark for more than one cycle.
pub fn failure_streak_note(consecutive: u32) -> Option<String> {
    (consecutive > 1).then(|| format!("{consecutive} consecutive cycles with no successful calls"))
}

fn health_line(node: &NodeHealth) -> String {
    match &node.error {
        None if node.is_healthy() => format!("🟢 up     {:>5}ms", node.latency_ms),
        None => format!("🟡 slow   {:>5}ms", node.latency_ms),
        Some(e) => format!("🔴 down   {}", e.describe()),
    }
}

fn source_tag<T>(set: &RecordSet<T>) -> &'static str {
    if set.synthetic { " (demo)" } else { "" }
}

fn error_suffix(error: Option<&FetchError>) -> String {
    error.map(|e| format!("  [{}]", e.kind)).unwrap_or_default()
}

/// Full dashboard for one cycle.
pub fn render_report(registry: &EndpointRegistry, report: &CycleReport, now: u64) -> String {
    let snap = &report.snapshot;
    let d = &report.dashboard;
    let mut out = String::new();

    out.push_str(&format!(
        "Cycle {}  ({}/{} calls ok in {}ms, health score {})\n\n",
        report.cycle,
        snap.fetch_meta.successful_calls,
        snap.fetch_meta.total_calls,
        snap.fetch_meta.elapsed_ms,
        format_percentage(snap.health_score(), 0),
    ));

    out.push_str(&format!(
        "  Active nodes      {:>8}  {}\n",
        d.active_node_count,
        format_delta(d.deltas.nodes)
    ));
    out.push_str(&format!(
        "  Total intents     {:>8}  {}\n",
        format_number(d.total_intents),
        format_delta(d.deltas.intents)
    ));
    out.push_str(&format!(
        "  Active bids       {:>8}  {}\n",
        format_number(d.active_bids),
        format_delta(d.deltas.bids)
    ));
    out.push_str(&format!(
        "  Completed matches {:>8}  {}\n",
        format_number(d.completed_matches),
        format_delta(d.deltas.matches)
    ));
    out.push_str(&format!(
        "  Success rate      {:>8}\n",
        format_percentage(d.success_rate, 1)
    ));
    out.push_str(&format!(
        "  Avg response      {:>6}ms\n",
        d.avg_response_time_ms
    ));
    out.push_str(&format!("  P2P peers         {:>8}\n\n", d.peer_count));

    out.push_str("Nodes\n");
    for node in registry.nodes() {
        let health = snap
            .health
            .get(&node.id)
            .map(health_line)
            .unwrap_or_else(|| "❓ not polled".to_string());
        out.push_str(&format!(
            "  {:>2}  {:<28} {:<14} {}\n",
            node.id,
            truncate(&node.label(), 28),
            node.role.to_string(),
            health
        ));
    }

    out.push_str("\nAgents\n");
    for (node_id, set) in &snap.agents {
        for a in &set.records {
            out.push_str(&format!(
                "  {:>2}  {} {:<26} bids {:>4}  won {}  earned {}  {}{}\n",
                node_id,
                status_marker(&a.status),
                truncate(&a.agent_id, 26),
                a.bids_submitted,
                format_percentage(a.success_rate(), 0),
                format_currency(&a.earnings),
                time_ago(a.last_activity_at, now),
                source_tag(set),
            ));
        }
        if set.records.is_empty() {
            out.push_str(&format!(
                "  {:>2}  (none){}\n",
                node_id,
                error_suffix(set.error.as_ref())
            ));
        }
    }

    out.push_str("\nBuilders\n");
    for (node_id, set) in &snap.builders {
        for b in &set.records {
            out.push_str(&format!(
                "  {:>2}  {} {:<26} sessions {:>3}  matches {:>4}  bids {:>4}\n",
                node_id,
                status_marker(&b.status),
                truncate(&b.builder_id, 26),
                b.active_sessions,
                b.completed_matches,
                b.bids_received,
            ));
        }
        if set.records.is_empty() {
            out.push_str(&format!(
                "  {:>2}  (none){}\n",
                node_id,
                error_suffix(set.error.as_ref())
            ));
        }
    }

    out.push_str("\nRecent intents\n");
    for (node_id, set) in &snap.intents {
        for i in set.records.iter().take(5) {
            out.push_str(&format!(
                "  {:>2}  {:<22} {:<12} {:<12} bids {:>2}  {}{}\n",
                node_id,
                truncate(&i.intent_id, 22),
                truncate(&i.intent_type, 12),
                format_intent_status(&i.status),
                i.bid_count,
                time_ago(i.created_at, now),
                source_tag(set),
            ));
        }
    }

    out.push_str("\nRecent matches\n");
    for m in snap.matches.iter().take(8) {
        out.push_str(&format!(
            "  {:<12} {:<22} {:>9}  {} bids  {}{}\n",
            truncate(&m.match_id, 12),
            truncate(&m.winning_agent_id, 22),
            format_currency(&m.winning_bid_amount),
            m.total_bids,
            time_ago(m.matched_at, now),
            if m.is_synthetic { " (demo)" } else { "" },
        ));
    }

    if !snap.fetch_meta.errors.is_empty() {
        out.push_str(&format!("\nErrors ({})\n", snap.fetch_meta.errors.len()));
        for e in &snap.fetch_meta.errors {
            let node = e.node_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
            out.push_str(&format!("  {:>2}  {:<30} {}\n", node, e.kind.to_string(), e.describe()));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_known_and_unknown() {
        assert_eq!(format_intent_status("INTENT_STATUS_BROADCASTED"), "Broadcasted");
        assert_eq!(format_intent_status("INTENT_STATUS_PROCESSED"), "Processing");
        assert_eq!(format_intent_status("INTENT_STATUS_ON_HOLD"), "On Hold");
        assert_eq!(format_intent_status("pending"), "Pending");
    }

    #[test]
    fn test_time_ago_buckets() {
        let now = 1_700_000_000;
        assert_eq!(time_ago(0, now), "Never");
        assert_eq!(time_ago(now - 42, now), "42s ago");
        assert_eq!(time_ago(now - 180, now), "3m ago");
        assert_eq!(time_ago(now - 7200, now), "2h ago");
        assert_eq!(time_ago(now - 3 * 86400, now), "3d ago");
        assert_eq!(time_ago(now + 10, now), "0s ago");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3725), "1h 2m");
    }

    #[test]
    fn test_currency_and_percentage() {
        assert_eq!(format_currency("12.5"), "$12.50");
        assert_eq!(format_currency("garbage"), "$0.00");
        assert_eq!(format_percentage(0.756, 1), "75.6%");
        assert_eq!(format_percentage(1.0, 0), "100%");
    }

    #[test]
    fn test_format_number_and_delta() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_delta(3), "+3");
        assert_eq!(format_delta(-2), "-2");
        assert_eq!(format_delta(0), "0");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-agent-id", 10), "a-very-...");
    }

    #[test]
    fn test_render_report_marks_demo_and_errors() {
        use pinwatch_core::{
            AggregatedSnapshot, DashboardMetrics, FetchErrorKind, IntentRecord, default_nodes,
        };

        let registry = EndpointRegistry::new(default_nodes(), "/pinai_intent").unwrap();
        let err = FetchError::new(FetchErrorKind::ConnectionFailed, "refused").with_node(4);
        let mut snapshot = AggregatedSnapshot::default();
        snapshot
            .health
            .insert(1, NodeHealth::up(1, 8100, 15, 0));
        snapshot
            .builders
            .insert(4, RecordSet::failed(err.clone()));
        snapshot.intents.insert(
            1,
            RecordSet::synthetic(
                vec![IntentRecord {
                    intent_id: "intent_1_001".into(),
                    intent_type: "trade".into(),
                    status: "INTENT_STATUS_BROADCASTED".into(),
                    sender_id: "auto-publisher".into(),
                    created_at: 100,
                    broadcast_count: 1,
                    bid_count: 0,
                    is_synthetic: true,
                }],
                Some(err.clone()),
            ),
        );
        snapshot.fetch_meta.errors.push(err);
        let report = CycleReport {
            cycle: 1,
            snapshot,
            dashboard: DashboardMetrics::default(),
        };

        let text = render_report(&registry, &report, 160);
        assert!(text.contains("Cycle 1"));
        assert!(text.contains("Broadcasted"));
        assert!(text.contains("(demo)"));
        assert!(text.contains("[connection_failed]"));
        assert!(text.contains("Node is offline or unreachable"));
        assert!(text.contains("not polled"));
    }

    #[test]
    fn test_status_marker() {
        assert_eq!(status_marker("ACTIVE"), "🟢");
        assert_eq!(status_marker("whatever"), "❓");
    }

    #[test]
    fn test_failure_streak_note() {
        assert_eq!(failure_streak_note(0), None);
        assert_eq!(failure_streak_note(1), None);
        assert_eq!(
            failure_streak_note(3).as_deref(),
            Some("3 consecutive cycles with no successful calls")
        );
    }
}
