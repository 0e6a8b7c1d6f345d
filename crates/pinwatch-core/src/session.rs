//! Per-display-session state: previous-cycle counters, rolling trend history
//! and refresh bookkeeping.
//!
//! A [`SessionContext`] is created when a display session starts, updated
//! exactly once per fetch cycle through [`SessionContext::record_cycle`], and
//! consumed by [`SessionContext::finish`]. Nothing here is global.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{CycleCounters, DashboardMetrics, aggregate};
use crate::model::{AgentRecord, AggregatedSnapshot, IntentRecord, MatchRecord, epoch_secs};

// ---------------------------------------------------------------------------
// Rolling history
// ---------------------------------------------------------------------------

/// Bounded FIFO: once full, each push evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory<T> {
    entries: VecDeque<T>,
    limit: usize,
}

impl<T> RollingHistory<T> {
    /// A history holding at most `limit` entries (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit.min(1024)),
            limit,
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// Push `entry`, dropping any held entry with the same key first, so the
    /// latest observation of a record wins. Returns `true` if the key was new.
    pub fn upsert_by<K, F>(&mut self, entry: T, key: F) -> bool
    where
        K: PartialEq,
        F: Fn(&T) -> K,
    {
        let k = key(&entry);
        let before = self.entries.len();
        self.entries.retain(|e| key(e) != k);
        let fresh = self.entries.len() == before;
        self.push(entry);
        fresh
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Dashboard figures stamped with the cycle that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSample {
    pub cycle: u64,
    /// Epoch seconds.
    pub timestamp: u64,
    pub metrics: DashboardMetrics,
}

/// One rolling history per category. Only real records are kept; demo data
/// would distort trends.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStore {
    pub metrics: RollingHistory<MetricsSample>,
    pub intents: RollingHistory<IntentRecord>,
    pub agents: RollingHistory<AgentRecord>,
    pub matches: RollingHistory<MatchRecord>,
}

impl HistoryStore {
    pub fn new(limit: usize) -> Self {
        Self {
            metrics: RollingHistory::new(limit),
            intents: RollingHistory::new(limit),
            agents: RollingHistory::new(limit),
            matches: RollingHistory::new(limit),
        }
    }

    fn record(&mut self, sample: MetricsSample, snapshot: &AggregatedSnapshot) {
        self.metrics.push(sample);
        for agent in snapshot.all_agents().filter(|a| !a.is_synthetic) {
            self.agents.push(agent.clone());
        }
        for intent in snapshot.all_intents().filter(|i| !i.is_synthetic) {
            self.intents.upsert_by(intent.clone(), |i| i.intent_id.clone());
        }
        for m in snapshot.matches.iter().filter(|m| !m.is_synthetic) {
            self.matches.upsert_by(m.clone(), |m| m.match_id.clone());
        }
    }

    pub fn clear(&mut self) {
        self.metrics.clear();
        self.intents.clear();
        self.agents.clear();
        self.matches.clear();
    }
}

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// Summary written when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    /// Epoch seconds.
    pub started_at: u64,
    pub duration_ms: u64,
    pub cycles: u64,
    pub consecutive_failures: u32,
}

/// State carried across fetch cycles of one display session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Uuid,
    started_at: u64,
    started: Instant,
    refresh_interval: Duration,
    previous: Option<CycleCounters>,
    history: HistoryStore,
    cycles: u64,
    consecutive_failures: u32,
    last_refresh: Option<Instant>,
    last_snapshot: Option<AggregatedSnapshot>,
    last_metrics: Option<DashboardMetrics>,
}

impl SessionContext {
    pub fn new(history_limit: usize, refresh_interval: Duration) -> Self {
        let id = Uuid::new_v4();
        debug!("session {id} started");
        Self {
            id,
            started_at: epoch_secs(),
            started: Instant::now(),
            refresh_interval,
            previous: None,
            history: HistoryStore::new(history_limit),
            cycles: 0,
            consecutive_failures: 0,
            last_refresh: None,
            last_snapshot: None,
            last_metrics: None,
        }
    }

    /// Aggregate `snapshot` against the previous cycle, then make it the
    /// previous cycle. The read and the replace happen under one `&mut`
    /// borrow, so two cycles can never interleave here.
    pub fn record_cycle(&mut self, snapshot: AggregatedSnapshot) -> DashboardMetrics {
        let metrics = aggregate(&snapshot, self.previous.as_ref());
        self.previous = Some(metrics.counters());

        self.cycles += 1;
        if snapshot.fetch_meta.total_calls > 0 && snapshot.fetch_meta.successful_calls == 0 {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }
        self.history.record(
            MetricsSample {
                cycle: self.cycles,
                timestamp: snapshot.fetch_meta.timestamp,
                metrics: metrics.clone(),
            },
            &snapshot,
        );
        self.last_refresh = Some(Instant::now());
        self.last_snapshot = Some(snapshot);
        self.last_metrics = Some(metrics.clone());
        metrics
    }

    /// True before the first cycle and once the refresh interval has passed.
    pub fn should_refresh(&self, now: Instant) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.refresh_interval,
        }
    }

    /// Time left until the next refresh is due.
    pub fn until_next_refresh(&self, now: Instant) -> Duration {
        match self.last_refresh {
            None => Duration::ZERO,
            Some(last) => self
                .refresh_interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Forget previous counters and history; the session id is kept.
    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
        self.last_snapshot = None;
        self.last_metrics = None;
        self.consecutive_failures = 0;
    }

    pub fn finish(self) -> SessionSummary {
        debug!("session {} finished after {} cycle(s)", self.id, self.cycles);
        SessionSummary {
            id: self.id.to_string(),
            started_at: self.started_at,
            duration_ms: self.started.elapsed().as_millis() as u64,
            cycles: self.cycles,
            consecutive_failures: self.consecutive_failures,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn previous(&self) -> Option<&CycleCounters> {
        self.previous.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn last_snapshot(&self) -> Option<&AggregatedSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn last_metrics(&self) -> Option<&DashboardMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }
}
