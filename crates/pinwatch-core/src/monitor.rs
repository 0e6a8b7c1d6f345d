//! One display session over one set of nodes.

use std::time::Instant;

use serde::Serialize;

use crate::aggregate::DashboardMetrics;
use crate::config::WatchConfig;
use crate::error::ConfigError;
use crate::fetch::FetchOrchestrator;
use crate::model::AggregatedSnapshot;
use crate::registry::EndpointRegistry;
use crate::session::{SessionContext, SessionSummary};

/// Everything a renderer needs after one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub snapshot: AggregatedSnapshot,
    pub dashboard: DashboardMetrics,
}

/// Orchestrator plus the session state it feeds.
///
/// `refresh` takes `&mut self`, so cycles on one monitor are strictly
/// sequential and each cycle's read-then-replace of the previous counters
/// is a single step.
#[derive(Debug)]
pub struct Monitor {
    orchestrator: FetchOrchestrator,
    session: SessionContext,
}

impl Monitor {
    pub fn new(config: &WatchConfig) -> Result<Self, ConfigError> {
        let orchestrator = FetchOrchestrator::from_config(config)?;
        let session = SessionContext::new(config.history_limit, config.refresh_interval);
        Ok(Self::from_parts(orchestrator, session))
    }

    pub fn from_parts(orchestrator: FetchOrchestrator, session: SessionContext) -> Self {
        Self {
            orchestrator,
            session,
        }
    }

    /// Run one fetch cycle and fold it into the session.
    pub async fn refresh(&mut self) -> CycleReport {
        let snapshot = self.orchestrator.fetch_all().await;
        let dashboard = self.session.record_cycle(snapshot.clone());
        CycleReport {
            cycle: self.session.cycles(),
            snapshot,
            dashboard,
        }
    }

    /// Refresh only if the session's refresh interval has elapsed.
    pub async fn refresh_if_due(&mut self, now: Instant) -> Option<CycleReport> {
        if self.session.should_refresh(now) {
            Some(self.refresh().await)
        } else {
            None
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        self.orchestrator.registry()
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn finish(self) -> SessionSummary {
        self.session.finish()
    }
}
