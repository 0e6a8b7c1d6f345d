//! Fetch orchestrator: one concurrent fan-out per cycle under a single
//! batch deadline.
//!
//! Every (node, capability) pair the registry allows becomes one spawned
//! task. Tasks are joined against an absolute deadline; whatever has not
//! finished by then is aborted and replaced by a timeout fallback, and a task
//! that dies is replaced by an `unknown` fallback. Assembly is keyed by
//! (capability, node id), so completion order never affects the snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::task::JoinHandle;

use crate::client::SafeCaller;
use crate::config::WatchConfig;
use crate::error::{ConfigError, FetchError};
use crate::model::{
    AgentSet, AggregatedSnapshot, BuilderSet, ExecutionMetrics, FetchMeta, IntentSet, MatchSet,
    NodeHealth, epoch_secs,
};
use crate::node_client::NodeClient;
use crate::registry::{Capability, EndpointRegistry};

/// One unit of work in a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub node_id: u32,
    pub capability: Capability,
}

impl TaskKey {
    pub fn new(node_id: u32, capability: Capability) -> Self {
        Self {
            node_id,
            capability,
        }
    }
}

/// The typed result of one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Health(NodeHealth),
    Agents(AgentSet),
    Builders(BuilderSet),
    Metrics(ExecutionMetrics),
    Intents(IntentSet),
    Matches(MatchSet),
}

impl TaskOutput {
    /// The failure this output carries, if any.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Health(h) => h.error.as_ref(),
            Self::Agents(s) => s.error.as_ref(),
            Self::Builders(s) => s.error.as_ref(),
            Self::Metrics(m) => m.error.as_ref(),
            Self::Intents(s) => s.error.as_ref(),
            Self::Matches(s) => s.error.as_ref(),
        }
    }
}

/// Issues every call of a cycle concurrently and assembles the snapshot.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    client: NodeClient,
    batch_deadline: Duration,
}

impl FetchOrchestrator {
    pub fn new(client: NodeClient, batch_deadline: Duration) -> Self {
        Self {
            client,
            batch_deadline,
        }
    }

    /// Validate `config` and wire up registry, caller and node client.
    pub fn from_config(config: &WatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        let caller = SafeCaller::new(config.call_timeout, config.connect_timeout())?;
        let client = NodeClient::new(registry, caller, config.retry, config.list_limit);
        Ok(Self::new(client, config.batch_deadline))
    }

    pub fn registry(&self) -> &EndpointRegistry {
        self.client.registry()
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    pub fn batch_deadline(&self) -> Duration {
        self.batch_deadline
    }

    /// Every task of one cycle, in node order then capability order.
    pub fn plan(&self) -> Vec<TaskKey> {
        self.registry()
            .nodes()
            .flat_map(|node| {
                node.role
                    .capabilities()
                    .iter()
                    .map(move |&cap| TaskKey::new(node.id, cap))
            })
            .collect()
    }

    /// Run one fetch cycle. Never fails and never outlives the batch deadline
    /// by more than the time needed to assemble results.
    pub async fn fetch_all(&self) -> AggregatedSnapshot {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.batch_deadline;

        let handles: Vec<_> = self
            .plan()
            .into_iter()
            .map(|key| {
                let client = self.client.clone();
                (key, tokio::spawn(async move { client.fetch(key).await }))
            })
            .collect();

        let outputs = self.join_tasks(handles, deadline).await;

        let snapshot = assemble(outputs, start.elapsed());
        let meta = &snapshot.fetch_meta;
        info!(
            "fetch cycle: {}/{} calls ok, {} error(s), {}ms",
            meta.successful_calls,
            meta.total_calls,
            meta.errors.len(),
            meta.elapsed_ms
        );
        snapshot
    }

    /// Join spawned tasks against an absolute deadline.
    ///
    /// A task still running at `deadline` is aborted and replaced by a timeout
    /// fallback; a task that panicked or was cancelled is replaced by an
    /// `unknown` fallback. Neither outcome touches the other tasks.
    pub async fn join_tasks(
        &self,
        handles: Vec<(TaskKey, JoinHandle<TaskOutput>)>,
        deadline: tokio::time::Instant,
    ) -> Vec<(TaskKey, TaskOutput)> {
        let mut outputs = Vec::with_capacity(handles.len());
        let mut expired = 0usize;
        for (key, handle) in handles {
            let abort = handle.abort_handle();
            let output = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(output)) => output,
                Ok(Err(join_err)) => {
                    warn!(
                        "node {} {}: task failed: {join_err}",
                        key.node_id, key.capability
                    );
                    self.client
                        .fallback(key, FetchError::unknown(format!("task failed: {join_err}")))
                }
                Err(_) => {
                    abort.abort();
                    expired += 1;
                    self.client.fallback(
                        key,
                        FetchError::timeout(format!(
                            "batch deadline of {}ms elapsed",
                            self.batch_deadline.as_millis()
                        )),
                    )
                }
            };
            outputs.push((key, output));
        }
        if expired > 0 {
            warn!("batch deadline elapsed with {expired} task(s) outstanding");
        }
        outputs
    }
}

/// Group task outputs into snapshot buckets and fill in the fetch metadata.
pub fn assemble(
    outputs: impl IntoIterator<Item = (TaskKey, TaskOutput)>,
    elapsed: Duration,
) -> AggregatedSnapshot {
    let mut snapshot = AggregatedSnapshot::default();
    let mut meta = FetchMeta::default();

    for (key, output) in outputs {
        meta.total_calls += 1;
        match output.error() {
            Some(err) => meta.errors.push(err.clone().with_node(key.node_id)),
            None => meta.successful_calls += 1,
        }
        let id = key.node_id;
        match output {
            TaskOutput::Health(h) => {
                snapshot.health.insert(id, h);
            }
            TaskOutput::Agents(set) => {
                snapshot.agents.insert(id, set);
            }
            TaskOutput::Builders(set) => {
                snapshot.builders.insert(id, set);
            }
            TaskOutput::Metrics(m) => {
                snapshot.metrics.insert(id, m);
            }
            TaskOutput::Intents(set) => {
                snapshot.intents.insert(id, set);
            }
            TaskOutput::Matches(set) => snapshot.matches.extend(set.records),
        }
    }

    meta.timestamp = epoch_secs();
    meta.elapsed_ms = elapsed.as_millis() as u64;
    snapshot.fetch_meta = meta;
    snapshot
}
