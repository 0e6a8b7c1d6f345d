//! Per-capability node calls: role checks, URL selection, normalization and
//! the failure policy for each kind of data.
//!
//! | Capability        | On failure / missing list                  |
//! |-------------------|--------------------------------------------|
//! | health            | `is_up = false` with the error             |
//! | agent status      | demo agents, flagged synthetic             |
//! | builder status    | empty list with the error                  |
//! | execution metrics | all-zero metrics with the error            |
//! | intent list       | demo intents, flagged synthetic            |
//! | match history     | demo matches, flagged synthetic            |

use std::sync::Arc;

use log::{debug, warn};

use crate::client::{RESPONSE_TIME_KEY, SafeCaller};
use crate::config::RetryPolicy;
use crate::error::FetchError;
use crate::fetch::{TaskKey, TaskOutput};
use crate::model::{
    AgentRecord, AgentSet, BuilderSet, ExecutionMetrics, IntentSet, MatchSet, NodeHealth,
    RecordSet, epoch_secs,
};
use crate::normalize::{self, JsonObject};
use crate::registry::{Capability, EndpointRegistry, NodeDescriptor};
use crate::synthetic;

/// Typed access to the nodes of one registry.
#[derive(Debug, Clone)]
pub struct NodeClient {
    registry: Arc<EndpointRegistry>,
    caller: SafeCaller,
    retry: RetryPolicy,
    list_limit: usize,
}

impl NodeClient {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        caller: SafeCaller,
        retry: RetryPolicy,
        list_limit: usize,
    ) -> Self {
        Self {
            registry,
            caller,
            retry,
            list_limit,
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn list_limit(&self) -> usize {
        self.list_limit
    }

    /// Run the call a task key names.
    pub async fn fetch(&self, key: TaskKey) -> TaskOutput {
        match key.capability {
            Capability::Health => TaskOutput::Health(self.health(key.node_id).await),
            Capability::AgentStatus => TaskOutput::Agents(self.agents(key.node_id).await),
            Capability::BuilderStatus => TaskOutput::Builders(self.builders(key.node_id).await),
            Capability::ExecutionMetrics => TaskOutput::Metrics(self.metrics(key.node_id).await),
            Capability::IntentList => {
                TaskOutput::Intents(self.intents(key.node_id, self.list_limit).await)
            }
            Capability::MatchHistory => {
                TaskOutput::Matches(self.matches(key.node_id, self.list_limit).await)
            }
        }
    }

    /// The output a failed call for `key` turns into.
    ///
    /// Also used by the orchestrator for tasks that missed the deadline or
    /// died, so stragglers follow the same substitution rules as live failures.
    pub fn fallback(&self, key: TaskKey, error: FetchError) -> TaskOutput {
        let error = error.with_node(key.node_id);
        let now = epoch_secs();
        match key.capability {
            Capability::Health => {
                let port = self.registry.get(key.node_id).map_or(0, |n| n.port());
                TaskOutput::Health(NodeHealth::down(key.node_id, port, now, error))
            }
            Capability::AgentStatus => TaskOutput::Agents(match self.registry.get(key.node_id) {
                Some(node) => RecordSet::synthetic(self.demo_agents(node, now), Some(error)),
                None => RecordSet::failed(error),
            }),
            Capability::BuilderStatus => TaskOutput::Builders(RecordSet::failed(error)),
            Capability::ExecutionMetrics => TaskOutput::Metrics(ExecutionMetrics::failed(error)),
            Capability::IntentList => TaskOutput::Intents(RecordSet::synthetic(
                synthetic::intents(key.node_id, self.list_limit, now, &mut rand::rng()),
                Some(error),
            )),
            Capability::MatchHistory => TaskOutput::Matches(RecordSet::synthetic(
                synthetic::matches(
                    &self.registry.expected_agent_ids(),
                    self.list_limit,
                    now,
                    &mut rand::rng(),
                ),
                Some(error),
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Probe `/health`. Any HTTP 200 with a JSON object counts as up.
    pub async fn health(&self, node_id: u32) -> NodeHealth {
        let node = match self.registry.require(node_id, Capability::Health) {
            Ok(node) => node,
            Err(e) => return NodeHealth::down(node_id, 0, epoch_secs(), e),
        };
        let url = self.first_url(node_id, Capability::Health);
        match self.call(&url).await {
            Ok(obj) => {
                let latency = normalize::count(&obj, &[RESPONSE_TIME_KEY]);
                NodeHealth::up(node_id, node.port(), latency, epoch_secs())
            }
            Err(e) => NodeHealth::down(node_id, node.port(), epoch_secs(), e.with_node(node_id)),
        }
    }

    pub async fn agents(&self, node_id: u32) -> AgentSet {
        let node = match self.registry.require(node_id, Capability::AgentStatus) {
            Ok(node) => node,
            Err(e) => return RecordSet::failed(e),
        };
        let url = self.first_url(node_id, Capability::AgentStatus);
        let obj = match self.call(&url).await {
            Ok(obj) => obj,
            Err(e) => {
                return RecordSet::synthetic(
                    self.demo_agents(node, epoch_secs()),
                    Some(e.with_node(node_id)),
                );
            }
        };
        match normalize::record_list(&obj, "agents") {
            Some(list) => RecordSet::real(list.into_iter().map(normalize::agent_record).collect()),
            None => {
                debug!("node {node_id}: no agent list in response, using demo agents");
                RecordSet::synthetic(self.demo_agents(node, epoch_secs()), None)
            }
        }
    }

    /// Builder data is authoritative or absent: never synthesized.
    pub async fn builders(&self, node_id: u32) -> BuilderSet {
        if let Err(e) = self.registry.require(node_id, Capability::BuilderStatus) {
            return RecordSet::failed(e);
        }
        let url = self.first_url(node_id, Capability::BuilderStatus);
        match self.call(&url).await {
            Ok(obj) => RecordSet::real(
                normalize::record_list(&obj, "builders")
                    .unwrap_or_default()
                    .into_iter()
                    .map(normalize::builder_record)
                    .collect(),
            ),
            Err(e) => RecordSet::failed(e.with_node(node_id)),
        }
    }

    pub async fn metrics(&self, node_id: u32) -> ExecutionMetrics {
        if let Err(e) = self.registry.require(node_id, Capability::ExecutionMetrics) {
            return ExecutionMetrics::failed(e);
        }
        let url = self.first_url(node_id, Capability::ExecutionMetrics);
        match self.call(&url).await {
            Ok(obj) => normalize::execution_metrics(&obj),
            Err(e) => ExecutionMetrics::failed(e.with_node(node_id)),
        }
    }

    /// Try each intent endpoint in turn; the first non-empty `intents` list
    /// wins. If every endpoint that answered returned an empty list, the
    /// result is real and empty rather than demo data.
    pub async fn intents(&self, node_id: u32, limit: usize) -> IntentSet {
        let node = match self.registry.require(node_id, Capability::IntentList) {
            Ok(node) => node,
            Err(e) => return RecordSet::failed(e),
        };
        let mut last_error = None;
        let mut answered_empty = false;
        for url in self.registry.urls(node, Capability::IntentList, limit) {
            match self.call(&url).await {
                Ok(obj) => match normalize::record_list(&obj, "intents") {
                    Some(list) if !list.is_empty() => {
                        return RecordSet::real(
                            list.into_iter().map(normalize::intent_record).collect(),
                        );
                    }
                    Some(_) => answered_empty = true,
                    None => debug!("node {node_id}: {url} returned no intent list"),
                },
                Err(e) => last_error = Some(e.with_node(node_id)),
            }
        }
        // An empty list from a live endpoint is real data.
        if answered_empty {
            return RecordSet::real(Vec::new());
        }
        RecordSet::synthetic(
            synthetic::intents(node_id, limit, epoch_secs(), &mut rand::rng()),
            last_error,
        )
    }

    pub async fn matches(&self, node_id: u32, limit: usize) -> MatchSet {
        if let Err(e) = self.registry.require(node_id, Capability::MatchHistory) {
            return RecordSet::failed(e);
        }
        let url = self.first_url_with_limit(node_id, Capability::MatchHistory, limit);
        let error = match self.call(&url).await {
            Ok(obj) => match normalize::record_list(&obj, "matches") {
                Some(list) => {
                    return RecordSet::real(list.into_iter().map(normalize::match_record).collect());
                }
                None => {
                    debug!("node {node_id}: no match list in response, using demo matches");
                    None
                }
            },
            Err(e) => Some(e.with_node(node_id)),
        };
        RecordSet::synthetic(
            synthetic::matches(
                &self.registry.expected_agent_ids(),
                limit,
                epoch_secs(),
                &mut rand::rng(),
            ),
            error,
        )
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn demo_agents(&self, node: &NodeDescriptor, now: u64) -> Vec<AgentRecord> {
        let ordinal = self
            .registry
            .agent_ordinal(node.id)
            .unwrap_or(node.id as usize);
        synthetic::agents(node, ordinal, now, &mut rand::rng())
    }

    fn first_url(&self, node_id: u32, capability: Capability) -> String {
        self.first_url_with_limit(node_id, capability, self.list_limit)
    }

    fn first_url_with_limit(&self, node_id: u32, capability: Capability, limit: usize) -> String {
        self.registry
            .get(node_id)
            .and_then(|node| self.registry.urls(node, capability, limit).into_iter().next())
            .unwrap_or_default()
    }

    /// One call through the safe wrapper, retrying transient failures per policy.
    async fn call(&self, url: &str) -> Result<JsonObject, FetchError> {
        let mut attempt = 0;
        loop {
            match self.caller.get(url, None).await {
                Err(e) if e.kind.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "{url}: {} (retry {attempt}/{})",
                        e.kind, self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    warn!("{url}: {}", e);
                    return Err(e);
                }
                Ok(obj) => return Ok(obj),
            }
        }
    }
}
