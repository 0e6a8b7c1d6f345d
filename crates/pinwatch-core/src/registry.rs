//! Static endpoint registry: node id → role, base address and display metadata.
//!
//! The registry is built once at startup and shared read-only by every fetch
//! task, so the fan-out needs no locking.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FetchError};

/// What a node does in the intent network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Originates intents.
    #[serde(alias = "PUBLISHER")]
    Publisher,
    /// Bids on intents.
    #[serde(alias = "SERVICE_AGENT")]
    ServiceAgent,
    /// Matches bids to intents.
    #[serde(alias = "BLOCK_BUILDER")]
    BlockBuilder,
}

impl NodeRole {
    /// Parse a role name; accepts snake_case, SCREAMING_SNAKE and short forms.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "publisher" | "pub" => Some(Self::Publisher),
            "service_agent" | "agent" => Some(Self::ServiceAgent),
            "block_builder" | "builder" => Some(Self::BlockBuilder),
            _ => None,
        }
    }

    /// Capabilities a node of this role serves.
    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Self::Publisher => &[Health, ExecutionMetrics, IntentList],
            Self::ServiceAgent => &[Health, AgentStatus, ExecutionMetrics, IntentList],
            Self::BlockBuilder => &[
                Health,
                BuilderStatus,
                ExecutionMetrics,
                IntentList,
                MatchHistory,
            ],
        }
    }

    pub fn supports(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publisher => write!(f, "publisher"),
            Self::ServiceAgent => write!(f, "service_agent"),
            Self::BlockBuilder => write!(f, "block_builder"),
        }
    }
}

/// One kind of data a node can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Health,
    AgentStatus,
    BuilderStatus,
    ExecutionMetrics,
    IntentList,
    MatchHistory,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Self::Health,
        Self::AgentStatus,
        Self::BuilderStatus,
        Self::ExecutionMetrics,
        Self::IntentList,
        Self::MatchHistory,
    ];

    /// Path suffixes for this capability, relative to the API prefix.
    /// Health is served at the root and ignores the prefix.
    pub fn paths(self) -> &'static [&'static str] {
        match self {
            Self::Health => &["/health"],
            Self::AgentStatus => &["/execution/agents/status"],
            Self::BuilderStatus => &["/execution/builders/status"],
            Self::ExecutionMetrics => &["/execution/metrics"],
            Self::IntentList => &["/intent/query", "/intents", "/intent/list"],
            Self::MatchHistory => &["/execution/matches/history"],
        }
    }

    pub fn takes_limit(self) -> bool {
        matches!(self, Self::IntentList | Self::MatchHistory)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Health => "health",
            Self::AgentStatus => "agent status",
            Self::BuilderStatus => "builder status",
            Self::ExecutionMetrics => "execution metrics",
            Self::IntentList => "intent list",
            Self::MatchHistory => "match history",
        };
        f.write_str(s)
    }
}

/// Presentation hints carried with a node; never used for fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Agent specialty (e.g. `trading`, `data_access`); shapes demo records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// A configured node. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: u32,
    pub role: NodeRole,
    pub address: String,
    #[serde(default)]
    pub display: DisplayMeta,
}

impl NodeDescriptor {
    pub fn new(id: u32, role: NodeRole, address: impl Into<String>) -> Self {
        Self {
            id,
            role,
            address: address.into(),
            display: DisplayMeta::default(),
        }
    }

    pub fn named(mut self, name: &str, description: &str) -> Self {
        self.display.name = name.to_string();
        self.display.description = description.to_string();
        self
    }

    pub fn with_specialty(mut self, specialty: &str) -> Self {
        self.display.specialty = Some(specialty.to_string());
        self
    }

    /// Port of the base address, or the scheme default, or 0.
    pub fn port(&self) -> u16 {
        Url::parse(&self.address)
            .ok()
            .and_then(|u| u.port_or_known_default())
            .unwrap_or(0)
    }

    /// Display name, falling back to `node-<id>`.
    pub fn label(&self) -> String {
        if self.display.name.is_empty() {
            format!("node-{}", self.id)
        } else {
            self.display.name.clone()
        }
    }
}

/// The stock four-node demo topology.
pub fn default_nodes() -> Vec<NodeDescriptor> {
    vec![
        NodeDescriptor::new(1, NodeRole::Publisher, "http://localhost:8100")
            .named("Intent Publisher", "Publishes intents and provides API services"),
        NodeDescriptor::new(2, NodeRole::ServiceAgent, "http://localhost:8101")
            .named("Service Agent 1 (Trading)", "Trading agent with automatic bidding")
            .with_specialty("trading"),
        NodeDescriptor::new(3, NodeRole::ServiceAgent, "http://localhost:8102")
            .named("Service Agent 2 (Data)", "Data agent with automatic bidding")
            .with_specialty("data_access"),
        NodeDescriptor::new(4, NodeRole::BlockBuilder, "http://localhost:8103")
            .named("Block Builder", "Intent matching coordinator"),
    ]
}

/// Validated, id-ordered set of nodes plus the shared API prefix.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    nodes: BTreeMap<u32, NodeDescriptor>,
    api_prefix: String,
}

impl EndpointRegistry {
    /// Build a registry, rejecting duplicate ids and unparseable addresses.
    pub fn new(nodes: Vec<NodeDescriptor>, api_prefix: &str) -> Result<Self, ConfigError> {
        if nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        let mut map = BTreeMap::new();
        for node in nodes {
            match Url::parse(&node.address) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => {
                    return Err(ConfigError::InvalidNode {
                        entry: node.address.clone(),
                        reason: "base address must be an http(s) URL".to_string(),
                    });
                }
            }
            let id = node.id;
            if map.insert(id, node).is_some() {
                return Err(ConfigError::DuplicateNode(id));
            }
        }
        Ok(Self {
            nodes: map,
            api_prefix: normalize_prefix(api_prefix),
        })
    }

    pub fn get(&self, id: u32) -> Option<&NodeDescriptor> {
        self.nodes.get(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.values()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.nodes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn with_role(&self, role: NodeRole) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.values().filter(move |n| n.role == role)
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Look up `id` and check it serves `capability`.
    pub fn require(&self, id: u32, capability: Capability) -> Result<&NodeDescriptor, FetchError> {
        let node = self.get(id).ok_or_else(|| FetchError::invalid_node(id))?;
        if !node.role.supports(capability) {
            return Err(FetchError::invalid_role(id, &capability.to_string()));
        }
        Ok(node)
    }

    /// Candidate URLs for `capability` on `node`, in the order they should be tried.
    pub fn urls(&self, node: &NodeDescriptor, capability: Capability, limit: usize) -> Vec<String> {
        let base = node.address.trim_end_matches('/');
        capability
            .paths()
            .iter()
            .map(|path| {
                let prefix = if capability == Capability::Health {
                    ""
                } else {
                    self.api_prefix.as_str()
                };
                if capability.takes_limit() {
                    format!("{base}{prefix}{path}?limit={limit}")
                } else {
                    format!("{base}{prefix}{path}")
                }
            })
            .collect()
    }

    /// Agent ids the service-agent nodes are expected to report.
    pub fn expected_agent_ids(&self) -> Vec<String> {
        self.with_role(NodeRole::ServiceAgent)
            .enumerate()
            .map(|(i, node)| demo_agent_id(node, i + 1))
            .collect()
    }

    /// 1-based rank of service-agent node `id` among the service-agent nodes.
    pub fn agent_ordinal(&self, id: u32) -> Option<usize> {
        self.with_role(NodeRole::ServiceAgent)
            .position(|n| n.id == id)
            .map(|i| i + 1)
    }
}

/// Deterministic agent id for demonstration records of the `ordinal`-th
/// service-agent node, e.g. `trading-agent-auto-001`.
pub fn demo_agent_id(node: &NodeDescriptor, ordinal: usize) -> String {
    let specialty = node.display.specialty.as_deref().unwrap_or("service");
    let short = specialty.split('_').next().unwrap_or(specialty);
    format!("{short}-agent-auto-{ordinal:03}")
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;

    fn registry() -> EndpointRegistry {
        EndpointRegistry::new(default_nodes(), "/pinai_intent").unwrap()
    }

    // -----------------------------------------------------------------------
    // Role tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_role_parse_variants() {
        assert_eq!(NodeRole::parse("publisher"), Some(NodeRole::Publisher));
        assert_eq!(NodeRole::parse("SERVICE_AGENT"), Some(NodeRole::ServiceAgent));
        assert_eq!(NodeRole::parse("block-builder"), Some(NodeRole::BlockBuilder));
        assert_eq!(NodeRole::parse("builder"), Some(NodeRole::BlockBuilder));
        assert_eq!(NodeRole::parse("miner"), None);
    }

    #[test]
    fn test_role_capabilities() {
        assert!(NodeRole::ServiceAgent.supports(Capability::AgentStatus));
        assert!(!NodeRole::Publisher.supports(Capability::AgentStatus));
        assert!(NodeRole::BlockBuilder.supports(Capability::MatchHistory));
        assert!(!NodeRole::ServiceAgent.supports(Capability::BuilderStatus));
        for role in [NodeRole::Publisher, NodeRole::ServiceAgent, NodeRole::BlockBuilder] {
            assert!(role.supports(Capability::Health));
            assert!(role.supports(Capability::ExecutionMetrics));
            assert!(role.supports(Capability::IntentList));
        }
    }

    #[test]
    fn test_role_deserializes_both_spellings() {
        let a: NodeRole = serde_json::from_str("\"block_builder\"").unwrap();
        let b: NodeRole = serde_json::from_str("\"BLOCK_BUILDER\"").unwrap();
        assert_eq!(a, b);
    }

    // -----------------------------------------------------------------------
    // Registry tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_default_registry_shape() {
        let reg = registry();
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.ids(), vec![1, 2, 3, 4]);
        assert_eq!(reg.with_role(NodeRole::ServiceAgent).count(), 2);
        assert_eq!(reg.with_role(NodeRole::BlockBuilder).count(), 1);
        assert_eq!(reg.get(3).unwrap().port(), 8102);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut nodes = default_nodes();
        nodes.push(NodeDescriptor::new(2, NodeRole::Publisher, "http://localhost:9000"));
        assert!(matches!(
            EndpointRegistry::new(nodes, ""),
            Err(ConfigError::DuplicateNode(2))
        ));
    }

    #[test]
    fn test_registry_rejects_bad_address() {
        let nodes = vec![NodeDescriptor::new(1, NodeRole::Publisher, "localhost:8100")];
        assert!(matches!(
            EndpointRegistry::new(nodes, ""),
            Err(ConfigError::InvalidNode { .. })
        ));
    }

    #[test]
    fn test_registry_rejects_empty() {
        assert!(matches!(
            EndpointRegistry::new(Vec::new(), ""),
            Err(ConfigError::NoNodes)
        ));
    }

    #[test]
    fn test_require_unknown_node() {
        let err = registry().require(9, Capability::Health).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::InvalidNodeId);
        assert_eq!(err.node_id, Some(9));
    }

    #[test]
    fn test_require_wrong_role() {
        let err = registry().require(1, Capability::AgentStatus).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::InvalidRoleForCapability);
    }

    // -----------------------------------------------------------------------
    // URL tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_health_url_ignores_prefix() {
        let reg = registry();
        let urls = reg.urls(reg.get(1).unwrap(), Capability::Health, 10);
        assert_eq!(urls, vec!["http://localhost:8100/health".to_string()]);
    }

    #[test]
    fn test_intent_urls_in_fallback_order() {
        let reg = registry();
        let urls = reg.urls(reg.get(2).unwrap(), Capability::IntentList, 7);
        assert_eq!(
            urls,
            vec![
                "http://localhost:8101/pinai_intent/intent/query?limit=7".to_string(),
                "http://localhost:8101/pinai_intent/intents?limit=7".to_string(),
                "http://localhost:8101/pinai_intent/intent/list?limit=7".to_string(),
            ]
        );
    }

    #[test]
    fn test_prefix_is_normalized() {
        let reg = EndpointRegistry::new(default_nodes(), "api/").unwrap();
        assert_eq!(reg.api_prefix(), "/api");
        let urls = reg.urls(reg.get(4).unwrap(), Capability::BuilderStatus, 10);
        assert_eq!(urls[0], "http://localhost:8103/api/execution/builders/status");
    }

    #[test]
    fn test_demo_agent_ids() {
        let reg = registry();
        assert_eq!(
            reg.expected_agent_ids(),
            vec![
                "trading-agent-auto-001".to_string(),
                "data-agent-auto-002".to_string()
            ]
        );
        assert_eq!(reg.agent_ordinal(2), Some(1));
        assert_eq!(reg.agent_ordinal(3), Some(2));
        assert_eq!(reg.agent_ordinal(1), None);
    }
}
