use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const UNRESTRICTED_IPV4: &str = "0.0.0.0/0";
pub const UNRESTRICTED_IPV6: &str = "::/0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc,
    /// Every subnet inside a VPC, looked up by VPC id.
    VpcSubnets,
    /// Specific subnets, looked up by subnet id.
    Subnets,
    FlowLogs,
    SecurityGroup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Vpc => write!(f, "vpc"),
            ResourceKind::VpcSubnets => write!(f, "subnets of vpc"),
            ResourceKind::Subnets => write!(f, "subnets"),
            ResourceKind::FlowLogs => write!(f, "flow logs for"),
            ResourceKind::SecurityGroup => write!(f, "security group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vpc {
    pub id: String,
    pub cidr_block: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subnet {
    pub id: String,
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowLog {
    pub id: String,
    pub resource_id: String,
    pub traffic_type: Option<String>,
    pub destination_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    /// `tcp`, `udp`, `icmp`, `-1` (all) or an IP protocol number.
    pub protocol: String,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub cidr_blocks: Vec<String>,
}

impl IngressRule {
    pub fn is_unrestricted(&self) -> bool {
        self.cidr_blocks
            .iter()
            .any(|c| c == UNRESTRICTED_IPV4 || c == UNRESTRICTED_IPV6)
    }

    pub fn covers_tcp_or_udp(&self) -> bool {
        matches!(self.protocol.as_str(), "tcp" | "udp" | "6" | "17" | "-1")
    }
}

impl fmt::Display for IngressRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.protocol)?;
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) if from == to => write!(f, " {}", from)?,
            (Some(from), Some(to)) => write!(f, " {}-{}", from, to)?,
            _ => {}
        }
        write!(f, " from {}", self.cidr_blocks.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub vpc_id: Option<String>,
    pub ingress: Vec<IngressRule>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "state", rename_all = "kebab-case")]
pub enum ResourceState {
    Vpc(Vpc),
    Subnets(Vec<Subnet>),
    FlowLogs(Vec<FlowLog>),
    SecurityGroup(SecurityGroup),
}

/// Point-in-time read of live provider state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub kind: ResourceKind,
    pub id: String,
    pub state: ResourceState,
}

impl Snapshot {
    /// Human-readable identification used in failure messages.
    pub fn label(&self) -> String {
        format!("{} {}", self.kind, self.id)
    }

    /// Number of records for list-shaped snapshots; one otherwise.
    pub fn len(&self) -> usize {
        match &self.state {
            ResourceState::Subnets(subnets) => subnets.len(),
            ResourceState::FlowLogs(logs) => logs.len(),
            ResourceState::Vpc(_) | ResourceState::SecurityGroup(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn availability_zones(&self) -> BTreeSet<&str> {
        match &self.state {
            ResourceState::Subnets(subnets) => subnets
                .iter()
                .map(|s| s.availability_zone.as_str())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Tag maps carried by the snapshot, one per resource.
    pub fn tag_sets(&self) -> Vec<(&str, &BTreeMap<String, String>)> {
        match &self.state {
            ResourceState::Vpc(vpc) => vec![(vpc.id.as_str(), &vpc.tags)],
            ResourceState::SecurityGroup(sg) => vec![(sg.id.as_str(), &sg.tags)],
            ResourceState::Subnets(subnets) => subnets
                .iter()
                .map(|s| (s.id.as_str(), &s.tags))
                .collect(),
            ResourceState::FlowLogs(_) => Vec::new(),
        }
    }
}
