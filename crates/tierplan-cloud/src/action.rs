//! Action listing for cluster plans

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tierplan_planner::{
    ClusterPlan, DatabasePlan, DnsRecord, InstanceSpec, LoadBalancerPlan, SecurityGroupPlan,
};

/// A resource the plan creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (`{resource_type}:{resource_id}`)
    pub id: String,

    pub resource_type: ResourceType,

    /// Resource identifier (name in the plan)
    pub resource_id: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Action {
    fn new(
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_id = resource_id.into();
        Self {
            id: action_id(resource_type, &resource_id),
            resource_type,
            resource_id,
            description: description.into(),
            details: BTreeMap::new(),
        }
    }

    fn detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

pub(crate) fn action_id(resource_type: ResourceType, resource_id: &str) -> String {
    format!("{}:{}", resource_type, resource_id)
}

/// Kind of resource, in apply order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    SecurityGroup,
    Instance,
    RecoveryInstance,
    Database,
    LoadBalancer,
    DnsRecord,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::SecurityGroup,
        ResourceType::Instance,
        ResourceType::RecoveryInstance,
        ResourceType::Database,
        ResourceType::LoadBalancer,
        ResourceType::DnsRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::SecurityGroup => "security-group",
            ResourceType::Instance => "instance",
            ResourceType::RecoveryInstance => "recovery-instance",
            ResourceType::Database => "database",
            ResourceType::LoadBalancer => "load-balancer",
            ResourceType::DnsRecord => "dns-record",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat listing of every resource in `plan`, in apply order
pub fn actions(plan: &ClusterPlan) -> Vec<Action> {
    let mut actions = Vec::new();

    actions.extend(plan.security_groups().map(security_group_action));
    actions.extend(
        plan.primary_instances()
            .map(|spec| instance_action(ResourceType::Instance, spec)),
    );
    actions.extend(
        plan.recovery_instances()
            .map(|spec| instance_action(ResourceType::RecoveryInstance, spec)),
    );
    actions.extend(plan.databases.iter().map(database_action));
    actions.extend(plan.load_balancers.iter().map(load_balancer_action));
    actions.extend(plan.dns_records.iter().map(dns_action));

    actions
}

fn security_group_action(sg: &SecurityGroupPlan) -> Action {
    Action::new(
        ResourceType::SecurityGroup,
        &sg.name,
        format!("{} rules for {} ({})", sg.rules.len(), sg.cidr, sg.region),
    )
    .detail("tier", json!(sg.tier))
    .detail("region", json!(sg.region))
    .detail("cidr", json!(sg.cidr))
    .detail("rules", json!(sg.rules.len()))
}

fn instance_action(resource_type: ResourceType, spec: &InstanceSpec) -> Action {
    let mut action = Action::new(
        resource_type,
        &spec.construct_name,
        format!(
            "{} {} in {} ({})",
            spec.instance_type, spec.hostname, spec.region_name, spec.resolved_ami
        ),
    )
    .detail("hostname", json!(spec.hostname))
    .detail("ami", json!(spec.resolved_ami))
    .detail("subnet", json!(spec.subnet_id))
    .detail("security_groups", json!(spec.security_group_refs));

    if let Some(paired) = &spec.paired_hostname {
        action = action.detail("paired_hostname", json!(paired));
    }
    if let Some(entry) = &spec.host_entry {
        action = action.detail("host_entry", json!(entry.hostnames));
    }
    action
}

fn database_action(db: &DatabasePlan) -> Action {
    let description = match &db.replica_region {
        Some(replica) => format!("{} {} (replica in {})", db.engine, db.instance_class, replica),
        None => format!("{} {}", db.engine, db.instance_class),
    };
    Action::new(ResourceType::Database, &db.identifier, description)
        .detail("engine", json!(db.engine))
        .detail("allocated_storage", json!(db.allocated_storage))
        .detail("subnets", json!(db.subnet_ids))
}

fn load_balancer_action(lb: &LoadBalancerPlan) -> Action {
    let listeners: Vec<String> = lb
        .listeners
        .iter()
        .map(|l| format!("{}/{}", l.port, l.protocol))
        .collect();
    Action::new(
        ResourceType::LoadBalancer,
        &lb.name,
        format!("{} listeners [{}]", listeners.len(), listeners.join(", ")),
    )
    .detail("region", json!(lb.region))
    .detail("purpose", json!(lb.purpose))
    .detail("scheme", json!(lb.scheme))
    .detail("subnets", json!(lb.subnets))
}

fn dns_action(record: &DnsRecord) -> Action {
    Action::new(
        ResourceType::DnsRecord,
        &record.name,
        format!("{} -> {}", record.record_type.as_str(), record.target),
    )
    .detail("target", json!(record.target))
    .detail("ttl", json!(record.ttl))
    .detail("zone_id", json!(record.zone_id))
}

/// Counts of planned resources per type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub counts: BTreeMap<ResourceType, usize>,
}

impl PlanSummary {
    pub fn from_actions(actions: &[Action]) -> Self {
        let mut counts = BTreeMap::new();
        for action in actions {
            *counts.entry(action.resource_type).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.counts.get(&resource_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = ResourceType::ALL
            .iter()
            .map(|t| format!("{} {}", self.count(*t), t))
            .collect();
        write!(f, "{} to create ({})", self.total(), parts.join(", "))
    }
}
