//! Provisioner trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tierplan_planner::{
    DatabasePlan, DnsRecord, InstanceSpec, LoadBalancerPlan, SecurityGroupPlan,
};

/// Provisioning boundary
///
/// Implemented by whatever actually creates cloud resources. The planner never
/// calls it directly; [`apply`](crate::apply) drives it in dependency order and
/// resolves deferred addresses from earlier results.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Returns the provisioner name (e.g., "aws", "dry-run")
    fn name(&self) -> &str;

    async fn create_security_group(&self, plan: &SecurityGroupPlan) -> Result<ProvisionedGroup>;

    /// Create an instance attached to the given security group ids
    async fn create_instance(
        &self,
        spec: &InstanceSpec,
        security_group_ids: &[String],
    ) -> Result<ProvisionedInstance>;

    /// Create a database and its read replica when `plan.replica_region` is set
    async fn create_database(&self, plan: &DatabasePlan) -> Result<ProvisionedDatabase>;

    /// Bind a load balancer to its targets
    ///
    /// `targets` maps each construct name in the plan's target groups to an instance id.
    async fn create_load_balancer_binding(
        &self,
        plan: &LoadBalancerPlan,
        targets: &BTreeMap<String, String>,
    ) -> Result<LoadBalancerBinding>;

    /// Create a DNS record whose deferred target has been resolved to `target`
    async fn create_dns_record(&self, record: &DnsRecord, target: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedGroup {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedInstance {
    pub id: String,
    pub private_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedDatabase {
    pub endpoint_address: String,
    /// Endpoint of the read replica in the recovery region
    pub replica_endpoint_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerBinding {
    pub arn: String,
}
