//! Fail-fast apply executor
//!
//! Drives a [`Provisioner`] through a [`ClusterPlan`] in dependency order:
//! security groups, primary instances, recovery instances, databases,
//! load-balancer bindings, DNS records. Addresses only known at apply time
//! ([`AddressRef`]) are resolved from the results of earlier steps.

use crate::action::{ResourceType, action_id};
use crate::error::{ProvisioningError, Result};
use crate::provider::{ProvisionedDatabase, ProvisionedInstance, Provisioner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tierplan_planner::{AddressRef, ClusterPlan, InstanceSpec, Region};
use tracing::{debug, info, instrument};

/// Result of a single action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Provider-assigned identifier
    pub provider_id: String,
}

/// Result of applying a whole plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Applied actions, in execution order
    pub applied: Vec<ActionResult>,

    /// Instances by construct name
    pub instances: BTreeMap<String, ProvisionedInstance>,

    /// Databases by identifier
    pub databases: BTreeMap<String, ProvisionedDatabase>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    fn record(&mut self, resource_type: ResourceType, resource_id: &str, provider_id: &str) {
        self.applied.push(ActionResult {
            action_id: action_id(resource_type, resource_id),
            provider_id: provider_id.to_string(),
        });
    }

    /// Resolve a deferred address against what has been created so far
    pub fn resolve(&self, address: &AddressRef) -> Result<String> {
        match address {
            AddressRef::InstancePrivateAddress { construct_name } => self
                .instances
                .get(construct_name)
                .map(|i| i.private_address.clone())
                .ok_or_else(|| ProvisioningError::Unresolved(address.to_string())),
            AddressRef::DatabaseEndpoint { identifier, region } => {
                let db = self
                    .databases
                    .get(identifier)
                    .ok_or_else(|| ProvisioningError::Unresolved(address.to_string()))?;
                match region {
                    Region::Primary => Ok(db.endpoint_address.clone()),
                    Region::Recovery => db
                        .replica_endpoint_address
                        .clone()
                        .ok_or_else(|| ProvisioningError::Unresolved(address.to_string())),
                }
            }
        }
    }
}

/// Apply `plan` through `provisioner`
///
/// The first error is returned unmodified and nothing after it runs.
#[instrument(skip_all, fields(cluster = %plan.cluster_name, provisioner = provisioner.name()))]
pub async fn apply(provisioner: &dyn Provisioner, plan: &ClusterPlan) -> Result<ApplyResult> {
    let start = Instant::now();
    let mut result = ApplyResult::default();

    let mut group_ids: BTreeMap<&str, String> = BTreeMap::new();
    for sg in plan.security_groups() {
        let group = provisioner.create_security_group(sg).await?;
        debug!(name = %sg.name, id = %group.id, "Created security group");
        result.record(ResourceType::SecurityGroup, &sg.name, &group.id);
        group_ids.insert(sg.name.as_str(), group.id);
    }

    for spec in plan.primary_instances() {
        create_instance(provisioner, spec, ResourceType::Instance, &group_ids, &mut result)
            .await?;
    }
    for spec in plan.recovery_instances() {
        create_instance(
            provisioner,
            spec,
            ResourceType::RecoveryInstance,
            &group_ids,
            &mut result,
        )
        .await?;
    }

    for db in &plan.databases {
        let created = provisioner.create_database(db).await?;
        debug!(
            identifier = %db.identifier,
            endpoint = %created.endpoint_address,
            "Created database"
        );
        result.record(ResourceType::Database, &db.identifier, &created.endpoint_address);
        result.databases.insert(db.identifier.clone(), created);
    }

    for lb in &plan.load_balancers {
        let mut targets = BTreeMap::new();
        for tg in lb.listeners.iter().flat_map(|l| &l.target_groups) {
            for construct_name in &tg.targets {
                let instance = result.instances.get(construct_name).ok_or_else(|| {
                    ProvisioningError::Unresolved(format!(
                        "target {} of {}",
                        construct_name, tg.name
                    ))
                })?;
                targets.insert(construct_name.clone(), instance.id.clone());
            }
        }
        let binding = provisioner.create_load_balancer_binding(lb, &targets).await?;
        debug!(name = %lb.name, arn = %binding.arn, "Bound load balancer");
        result.record(ResourceType::LoadBalancer, &lb.name, &binding.arn);
    }

    for record in &plan.dns_records {
        let target = result.resolve(&record.target)?;
        provisioner.create_dns_record(record, &target).await?;
        debug!(name = %record.name, target = %target, "Created DNS record");
        result.record(ResourceType::DnsRecord, &record.name, &target);
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        applied = result.applied.len(),
        duration_ms = result.duration_ms,
        "Applied cluster plan"
    );
    Ok(result)
}

async fn create_instance(
    provisioner: &dyn Provisioner,
    spec: &InstanceSpec,
    resource_type: ResourceType,
    group_ids: &BTreeMap<&str, String>,
    result: &mut ApplyResult,
) -> Result<()> {
    let security_group_ids = spec
        .security_group_refs
        .iter()
        .map(|name| {
            group_ids
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| ProvisioningError::Unresolved(format!("security group {}", name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let instance = provisioner.create_instance(spec, &security_group_ids).await?;
    debug!(
        construct_name = %spec.construct_name,
        id = %instance.id,
        address = %instance.private_address,
        "Created instance"
    );
    result.record(resource_type, &spec.construct_name, &instance.id);
    result
        .instances
        .insert(spec.construct_name.clone(), instance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LoadBalancerBinding, ProvisionedGroup};
    use crate::tests_support::cluster_plan;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tierplan_planner::{
        DatabasePlan, DnsRecord, InstanceSpec, LoadBalancerPlan, SecurityGroupPlan,
    };
    use tokio_test::{assert_err, assert_ok};

    /// Records every call and hands out sequential ids
    #[derive(Default)]
    struct RecordingProvisioner {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingProvisioner {
        fn failing_on(kind: &'static str) -> Self {
            Self {
                fail_on: Some(kind),
                ..Default::default()
            }
        }

        fn call(&self, kind: &'static str, name: &str) -> Result<usize> {
            if self.fail_on == Some(kind) {
                return Err(ProvisioningError::ApiError(format!("{} {} rejected", kind, name)));
            }
            let mut calls = self.calls.lock().unwrap();
            calls.push(format!("{}:{}", kind, name));
            Ok(calls.len())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provisioner for RecordingProvisioner {
        fn name(&self) -> &str {
            "recording"
        }

        async fn create_security_group(
            &self,
            plan: &SecurityGroupPlan,
        ) -> Result<ProvisionedGroup> {
            let n = self.call("sg", &plan.name)?;
            Ok(ProvisionedGroup {
                id: format!("sg-{}", n),
            })
        }

        async fn create_instance(
            &self,
            spec: &InstanceSpec,
            security_group_ids: &[String],
        ) -> Result<ProvisionedInstance> {
            assert_eq!(security_group_ids.len(), spec.security_group_refs.len());
            let n = self.call("instance", &spec.construct_name)?;
            Ok(ProvisionedInstance {
                id: format!("i-{}", n),
                private_address: format!("10.0.0.{}", n),
            })
        }

        async fn create_database(&self, plan: &DatabasePlan) -> Result<ProvisionedDatabase> {
            self.call("database", &plan.identifier)?;
            Ok(ProvisionedDatabase {
                endpoint_address: format!("{}.primary.example", plan.identifier),
                replica_endpoint_address: plan
                    .replica_region
                    .as_ref()
                    .map(|r| format!("{}.{}.example", plan.identifier, r)),
            })
        }

        async fn create_load_balancer_binding(
            &self,
            plan: &LoadBalancerPlan,
            targets: &BTreeMap<String, String>,
        ) -> Result<LoadBalancerBinding> {
            assert!(!targets.is_empty());
            let n = self.call("lb", &plan.name)?;
            Ok(LoadBalancerBinding {
                arn: format!("arn:lb/{}", n),
            })
        }

        async fn create_dns_record(&self, record: &DnsRecord, target: &str) -> Result<()> {
            self.call("dns", &format!("{}={}", record.name, target))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_apply_in_dependency_order() {
        let plan = cluster_plan();
        let provisioner = RecordingProvisioner::default();

        let result = assert_ok!(apply(&provisioner, &plan).await);

        let kinds: Vec<String> = provisioner
            .calls()
            .iter()
            .map(|c| c.split(':').next().unwrap_or_default().to_string())
            .collect();
        let mut deduped = kinds.clone();
        deduped.dedup();
        assert_eq!(deduped, vec!["sg", "instance", "database", "lb", "dns"]);

        // recovery instances follow every primary
        let instances: Vec<String> = provisioner
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("instance:"))
            .collect();
        assert_eq!(instances.last().unwrap(), "instance:acme-web-01-dr");

        assert_eq!(result.applied.len(), provisioner.calls().len());
        assert_eq!(result.instances.len(), 3);
    }

    #[tokio::test]
    async fn test_dns_targets_resolved_from_earlier_steps() {
        let plan = cluster_plan();
        let provisioner = RecordingProvisioner::default();
        let result = assert_ok!(apply(&provisioner, &plan).await);

        let web01 = &result.instances["acme-web-01"];
        let expected = format!("dns:acmeprodweb01.prod.corp.internal={}", web01.private_address);
        assert!(provisioner.calls().contains(&expected));
        assert!(
            provisioner
                .calls()
                .contains(&"dns:coredb.prod.corp.internal=coredb.primary.example".to_string())
        );
    }

    #[tokio::test]
    async fn test_first_error_stops_apply() {
        let plan = cluster_plan();
        let provisioner = RecordingProvisioner::failing_on("database");

        let err = assert_err!(apply(&provisioner, &plan).await);
        assert!(matches!(err, ProvisioningError::ApiError(msg) if msg.contains("coredb")));
        assert!(
            provisioner
                .calls()
                .iter()
                .all(|c| !c.starts_with("lb:") && !c.starts_with("dns:"))
        );
    }

    #[test]
    fn test_resolve_unknown_address() {
        let result = ApplyResult::default();
        let err = result
            .resolve(&AddressRef::InstancePrivateAddress {
                construct_name: "acme-web-09".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisioningError::Unresolved(name) if name == "acme-web-09.private_ip"
        ));
    }

    #[test]
    fn test_resolve_missing_replica() {
        let mut result = ApplyResult::default();
        result.databases.insert(
            "coredb".to_string(),
            ProvisionedDatabase {
                endpoint_address: "coredb.primary.example".to_string(),
                replica_endpoint_address: None,
            },
        );
        let recovery = AddressRef::DatabaseEndpoint {
            identifier: "coredb".to_string(),
            region: Region::Recovery,
        };
        assert!(matches!(
            result.resolve(&recovery),
            Err(ProvisioningError::Unresolved(_))
        ));
    }
}
