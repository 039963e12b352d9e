//! クラスター全体のプランニング
//!
//! ティアを宣言順に展開し、ロードバランサー、データベース、DNS をまとめて
//! 1つの [`ClusterPlan`] にする。入力が同じなら出力も同じ。

use crate::Result;
use crate::context::PlanningContext;
use crate::plan::{ClusterPlan, Region, TierPlan};
use crate::ports::PortTable;
use crate::{database, dns, ingress, recovery, security_group, tier};
use tierplan_core::{ClusterConfiguration, Project, TierConfiguration};
use tracing::{debug, info, instrument};

/// 1クラスターのプランを作る
#[instrument(skip_all, fields(cluster = %cluster.name(), environment = %ctx.environment))]
pub fn plan_cluster(ctx: &PlanningContext, cluster: &ClusterConfiguration) -> Result<ClusterPlan> {
    cluster.validate()?;

    let props = &cluster.properties;
    let ports = ctx.ports.for_cluster(props.cluster_type);

    let mut tiers = Vec::with_capacity(cluster.tiers.len());
    for config in &cluster.tiers {
        tiers.push(plan_tier(ctx, cluster, config, ports)?);
    }

    let mut load_balancers = Vec::new();
    if let Some(lb) = ingress::public_ingress(ctx, props, &tiers)? {
        load_balancers.push(lb);
    }
    for (config, plan) in cluster.tiers.iter().zip(&tiers) {
        load_balancers.extend(ingress::customer_load_balancers(
            ctx,
            props,
            plan,
            &config.customer_mappings,
        )?);
    }

    let databases = if props.use_db_configs {
        database::plan(ctx, &cluster.db_configs)?
    } else {
        Vec::new()
    };

    dns::ensure_unique_names(&tiers, &databases)?;
    let dns_records = dns::records(ctx, props.active_region, &tiers, &databases);

    let plan = ClusterPlan {
        cluster_name: props.cluster_name.clone(),
        fi_name: props.fi_name.clone(),
        environment: ctx.environment.clone(),
        active_region: props.active_region,
        tiers,
        load_balancers,
        databases,
        dns_records,
    };

    info!(
        primary = plan.primary_instances().count(),
        recovery = plan.recovery_instances().count(),
        load_balancers = plan.load_balancers.len(),
        databases = plan.databases.len(),
        dns_records = plan.dns_records.len(),
        "Planned cluster"
    );
    Ok(plan)
}

fn plan_tier(
    ctx: &PlanningContext,
    cluster: &ClusterConfiguration,
    config: &TierConfiguration,
    ports: &PortTable,
) -> Result<TierPlan> {
    let fi_name = &cluster.properties.fi_name;

    let mut security_groups = security_group::plan(ctx, fi_name, config, Region::Primary, ports)?;
    if ctx.recovery.is_some() {
        security_groups.extend(security_group::plan(
            ctx,
            fi_name,
            config,
            Region::Recovery,
            ports,
        )?);
    }

    let primary = tier::expand(ctx, &cluster.properties, config, &security_groups)?;
    let recovery = recovery::link(ctx, &cluster.properties, config, &primary, &security_groups)?;

    debug!(
        tier = %config.tier,
        primary = primary.len(),
        recovery = recovery.len(),
        security_groups = security_groups.len(),
        "Planned tier"
    );

    Ok(TierPlan {
        tier: config.tier,
        security_groups,
        primary,
        recovery,
    })
}

/// プロジェクトの全クラスターをプランする
///
/// `only` を指定するとそのクラスターだけ。
pub fn plan_project(project: &Project, only: Option<&str>) -> Result<Vec<ClusterPlan>> {
    let ctx = PlanningContext::new(&project.environment);
    project
        .clusters
        .iter()
        .filter(|c| only.is_none_or(|name| c.name() == name))
        .map(|c| plan_cluster(&ctx, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, props};
    use tierplan_core::{
        CidrBlock, CustomerMapping, DbConfig, IndexedOverrides, LbProtocol, PlanError,
        PublicIngressRule, TierType,
    };

    fn cluster() -> ClusterConfiguration {
        let mut web = TierConfiguration::new(TierType::Web, 2, "ami-web", "m5.large");
        web.recovery_ami_ids = IndexedOverrides::from_list(["ami-web-dr"]);

        let mut lbs = TierConfiguration::new(TierType::Lbs, 1, "ami-lbs", "m5.large");
        lbs.customer_mappings.push(CustomerMapping {
            customer_name: "bankco".to_string(),
            cidr: CidrBlock::parse("172.16.0.0/16").unwrap(),
            port: 443,
            protocol: LbProtocol::Tcp,
            health_check_port: None,
        });

        let mut properties = props();
        properties.public_ingress_partial.push(PublicIngressRule {
            tier: TierType::Web,
            port: 443,
            protocol: LbProtocol::Https,
            health_check: Some("/health".to_string()),
        });
        properties.use_db_configs = true;

        ClusterConfiguration {
            properties,
            tiers: vec![web, lbs],
            db_configs: vec![DbConfig {
                identifier: "coredb".to_string(),
                route53_name: "coredb".to_string(),
                engine: "postgres".to_string(),
                instance_class: "db.r5.large".to_string(),
                allocated_storage: 100,
                replicate_to_recovery: true,
            }],
        }
    }

    #[test]
    fn test_plan_cluster() {
        let plan = plan_cluster(&context(), &cluster()).unwrap();

        assert_eq!(plan.cluster_name, "acme-core");
        assert_eq!(plan.tiers.len(), 2);
        assert_eq!(plan.tiers[0].tier, TierType::Web);
        assert_eq!(plan.primary_instances().count(), 3);
        assert_eq!(plan.recovery_instances().count(), 1);
        assert_eq!(plan.load_balancers.len(), 2);
        assert_eq!(plan.load_balancers[0].name, "acme-public-lb");
        assert_eq!(plan.load_balancers[1].name, "acme-lbs-bankco-lb");
        assert_eq!(plan.databases.len(), 1);
        // 3 プライマリー + 1 リカバリー + 1 CNAME
        assert_eq!(plan.dns_records.len(), 5);
    }

    #[test]
    fn test_databases_skipped_without_flag() {
        let mut cluster = cluster();
        cluster.properties.use_db_configs = false;
        let plan = plan_cluster(&context(), &cluster).unwrap();
        assert!(plan.databases.is_empty());
    }

    #[test]
    fn test_recovery_security_groups_only_with_recovery_region() {
        let plan = plan_cluster(&context(), &cluster()).unwrap();
        assert!(plan.security_groups().any(|sg| sg.region == Region::Recovery));

        let mut ctx = context();
        ctx.recovery = None;
        let mut cluster = cluster();
        cluster.tiers[0].recovery_ami_ids = IndexedOverrides::new();
        cluster.db_configs[0].replicate_to_recovery = false;
        let plan = plan_cluster(&ctx, &cluster).unwrap();
        assert!(plan.security_groups().all(|sg| sg.region == Region::Primary));
    }

    #[test]
    fn test_invalid_cluster_is_rejected() {
        let mut cluster = cluster();
        cluster.tiers[0].recovery_ami_ids = IndexedOverrides::from_positional([
            None,
            None,
            Some("ami-out-of-range"),
        ]);
        assert!(matches!(
            plan_cluster(&context(), &cluster),
            Err(PlanError::Linkage { index: 2, .. })
        ));
    }
}
