//! ロードバランサーのプランニング
//!
//! 公開イングレスと顧客向けロードバランサーの2種類。

use crate::Result;
use crate::context::PlanningContext;
use crate::naming::DR_SUFFIX;
use crate::plan::{
    InstanceSpec, ListenerPlan, LoadBalancerPlan, LoadBalancerPurpose, LoadBalancerScheme, Region,
    TargetGroupPlan, TierPlan,
};
use tierplan_core::{
    ClusterProperties, CustomerMapping, Placement, PlanError, PublicIngressRule, SubnetSource,
};

fn construct_names(specs: &[InstanceSpec]) -> Vec<String> {
    specs.iter().map(|s| s.construct_name.clone()).collect()
}

/// 公開イングレス用のロードバランサー
///
/// ルールごとにリスナーを作り、対象ティアのプライマリーインスタンスへ転送する。
/// ルールが空なら作らない。
pub fn public_ingress(
    ctx: &PlanningContext,
    props: &ClusterProperties,
    tiers: &[TierPlan],
) -> Result<Option<LoadBalancerPlan>> {
    let Some(first) = props.public_ingress_partial.first() else {
        return Ok(None);
    };

    let subnets = ctx.primary.vpc.subnets_for(Placement::Public);
    if subnets.is_empty() {
        return Err(PlanError::configuration(
            first.tier.as_str(),
            "public-ingress",
            format!(
                "{} VPC ({}) に公開サブネットがありません",
                ctx.primary.vpc.kind(),
                ctx.primary.name
            ),
        ));
    }

    let listeners = props
        .public_ingress_partial
        .iter()
        .map(|rule| public_listener(props, rule, tiers))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(LoadBalancerPlan {
        name: format!("{}-public-lb", props.fi_name),
        region: Region::Primary,
        purpose: LoadBalancerPurpose::PublicIngress,
        scheme: LoadBalancerScheme::InternetFacing,
        subnets: subnets.to_vec(),
        allowed_cidr: None,
        listeners,
    }))
}

fn public_listener(
    props: &ClusterProperties,
    rule: &PublicIngressRule,
    tiers: &[TierPlan],
) -> Result<ListenerPlan> {
    let tier = tiers.iter().find(|t| t.tier == rule.tier).ok_or_else(|| {
        PlanError::configuration(
            rule.tier.as_str(),
            "public-ingress",
            "公開イングレスが宣言されていないティアを参照しています",
        )
    })?;

    Ok(ListenerPlan {
        port: rule.port,
        protocol: rule.protocol,
        health_check: rule.health_check.clone(),
        health_check_port: None,
        target_groups: vec![TargetGroupPlan {
            name: format!("{}-{}-{}-tg", props.fi_name, rule.tier, rule.port),
            region: Region::Primary,
            targets: construct_names(&tier.primary),
        }],
    })
}

/// 顧客マッピングごとの内部ロードバランサー
///
/// ロードバランサーはリージョンをまたいでターゲットを持てないため、
/// ティアにリカバリーインスタンスがあればリカバリーリージョンに `-dr` の組を別に作る。
pub fn customer_load_balancers(
    ctx: &PlanningContext,
    props: &ClusterProperties,
    tier: &TierPlan,
    mappings: &[CustomerMapping],
) -> Result<Vec<LoadBalancerPlan>> {
    if mappings.is_empty() {
        return Ok(Vec::new());
    }

    let mut sites = vec![(Region::Primary, "", compute_subnets(ctx, tier, Region::Primary)?)];
    if !tier.recovery.is_empty() {
        sites.push((
            Region::Recovery,
            DR_SUFFIX,
            compute_subnets(ctx, tier, Region::Recovery)?,
        ));
    }

    let mut plans = Vec::with_capacity(mappings.len() * sites.len());
    for mapping in mappings {
        let base = format!("{}-{}-{}", props.fi_name, tier.tier, mapping.customer_name);
        for (region, suffix, subnets) in &sites {
            let targets = match region {
                Region::Primary => &tier.primary,
                Region::Recovery => &tier.recovery,
            };
            plans.push(LoadBalancerPlan {
                name: format!("{}-lb{}", base, suffix),
                region: *region,
                purpose: LoadBalancerPurpose::Customer {
                    customer_name: mapping.customer_name.clone(),
                    tier: tier.tier,
                },
                scheme: LoadBalancerScheme::Internal,
                subnets: subnets.clone(),
                allowed_cidr: Some(mapping.cidr.clone()),
                listeners: vec![ListenerPlan {
                    port: mapping.port,
                    protocol: mapping.protocol,
                    health_check: None,
                    health_check_port: mapping.health_check_port,
                    target_groups: vec![TargetGroupPlan {
                        name: format!("{}-tg{}", base, suffix),
                        region: *region,
                        targets: construct_names(targets),
                    }],
                }],
            });
        }
    }

    Ok(plans)
}

fn compute_subnets(ctx: &PlanningContext, tier: &TierPlan, region: Region) -> Result<Vec<String>> {
    let config = ctx.region(region).ok_or_else(|| {
        PlanError::configuration(
            tier.tier.as_str(),
            "customer-mapping",
            format!("{} リージョンが定義されていません", region),
        )
    })?;
    let subnets = config.vpc.subnets_for(Placement::Compute);
    if subnets.is_empty() {
        return Err(PlanError::configuration(
            tier.tier.as_str(),
            "customer-mapping",
            format!("{} にコンピュートサブネットがありません", config.name),
        ));
    }
    Ok(subnets.to_vec())
}
