//! セキュリティグループのプランニング
//!
//! CIDR ブロックごとに1グループ（single-ingress モード）を作り、
//! ティアのポート、SSH、内部全許可、ティア固有のイングレスをマージする。

use crate::Result;
use crate::context::PlanningContext;
use crate::plan::{IngressRule, Region, SecurityGroupPlan};
use crate::ports::PortTable;
use std::collections::BTreeSet;
use tierplan_core::{CidrBlock, IngressProtocol, PlanError, TierConfiguration};

const SSH_PORT: u16 = 22;

/// リージョンのセキュリティグループが対象とする CIDR ブロック
///
/// ベースライン → 自 VPC → 対になる VPC の順。重複は最初の位置に残す。
/// この順序がグループ名の番号を決める。
pub fn network_cidrs(ctx: &PlanningContext, region: Region) -> Vec<CidrBlock> {
    let own = ctx.region(region).map(|r| &r.vpc_cidr);
    let paired = ctx.paired_region(region).map(|r| &r.vpc_cidr);

    let mut blocks: Vec<CidrBlock> = Vec::new();
    for block in ctx.baseline_blocks.iter().chain(own).chain(paired) {
        if !blocks.contains(block) {
            blocks.push(block.clone());
        }
    }
    blocks
}

/// グループ名: `{fiName}-{tier}-sg-{n}`、リカバリーは `-dr` 付き
pub fn group_name(fi_name: &str, tier: &str, region: Region, index: usize) -> String {
    match region {
        Region::Primary => format!("{}-{}-sg-{}", fi_name, tier, index),
        Region::Recovery => format!("{}-{}-sg-{}-dr", fi_name, tier, index),
    }
}

/// ティアとリージョンのセキュリティグループを生成
pub fn plan(
    ctx: &PlanningContext,
    fi_name: &str,
    tier: &TierConfiguration,
    region: Region,
    ports: &PortTable,
) -> Result<Vec<SecurityGroupPlan>> {
    if ctx.region(region).is_none() {
        return Err(PlanError::configuration(
            tier.tier.as_str(),
            "region",
            format!("環境 {} に {} リージョンがありません", ctx.environment, region),
        ));
    }

    let groups = network_cidrs(ctx, region)
        .into_iter()
        .enumerate()
        .map(|(index, cidr)| SecurityGroupPlan {
            name: group_name(fi_name, tier.tier.as_str(), region, index),
            tier: tier.tier,
            region,
            rules: rules_for(ctx, tier, ports, &cidr),
            cidr,
        })
        .collect();

    Ok(groups)
}

/// 1つの CIDR ブロックに対するルール集合
fn rules_for(
    ctx: &PlanningContext,
    tier: &TierConfiguration,
    ports: &PortTable,
    cidr: &CidrBlock,
) -> BTreeSet<IngressRule> {
    let mut rules = BTreeSet::new();

    for &port in ports.ports(tier.tier) {
        rules.insert(IngressRule::port(port, IngressProtocol::Tcp, cidr.clone()));
    }

    rules.insert(
        IngressRule::port(SSH_PORT, IngressProtocol::Tcp, ctx.operations_cidr.clone())
            .described("ssh from operations"),
    );
    rules.insert(
        IngressRule {
            from_port: 0,
            to_port: u16::MAX,
            protocol: IngressProtocol::All,
            cidr: ctx.internal_cidr.clone(),
            description: None,
        }
        .described("internal traffic"),
    );

    for ingress in &tier.tier_ingresses {
        rules.insert(IngressRule {
            from_port: ingress.from_port,
            to_port: ingress.to_port,
            protocol: ingress.protocol,
            cidr: ingress.cidr.clone().unwrap_or_else(|| cidr.clone()),
            description: ingress.description.clone(),
        });
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use tierplan_core::{TierIngress, TierType};

    fn cidr(s: &str) -> CidrBlock {
        CidrBlock::parse(s).unwrap()
    }

    #[test]
    fn test_network_cidrs_order_and_dedup() {
        let mut ctx = context();
        ctx.baseline_blocks = vec![cidr("10.100.0.0/16"), cidr("10.20.0.0/16")];

        let primary = network_cidrs(&ctx, Region::Primary);
        assert_eq!(
            primary,
            vec![cidr("10.100.0.0/16"), cidr("10.20.0.0/16"), cidr("10.30.0.0/16")]
        );

        let recovery = network_cidrs(&ctx, Region::Recovery);
        assert_eq!(
            recovery,
            vec![cidr("10.100.0.0/16"), cidr("10.20.0.0/16"), cidr("10.30.0.0/16")]
        );
    }

    #[test]
    fn test_network_cidrs_dedup_by_network() {
        let mut ctx = context();
        // ホスト部付きの表記でも同じネットワークなら1つ
        ctx.baseline_blocks = vec![cidr("10.20.7.1/16")];

        let primary = network_cidrs(&ctx, Region::Primary);
        assert_eq!(primary, vec![cidr("10.20.0.0/16"), cidr("10.30.0.0/16")]);
        assert_eq!(primary[0].as_str(), "10.20.0.0/16");
    }

    #[test]
    fn test_one_group_per_block() {
        let ctx = context();
        let tier = TierConfiguration::new(TierType::Web, 1, "ami", "m5.large");
        let groups = plan(&ctx, "acme", &tier, Region::Primary, &PortTable::workload()).unwrap();

        let expected = network_cidrs(&ctx, Region::Primary);
        assert_eq!(groups.len(), expected.len());
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.name, format!("acme-web-sg-{}", i));
            assert_eq!(group.cidr, expected[i]);
            // ティアポートは対象ブロックから
            assert!(group.rules.contains(&IngressRule::port(
                443,
                IngressProtocol::Tcp,
                group.cidr.clone()
            )));
            assert!(
                group
                    .rules
                    .iter()
                    .any(|r| r.from_port == 22 && r.cidr == ctx.operations_cidr)
            );
            assert!(
                group
                    .rules
                    .iter()
                    .any(|r| r.protocol == IngressProtocol::All && r.cidr == ctx.internal_cidr)
            );
        }
    }

    #[test]
    fn test_tier_ingress_defaults_to_group_block() {
        let ctx = context();
        let mut tier = TierConfiguration::new(TierType::Rt, 1, "ami", "c5.large");
        tier.tier_ingresses.push(TierIngress {
            from_port: 7000,
            to_port: 7100,
            protocol: IngressProtocol::Udp,
            cidr: None,
            description: None,
        });
        tier.tier_ingresses.push(TierIngress {
            from_port: 9000,
            to_port: 9000,
            protocol: IngressProtocol::Tcp,
            cidr: Some(cidr("192.168.0.0/24")),
            description: Some("monitoring".to_string()),
        });

        let groups = plan(&ctx, "acme", &tier, Region::Recovery, &PortTable::workload()).unwrap();
        let group = &groups[0];
        assert_eq!(group.name, "acme-rt-sg-0-dr");
        assert!(
            group
                .rules
                .iter()
                .any(|r| r.from_port == 7000 && r.to_port == 7100 && r.cidr == group.cidr)
        );
        assert!(
            group
                .rules
                .iter()
                .any(|r| r.from_port == 9000 && r.cidr == cidr("192.168.0.0/24"))
        );
    }

    #[test]
    fn test_duplicate_rules_collapse() {
        let ctx = context();
        let mut tier = TierConfiguration::new(TierType::Web, 1, "ami", "m5.large");
        // テーブルと同じルールを明示しても1つになる
        tier.tier_ingresses.push(TierIngress {
            from_port: 443,
            to_port: 443,
            protocol: IngressProtocol::Tcp,
            cidr: None,
            description: None,
        });
        let with_dup = plan(&ctx, "acme", &tier, Region::Primary, &PortTable::workload()).unwrap();
        tier.tier_ingresses.clear();
        let without = plan(&ctx, "acme", &tier, Region::Primary, &PortTable::workload()).unwrap();
        assert_eq!(with_dup, without);
    }

    #[test]
    fn test_missing_recovery_region() {
        let mut ctx = context();
        ctx.recovery = None;
        let tier = TierConfiguration::new(TierType::Web, 1, "ami", "m5.large");
        assert!(matches!(
            plan(&ctx, "acme", &tier, Region::Recovery, &PortTable::workload()),
            Err(PlanError::Configuration { field: "region", .. })
        ));
    }
}
