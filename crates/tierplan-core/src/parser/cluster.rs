//! cluster ノードのパース

use super::tier::parse_tier;
use super::{first_bool, first_string, prop_bool, prop_int, prop_string, required_string};
use crate::error::{ConfigError, Result};
use crate::model::{
    ActiveRegion, ClusterConfiguration, ClusterProperties, ClusterType, DbConfig, LbProtocol,
    PublicIngressRule, TierType,
};
use kdl::KdlNode;

/// cluster ノードをパース
pub fn parse_cluster(node: &KdlNode) -> Result<ClusterConfiguration> {
    let cluster_name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("cluster requires a name".to_string()))?
        .to_string();

    let mut properties = ClusterProperties {
        cluster_name: cluster_name.clone(),
        ..Default::default()
    };
    let mut tiers = Vec::new();
    let mut db_configs = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "fi-name" | "fi_name" => {
                    properties.fi_name = required_string(child, "fi-name")?;
                }
                "construct-name-pattern" | "construct_name_pattern" => {
                    properties.construct_name_pattern =
                        Some(required_string(child, "construct-name-pattern")?);
                }
                "active-region" | "active_region" => {
                    let value = required_string(child, "active-region")?;
                    properties.active_region = ActiveRegion::parse(&value).ok_or_else(|| {
                        ConfigError::InvalidConfig(format!("未知の active-region: {}", value))
                    })?;
                }
                "cluster-type" | "cluster_type" => {
                    let value = required_string(child, "cluster-type")?;
                    properties.cluster_type = ClusterType::parse(&value).ok_or_else(|| {
                        ConfigError::InvalidConfig(format!("未知の cluster-type: {}", value))
                    })?;
                }
                "use-db-configs" | "use_db_configs" => {
                    properties.use_db_configs = first_bool(child);
                }
                "public-ingress" | "public_ingress" => {
                    properties
                        .public_ingress_partial
                        .push(parse_public_ingress(child)?);
                }
                "tier" => {
                    tiers.push(parse_tier(child)?);
                }
                "database" => {
                    db_configs.push(parse_database(child)?);
                }
                other => {
                    return Err(ConfigError::InvalidConfig(format!(
                        "cluster '{}' に未知のフィールドがあります: {}",
                        cluster_name, other
                    )));
                }
            }
        }
    }

    Ok(ClusterConfiguration {
        properties,
        tiers,
        db_configs,
    })
}

/// public-ingress ノードをパース
///
/// 例: `public-ingress tier="web" port=443 protocol="HTTPS" health-check="/health"`
fn parse_public_ingress(node: &KdlNode) -> Result<PublicIngressRule> {
    let tier_name = prop_string(node, "tier")
        .ok_or_else(|| ConfigError::InvalidConfig("public-ingress requires tier".to_string()))?;
    let tier = TierType::parse(&tier_name)
        .ok_or_else(|| ConfigError::InvalidConfig(format!("未知のティア種別: {}", tier_name)))?;
    let port = prop_int(node, "port")?
        .ok_or_else(|| ConfigError::InvalidConfig("public-ingress requires port".to_string()))?;
    let protocol = match prop_string(node, "protocol") {
        Some(p) => LbProtocol::parse(&p)
            .ok_or_else(|| ConfigError::InvalidConfig(format!("未知のプロトコル: {}", p)))?,
        None => LbProtocol::Https,
    };

    Ok(PublicIngressRule {
        tier,
        port,
        protocol,
        health_check: prop_string(node, "health-check"),
    })
}

/// database ノードをパース
///
/// 例: `database "coredb" route53-name="coredb" engine="postgres" instance-class="db.r5.large" storage=200`
fn parse_database(node: &KdlNode) -> Result<DbConfig> {
    let identifier = required_string(node, "database")?;

    let route53_name = prop_string(node, "route53-name").unwrap_or_else(|| identifier.clone());
    let engine = prop_string(node, "engine").ok_or_else(|| {
        ConfigError::InvalidConfig(format!("database {} requires engine", identifier))
    })?;
    let instance_class = prop_string(node, "instance-class").ok_or_else(|| {
        ConfigError::InvalidConfig(format!("database {} requires instance-class", identifier))
    })?;
    let allocated_storage = prop_int(node, "storage")?.unwrap_or(100);

    Ok(DbConfig {
        identifier,
        route53_name,
        engine,
        instance_class,
        allocated_storage,
        replicate_to_recovery: prop_bool(node, "replicate-to-recovery").unwrap_or(false),
    })
}
