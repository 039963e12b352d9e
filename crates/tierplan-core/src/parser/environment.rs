//! environment ノードのパース

use super::{first_string, prop_string, required_string, string_args};
use crate::error::{ConfigError, Result};
use crate::model::{
    CidrBlock, EnvironmentConfig, GatewayVpc, ImageCatalog, IsolatedVpc, Placement, PrivateZone,
    RegionConfig, SharedHandles, SpokeVpc, ToolsVpc, VpcLayout,
};
use kdl::KdlNode;
use std::collections::BTreeMap;

fn parse_cidr(value: &str) -> Result<CidrBlock> {
    CidrBlock::parse(value)
        .ok_or_else(|| ConfigError::InvalidConfig(format!("無効な CIDR: {}", value)))
}

/// environment ノードをパース
pub fn parse_environment(node: &KdlNode) -> Result<EnvironmentConfig> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("environment requires a name".to_string()))?
        .to_string();

    let mut env_subdomain = None;
    let mut zone = None;
    let mut operations_cidr = None;
    let mut internal_cidr = None;
    let mut baseline_blocks = Vec::new();
    let mut primary = None;
    let mut recovery = None;
    let mut shared = SharedHandles::default();
    let mut images = ImageCatalog::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "env-subdomain" | "env_subdomain" => {
                    env_subdomain = Some(required_string(child, "env-subdomain")?);
                }
                "zone" => {
                    let zone_name = required_string(child, "zone")?;
                    let id = prop_string(child, "id").ok_or_else(|| {
                        ConfigError::InvalidConfig(format!("zone {} requires id", zone_name))
                    })?;
                    zone = Some(PrivateZone {
                        name: zone_name,
                        id,
                    });
                }
                "operations-cidr" | "operations_cidr" => {
                    operations_cidr =
                        Some(parse_cidr(&required_string(child, "operations-cidr")?)?);
                }
                "internal-cidr" | "internal_cidr" => {
                    internal_cidr = Some(parse_cidr(&required_string(child, "internal-cidr")?)?);
                }
                "baseline-blocks" | "baseline_blocks" => {
                    for block in string_args(child) {
                        baseline_blocks.push(parse_cidr(&block)?);
                    }
                }
                "region" => {
                    let role = required_string(child, "region")?;
                    let region = parse_region(child)?;
                    match role.as_str() {
                        "primary" => primary = Some(region),
                        "recovery" => recovery = Some(region),
                        other => {
                            return Err(ConfigError::InvalidConfig(format!(
                                "region は primary か recovery です: {}",
                                other
                            )));
                        }
                    }
                }
                "shared" => {
                    shared = parse_shared(child)?;
                }
                "image" => {
                    let alias = required_string(child, "image")?;
                    if let Some(regions) = child.children() {
                        for region_node in regions.nodes() {
                            let image_id = required_string(region_node, &alias)?;
                            images.insert(alias.clone(), region_node.name().value(), image_id);
                        }
                    }
                }
                other => {
                    return Err(ConfigError::InvalidConfig(format!(
                        "environment '{}' に未知のフィールドがあります: {}",
                        name, other
                    )));
                }
            }
        }
    }

    let missing = |field: &str| {
        ConfigError::InvalidConfig(format!("environment '{}' requires {}", name, field))
    };

    Ok(EnvironmentConfig {
        env_subdomain: env_subdomain.ok_or_else(|| missing("env-subdomain"))?,
        zone: zone.ok_or_else(|| missing("zone"))?,
        operations_cidr: operations_cidr.ok_or_else(|| missing("operations-cidr"))?,
        internal_cidr: internal_cidr.ok_or_else(|| missing("internal-cidr"))?,
        baseline_blocks,
        primary: primary.ok_or_else(|| missing("region \"primary\""))?,
        recovery,
        shared,
        images,
        name,
    })
}

/// region ノードをパース
///
/// 例: `region "primary" name="us-east-1" vpc-cidr="10.20.0.0/16" kms-key="alias/prod" { vpc "spoke" { ... } }`
fn parse_region(node: &KdlNode) -> Result<RegionConfig> {
    let name = prop_string(node, "name")
        .ok_or_else(|| ConfigError::InvalidConfig("region requires name".to_string()))?;
    let vpc_cidr = prop_string(node, "vpc-cidr")
        .ok_or_else(|| ConfigError::InvalidConfig(format!("region {} requires vpc-cidr", name)))?;
    let encryption_key = prop_string(node, "kms-key")
        .ok_or_else(|| ConfigError::InvalidConfig(format!("region {} requires kms-key", name)))?;

    let vpc_node = node
        .children()
        .and_then(|c| c.nodes().iter().find(|n| n.name().value() == "vpc"))
        .ok_or_else(|| ConfigError::InvalidConfig(format!("region {} requires vpc", name)))?;

    Ok(RegionConfig {
        vpc_cidr: parse_cidr(&vpc_cidr)?,
        encryption_key,
        vpc: parse_vpc(vpc_node)?,
        name,
    })
}

/// vpc ノードをパース
///
/// VPC 種別ごとに許可されない配置先のサブネットはエラーにする。
fn parse_vpc(node: &KdlNode) -> Result<VpcLayout> {
    let kind = required_string(node, "vpc")?;
    let supported = VpcLayout::supported_placements(&kind)
        .ok_or_else(|| ConfigError::InvalidConfig(format!("未知の VPC 種別: {}", kind)))?;

    let mut subnets: BTreeMap<Placement, Vec<String>> = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() != "subnets" {
                continue;
            }
            let mut values = string_args(child).into_iter();
            let placement_name = values.next().ok_or_else(|| {
                ConfigError::InvalidConfig("subnets requires a placement".to_string())
            })?;
            let placement = Placement::parse(&placement_name).ok_or_else(|| {
                ConfigError::InvalidConfig(format!("未知の配置先: {}", placement_name))
            })?;
            if !supported.contains(&placement) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{} VPC は {} サブネットを持てません",
                    kind, placement
                )));
            }
            subnets.entry(placement).or_default().extend(values);
        }
    }

    let mut take = |placement: Placement| subnets.remove(&placement).unwrap_or_default();

    Ok(match kind.as_str() {
        "gateway" => VpcLayout::Gateway(GatewayVpc {
            public: take(Placement::Public),
            compute: take(Placement::Compute),
            data: take(Placement::Data),
            endpoint: take(Placement::Endpoint),
        }),
        "spoke" => VpcLayout::Spoke(SpokeVpc {
            public: take(Placement::Public),
            compute: take(Placement::Compute),
            data: take(Placement::Data),
        }),
        "isolated" => VpcLayout::Isolated(IsolatedVpc {
            compute: take(Placement::Compute),
            data: take(Placement::Data),
        }),
        _ => VpcLayout::Tools(ToolsVpc {
            public: take(Placement::Public),
            compute: take(Placement::Compute),
        }),
    })
}

/// shared ノードをパース
fn parse_shared(node: &KdlNode) -> Result<SharedHandles> {
    let mut shared = SharedHandles::default();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "instance-role" | "instance_role" => {
                    shared.instance_role = required_string(child, "instance-role")?;
                }
                "key-pair" | "key_pair" => {
                    shared.key_pair = required_string(child, "key-pair")?;
                }
                "file-system" | "file_system" => {
                    shared.file_system = Some(required_string(child, "file-system")?);
                }
                _ => {}
            }
        }
    }
    Ok(shared)
}
