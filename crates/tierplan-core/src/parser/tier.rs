//! tier ノードのパース

use super::{
    first_bool, first_int, first_string, parse_positional, prop_int, prop_string,
    required_string,
};
use crate::error::{ConfigError, PlanError, Result};
use crate::model::{
    CidrBlock, CustomerMapping, HostnameStrategy, IngressProtocol, LbProtocol, TierConfiguration,
    TierIngress, TierType, VolumeSpec,
};
use kdl::KdlNode;

/// tier ノードをパース
///
/// ```kdl
/// tier "web" {
///     count 2
///     ami "ami-base"
///     ami-pattern-override "ami-p0" #null
///     recovery-ami-ids "ami-r0"
///     instance-type "m5.large"
///     hostname-pattern "{fiName}{envSubdomain}{tier}{instanceIndex}"
///     volume "/dev/sdf" size=100 type="gp3"
///     ingress port=8443 protocol="tcp" cidr="10.0.0.0/8"
///     customer-mapping "bankco" cidr="172.16.0.0/16" port=443 protocol="TCP"
/// }
/// ```
pub fn parse_tier(node: &KdlNode) -> Result<TierConfiguration> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("tier requires a name".to_string()))?;
    let tier = TierType::parse(name)
        .ok_or_else(|| ConfigError::InvalidConfig(format!("未知のティア種別: {}", name)))?;

    let mut config = TierConfiguration::new(tier, 0, "", "");
    let mut pattern: Option<String> = None;
    let mut pattern_override = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "count" => {
                    config.count = first_int(child, "count")?;
                }
                "ami" => {
                    config.ami = required_string(child, "ami")?;
                }
                "ami-pattern-override" | "ami_pattern_override" => {
                    config.ami_pattern_override =
                        parse_positional(child, "ami-pattern-override")?;
                }
                "recovery-ami-ids" | "recovery_ami_ids" => {
                    config.recovery_ami_ids = parse_positional(child, "recovery-ami-ids")?;
                }
                "instance-type" | "instance_type" => {
                    config.instance_type = required_string(child, "instance-type")?;
                }
                "hostname-pattern" | "hostname_pattern" => {
                    pattern = Some(required_string(child, "hostname-pattern")?);
                }
                "hostname-pattern-override" | "hostname_pattern_override" => {
                    pattern_override = Some(parse_positional(child, "hostname-pattern-override")?);
                }
                "create-volumes-in-recovery" | "create_volumes_in_recovery" => {
                    config.create_volumes_in_recovery = first_bool(child);
                }
                "volume" => {
                    config.volumes.push(parse_volume(child)?);
                }
                "ingress" => {
                    config.tier_ingresses.push(parse_ingress(child, tier)?);
                }
                "customer-mapping" | "customer_mapping" => {
                    config.customer_mappings.push(parse_customer_mapping(child)?);
                }
                other => {
                    return Err(ConfigError::InvalidConfig(format!(
                        "tier '{}' に未知のフィールドがあります: {}",
                        tier, other
                    )));
                }
            }
        }
    }

    config.hostname = match (pattern, pattern_override) {
        (Some(_), Some(_)) => {
            return Err(PlanError::configuration(
                tier.as_str(),
                "hostname-pattern",
                "hostname-pattern と hostname-pattern-override は同時に指定できません",
            )
            .into());
        }
        (Some(pattern), None) => HostnameStrategy::Pattern(pattern),
        (None, Some(overrides)) => HostnameStrategy::Override(overrides),
        (None, None) => HostnameStrategy::Fallback,
    };

    Ok(config)
}

/// volume ノードをパース
///
/// 例: `volume "/dev/sdf" size=100 type="gp3"`
fn parse_volume(node: &KdlNode) -> Result<VolumeSpec> {
    let device_name = required_string(node, "volume")?;
    let size_gb = prop_int(node, "size")?.ok_or_else(|| {
        ConfigError::InvalidConfig(format!("volume {} requires size", device_name))
    })?;
    let volume_type = prop_string(node, "type").unwrap_or_else(|| "gp3".to_string());

    Ok(VolumeSpec {
        device_name,
        size_gb,
        volume_type,
    })
}

/// ingress ノードをパース
///
/// 例: `ingress port=8443 protocol="tcp" cidr="10.0.0.0/8" description="admin"`
/// 範囲指定: `ingress from-port=7000 to-port=7100`
fn parse_ingress(node: &KdlNode, tier: TierType) -> Result<TierIngress> {
    let port: Option<u16> = prop_int(node, "port")?;
    let from_port = match prop_int(node, "from-port")? {
        Some(p) => p,
        None => port.ok_or_else(|| {
            ConfigError::InvalidConfig(format!("tier '{}' の ingress に port が必要です", tier))
        })?,
    };
    let to_port = prop_int(node, "to-port")?.unwrap_or(from_port);

    let protocol = match prop_string(node, "protocol") {
        Some(p) => IngressProtocol::parse(&p)
            .ok_or_else(|| ConfigError::InvalidConfig(format!("未知のプロトコル: {}", p)))?,
        None => IngressProtocol::Tcp,
    };

    let cidr = prop_string(node, "cidr")
        .map(|c| {
            CidrBlock::parse(&c)
                .ok_or_else(|| ConfigError::InvalidConfig(format!("無効な CIDR: {}", c)))
        })
        .transpose()?;

    Ok(TierIngress {
        from_port,
        to_port,
        protocol,
        cidr,
        description: prop_string(node, "description"),
    })
}

/// customer-mapping ノードをパース
fn parse_customer_mapping(node: &KdlNode) -> Result<CustomerMapping> {
    let customer_name = required_string(node, "customer-mapping")?;
    let cidr_str = prop_string(node, "cidr").ok_or_else(|| {
        ConfigError::InvalidConfig(format!("customer-mapping {} requires cidr", customer_name))
    })?;
    let cidr = CidrBlock::parse(&cidr_str)
        .ok_or_else(|| ConfigError::InvalidConfig(format!("無効な CIDR: {}", cidr_str)))?;
    let port = prop_int(node, "port")?.ok_or_else(|| {
        ConfigError::InvalidConfig(format!("customer-mapping {} requires port", customer_name))
    })?;
    let protocol = match prop_string(node, "protocol") {
        Some(p) => LbProtocol::parse(&p)
            .ok_or_else(|| ConfigError::InvalidConfig(format!("未知のプロトコル: {}", p)))?,
        None => LbProtocol::Tcp,
    };

    Ok(CustomerMapping {
        customer_name,
        cidr,
        port,
        protocol,
        health_check_port: prop_int(node, "health-check-port")?,
    })
}
