//! ホスト名と construct name の生成

use crate::Result;
use tierplan_core::{ClusterProperties, HostnameStrategy, PlanError, TierConfiguration, tokens};

/// DR 側の名前に付く接尾辞
pub const DR_SUFFIX: &str = "-dr";

/// hostname-pattern がない場合の既定パターン
pub const FALLBACK_HOSTNAME_PATTERN: &str = "{fiName}{envSubdomain}{tier}{instanceIndex}";

/// construct-name-pattern がない場合の既定パターン
pub const FALLBACK_CONSTRUCT_PATTERN: &str = "{fiName}-{tier}-{instanceIndex}";

/// 位置を 1 始まり・2 桁以上のゼロ埋め文字列にする
pub fn format_index(index: u32) -> String {
    format!("{:02}", u64::from(index) + 1)
}

/// 4 つのトークンを置換（順不同）
pub fn substitute(
    pattern: &str,
    fi_name: &str,
    env_subdomain: &str,
    tier: &str,
    instance_index: &str,
) -> String {
    pattern
        .replace(tokens::FI_NAME, fi_name)
        .replace(tokens::ENV_SUBDOMAIN, env_subdomain)
        .replace(tokens::TIER, tier)
        .replace(tokens::INSTANCE_INDEX, instance_index)
}

/// 置換されずに残った `{...}` トークン
fn residual_token(value: &str) -> Option<&str> {
    let start = value.find('{')?;
    let end = value[start..].find('}')?;
    Some(&value[start..=start + end])
}

fn with_dr_suffix(name: String, is_recovery: bool) -> String {
    if is_recovery {
        name + DR_SUFFIX
    } else {
        name
    }
}

/// ホスト名を解決
///
/// override リストがあればその位置の値をそのまま使い、置換はしない。
pub fn hostname(
    tier: &TierConfiguration,
    props: &ClusterProperties,
    env_subdomain: &str,
    index: u32,
    is_recovery: bool,
) -> Result<String> {
    let tier_name = tier.tier.as_str();
    if index >= tier.count {
        return Err(PlanError::Resolution {
            tier: tier_name.to_string(),
            index,
            field: "count",
        });
    }

    let resolved = match &tier.hostname {
        HostnameStrategy::Override(overrides) => overrides
            .get(index)
            .map(str::to_string)
            .ok_or_else(|| PlanError::Resolution {
                tier: tier_name.to_string(),
                index,
                field: "hostname-pattern-override",
            })?,
        HostnameStrategy::Pattern(pattern) => {
            render(pattern, props, env_subdomain, tier_name, index, "hostname-pattern")?
        }
        HostnameStrategy::Fallback => render(
            FALLBACK_HOSTNAME_PATTERN,
            props,
            env_subdomain,
            tier_name,
            index,
            "hostname-pattern",
        )?,
    };

    Ok(with_dr_suffix(resolved, is_recovery))
}

/// construct name を解決
pub fn construct_name(
    tier: &TierConfiguration,
    props: &ClusterProperties,
    env_subdomain: &str,
    index: u32,
    is_recovery: bool,
) -> Result<String> {
    let pattern = props
        .construct_name_pattern
        .as_deref()
        .unwrap_or(FALLBACK_CONSTRUCT_PATTERN);
    let name = render(
        pattern,
        props,
        env_subdomain,
        tier.tier.as_str(),
        index,
        "construct-name-pattern",
    )?;
    Ok(with_dr_suffix(name, is_recovery))
}

fn render(
    pattern: &str,
    props: &ClusterProperties,
    env_subdomain: &str,
    tier: &str,
    index: u32,
    field: &'static str,
) -> Result<String> {
    let value = substitute(
        pattern,
        &props.fi_name,
        env_subdomain,
        tier,
        &format_index(index),
    );
    if let Some(token) = residual_token(&value) {
        return Err(PlanError::configuration(
            tier,
            field,
            format!("未知のトークン {} が残っています", token),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierplan_core::{IndexedOverrides, TierType};

    fn props() -> ClusterProperties {
        ClusterProperties {
            fi_name: "acme".to_string(),
            cluster_name: "acme-core".to_string(),
            ..Default::default()
        }
    }

    fn web(count: u32, hostname: HostnameStrategy) -> TierConfiguration {
        let mut tier = TierConfiguration::new(TierType::Web, count, "ami-base", "m5.large");
        tier.hostname = hostname;
        tier
    }

    #[test]
    fn test_format_index() {
        assert_eq!(format_index(0), "01");
        assert_eq!(format_index(8), "09");
        assert_eq!(format_index(9), "10");
        assert_eq!(format_index(99), "100");
    }

    #[test]
    fn test_pattern_substitution() {
        let pattern = format!(
            "{}{}{}{}",
            tokens::FI_NAME,
            tokens::ENV_SUBDOMAIN,
            tokens::TIER,
            tokens::INSTANCE_INDEX
        );
        let tier = web(2, HostnameStrategy::Pattern(pattern));

        let name = hostname(&tier, &props(), "prod", 0, false).unwrap();
        assert_eq!(name, "acmeprodweb01");
        assert!(!name.contains('{'));

        let dr = hostname(&tier, &props(), "prod", 0, true).unwrap();
        assert_eq!(dr, "acmeprodweb01-dr");
    }

    #[test]
    fn test_token_order_is_free() {
        let tier = web(
            1,
            HostnameStrategy::Pattern("{instanceIndex}-{tier}.{fiName}{envSubdomain}".to_string()),
        );
        assert_eq!(
            hostname(&tier, &props(), "uat", 0, false).unwrap(),
            "01-web.acmeuat"
        );
    }

    #[test]
    fn test_fallback_pattern() {
        let tier = web(3, HostnameStrategy::Fallback);
        assert_eq!(
            hostname(&tier, &props(), "prod", 2, false).unwrap(),
            "acmeprodweb03"
        );
    }

    #[test]
    fn test_override_list_is_literal() {
        let tier = web(
            2,
            HostnameStrategy::Override(IndexedOverrides::from_list(["legacy-{tier}", "legacy-b"])),
        );
        assert_eq!(
            hostname(&tier, &props(), "prod", 0, false).unwrap(),
            "legacy-{tier}"
        );
        assert_eq!(
            hostname(&tier, &props(), "prod", 1, true).unwrap(),
            "legacy-b-dr"
        );
    }

    #[test]
    fn test_override_gap_is_resolution_error() {
        let mut overrides = IndexedOverrides::new();
        overrides.insert(0, "only-a");
        let tier = web(2, HostnameStrategy::Override(overrides));

        let err = hostname(&tier, &props(), "prod", 1, false).unwrap_err();
        assert_eq!(
            err,
            PlanError::Resolution {
                tier: "web".to_string(),
                index: 1,
                field: "hostname-pattern-override",
            }
        );
    }

    #[test]
    fn test_index_beyond_count() {
        let tier = web(1, HostnameStrategy::Fallback);
        assert!(matches!(
            hostname(&tier, &props(), "prod", 1, false),
            Err(PlanError::Resolution { index: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_token_is_configuration_error() {
        let tier = web(1, HostnameStrategy::Pattern("{fiName}{region}{instanceIndex}".to_string()));
        assert!(matches!(
            hostname(&tier, &props(), "prod", 0, false),
            Err(PlanError::Configuration {
                field: "hostname-pattern",
                ..
            })
        ));
    }

    #[test]
    fn test_construct_name() {
        let tier = web(2, HostnameStrategy::Fallback);
        assert_eq!(
            construct_name(&tier, &props(), "prod", 1, false).unwrap(),
            "acme-web-02"
        );
        assert_eq!(
            construct_name(&tier, &props(), "prod", 1, true).unwrap(),
            "acme-web-02-dr"
        );

        let custom = ClusterProperties {
            construct_name_pattern: Some("{fiName}{envSubdomain}-{tier}{instanceIndex}".to_string()),
            ..props()
        };
        assert_eq!(
            construct_name(&tier, &custom, "prod", 0, false).unwrap(),
            "acmeprod-web01"
        );
    }
}
