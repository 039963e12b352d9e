//! モデル定義
//!
//! クラスター、ティア、環境、ネットワークの宣言的なデータモデル。
//! 各モデルは機能ごとにモジュールに分離されています。

mod cluster;
mod environment;
mod network;
mod tier;

// Re-exports
pub use cluster::*;
pub use environment::*;
pub use network::*;
pub use tier::*;

/// ロード済みプロジェクト
///
/// 1つの環境と、その環境で展開するクラスター群。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub name: String,
    pub environment: EnvironmentConfig,
    /// ファイル名順のクラスター
    pub clusters: Vec<ClusterConfiguration>,
}

impl Project {
    pub fn cluster(&self, name: &str) -> Option<&ClusterConfiguration> {
        self.clusters.iter().find(|c| c.name() == name)
    }

    /// プロジェクト全体を検証
    pub fn validate(&self) -> std::result::Result<(), crate::error::PlanError> {
        self.environment.validate()?;
        for cluster in &self.clusters {
            cluster.validate()?;
            if self.environment.recovery.is_none() {
                requires_no_recovery(cluster)?;
            }
        }
        Ok(())
    }
}

/// リカバリーリージョンがない環境でリカバリーを前提とする宣言を拒否
fn requires_no_recovery(
    cluster: &ClusterConfiguration,
) -> std::result::Result<(), crate::error::PlanError> {
    use crate::error::PlanError;

    if cluster.properties.active_region == ActiveRegion::Recovery {
        return Err(PlanError::configuration(
            "*",
            "active-region",
            format!(
                "クラスター '{}' は recovery を指定していますが、環境にリカバリーリージョンがありません",
                cluster.name()
            ),
        ));
    }
    if let Some(tier) = cluster.tiers.iter().find(|t| t.has_recovery()) {
        return Err(PlanError::configuration(
            tier.tier.as_str(),
            "recovery-ami-ids",
            "環境にリカバリーリージョンがありません",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> EnvironmentConfig {
        EnvironmentConfig {
            name: "prod".to_string(),
            env_subdomain: "prod".to_string(),
            zone: PrivateZone {
                name: "corp.internal".to_string(),
                id: "Z0PRIVATE".to_string(),
            },
            operations_cidr: CidrBlock::parse("10.250.0.0/24").unwrap(),
            internal_cidr: CidrBlock::parse("10.0.0.0/8").unwrap(),
            baseline_blocks: vec![],
            primary: RegionConfig {
                name: "us-east-1".to_string(),
                vpc_cidr: CidrBlock::parse("10.20.0.0/16").unwrap(),
                encryption_key: "alias/prod-use1".to_string(),
                vpc: VpcLayout::Spoke(SpokeVpc {
                    compute: vec!["subnet-a".to_string()],
                    ..Default::default()
                }),
            },
            recovery: None,
            shared: SharedHandles {
                instance_role: "role/app".to_string(),
                key_pair: "ops".to_string(),
                file_system: None,
            },
            images: ImageCatalog::new(),
        }
    }

    #[test]
    fn test_project_lookup_and_validate() {
        let project = Project {
            name: "acme".to_string(),
            environment: environment(),
            clusters: vec![ClusterConfiguration {
                properties: ClusterProperties {
                    fi_name: "acme".to_string(),
                    cluster_name: "acme-core".to_string(),
                    ..Default::default()
                },
                tiers: vec![TierConfiguration::new(TierType::Web, 1, "ami", "t3.small")],
                db_configs: vec![],
            }],
        };

        assert!(project.validate().is_ok());
        assert!(project.cluster("acme-core").is_some());
        assert!(project.cluster("other").is_none());
    }

    #[test]
    fn test_recovery_declarations_need_recovery_region() {
        let mut tier = TierConfiguration::new(TierType::Web, 1, "ami", "t3.small");
        tier.recovery_ami_ids = IndexedOverrides::from_list(["ami-dr"]);
        let mut project = Project {
            name: "acme".to_string(),
            environment: environment(),
            clusters: vec![ClusterConfiguration {
                properties: ClusterProperties {
                    fi_name: "acme".to_string(),
                    cluster_name: "acme-core".to_string(),
                    ..Default::default()
                },
                tiers: vec![tier],
                db_configs: vec![],
            }],
        };
        assert!(matches!(
            project.validate(),
            Err(crate::error::PlanError::Configuration { field: "recovery-ami-ids", .. })
        ));

        project.clusters[0].tiers[0].recovery_ami_ids = IndexedOverrides::new();
        project.clusters[0].properties.active_region = ActiveRegion::Recovery;
        assert!(matches!(
            project.validate(),
            Err(crate::error::PlanError::Configuration { field: "active-region", .. })
        ));
    }

    #[test]
    fn test_environment_same_region_twice() {
        let mut env = environment();
        env.recovery = Some(env.primary.clone());
        assert!(env.validate().is_err());
    }

    #[test]
    fn test_environment_without_compute_subnets() {
        let mut env = environment();
        env.primary.vpc = VpcLayout::Isolated(IsolatedVpc::default());
        assert!(matches!(
            env.validate(),
            Err(crate::error::PlanError::Configuration { field: "region", .. })
        ));
    }

    #[test]
    fn test_project_serialization() {
        let project = Project {
            name: "acme".to_string(),
            environment: environment(),
            clusters: vec![],
        };
        let json = serde_json::to_string(&project).unwrap();
        assert!(json.contains("corp.internal"));
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
    }
}
