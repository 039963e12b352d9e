//! tierplan planner: ティア展開とディザスタリカバリーのリンケージ
//!
//! ロード済みの [`ClusterConfiguration`](tierplan_core::ClusterConfiguration) から、
//! クラウドに作成すべきリソースを宣言した [`ClusterPlan`] を組み立てます。
//! プランナーはクラウド API を呼ばず、適用時にしか決まらない値は
//! [`AddressRef`] として残します。
//!
//! # 流れ
//!
//! 1. ティアごとにセキュリティグループを生成（プライマリー、あればリカバリー）
//! 2. `count` 個のプライマリーインスタンスを展開
//! 3. `recovery-ami-ids` のエントリーごとにリカバリーインスタンスをリンク
//! 4. ロードバランサー、データベース、DNS レコード

pub mod ami;
pub mod context;
pub mod database;
pub mod dns;
pub mod ingress;
pub mod naming;
pub mod orchestrator;
pub mod plan;
pub mod ports;
pub mod recovery;
pub mod security_group;
pub mod tier;

pub use context::PlanningContext;
pub use orchestrator::{plan_cluster, plan_project};
pub use plan::*;
pub use ports::{PortTable, PortTables};
pub use recovery::RecoveryLinkage;
pub use tierplan_core::PlanError;

pub type Result<T> = std::result::Result<T, PlanError>;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::PlanningContext;
    use tierplan_core::{
        CidrBlock, ClusterProperties, EnvironmentConfig, ImageCatalog, PrivateZone, RegionConfig,
        SharedHandles, SpokeVpc, VpcLayout,
    };

    fn cidr(s: &str) -> CidrBlock {
        CidrBlock::parse(s).unwrap()
    }

    fn subnets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    pub fn environment() -> EnvironmentConfig {
        EnvironmentConfig {
            name: "prod".to_string(),
            env_subdomain: "prod".to_string(),
            zone: PrivateZone {
                name: "corp.internal".to_string(),
                id: "Z0PRIVATE".to_string(),
            },
            operations_cidr: cidr("10.250.0.0/24"),
            internal_cidr: cidr("10.0.0.0/8"),
            baseline_blocks: vec![cidr("10.100.0.0/16")],
            primary: RegionConfig {
                name: "us-east-1".to_string(),
                vpc_cidr: cidr("10.20.0.0/16"),
                encryption_key: "alias/prod-use1".to_string(),
                vpc: VpcLayout::Spoke(SpokeVpc {
                    public: subnets(&["subnet-pub"]),
                    compute: subnets(&["subnet-a", "subnet-b"]),
                    data: subnets(&["subnet-db"]),
                }),
            },
            recovery: Some(RegionConfig {
                name: "us-west-2".to_string(),
                vpc_cidr: cidr("10.30.0.0/16"),
                encryption_key: "alias/prod-usw2".to_string(),
                vpc: VpcLayout::Spoke(SpokeVpc {
                    public: Vec::new(),
                    compute: subnets(&["subnet-dr-a"]),
                    data: subnets(&["subnet-dr-db"]),
                }),
            }),
            shared: SharedHandles {
                instance_role: "role/app".to_string(),
                key_pair: "ops-key".to_string(),
                file_system: None,
            },
            images: ImageCatalog::new(),
        }
    }

    pub fn context() -> PlanningContext {
        PlanningContext::new(&environment())
    }

    pub fn props() -> ClusterProperties {
        ClusterProperties {
            fi_name: "acme".to_string(),
            cluster_name: "acme-core".to_string(),
            ..Default::default()
        }
    }
}
