//! プランニングコンテキスト
//!
//! 共有ハンドルや参照表をすべて明示的に保持し、各プランナーへ引数で渡す。

use crate::plan::Region;
use crate::ports::PortTables;
use tierplan_core::{
    CidrBlock, EnvironmentConfig, ImageCatalog, PrivateZone, RegionConfig, SharedHandles,
};

/// 1 回のプランニングで共有される読み取り専用の入力
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub environment: String,
    pub env_subdomain: String,
    pub zone: PrivateZone,
    pub primary: RegionConfig,
    pub recovery: Option<RegionConfig>,
    pub baseline_blocks: Vec<CidrBlock>,
    pub operations_cidr: CidrBlock,
    pub internal_cidr: CidrBlock,
    pub shared: SharedHandles,
    pub images: ImageCatalog,
    pub ports: PortTables,
}

impl PlanningContext {
    /// 環境設定から標準のポート表でコンテキストを作る
    pub fn new(env: &EnvironmentConfig) -> Self {
        Self::with_ports(env, PortTables::default())
    }

    pub fn with_ports(env: &EnvironmentConfig, ports: PortTables) -> Self {
        Self {
            environment: env.name.clone(),
            env_subdomain: env.env_subdomain.clone(),
            zone: env.zone.clone(),
            primary: env.primary.clone(),
            recovery: env.recovery.clone(),
            baseline_blocks: env.baseline_blocks.clone(),
            operations_cidr: env.operations_cidr.clone(),
            internal_cidr: env.internal_cidr.clone(),
            shared: env.shared.clone(),
            images: env.images.clone(),
            ports,
        }
    }

    pub fn region(&self, region: Region) -> Option<&RegionConfig> {
        match region {
            Region::Primary => Some(&self.primary),
            Region::Recovery => self.recovery.as_ref(),
        }
    }

    /// 対になるリージョン
    pub fn paired_region(&self, region: Region) -> Option<&RegionConfig> {
        match region {
            Region::Primary => self.recovery.as_ref(),
            Region::Recovery => Some(&self.primary),
        }
    }

    /// `{hostname}.{envSubdomain}.{zone}`
    pub fn fqdn(&self, hostname: &str) -> String {
        format!("{}.{}.{}", hostname, self.env_subdomain, self.zone.name)
    }
}
