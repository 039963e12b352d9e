//! 環境定義
//!
//! サブドメイン、プライベートゾーン、リージョン、共有リソースなど、
//! プランニング時にクラスター横断で参照されるコンテキスト。

use super::network::{CidrBlock, Placement, SubnetSource, VpcLayout};
use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// プライベートホストゾーン
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateZone {
    pub name: String,
    pub id: String,
}

/// リージョンごとの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// リージョン名（us-east-1 など）
    pub name: String,
    pub vpc_cidr: CidrBlock,
    /// ボリューム暗号化キー
    pub encryption_key: String,
    pub vpc: VpcLayout,
}

/// 全インスタンスが共有するハンドル
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedHandles {
    pub instance_role: String,
    pub key_pair: String,
    pub file_system: Option<String>,
}

/// イメージ別名 → リージョンごとのイメージ ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageCatalog(BTreeMap<String, BTreeMap<String, String>>);

impl ImageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        alias: impl Into<String>,
        region: impl Into<String>,
        image_id: impl Into<String>,
    ) {
        self.0
            .entry(alias.into())
            .or_default()
            .insert(region.into(), image_id.into());
    }

    /// 別名ならリージョンのイメージ ID、そうでなければそのまま返す
    pub fn resolve<'a>(&'a self, image: &'a str, region: &str) -> &'a str {
        self.0
            .get(image)
            .and_then(|regions| regions.get(region))
            .map(String::as_str)
            .unwrap_or(image)
    }

    pub fn is_alias(&self, image: &str) -> bool {
        self.0.contains_key(image)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 環境設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub env_subdomain: String,
    pub zone: PrivateZone,
    /// SSH を許可する運用ネットワーク
    pub operations_cidr: CidrBlock,
    /// 全トラフィックを許可する内部アドレス範囲
    pub internal_cidr: CidrBlock,
    /// ネットワーク種別ごとのベースライン CIDR ブロック
    #[serde(default)]
    pub baseline_blocks: Vec<CidrBlock>,
    pub primary: RegionConfig,
    pub recovery: Option<RegionConfig>,
    #[serde(default)]
    pub shared: SharedHandles,
    #[serde(default)]
    pub images: ImageCatalog,
}

impl EnvironmentConfig {
    /// 環境設定の整合性を検証
    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        let scope = format!("environment:{}", self.name);

        if self.env_subdomain.trim().is_empty() {
            return Err(PlanError::configuration(
                scope,
                "env-subdomain",
                "サブドメインが空です",
            ));
        }
        if self.zone.name.trim().is_empty() || self.zone.id.trim().is_empty() {
            return Err(PlanError::configuration(
                scope,
                "zone",
                "ゾーン名とゾーン ID の両方が必要です",
            ));
        }
        if self.primary.vpc.subnets_for(Placement::Compute).is_empty() {
            return Err(PlanError::configuration(
                scope,
                "region",
                format!(
                    "プライマリーリージョン {} にコンピュートサブネットがありません",
                    self.primary.name
                ),
            ));
        }
        if let Some(recovery) = &self.recovery {
            if recovery.name == self.primary.name {
                return Err(PlanError::configuration(
                    scope,
                    "region",
                    "プライマリーとリカバリーが同じリージョンです",
                ));
            }
            if recovery.vpc.subnets_for(Placement::Compute).is_empty() {
                return Err(PlanError::configuration(
                    scope,
                    "region",
                    format!(
                        "リカバリーリージョン {} にコンピュートサブネットがありません",
                        recovery.name
                    ),
                ));
            }
        }
        if self.shared.instance_role.trim().is_empty() || self.shared.key_pair.trim().is_empty()
        {
            return Err(PlanError::configuration(
                scope,
                "shared",
                "instance-role と key-pair が必要です",
            ));
        }

        Ok(())
    }
}
