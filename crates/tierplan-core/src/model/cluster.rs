//! クラスター定義

use super::network::LbProtocol;
use super::tier::{TierConfiguration, TierType, tokens};
use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// DNS が向くリージョン
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveRegion {
    #[default]
    Default,
    Recovery,
}

impl ActiveRegion {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" | "primary" => Some(Self::Default),
            "recovery" => Some(Self::Recovery),
            _ => None,
        }
    }
}

/// クラスター種別（ティアのポート表を選択する）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterType {
    #[default]
    Workload,
    DatabaseSupport,
}

impl ClusterType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "workload" => Some(Self::Workload),
            "database-support" | "database_support" => Some(Self::DatabaseSupport),
            _ => None,
        }
    }
}

/// 公開イングレスの部分定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIngressRule {
    pub tier: TierType,
    pub port: u16,
    pub protocol: LbProtocol,
    /// ヘルスチェックパス（HTTP/HTTPS のみ）
    pub health_check: Option<String>,
}

/// クラスター共通プロパティ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProperties {
    pub fi_name: String,
    pub cluster_name: String,
    pub construct_name_pattern: Option<String>,
    #[serde(default)]
    pub public_ingress_partial: Vec<PublicIngressRule>,
    #[serde(default)]
    pub use_db_configs: bool,
    #[serde(default)]
    pub active_region: ActiveRegion,
    #[serde(default)]
    pub cluster_type: ClusterType,
}

/// データベース接続定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub identifier: String,
    /// プライベートゾーンに登録する CNAME 名
    pub route53_name: String,
    pub engine: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    /// リカバリーリージョンにリードレプリカを作るか
    #[serde(default)]
    pub replicate_to_recovery: bool,
}

/// クラスター定義
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfiguration {
    pub properties: ClusterProperties,
    /// 宣言順のティア
    pub tiers: Vec<TierConfiguration>,
    #[serde(default)]
    pub db_configs: Vec<DbConfig>,
}

impl ClusterConfiguration {
    pub fn name(&self) -> &str {
        &self.properties.cluster_name
    }

    pub fn tier(&self, tier: TierType) -> Option<&TierConfiguration> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// クラスター全体の整合性を検証
    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        let props = &self.properties;

        if props.fi_name.trim().is_empty() {
            return Err(PlanError::configuration("*", "fi-name", "fi-name が空です"));
        }

        if let Some(pattern) = &props.construct_name_pattern {
            for token in [tokens::TIER, tokens::INSTANCE_INDEX] {
                if !pattern.contains(token) {
                    return Err(PlanError::configuration(
                        "*",
                        "construct-name-pattern",
                        format!("パターンには {} が必要です", token),
                    ));
                }
            }
        }

        let mut seen = BTreeSet::new();
        for tier in &self.tiers {
            if !seen.insert(tier.tier) {
                return Err(PlanError::configuration(
                    tier.tier.as_str(),
                    "tier",
                    "同じティアが複数回宣言されています",
                ));
            }
            tier.validate()?;
        }

        for rule in &props.public_ingress_partial {
            if !seen.contains(&rule.tier) {
                return Err(PlanError::configuration(
                    rule.tier.as_str(),
                    "public-ingress",
                    "宣言されていないティアを参照しています",
                ));
            }
        }

        let mut names = BTreeSet::new();
        for db in &self.db_configs {
            if !names.insert(db.route53_name.as_str()) {
                return Err(PlanError::configuration(
                    "*",
                    "database",
                    format!("route53-name '{}' が重複しています", db.route53_name),
                ));
            }
        }

        Ok(())
    }
}
