//! ティア定義
//!
//! クラスター内の均質なロール（web, app, mq など）ごとの宣言。

use super::network::{CidrBlock, IngressProtocol, LbProtocol};
use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// ホスト名テンプレートのトークン
pub mod tokens {
    pub const FI_NAME: &str = "{fiName}";
    pub const ENV_SUBDOMAIN: &str = "{envSubdomain}";
    pub const TIER: &str = "{tier}";
    pub const INSTANCE_INDEX: &str = "{instanceIndex}";
}

/// ティア種別
///
/// ワークロードのロールと、デフォルトのポート／イングレスプロファイルを同時に表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierType {
    App,
    Web,
    Bld,
    Rt,
    Lbs,
    Mq,
    Msi,
    Rpt,
    Sim,
    Bat,
    Db,
    Cfm,
}

impl TierType {
    pub const ALL: [TierType; 12] = [
        TierType::App,
        TierType::Web,
        TierType::Bld,
        TierType::Rt,
        TierType::Lbs,
        TierType::Mq,
        TierType::Msi,
        TierType::Rpt,
        TierType::Sim,
        TierType::Bat,
        TierType::Db,
        TierType::Cfm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierType::App => "app",
            TierType::Web => "web",
            TierType::Bld => "bld",
            TierType::Rt => "rt",
            TierType::Lbs => "lbs",
            TierType::Mq => "mq",
            TierType::Msi => "msi",
            TierType::Rpt => "rpt",
            TierType::Sim => "sim",
            TierType::Bat => "bat",
            TierType::Db => "db",
            TierType::Cfm => "cfm",
        }
    }

    /// 文字列からパース
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == lower)
    }
}

impl std::fmt::Display for TierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 位置指定オーバーライド
///
/// インスタンス index → 値 の疎なマップ。配列の範囲外アクセスで暗黙に
/// 「未定義」になるのではなく、存在しない index は明示的に `None` を返す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedOverrides(BTreeMap<u32, String>);

impl IndexedOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 位置指定のリストから作成（`None` の位置はオーバーライドなし）
    pub fn from_positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let entries = values
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as u32, v.into())))
            .collect();
        Self(entries)
    }

    /// 欠落のない連続リストから作成
    pub fn from_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_positional(values.into_iter().map(Some))
    }

    pub fn insert(&mut self, index: u32, value: impl Into<String>) {
        self.0.insert(index, value.into());
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.0.contains_key(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn max_index(&self) -> Option<u32> {
        self.0.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(i, v)| (*i, v.as_str()))
    }
}

/// ホスト名の決定方法
///
/// パターンとオーバーライドリストは排他。どちらもなければ固定のフォールバックを使う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum HostnameStrategy {
    /// 4つのトークンを置換するテンプレート
    Pattern(String),
    /// index ごとのリテラルなホスト名
    Override(IndexedOverrides),
    /// `{fiName}{envSubdomain}{tier}{instanceIndex}`
    #[default]
    Fallback,
}

/// ボリューム定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// デバイス名（/dev/sdf など）
    pub device_name: String,
    /// サイズ (GB)
    pub size_gb: u32,
    /// ボリュームタイプ（gp3, io2 など）
    pub volume_type: String,
}

/// ティア固有のイングレスルール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierIngress {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: IngressProtocol,
    /// 未指定の場合はセキュリティグループ自身の CIDR ブロック
    pub cidr: Option<CidrBlock>,
    pub description: Option<String>,
}

/// 顧客ネットワークとロードバランサーの対応
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMapping {
    pub customer_name: String,
    pub cidr: CidrBlock,
    pub port: u16,
    pub protocol: LbProtocol,
    /// 未指定の場合は `port` を使う
    pub health_check_port: Option<u16>,
}

/// ティア設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfiguration {
    pub tier: TierType,
    /// プライマリーインスタンス数
    pub count: u32,
    /// デフォルトのイメージ
    pub ami: String,
    /// プライマリー用の index ごとのイメージ
    #[serde(default)]
    pub ami_pattern_override: IndexedOverrides,
    /// リカバリー用の index ごとのイメージ。エントリーの存在がリカバリーインスタンス作成の唯一の条件
    #[serde(default)]
    pub recovery_ami_ids: IndexedOverrides,
    pub instance_type: String,
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
    #[serde(default)]
    pub tier_ingresses: Vec<TierIngress>,
    #[serde(default)]
    pub hostname: HostnameStrategy,
    #[serde(default)]
    pub customer_mappings: Vec<CustomerMapping>,
    #[serde(default)]
    pub create_volumes_in_recovery: bool,
}

impl TierConfiguration {
    /// 必須項目だけでティア設定を作成
    pub fn new(
        tier: TierType,
        count: u32,
        ami: impl Into<String>,
        instance_type: impl Into<String>,
    ) -> Self {
        Self {
            tier,
            count,
            ami: ami.into(),
            ami_pattern_override: IndexedOverrides::new(),
            recovery_ami_ids: IndexedOverrides::new(),
            instance_type: instance_type.into(),
            volumes: Vec::new(),
            tier_ingresses: Vec::new(),
            hostname: HostnameStrategy::Fallback,
            customer_mappings: Vec::new(),
            create_volumes_in_recovery: false,
        }
    }

    /// index にリカバリーインスタンスが存在するか
    pub fn has_recovery_at(&self, index: u32) -> bool {
        self.recovery_ami_ids.contains(index)
    }

    /// リカバリーインスタンスを一つでも持つか
    pub fn has_recovery(&self) -> bool {
        !self.recovery_ami_ids.is_empty()
    }

    /// 構造的な整合性を検証
    ///
    /// 位置指定オーバーライドの範囲はロード時にまとめて検証する。
    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        let tier = self.tier.as_str();

        if self.ami.trim().is_empty() {
            return Err(PlanError::configuration(tier, "ami", "イメージが空です"));
        }
        if self.instance_type.trim().is_empty() {
            return Err(PlanError::configuration(
                tier,
                "instance-type",
                "インスタンスタイプが空です",
            ));
        }

        if let Some(max) = self.ami_pattern_override.max_index()
            && max >= self.count
        {
            return Err(PlanError::configuration(
                tier,
                "ami-pattern-override",
                format!("index {} にエントリーがありますが count は {} です", max, self.count),
            ));
        }

        // リカバリーはプライマリーのホスト名を前提とする
        if let Some(max) = self.recovery_ami_ids.max_index()
            && max >= self.count
        {
            return Err(PlanError::Linkage {
                tier: tier.to_string(),
                index: max,
                message: format!(
                    "recovery-ami-ids にエントリーがありますが、対応するプライマリーインスタンスがありません (count {})",
                    self.count
                ),
            });
        }

        match &self.hostname {
            HostnameStrategy::Override(overrides) => {
                if let Some(missing) = (0..self.count).find(|i| !overrides.contains(*i)) {
                    return Err(PlanError::configuration(
                        tier,
                        "hostname-pattern-override",
                        format!(
                            "{} 件のエントリーが必要ですが index {} がありません",
                            self.count, missing
                        ),
                    ));
                }
                if let Some(max) = overrides.max_index()
                    && max >= self.count
                {
                    return Err(PlanError::configuration(
                        tier,
                        "hostname-pattern-override",
                        format!("index {} にエントリーがありますが count は {} です", max, self.count),
                    ));
                }
                let mut seen = BTreeSet::new();
                for (_, hostname) in overrides.iter() {
                    if !seen.insert(hostname) {
                        return Err(PlanError::configuration(
                            tier,
                            "hostname-pattern-override",
                            format!("ホスト名 '{}' が重複しています", hostname),
                        ));
                    }
                }
            }
            HostnameStrategy::Pattern(pattern) => {
                if self.count > 1 && !pattern.contains(tokens::INSTANCE_INDEX) {
                    return Err(PlanError::configuration(
                        tier,
                        "hostname-pattern",
                        format!(
                            "複数インスタンスのパターンには {} が必要です",
                            tokens::INSTANCE_INDEX
                        ),
                    ));
                }
            }
            HostnameStrategy::Fallback => {}
        }

        for volume in &self.volumes {
            if volume.size_gb == 0 {
                return Err(PlanError::configuration(
                    tier,
                    "volume",
                    format!("{} のサイズが 0 です", volume.device_name),
                ));
            }
        }

        for ingress in &self.tier_ingresses {
            if ingress.to_port < ingress.from_port {
                return Err(PlanError::configuration(
                    tier,
                    "ingress",
                    format!(
                        "ポート範囲が不正です ({}-{})",
                        ingress.from_port, ingress.to_port
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(count: u32) -> TierConfiguration {
        TierConfiguration::new(TierType::Web, count, "ami-base", "m5.large")
    }

    #[test]
    fn test_tier_type_parse() {
        assert_eq!(TierType::parse("web"), Some(TierType::Web));
        assert_eq!(TierType::parse("RT"), Some(TierType::Rt));
        assert_eq!(TierType::parse("nope"), None);
        for tier in TierType::ALL {
            assert_eq!(TierType::parse(tier.as_str()), Some(tier));
        }
    }

    #[test]
    fn test_indexed_overrides_sparse() {
        let overrides = IndexedOverrides::from_positional([Some("p0"), None, Some("p2")]);
        assert_eq!(overrides.get(0), Some("p0"));
        assert_eq!(overrides.get(1), None);
        assert_eq!(overrides.get(2), Some("p2"));
        assert_eq!(overrides.get(3), None);
        assert_eq!(overrides.max_index(), Some(2));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_validate_ok_with_no_recovery_and_large_count() {
        let tier = web(22);
        assert!(tier.validate().is_ok());
        assert!(!tier.has_recovery());
    }

    #[test]
    fn test_validate_ami_override_beyond_count() {
        let mut tier = web(1);
        tier.ami_pattern_override = IndexedOverrides::from_list(["p0", "p1"]);
        let err = tier.validate().unwrap_err();
        assert!(matches!(
            err,
            PlanError::Configuration {
                field: "ami-pattern-override",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_recovery_without_primary_is_linkage_error() {
        let mut tier = web(1);
        tier.recovery_ami_ids = IndexedOverrides::from_list(["r0", "r1"]);
        let err = tier.validate().unwrap_err();
        assert!(matches!(err, PlanError::Linkage { index: 1, .. }));
    }

    #[test]
    fn test_validate_hostname_override_shorter_than_count() {
        let mut tier = web(3);
        tier.hostname = HostnameStrategy::Override(IndexedOverrides::from_list(["a", "b"]));
        let err = tier.validate().unwrap_err();
        assert!(matches!(
            err,
            PlanError::Configuration {
                field: "hostname-pattern-override",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_hostname_override_duplicates() {
        let mut tier = web(2);
        tier.hostname = HostnameStrategy::Override(IndexedOverrides::from_list(["a", "a"]));
        assert!(tier.validate().is_err());
    }

    #[test]
    fn test_validate_pattern_without_index_token() {
        let mut tier = web(2);
        tier.hostname = HostnameStrategy::Pattern("{fiName}{tier}".to_string());
        assert!(tier.validate().is_err());

        // 1台なら index トークンなしでも一意
        let mut single = web(1);
        single.hostname = HostnameStrategy::Pattern("{fiName}{tier}".to_string());
        assert!(single.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_ami() {
        let tier = TierConfiguration::new(TierType::App, 1, " ", "m5.large");
        assert!(matches!(
            tier.validate(),
            Err(PlanError::Configuration { field: "ami", .. })
        ));
    }
}
