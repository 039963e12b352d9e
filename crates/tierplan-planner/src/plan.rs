//! プラン出力の型
//!
//! プランナーが一度だけ生成し、以後変更されない値。
//! 順序付きコレクションのみを使うため、同じ入力からは常に同じ JSON が得られる。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tierplan_core::{ActiveRegion, CidrBlock, IngressProtocol, LbProtocol, TierType};

/// 展開先リージョン
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Primary,
    Recovery,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Primary => "primary",
            Region::Recovery => "recovery",
        }
    }

    /// クラスターのアクティブリージョンに対応するか
    pub fn is_active(&self, active: ActiveRegion) -> bool {
        matches!(
            (self, active),
            (Region::Primary, ActiveRegion::Default) | (Region::Recovery, ActiveRegion::Recovery)
        )
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 適用時にしか決まらないアドレスへの参照
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AddressRef {
    /// インスタンス（construct name で識別）のプライベートアドレス
    InstancePrivateAddress { construct_name: String },
    /// データベースのリージョン別エンドポイント
    DatabaseEndpoint { identifier: String, region: Region },
}

impl std::fmt::Display for AddressRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressRef::InstancePrivateAddress { construct_name } => {
                write!(f, "{}.private_ip", construct_name)
            }
            AddressRef::DatabaseEndpoint { identifier, region } => {
                write!(f, "{}.endpoint[{}]", identifier, region)
            }
        }
    }
}

/// イングレスルール
///
/// ルールは集合として扱うので、マージ順は結果に影響しない。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: IngressProtocol,
    pub cidr: CidrBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IngressRule {
    pub fn port(port: u16, protocol: IngressProtocol, cidr: CidrBlock) -> Self {
        Self {
            from_port: port,
            to_port: port,
            protocol,
            cidr,
            description: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// セキュリティグループ
///
/// `(tier, region, cidr)` ごとに1つ。名前の末尾番号は CIDR の列挙順で決まる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupPlan {
    pub name: String,
    pub tier: TierType,
    pub region: Region,
    /// このグループが対象とする CIDR ブロック
    pub cidr: CidrBlock,
    pub rules: BTreeSet<IngressRule>,
}

/// ボリューム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePlan {
    pub device_name: String,
    pub size_gb: u32,
    pub volume_type: String,
    pub encryption_key: String,
}

/// /etc/hosts 形式の名前解決エントリー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub address: AddressRef,
    pub hostnames: Vec<String>,
}

/// インスタンス1台分のプラン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// 0 始まりの位置
    pub index: u32,
    pub tier: TierType,
    pub region: Region,
    pub region_name: String,
    pub construct_name: String,
    pub hostname: String,
    pub resolved_ami: String,
    pub instance_type: String,
    pub subnet_id: String,
    /// 所属するセキュリティグループ名
    pub security_group_refs: Vec<String>,
    pub volumes: Vec<VolumePlan>,
    pub instance_role: String,
    pub key_pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_system: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// 対になる他リージョンのインスタンスのホスト名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_hostname: Option<String>,
    /// リカバリーインスタンスのみが持つ名前解決エントリー
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_entry: Option<HostEntry>,
}

impl InstanceSpec {
    pub fn address(&self) -> AddressRef {
        AddressRef::InstancePrivateAddress {
            construct_name: self.construct_name.clone(),
        }
    }
}

/// DNS レコード種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
        }
    }
}

/// DNS レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// 完全修飾名
    pub name: String,
    pub record_type: RecordType,
    pub target: AddressRef,
    pub ttl: u32,
    pub zone_id: String,
}

/// ロードバランサーの公開範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerScheme {
    InternetFacing,
    Internal,
}

/// ターゲットグループ
///
/// ターゲットは construct name で参照する。アベイラビリティゾーンは指定しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupPlan {
    pub name: String,
    pub region: Region,
    pub targets: Vec<String>,
}

/// リスナー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerPlan {
    pub port: u16,
    pub protocol: LbProtocol,
    /// ヘルスチェックのパス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<u16>,
    pub target_groups: Vec<TargetGroupPlan>,
}

/// ロードバランサーの用途
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LoadBalancerPurpose {
    /// インターネットからの公開イングレス
    PublicIngress,
    /// 顧客ネットワークからの接続
    Customer { customer_name: String, tier: TierType },
}

/// ロードバランサー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerPlan {
    pub name: String,
    /// ロードバランサーとターゲットが置かれるリージョン
    pub region: Region,
    pub purpose: LoadBalancerPurpose,
    pub scheme: LoadBalancerScheme,
    pub subnets: Vec<String>,
    /// 顧客向けの場合、接続元ネットワーク
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_cidr: Option<CidrBlock>,
    pub listeners: Vec<ListenerPlan>,
}

/// データベース
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabasePlan {
    pub identifier: String,
    pub route53_name: String,
    pub engine: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub subnet_ids: Vec<String>,
    pub encryption_key: String,
    /// リードレプリカを置くリージョン
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_region: Option<String>,
}

/// ティア1つ分のプラン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPlan {
    pub tier: TierType,
    pub security_groups: Vec<SecurityGroupPlan>,
    pub primary: Vec<InstanceSpec>,
    pub recovery: Vec<InstanceSpec>,
}

impl TierPlan {
    /// index に対応するリカバリーインスタンス
    pub fn recovery_at(&self, index: u32) -> Option<&InstanceSpec> {
        self.recovery.iter().find(|spec| spec.index == index)
    }
}

/// クラスター全体のプラン
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPlan {
    pub cluster_name: String,
    pub fi_name: String,
    pub environment: String,
    pub active_region: ActiveRegion,
    pub tiers: Vec<TierPlan>,
    pub load_balancers: Vec<LoadBalancerPlan>,
    pub databases: Vec<DatabasePlan>,
    pub dns_records: Vec<DnsRecord>,
}

impl ClusterPlan {
    pub fn tier(&self, tier: TierType) -> Option<&TierPlan> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn security_groups(&self) -> impl Iterator<Item = &SecurityGroupPlan> {
        self.tiers.iter().flat_map(|t| t.security_groups.iter())
    }

    pub fn primary_instances(&self) -> impl Iterator<Item = &InstanceSpec> {
        self.tiers.iter().flat_map(|t| t.primary.iter())
    }

    pub fn recovery_instances(&self) -> impl Iterator<Item = &InstanceSpec> {
        self.tiers.iter().flat_map(|t| t.recovery.iter())
    }
}
