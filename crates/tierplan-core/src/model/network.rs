//! ネットワークモデル
//!
//! CIDR ブロック、プロトコル、VPC バリアントとサブネット配置の定義。

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// IPv4 CIDR ブロック（例: 10.0.0.0/16）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock(String);

impl CidrBlock {
    /// 文字列からパース
    ///
    /// ホスト部は切り捨て、ネットワークアドレスに正規化する（10.20.1.0/16 → 10.20.0.0/16）。
    pub fn parse(s: &str) -> Option<Self> {
        let (addr, prefix) = s.trim().split_once('/')?;
        let addr: Ipv4Addr = addr.parse().ok()?;
        let prefix: u32 = prefix.parse().ok()?;
        if prefix > 32 {
            return None;
        }
        let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
        let network = Ipv4Addr::from(u32::from(addr) & mask);
        Some(Self(format!("{}/{}", network, prefix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid CIDR block: {}", value))
    }
}

impl From<CidrBlock> for String {
    fn from(value: CidrBlock) -> Self {
        value.0
    }
}

impl std::fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// セキュリティグループのプロトコル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressProtocol {
    Tcp,
    Udp,
    /// 全トラフィック
    All,
}

impl IngressProtocol {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "all" | "-1" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for IngressProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngressProtocol::Tcp => write!(f, "tcp"),
            IngressProtocol::Udp => write!(f, "udp"),
            IngressProtocol::All => write!(f, "all"),
        }
    }
}

/// ロードバランサーのリスナープロトコル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LbProtocol {
    Tcp,
    Tls,
    Http,
    Https,
}

impl LbProtocol {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TCP" => Some(Self::Tcp),
            "TLS" => Some(Self::Tls),
            "HTTP" => Some(Self::Http),
            "HTTPS" => Some(Self::Https),
            _ => None,
        }
    }
}

impl std::fmt::Display for LbProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LbProtocol::Tcp => write!(f, "TCP"),
            LbProtocol::Tls => write!(f, "TLS"),
            LbProtocol::Http => write!(f, "HTTP"),
            LbProtocol::Https => write!(f, "HTTPS"),
        }
    }
}

/// サブネットの配置先
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// インスタンス
    Compute,
    /// データベース
    Data,
    /// インターネット向けロードバランサー
    Public,
    /// VPC エンドポイント
    Endpoint,
}

impl Placement {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compute" => Some(Self::Compute),
            "data" => Some(Self::Data),
            "public" => Some(Self::Public),
            "endpoint" => Some(Self::Endpoint),
            _ => None,
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Compute => write!(f, "compute"),
            Placement::Data => write!(f, "data"),
            Placement::Public => write!(f, "public"),
            Placement::Endpoint => write!(f, "endpoint"),
        }
    }
}

/// 配置先ごとのサブネット一覧を返す能力
pub trait SubnetSource {
    fn subnets_for(&self, placement: Placement) -> &[String];
}

/// インターネットゲートウェイを持つ VPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayVpc {
    pub public: Vec<String>,
    pub compute: Vec<String>,
    pub data: Vec<String>,
    pub endpoint: Vec<String>,
}

impl SubnetSource for GatewayVpc {
    fn subnets_for(&self, placement: Placement) -> &[String] {
        match placement {
            Placement::Public => &self.public,
            Placement::Compute => &self.compute,
            Placement::Data => &self.data,
            Placement::Endpoint => &self.endpoint,
        }
    }
}

/// トランジット経由で接続されるワークロード VPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokeVpc {
    pub public: Vec<String>,
    pub compute: Vec<String>,
    pub data: Vec<String>,
}

impl SubnetSource for SpokeVpc {
    fn subnets_for(&self, placement: Placement) -> &[String] {
        match placement {
            Placement::Public => &self.public,
            Placement::Compute => &self.compute,
            Placement::Data => &self.data,
            Placement::Endpoint => &[],
        }
    }
}

/// 外部接続を持たない VPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolatedVpc {
    pub compute: Vec<String>,
    pub data: Vec<String>,
}

impl SubnetSource for IsolatedVpc {
    fn subnets_for(&self, placement: Placement) -> &[String] {
        match placement {
            Placement::Compute => &self.compute,
            Placement::Data => &self.data,
            Placement::Public | Placement::Endpoint => &[],
        }
    }
}

/// 運用ツール用 VPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsVpc {
    pub public: Vec<String>,
    pub compute: Vec<String>,
}

impl SubnetSource for ToolsVpc {
    fn subnets_for(&self, placement: Placement) -> &[String] {
        match placement {
            Placement::Public => &self.public,
            Placement::Compute => &self.compute,
            Placement::Data | Placement::Endpoint => &[],
        }
    }
}

/// VPC バリアント
///
/// 実行時の型判定ではなく、明示的なタグで選択する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VpcLayout {
    Gateway(GatewayVpc),
    Spoke(SpokeVpc),
    Isolated(IsolatedVpc),
    Tools(ToolsVpc),
}

impl VpcLayout {
    pub fn kind(&self) -> &'static str {
        match self {
            VpcLayout::Gateway(_) => "gateway",
            VpcLayout::Spoke(_) => "spoke",
            VpcLayout::Isolated(_) => "isolated",
            VpcLayout::Tools(_) => "tools",
        }
    }

    /// 種別ごとに許可される配置先
    pub fn supported_placements(kind: &str) -> Option<&'static [Placement]> {
        match kind {
            "gateway" => Some(&[
                Placement::Public,
                Placement::Compute,
                Placement::Data,
                Placement::Endpoint,
            ]),
            "spoke" => Some(&[Placement::Public, Placement::Compute, Placement::Data]),
            "isolated" => Some(&[Placement::Compute, Placement::Data]),
            "tools" => Some(&[Placement::Public, Placement::Compute]),
            _ => None,
        }
    }
}

impl SubnetSource for VpcLayout {
    fn subnets_for(&self, placement: Placement) -> &[String] {
        match self {
            VpcLayout::Gateway(vpc) => vpc.subnets_for(placement),
            VpcLayout::Spoke(vpc) => vpc.subnets_for(placement),
            VpcLayout::Isolated(vpc) => vpc.subnets_for(placement),
            VpcLayout::Tools(vpc) => vpc.subnets_for(placement),
        }
    }
}
