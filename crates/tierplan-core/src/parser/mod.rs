//! KDLパーサー
//!
//! tierplan の KDL 設定ファイルをパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod cluster;
mod environment;
mod tier;

use cluster::parse_cluster;
use environment::parse_environment;

// 外部クレートから再利用可能なパース関数
pub use tier::parse_tier;

use crate::error::{ConfigError, Result};
use crate::model::{ClusterConfiguration, EnvironmentConfig, IndexedOverrides, Project};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// KDLファイルをパースして Project を生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P, environment: Option<&str>) -> Result<Project> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name, environment)
}

/// KDL文字列をパース
///
/// `environment` が None の場合、定義されている環境が1つだけならそれを使う。
pub fn parse_kdl_string(
    content: &str,
    default_name: String,
    environment: Option<&str>,
) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut environments: BTreeMap<String, EnvironmentConfig> = BTreeMap::new();
    let mut clusters: Vec<ClusterConfiguration> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) = first_string(node) {
                    name = project_name.to_string();
                }
            }
            "environment" => {
                let env = parse_environment(node)?;
                // 後から読み込まれた定義（tierplan.{env}.kdl）が優先
                if environments.insert(env.name.clone(), env).is_some() {
                    debug!("Environment redefined by a later file");
                }
            }
            "cluster" => {
                let cluster = parse_cluster(node)?;
                if clusters.iter().any(|c| c.name() == cluster.name()) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "クラスター '{}' が重複しています",
                        cluster.name()
                    )));
                }
                clusters.push(cluster);
            }
            // variables はテンプレート展開時に処理済み
            "variables" => {}
            other => {
                debug!(node = other, "Skipping unknown node");
            }
        }
    }

    let environment = match environment {
        Some(env_name) => environments
            .remove(env_name)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(env_name.to_string()))?,
        None => {
            if environments.len() != 1 {
                return Err(ConfigError::InvalidConfig(format!(
                    "環境を指定してください（定義済み: {}）",
                    environments.keys().cloned().collect::<Vec<_>>().join(", ")
                )));
            }
            environments
                .into_values()
                .next()
                .ok_or_else(|| ConfigError::EnvironmentNotFound("(none)".to_string()))?
        }
    };

    Ok(Project {
        name,
        environment,
        clusters,
    })
}

/// 位置引数（プロパティを除く）
pub(crate) fn args(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

/// 最初の位置引数を文字列として取得
pub(crate) fn first_string(node: &KdlNode) -> Option<&str> {
    args(node).next().and_then(|v| v.as_string())
}

/// 最初の位置引数を文字列として取得（必須）
pub(crate) fn required_string(node: &KdlNode, what: &str) -> Result<String> {
    first_string(node)
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::InvalidConfig(format!("{} requires a string value", what)))
}

/// 全ての位置引数を文字列として取得
pub(crate) fn string_args(node: &KdlNode) -> Vec<String> {
    args(node)
        .filter_map(|v| v.as_string().map(|s| s.to_string()))
        .collect()
}

/// 名前付きプロパティを取得
pub(crate) fn prop<'a>(node: &'a KdlNode, key: &str) -> Option<&'a KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .map(|e| e.value())
}

pub(crate) fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    prop(node, key).and_then(|v| v.as_string()).map(|s| s.to_string())
}

pub(crate) fn prop_bool(node: &KdlNode, key: &str) -> Option<bool> {
    prop(node, key).and_then(|v| v.as_bool())
}

/// 整数値を範囲チェック付きで変換
pub(crate) fn to_int<T: TryFrom<i128>>(value: &KdlValue, what: &str) -> Result<T> {
    value
        .as_integer()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ConfigError::InvalidConfig(format!("{} requires a valid integer", what)))
}

pub(crate) fn first_int<T: TryFrom<i128>>(node: &KdlNode, what: &str) -> Result<T> {
    let value = args(node)
        .next()
        .ok_or_else(|| ConfigError::InvalidConfig(format!("{} requires a value", what)))?;
    to_int(value, what)
}

pub(crate) fn prop_int<T: TryFrom<i128>>(node: &KdlNode, key: &str) -> Result<Option<T>> {
    prop(node, key).map(|v| to_int(v, key)).transpose()
}

/// 最初の位置引数を真偽値として取得（引数なしは true）
pub(crate) fn first_bool(node: &KdlNode) -> bool {
    args(node).next().and_then(|v| v.as_bool()).unwrap_or(true)
}

/// 位置指定オーバーライドをパース
///
/// `#null` の位置はオーバーライドなしとして扱う。
/// 例: `ami-pattern-override "ami-p0" #null "ami-p2"`
pub(crate) fn parse_positional(node: &KdlNode, what: &str) -> Result<IndexedOverrides> {
    let mut overrides = IndexedOverrides::new();
    for (index, value) in args(node).enumerate() {
        if value.is_null() {
            continue;
        }
        let s = value.as_string().ok_or_else(|| {
            ConfigError::InvalidConfig(format!("{} の index {} は文字列か #null です", what, index))
        })?;
        overrides.insert(index as u32, s);
    }
    Ok(overrides)
}
