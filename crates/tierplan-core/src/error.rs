use std::path::PathBuf;
use thiserror::Error;

/// 設定の読み込み・パース時のエラー
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("テンプレートエラー: {file}\n理由: {message}")]
    TemplateError { file: PathBuf, message: String },

    #[error("テンプレート展開エラー: {0}")]
    TemplateRenderError(String),

    #[error("ファイル発見エラー: {path}\n理由: {message}")]
    DiscoveryError { path: PathBuf, message: String },

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: tierplan.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("環境が見つかりません: {0}")]
    EnvironmentNotFound(String),

    #[error("クラスターが見つかりません: {0}")]
    ClusterNotFound(String),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// 展開（プランニング）時のエラー
///
/// ロード時の検証とプランナーの検証は同じ分類を使う。
/// どのバリアントも、問題のある tier / index / フィールドを特定できる情報を持つ。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// 入力の構造的な不整合
    #[error("構成エラー: tier '{tier}' のフィールド '{field}': {message}")]
    Configuration {
        tier: String,
        field: &'static str,
        message: String,
    },

    /// 位置指定の参照が宣言範囲外
    #[error("解決エラー: tier '{tier}' の index {index} はフィールド '{field}' の範囲外です")]
    Resolution {
        tier: String,
        index: u32,
        field: &'static str,
    },

    /// リカバリーインスタンスに対応するプライマリーが解決できない
    #[error("リンクエラー: tier '{tier}' の index {index}: {message}")]
    Linkage {
        tier: String,
        index: u32,
        message: String,
    },
}

impl PlanError {
    pub fn configuration(
        tier: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        PlanError::Configuration {
            tier: tier.into(),
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
