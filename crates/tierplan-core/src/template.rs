//! テンプレート展開
//!
//! KDL 設定ファイルは Tera テンプレートとして展開してからパースします。
//! 単一波括弧の `{fiName}` などの命名トークンは Tera の構文と衝突しません。

use crate::error::{ConfigError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// 展開に使える環境変数のプレフィックス
pub const ALLOWED_ENV_PREFIXES: &[&str] = &["TIERPLAN_", "CI_", "APP_"];

/// 変数コンテキスト
pub type Variables = BTreeMap<String, serde_json::Value>;

/// テンプレートプロセッサ
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// 変数を追加（同名は上書き）
    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// 許可されたプレフィックスを持つ環境変数を追加
    #[tracing::instrument(skip(self))]
    pub fn add_env_variables(&mut self) {
        let mut count = 0;
        for (key, value) in std::env::vars() {
            if ALLOWED_ENV_PREFIXES
                .iter()
                .any(|prefix| key.starts_with(prefix))
            {
                debug!(key = %key, "Adding environment variable");
                self.context.insert(key, &serde_json::Value::String(value));
                count += 1;
            }
        }
        info!(env_var_count = count, "Added filtered environment variables");
    }

    /// .env ファイルの変数を追加
    ///
    /// .env は明示的に置かれたファイルなのでプレフィックス制限はかけない。
    #[tracing::instrument(skip(self), fields(env_file = %env_file_path.display()))]
    pub fn add_env_file_variables(&mut self, env_file_path: &Path) -> Result<()> {
        let content =
            std::fs::read_to_string(env_file_path).map_err(|e| ConfigError::IoError {
                path: env_file_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut count = 0;
        for (key, value) in parse_env_lines(&content) {
            debug!(key = %key, "Adding variable from .env file");
            self.context.insert(key, &serde_json::Value::String(value));
            count += 1;
        }

        info!(variable_count = count, "Loaded variables from .env file");
        Ok(())
    }

    /// 文字列をテンプレートとして展開
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(template, &self.context)
            .map_err(|e| ConfigError::TemplateRenderError(describe_tera_error(&e)))
    }

    /// ファイルを読み込んで展開
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| match e {
            ConfigError::TemplateRenderError(message) => ConfigError::TemplateError {
                file: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// `KEY=VALUE` 形式の行を読み取る（空行と # コメントは無視）
fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                strip_quotes(value.trim()).to_string(),
            )
        })
        .collect()
}

/// KDL ファイルから `variables { ... }` ブロックの変数を抽出
///
/// 展開前のファイルは `{{ ... }}` を含むため KDL としてパースできない。
/// ブロックだけを正規表現で切り出してパースする。
/// 同じ変数が複数回定義された場合は後勝ち。
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    let re = Regex::new(r"(?s)variables\s*\{(?P<content>.*?)\}")
        .map_err(|e| ConfigError::InvalidConfig(format!("正規表現のコンパイルエラー: {}", e)))?;

    let mut variables = Variables::new();
    for cap in re.captures_iter(kdl_content) {
        let Some(block) = cap.name("content") else {
            continue;
        };
        let wrapped = format!("extracted {{\n{}\n}}", block.as_str());
        let doc: kdl::KdlDocument = wrapped.parse().map_err(|e| {
            ConfigError::InvalidConfig(format!("KDL パースエラー (variables ブロック): {}", e))
        })?;

        if let Some(node) = doc.nodes().first()
            && let Some(children) = node.children()
        {
            for var_node in children.nodes() {
                if let Some(entry) = var_node.entries().first() {
                    variables.insert(
                        var_node.name().value().to_string(),
                        kdl_value_to_json(entry.value()),
                    );
                }
            }
        }
    }

    Ok(variables)
}

fn strip_quotes(s: &str) -> &str {
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted { &s[1..s.len() - 1] } else { s }
}

/// Tera のエラーチェーンから未定義変数などを読みやすくする
fn describe_tera_error(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }
    let full_error = details.join(" | ");

    if let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "未定義の変数: `{}`\nヒント: variables ブロックか .env ファイルで定義してください",
            var_name
        );
    }

    full_error
}

fn kdl_value_to_json(value: &kdl::KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        i64::try_from(i)
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}
