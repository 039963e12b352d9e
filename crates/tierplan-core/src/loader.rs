//! 統合ローダー
//!
//! ファイル発見、テンプレート展開、パース、検証を統合

use crate::discovery::{DiscoveredFiles, discover_files, find_project_root};
use crate::error::{ConfigError, Result};
use crate::model::Project;
use crate::parser::parse_kdl_string;
use crate::template::{TemplateProcessor, Variables, extract_variables};
use std::path::Path;
use tracing::{debug, info, instrument};

/// プロジェクトをロード
///
/// 1. プロジェクトルートの検出
/// 2. ファイルの発見
/// 3. 変数の収集
/// 4. テンプレート展開
/// 5. KDL パース
/// 6. 検証
#[instrument]
pub fn load_project(environment: Option<&str>) -> Result<Project> {
    info!("Starting project load");
    let project_root = find_project_root()?;
    load_project_from_root(&project_root, environment)
}

/// 指定されたルートディレクトリからプロジェクトをロード
///
/// 読み込み順序: tierplan.kdl → clusters/**/*.kdl → tierplan.{env}.kdl
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_project_from_root(project_root: &Path, environment: Option<&str>) -> Result<Project> {
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root, environment)?;
    if discovered.root.is_none() {
        return Err(ConfigError::ProjectRootNotFound(project_root.to_path_buf()));
    }

    debug!("Step 2: Preparing template processor");
    let mut processor = prepare_template_processor(&discovered, project_root, environment)?;

    debug!("Step 3: Expanding templates");
    let expanded = expand_all_files(&discovered, &mut processor)?;
    info!(content_size = expanded.len(), "Template expansion complete");

    debug!("Step 4: Parsing KDL");
    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let project = parse_kdl_string(&expanded, name, environment)?;

    debug!("Step 5: Validating");
    project.validate()?;

    info!(
        environment = %project.environment.name,
        clusters = project.clusters.len(),
        "Project loaded successfully"
    );
    Ok(project)
}

/// テンプレートプロセッサを準備
///
/// 優先度（後勝ち）: ビルトイン → .env → .env.{env} → 環境変数 → variables ブロック
fn prepare_template_processor(
    discovered: &DiscoveredFiles,
    project_root: &Path,
    environment: Option<&str>,
) -> Result<TemplateProcessor> {
    let mut processor = TemplateProcessor::new();

    processor.add_variable(
        "PROJECT_ROOT",
        serde_json::Value::String(project_root.to_string_lossy().to_string()),
    );
    if let Some(env) = environment {
        processor.add_variable("ENVIRONMENT", serde_json::Value::String(env.to_string()));
    }

    if let Some(env_file) = &discovered.env_file {
        processor.add_env_file_variables(env_file)?;
    }
    if let Some(env_file) = &discovered.env_specific_file {
        processor.add_env_file_variables(env_file)?;
    }

    processor.add_env_variables();

    let mut variables = Variables::new();
    for file in discovered.kdl_files() {
        let content = std::fs::read_to_string(file).map_err(|e| ConfigError::IoError {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        variables.extend(extract_variables(&content)?);
    }
    debug!(vars = ?variables, "Adding collected variables to processor");
    processor.add_variables(variables);

    Ok(processor)
}

/// 全ファイルを展開して結合
fn expand_all_files(
    discovered: &DiscoveredFiles,
    processor: &mut TemplateProcessor,
) -> Result<String> {
    let mut expanded = String::new();
    for file in discovered.kdl_files() {
        debug!(file = %file.display(), "Rendering file");
        expanded.push_str(&processor.render_file(file)?);
        expanded.push_str("\n\n");
    }
    Ok(expanded)
}
