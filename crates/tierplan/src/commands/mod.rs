pub mod plan;
pub mod validate;

use colored::Colorize;
use tierplan_core::Project;
use tracing::debug;

/// プロジェクトルートを検出してロード
pub(crate) fn load(env: Option<&str>) -> anyhow::Result<Project> {
    let project_root = tierplan_core::find_project_root()?;
    eprintln!(
        "{} {}",
        "プロジェクトルート:".dimmed(),
        project_root.display().to_string().cyan()
    );
    let project = tierplan_core::load_project_from_root(&project_root, env)?;
    debug!(
        project = %project.name,
        environment = %project.environment.name,
        clusters = project.clusters.len(),
        "Loaded project"
    );
    Ok(project)
}
