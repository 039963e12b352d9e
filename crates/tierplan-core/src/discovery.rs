//! ファイル自動発見
//!
//! 規約ベースのディレクトリ構造から設定ファイルを発見します。
//!
//! ```text
//! tierplan.kdl            (または .tierplan/tierplan.kdl)
//! tierplan.{env}.kdl      環境オーバーライド
//! clusters/**/*.kdl       クラスター定義
//! .env / .env.{env}       テンプレート変数
//! ```

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// プロジェクトルートを上書きする環境変数
pub const PROJECT_ROOT_ENV: &str = "TIERPLAN_PROJECT_ROOT";

const ROOT_FILE: &str = "tierplan.kdl";
const HIDDEN_DIR: &str = ".tierplan";

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (tierplan.kdl)
    pub root: Option<PathBuf>,
    /// クラスター定義 (clusters/**/*.kdl)、パス順
    pub clusters: Vec<PathBuf>,
    /// 環境オーバーライド (tierplan.{env}.kdl)
    pub env_override: Option<PathBuf>,
    /// .env
    pub env_file: Option<PathBuf>,
    /// .env.{env}
    pub env_specific_file: Option<PathBuf>,
}

impl DiscoveredFiles {
    /// 展開順に並べた KDL ファイル
    pub fn kdl_files(&self) -> Vec<&Path> {
        self.root
            .iter()
            .chain(self.clusters.iter())
            .chain(self.env_override.iter())
            .map(PathBuf::as_path)
            .collect()
    }
}

fn has_root_file(dir: &Path) -> bool {
    dir.join(ROOT_FILE).exists() || dir.join(HIDDEN_DIR).join(ROOT_FILE).exists()
}

/// プロジェクトルートを検出
///
/// 1. 環境変数 TIERPLAN_PROJECT_ROOT
/// 2. カレントディレクトリから親へ向かって tierplan.kdl / .tierplan/tierplan.kdl を探す
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking TIERPLAN_PROJECT_ROOT");
        if has_root_file(&path) {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
        warn!(
            env_root = %root,
            "TIERPLAN_PROJECT_ROOT has no tierplan.kdl, falling back to search"
        );
    }

    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから親へ向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        debug!(checking = %current.display(), "Looking for tierplan.kdl");
        if has_root_file(&current) {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(ConfigError::ProjectRootNotFound(start_dir.to_path_buf()))
}

/// プロジェクトルートからファイルを発見
///
/// `environment` が指定されていれば tierplan.{env}.kdl と .env.{env} も探す。
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path, environment: Option<&str>) -> Result<DiscoveredFiles> {
    let mut discovered = DiscoveredFiles {
        root: first_existing(project_root, ROOT_FILE),
        ..Default::default()
    };

    let clusters_dir = project_root.join("clusters");
    if clusters_dir.is_dir() {
        discovered.clusters = discover_kdl_files(&clusters_dir)?;
        info!(
            cluster_file_count = discovered.clusters.len(),
            "Discovered cluster files"
        );
    }

    if let Some(env) = environment {
        discovered.env_override = first_existing(project_root, &format!("tierplan.{}.kdl", env));
        discovered.env_specific_file = first_existing(project_root, &format!(".env.{}", env));
    }
    discovered.env_file = first_existing(project_root, ".env");

    debug!(?discovered, "File discovery complete");
    Ok(discovered)
}

/// ルート直下、なければ .tierplan/ 配下のファイル
fn first_existing(project_root: &Path, name: &str) -> Option<PathBuf> {
    [project_root.join(name), project_root.join(HIDDEN_DIR).join(name)]
        .into_iter()
        .find(|p| p.is_file())
}

/// ディレクトリ配下の .kdl ファイルを再帰的に発見（パス順）
fn discover_kdl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**").join("*.kdl");
    let pattern = pattern.to_string_lossy();

    let paths = glob::glob(&pattern).map_err(|e| ConfigError::DiscoveryError {
        path: dir.to_path_buf(),
        message: format!("無効なパターン: {}", e),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| ConfigError::DiscoveryError {
            path: dir.to_path_buf(),
            message: format!("ディレクトリの読み込みに失敗: {}", e),
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_test_project(base: &Path) -> Result<()> {
        fs::write(base.join("tierplan.kdl"), "// root")?;
        fs::write(base.join("tierplan.prod.kdl"), "// prod")?;
        fs::create_dir_all(base.join("clusters/payments"))?;
        fs::write(base.join("clusters/core.kdl"), "cluster \"core\" {}")?;
        fs::write(base.join("clusters/payments/ledger.kdl"), "cluster \"ledger\" {}")?;
        fs::write(base.join("clusters/README.md"), "not kdl")?;
        fs::write(base.join(".env"), "A=1")?;
        fs::write(base.join(".env.prod"), "A=2")?;
        Ok(())
    }

    #[test]
    fn test_discover_files() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        create_test_project(root)?;

        let discovered = discover_files(root, Some("prod"))?;

        assert!(discovered.root.is_some());
        assert_eq!(discovered.clusters.len(), 2);
        assert!(discovered.clusters[0].ends_with("clusters/core.kdl"));
        assert!(discovered.clusters[1].ends_with("clusters/payments/ledger.kdl"));
        assert!(discovered.env_override.is_some());
        assert!(discovered.env_file.is_some());
        assert!(discovered.env_specific_file.is_some());

        let order = discovered.kdl_files();
        assert_eq!(order.len(), 4);
        assert!(order[0].ends_with("tierplan.kdl"));
        assert!(order[3].ends_with("tierplan.prod.kdl"));
        Ok(())
    }

    #[test]
    fn test_environment_files_only_when_requested() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        create_test_project(temp_dir.path())?;

        let discovered = discover_files(temp_dir.path(), None)?;
        assert!(discovered.env_override.is_none());
        assert!(discovered.env_specific_file.is_none());
        assert!(discovered.env_file.is_some());
        Ok(())
    }

    #[test]
    fn test_alphabetical_order() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("tierplan.kdl"), "")?;
        fs::create_dir_all(root.join("clusters"))?;
        fs::write(root.join("clusters/zebra.kdl"), "")?;
        fs::write(root.join("clusters/alpha.kdl"), "")?;
        fs::write(root.join("clusters/beta.kdl"), "")?;

        let discovered = discover_files(root, None)?;
        assert!(discovered.clusters[0].ends_with("clusters/alpha.kdl"));
        assert!(discovered.clusters[1].ends_with("clusters/beta.kdl"));
        assert!(discovered.clusters[2].ends_with("clusters/zebra.kdl"));
        Ok(())
    }

    #[test]
    fn test_hidden_dir_root_file() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".tierplan"))?;
        fs::write(root.join(".tierplan/tierplan.kdl"), "// hidden")?;

        let discovered = discover_files(root, None)?;
        assert!(
            discovered
                .root
                .as_ref()
                .unwrap()
                .ends_with(".tierplan/tierplan.kdl")
        );
        Ok(())
    }

    #[test]
    fn test_find_project_root_walks_up() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("tierplan.kdl"), "")?;
        let nested = root.join("clusters/payments");
        fs::create_dir_all(&nested)?;

        let found = find_project_root_from(&nested)?;
        assert_eq!(found, root.to_path_buf());
        Ok(())
    }

    #[test]
    fn test_find_project_root_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_project_root_from(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::ProjectRootNotFound(_))));
    }
}
