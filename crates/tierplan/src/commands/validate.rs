use colored::Colorize;
use tierplan_planner::plan_project;
use tracing::debug;

pub fn handle(env: Option<&str>) -> anyhow::Result<()> {
    eprintln!("{}", "設定を検証中...".blue());

    let project = super::load(env)?;
    let environment = &project.environment;

    // 名前の衝突などは展開してみないと分からない
    let plans = plan_project(&project, None)?;
    debug!(clusters = plans.len(), "Planned every cluster");

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", project.name.cyan());
    println!(
        "  環境: {} ({}.{})",
        environment.name.cyan(),
        environment.env_subdomain,
        environment.zone.name
    );
    println!(
        "    - primary: {} ({} VPC)",
        environment.primary.name,
        environment.primary.vpc.kind()
    );
    match &environment.recovery {
        Some(recovery) => println!(
            "    - recovery: {} ({} VPC)",
            recovery.name,
            recovery.vpc.kind()
        ),
        None => println!("    - recovery: {}", "(なし)".dimmed()),
    }

    println!("  クラスター: {}個", project.clusters.len());
    for cluster in &project.clusters {
        let instances: u32 = cluster.tiers.iter().map(|t| t.count).sum();
        let recovery: usize = cluster.tiers.iter().map(|t| t.recovery_ami_ids.len()).sum();
        println!(
            "    - {} ({}個のティア, {}台, DR {}台)",
            cluster.name().cyan(),
            cluster.tiers.len(),
            instances,
            recovery
        );
    }

    Ok(())
}
