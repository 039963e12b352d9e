use crate::OutputFormat;
use colored::Colorize;
use tierplan_cloud::{PlanSummary, ResourceType, actions};
use tierplan_core::ConfigError;
use tierplan_planner::{ClusterPlan, plan_project};
use tracing::debug;

pub fn handle(
    env: Option<&str>,
    cluster: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let project = super::load(env)?;

    if let Some(name) = cluster
        && project.cluster(name).is_none()
    {
        return Err(ConfigError::ClusterNotFound(name.to_string()).into());
    }

    let plans = plan_project(&project, cluster)?;
    debug!(clusters = plans.len(), format = ?format, "Planned project");

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        OutputFormat::Text => {
            for plan in &plans {
                print_plan(plan);
            }
            if plans.is_empty() {
                println!("{}", "クラスターが定義されていません".yellow());
            }
        }
    }

    Ok(())
}

fn print_plan(plan: &ClusterPlan) {
    println!(
        "{} {} (環境: {}, active-region: {:?})",
        "クラスター".bold(),
        plan.cluster_name.cyan().bold(),
        plan.environment,
        plan.active_region
    );

    let actions = actions(plan);
    let mut current = None;
    for action in &actions {
        if current != Some(action.resource_type) {
            current = Some(action.resource_type);
            println!("  {}", heading(action.resource_type).bold());
        }
        println!(
            "    {} {}  {}",
            "+".green(),
            action.resource_id.cyan(),
            action.description.dimmed()
        );
    }

    println!();
    println!("  {}", PlanSummary::from_actions(&actions).to_string().green());
    println!();
}

fn heading(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::SecurityGroup => "セキュリティグループ",
        ResourceType::Instance => "プライマリーインスタンス",
        ResourceType::RecoveryInstance => "リカバリーインスタンス",
        ResourceType::Database => "データベース",
        ResourceType::LoadBalancer => "ロードバランサー",
        ResourceType::DnsRecord => "DNS レコード",
    }
}
