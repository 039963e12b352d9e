//! データベースのプランニング

use crate::Result;
use crate::context::PlanningContext;
use crate::plan::DatabasePlan;
use tierplan_core::{DbConfig, Placement, PlanError, SubnetSource};

/// db-config ごとにデータベースを宣言
///
/// プライマリー VPC のデータサブネットに置き、リージョンの暗号化キーを使う。
/// リードレプリカはリカバリーリージョンがある場合だけ。
pub fn plan(ctx: &PlanningContext, db_configs: &[DbConfig]) -> Result<Vec<DatabasePlan>> {
    if db_configs.is_empty() {
        return Ok(Vec::new());
    }

    let subnets = ctx.primary.vpc.subnets_for(Placement::Data);
    if subnets.is_empty() {
        return Err(PlanError::configuration(
            "*",
            "database",
            format!(
                "{} VPC ({}) にデータサブネットがありません",
                ctx.primary.vpc.kind(),
                ctx.primary.name
            ),
        ));
    }

    let replica_region = ctx.recovery.as_ref().map(|r| r.name.clone());

    Ok(db_configs
        .iter()
        .map(|db| DatabasePlan {
            identifier: db.identifier.clone(),
            route53_name: db.route53_name.clone(),
            engine: db.engine.clone(),
            instance_class: db.instance_class.clone(),
            allocated_storage: db.allocated_storage,
            subnet_ids: subnets.to_vec(),
            encryption_key: ctx.primary.encryption_key.clone(),
            replica_region: if db.replicate_to_recovery {
                replica_region.clone()
            } else {
                None
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;

    fn db(identifier: &str, replicate: bool) -> DbConfig {
        DbConfig {
            identifier: identifier.to_string(),
            route53_name: identifier.to_string(),
            engine: "postgres".to_string(),
            instance_class: "db.r5.large".to_string(),
            allocated_storage: 100,
            replicate_to_recovery: replicate,
        }
    }

    #[test]
    fn test_database_plan() {
        let ctx = context();
        let plans = plan(&ctx, &[db("coredb", true), db("auditdb", false)]).unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].subnet_ids, vec!["subnet-db"]);
        assert_eq!(plans[0].encryption_key, "alias/prod-use1");
        assert_eq!(plans[0].replica_region.as_deref(), Some("us-west-2"));
        assert_eq!(plans[1].replica_region, None);
    }

    #[test]
    fn test_replica_requires_recovery_region() {
        let mut ctx = context();
        ctx.recovery = None;
        let plans = plan(&ctx, &[db("coredb", true)]).unwrap();
        assert_eq!(plans[0].replica_region, None);
    }

    #[test]
    fn test_missing_data_subnets() {
        let mut ctx = context();
        ctx.primary.vpc = tierplan_core::VpcLayout::Tools(Default::default());
        assert!(matches!(
            plan(&ctx, &[db("coredb", false)]),
            Err(PlanError::Configuration {
                field: "database",
                ..
            })
        ));
    }
}
