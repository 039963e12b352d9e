//! DNS レコードのプランニング
//!
//! 論理的な位置ごとのレコードは常にアクティブリージョンだけを指す。

use crate::Result;
use crate::context::PlanningContext;
use crate::plan::{AddressRef, DatabasePlan, DnsRecord, RecordType, Region, TierPlan};
use std::collections::BTreeMap;
use tierplan_core::{ActiveRegion, PlanError};

pub const DEFAULT_TTL: u32 = 300;

/// インスタンスとデータベースのレコードを生成
///
/// - 各プライマリー位置: `{hostname}.{envSubdomain}.{zone}` の A レコード。
///   active-region が recovery でリカバリー側があればリカバリーのアドレスを指す。
/// - 各リカバリーインスタンス: `-dr` ホスト名の A レコード
/// - 各データベース: route53-name の CNAME
pub fn records(
    ctx: &PlanningContext,
    active_region: ActiveRegion,
    tiers: &[TierPlan],
    databases: &[DatabasePlan],
) -> Vec<DnsRecord> {
    let mut records = Vec::new();

    for tier in tiers {
        for primary in &tier.primary {
            let target = match tier.recovery_at(primary.index) {
                Some(recovery) if Region::Recovery.is_active(active_region) => recovery.address(),
                _ => primary.address(),
            };
            records.push(a_record(ctx, &primary.hostname, target));
        }
        for recovery in &tier.recovery {
            records.push(a_record(ctx, &recovery.hostname, recovery.address()));
        }
    }

    for db in databases {
        let region = if db.replica_region.is_some() && Region::Recovery.is_active(active_region) {
            Region::Recovery
        } else {
            Region::Primary
        };
        records.push(DnsRecord {
            name: ctx.fqdn(&db.route53_name),
            record_type: RecordType::Cname,
            target: AddressRef::DatabaseEndpoint {
                identifier: db.identifier.clone(),
                region,
            },
            ttl: DEFAULT_TTL,
            zone_id: ctx.zone.id.clone(),
        });
    }

    records
}

/// ゾーン内の名前がクラスター全体で一意であることを確認
///
/// プライマリーのホスト名、`-dr` ホスト名、データベースの route53-name が対象。
pub fn ensure_unique_names(tiers: &[TierPlan], databases: &[DatabasePlan]) -> Result<()> {
    let mut owners: BTreeMap<&str, (&str, u32)> = BTreeMap::new();

    let instances = tiers.iter().flat_map(|t| t.primary.iter().chain(&t.recovery));
    for spec in instances {
        let owner = (spec.tier.as_str(), spec.index);
        if let Some((tier, index)) = owners.insert(&spec.hostname, owner) {
            return Err(PlanError::configuration(
                spec.tier.as_str(),
                "hostname",
                format!(
                    "index {} のホスト名 '{}' は tier '{}' の index {} と重複しています",
                    spec.index, spec.hostname, tier, index
                ),
            ));
        }
    }

    for db in databases {
        if let Some((tier, index)) = owners.insert(&db.route53_name, ("*", 0)) {
            return Err(PlanError::configuration(
                "*",
                "route53-name",
                format!(
                    "データベース '{}' の名前 '{}' は tier '{}' の index {} と重複しています",
                    db.identifier, db.route53_name, tier, index
                ),
            ));
        }
    }

    Ok(())
}

fn a_record(ctx: &PlanningContext, hostname: &str, target: AddressRef) -> DnsRecord {
    DnsRecord {
        name: ctx.fqdn(hostname),
        record_type: RecordType::A,
        target,
        ttl: DEFAULT_TTL,
        zone_id: ctx.zone.id.clone(),
    }
}
