//! リカバリーリンケージ
//!
//! `(tier, index)` ごとに、リカバリーインスタンスを作るかどうかと
//! フェイルオーバー後の名前解決に必要なリンク情報を決める。
//! リカバリーインスタンスは必ず名前解決エントリーと一緒に作られる。

use crate::Result;
use crate::ami;
use crate::context::PlanningContext;
use crate::naming;
use crate::plan::{AddressRef, HostEntry, InstanceSpec, Region, SecurityGroupPlan};
use crate::tier::{InstanceDraft, volumes};
use tierplan_core::{ClusterProperties, PlanError, TierConfiguration, TierType};
use tracing::debug;

/// 1つの位置に対する決定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryLinkage {
    /// recovery-ami-ids にエントリーがない
    NoRecovery,
    /// リカバリーインスタンスとその名前解決エントリー
    RecoveryLinked(Box<InstanceSpec>),
}

/// 位置 `index` のリンケージを解決
///
/// プライマリー側の展開が終わっている必要がある。
pub fn resolve(
    ctx: &PlanningContext,
    props: &ClusterProperties,
    tier: &TierConfiguration,
    index: u32,
    primaries: &[InstanceSpec],
    security_groups: &[SecurityGroupPlan],
) -> Result<RecoveryLinkage> {
    if !tier.has_recovery_at(index) {
        return Ok(RecoveryLinkage::NoRecovery);
    }

    let tier_name = tier.tier.as_str();
    let primary = primaries
        .iter()
        .find(|spec| spec.index == index)
        .ok_or_else(|| PlanError::Linkage {
            tier: tier_name.to_string(),
            index,
            message: "対応するプライマリーインスタンスのホスト名を解決できません".to_string(),
        })?;

    let region = ctx.recovery.as_ref().ok_or_else(|| {
        PlanError::configuration(
            tier_name,
            "recovery-ami-ids",
            format!("環境 {} にリカバリーリージョンがありません", ctx.environment),
        )
    })?;

    let hostname = naming::hostname(tier, props, &ctx.env_subdomain, index, true)?;
    let construct_name = naming::construct_name(tier, props, &ctx.env_subdomain, index, true)?;

    // rt は新規にブートストラップされ、プライマリーのアドレス対応を持ち越さない
    let hostnames = if tier.tier == TierType::Rt {
        vec![hostname.clone()]
    } else {
        vec![hostname.clone(), primary.hostname.clone()]
    };

    let host_entry = HostEntry {
        address: AddressRef::InstancePrivateAddress {
            construct_name: construct_name.clone(),
        },
        hostnames,
    };

    let draft = InstanceDraft {
        index,
        region: Region::Recovery,
        resolved_ami: ami::resolve_image(&ctx.images, tier, index, Region::Recovery, &region.name)?,
        volumes: if tier.create_volumes_in_recovery {
            volumes(tier, region)
        } else {
            Vec::new()
        },
        paired_hostname: Some(primary.hostname.clone()),
        host_entry: Some(host_entry),
        construct_name,
        hostname,
    };

    let spec = draft.build(ctx, props, tier, security_groups)?;
    debug!(
        tier = %tier.tier,
        index,
        hostname = %spec.hostname,
        primary = %primary.hostname,
        "Linked recovery instance"
    );
    Ok(RecoveryLinkage::RecoveryLinked(Box::new(spec)))
}

/// ティアの全リカバリーインスタンスを生成
///
/// recovery-ami-ids のエントリーだけを見る。count が大きくてもエントリーがなければ DR なし。
pub fn link(
    ctx: &PlanningContext,
    props: &ClusterProperties,
    tier: &TierConfiguration,
    primaries: &[InstanceSpec],
    security_groups: &[SecurityGroupPlan],
) -> Result<Vec<InstanceSpec>> {
    let mut recovery = Vec::with_capacity(tier.recovery_ami_ids.len());
    for (index, _) in tier.recovery_ami_ids.iter() {
        match resolve(ctx, props, tier, index, primaries, security_groups)? {
            RecoveryLinkage::RecoveryLinked(spec) => recovery.push(*spec),
            RecoveryLinkage::NoRecovery => {}
        }
    }
    Ok(recovery)
}
