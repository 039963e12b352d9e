//! ティア展開
//!
//! 1つの [`TierConfiguration`] をプライマリーリージョンの [`InstanceSpec`] 列に展開する。

use crate::Result;
use crate::ami;
use crate::context::PlanningContext;
use crate::naming;
use crate::plan::{HostEntry, InstanceSpec, Region, SecurityGroupPlan, VolumePlan};
use std::collections::BTreeMap;
use tierplan_core::{
    ClusterProperties, Placement, PlanError, RegionConfig, SubnetSource, TierConfiguration,
};
use tracing::debug;

/// インスタンスに付けるタグのキー
pub mod tag {
    pub const NAME: &str = "Name";
    pub const HOSTNAME: &str = "Hostname";
    pub const FI_NAME: &str = "FiName";
    pub const ANSIBLE_MANAGED: &str = "AnsibleManaged";
    pub const TIER: &str = "Tier";
    pub const APPLICATION: &str = "Application";
}

/// プライマリーインスタンスを展開
///
/// `count == 0` は空の展開として有効。
pub fn expand(
    ctx: &PlanningContext,
    props: &ClusterProperties,
    tier: &TierConfiguration,
    security_groups: &[SecurityGroupPlan],
) -> Result<Vec<InstanceSpec>> {
    let region = &ctx.primary;
    let mut specs = Vec::with_capacity(tier.count as usize);

    for index in 0..tier.count {
        let hostname = naming::hostname(tier, props, &ctx.env_subdomain, index, false)?;
        let paired_hostname = if tier.has_recovery_at(index) {
            Some(naming::hostname(tier, props, &ctx.env_subdomain, index, true)?)
        } else {
            None
        };

        let spec = InstanceDraft {
            index,
            region: Region::Primary,
            construct_name: naming::construct_name(
                tier,
                props,
                &ctx.env_subdomain,
                index,
                false,
            )?,
            hostname,
            resolved_ami: ami::resolve_image(
                &ctx.images,
                tier,
                index,
                Region::Primary,
                &region.name,
            )?,
            volumes: volumes(tier, region),
            paired_hostname,
            host_entry: None,
        }
        .build(ctx, props, tier, security_groups)?;

        debug!(
            tier = %tier.tier,
            index,
            construct_name = %spec.construct_name,
            hostname = %spec.hostname,
            "Expanded primary instance"
        );
        specs.push(spec);
    }

    Ok(specs)
}

/// ティアのボリュームをリージョンの暗号化キーで宣言
pub(crate) fn volumes(tier: &TierConfiguration, region: &RegionConfig) -> Vec<VolumePlan> {
    tier.volumes
        .iter()
        .map(|v| VolumePlan {
            device_name: v.device_name.clone(),
            size_gb: v.size_gb,
            volume_type: v.volume_type.clone(),
            encryption_key: region.encryption_key.clone(),
        })
        .collect()
}

/// リージョンに依存しない部分を埋める前のインスタンス
pub(crate) struct InstanceDraft {
    pub index: u32,
    pub region: Region,
    pub construct_name: String,
    pub hostname: String,
    pub resolved_ami: String,
    pub volumes: Vec<VolumePlan>,
    pub paired_hostname: Option<String>,
    pub host_entry: Option<HostEntry>,
}

impl InstanceDraft {
    /// サブネット、セキュリティグループ、共有ハンドル、タグを埋めて完成させる
    pub(crate) fn build(
        self,
        ctx: &PlanningContext,
        props: &ClusterProperties,
        tier: &TierConfiguration,
        security_groups: &[SecurityGroupPlan],
    ) -> Result<InstanceSpec> {
        let region = ctx.region(self.region).ok_or_else(|| {
            PlanError::configuration(
                tier.tier.as_str(),
                "region",
                format!("環境 {} に {} リージョンがありません", ctx.environment, self.region),
            )
        })?;

        let subnets = region.vpc.subnets_for(Placement::Compute);
        if subnets.is_empty() {
            return Err(PlanError::configuration(
                tier.tier.as_str(),
                "subnets",
                format!("{} にコンピュートサブネットがありません", region.name),
            ));
        }
        let subnet_id = subnets[self.index as usize % subnets.len()].clone();

        let security_group_refs = security_groups
            .iter()
            .filter(|sg| sg.region == self.region)
            .map(|sg| sg.name.clone())
            .collect();

        let tags = BTreeMap::from([
            (tag::NAME.to_string(), self.construct_name.clone()),
            (tag::HOSTNAME.to_string(), self.hostname.clone()),
            (tag::FI_NAME.to_string(), props.fi_name.clone()),
            (tag::ANSIBLE_MANAGED.to_string(), "true".to_string()),
            (tag::TIER.to_string(), tier.tier.as_str().to_string()),
            (tag::APPLICATION.to_string(), props.cluster_name.clone()),
        ]);

        Ok(InstanceSpec {
            index: self.index,
            tier: tier.tier,
            region: self.region,
            region_name: region.name.clone(),
            construct_name: self.construct_name,
            hostname: self.hostname,
            resolved_ami: self.resolved_ami,
            instance_type: tier.instance_type.clone(),
            subnet_id,
            security_group_refs,
            volumes: self.volumes,
            instance_role: ctx.shared.instance_role.clone(),
            key_pair: ctx.shared.key_pair.clone(),
            file_system: ctx.shared.file_system.clone(),
            tags,
            paired_hostname: self.paired_hostname,
            host_entry: self.host_entry,
        })
    }
}
