//! イメージ解決
//!
//! 優先順位（高い順）:
//! - プライマリー: `ami-pattern-override[index]` → ティアの `ami`
//! - リカバリー: `recovery-ami-ids[index]`（なければリカバリーインスタンス自体を作らない）
//!
//! 選ばれた識別子がイメージカタログの別名なら、対象リージョンの ID に変換する。

use crate::Result;
use crate::plan::Region;
use tierplan_core::{ImageCatalog, PlanError, TierConfiguration};

/// 位置とリージョンからイメージ識別子を選ぶ
pub fn resolve(tier: &TierConfiguration, index: u32, region: Region) -> Result<&str> {
    if index >= tier.count {
        return Err(PlanError::Resolution {
            tier: tier.tier.as_str().to_string(),
            index,
            field: "ami",
        });
    }

    match region {
        Region::Recovery => {
            tier.recovery_ami_ids
                .get(index)
                .ok_or_else(|| PlanError::Resolution {
                    tier: tier.tier.as_str().to_string(),
                    index,
                    field: "recovery-ami-ids",
                })
        }
        Region::Primary => Ok(tier
            .ami_pattern_override
            .get(index)
            .unwrap_or(tier.ami.as_str())),
    }
}

/// 選んだ識別子をリージョンのイメージ ID に変換して返す
pub fn resolve_image(
    images: &ImageCatalog,
    tier: &TierConfiguration,
    index: u32,
    region: Region,
    region_name: &str,
) -> Result<String> {
    let image = resolve(tier, index, region)?;
    Ok(images.resolve(image, region_name).to_string())
}
