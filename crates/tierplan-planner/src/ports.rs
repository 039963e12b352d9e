//! ティア種別ごとのポート表
//!
//! 読み取り専用の値として [`PlanningContext`](crate::PlanningContext) に渡す。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tierplan_core::{ClusterType, TierType};

/// ティア種別 → 受け付けるポート
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortTable(BTreeMap<TierType, Vec<u16>>);

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tier: TierType, ports: &[u16]) -> Self {
        self.0.insert(tier, ports.to_vec());
        self
    }

    /// 未登録のティアは空
    pub fn ports(&self, tier: TierType) -> &[u16] {
        self.0.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// ワークロードクラスターの標準表
    pub fn workload() -> Self {
        Self::new()
            .with(TierType::Web, &[80, 443])
            .with(TierType::App, &[8080, 8443])
            .with(TierType::Bld, &[8080])
            .with(TierType::Rt, &[7800])
            .with(TierType::Lbs, &[443])
            .with(TierType::Mq, &[1414])
            .with(TierType::Msi, &[9080])
            .with(TierType::Rpt, &[8081])
            .with(TierType::Sim, &[9443])
            .with(TierType::Bat, &[8090])
            .with(TierType::Db, &[1521])
            .with(TierType::Cfm, &[8500])
    }

    /// データベース支援クラスターの標準表
    pub fn database_support() -> Self {
        Self::new()
            .with(TierType::Db, &[1521, 5432])
            .with(TierType::App, &[8080])
            .with(TierType::Bat, &[8090])
            .with(TierType::Rpt, &[8081])
            .with(TierType::Cfm, &[8500])
    }
}

/// クラスター種別ごとのポート表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTables {
    pub workload: PortTable,
    pub database_support: PortTable,
}

impl PortTables {
    pub fn for_cluster(&self, cluster_type: ClusterType) -> &PortTable {
        match cluster_type {
            ClusterType::Workload => &self.workload,
            ClusterType::DatabaseSupport => &self.database_support,
        }
    }
}

impl Default for PortTables {
    fn default() -> Self {
        Self {
            workload: PortTable::workload(),
            database_support: PortTable::database_support(),
        }
    }
}
