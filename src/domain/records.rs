// ==========================================
// 库存补货调拨系统 - 计算结果记录
// ==========================================
// 红线: 每个阶段产出新表,不修改上游记录
// ==========================================

use crate::domain::types::{AllocationFlag, Category};
use serde::{Deserialize, Serialize};

/// 计算键: (sku, fc?)
///
/// fc 为 None 表示 SKU 维度汇总。排序先按 sku 再按 fc,None 排在前。
pub type SkuKey = (String, Option<String>);

// ==========================================
// RegionSalesRecord - 地区销量汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSalesRecord {
    pub sku: String,
    pub region: String,
    pub units_in_window: i64,
    pub revenue: f64,
    pub weekly_velocity: f64,
}

// ==========================================
// VelocityRecord - 周期平均销量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityRecord {
    pub sku: String,
    pub fc: Option<String>,
    /// 窗口内总销量
    pub units_in_window: i64,
    /// 窗口内平均每周期销量 (总量 ÷ 窗口周期数)
    pub avg_rate_per_period: f64,
}

impl VelocityRecord {
    pub fn key(&self) -> SkuKey {
        (self.sku.clone(), self.fc.clone())
    }
}

// ==========================================
// NetInventoryRecord - 净可用库存
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetInventoryRecord {
    pub sku: String,
    /// None 表示 SKU 维度汇总
    pub fc: Option<String>,
    pub sellable: i64,
    pub buffer_stock: i64,
    pub secondary_effective: i64,
    pub recalled: i64,
    pub net_available: i64,
}

impl NetInventoryRecord {
    pub fn key(&self) -> SkuKey {
        (self.sku.clone(), self.fc.clone())
    }
}

// ==========================================
// RequirementRecord - 目标库存需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementRecord {
    pub sku: String,
    pub fc: Option<String>,
    pub avg_rate_per_period: f64,
    pub requirement: i64,
}

impl RequirementRecord {
    pub fn key(&self) -> SkuKey {
        (self.sku.clone(), self.fc.clone())
    }
}

// ==========================================
// ShortfallRecord - 补货缺口
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortfallRecord {
    pub sku: String,
    pub fc: Option<String>,
    pub avg_rate_per_period: f64,
    pub requirement: i64,
    pub net_available: i64,
    /// max(0, requirement - net_available)
    pub raw_shortfall: i64,
    /// avg_rate_per_period × 安全倍数 (取整)
    pub safety_cap: i64,
    /// min(raw_shortfall, safety_cap)
    pub capped_shortfall: i64,
    pub lot_size: Option<i64>,
    /// 最终补货量 (箱规取整后)
    pub shortfall: i64,
}

// ==========================================
// FcPlanRecord - FC 维度计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcPlanRecord {
    pub sku: String,
    pub fc: String,
    pub units_in_window: i64,
    pub weekly_velocity: f64,
    pub fc_inventory: f64,
    pub required_units: f64,
    pub fc_shortfall: f64,
    pub coverage_weeks: f64,
    /// 周销量为 0 时 coverage_weeks 以除数 1 近似,不具备业务含义
    pub coverage_approximated: bool,
    pub excess: f64,
}

// ==========================================
// TransferRecord - FC 间调拨
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferRecord {
    pub sku: String,
    pub from_fc: String,
    pub to_fc: String,
    pub transfer_qty: i64,
}

// ==========================================
// AllocationRecord - 最终分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub sku: String,
    pub fc: String,
    /// 型号 (品类主数据缺失时为 "-")
    pub model: String,
    pub category: Option<Category>,
    pub weekly_velocity: f64,
    pub fc_inventory: f64,
    pub transfer_in: f64,
    pub target_cover_units: f64,
    pub post_transfer_stock: f64,
    pub adjusted_shortfall: f64,
    pub original_required_units: f64,
    pub send_qty: f64,
    pub fill_ratio: f64,
    pub fill_pct: f64,
    pub flag: AllocationFlag,
    pub allocation_logic: String,
}

// ==========================================
// SupplierReorderRecord - 供应商补单建议 (型号维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierReorderRecord {
    pub model: String,
    pub units_in_window: i64,
    pub avg_weekly_sales: f64,
    pub current_inventory: i64,
    pub open_order_qty: i64,
    pub weeks_cover: f64,
    pub target_stock: f64,
    pub suggested_reorder: f64,
}

// ==========================================
// WarehouseReplenishmentRecord - 仓库到平台补货 (型号维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseReplenishmentRecord {
    pub model: String,
    pub sales_velocity: f64,
    pub units_in_window: i64,
    pub marketplace_inventory: i64,
    pub warehouse_inventory: i64,
    pub required_units: i64,
    pub replenishment_qty: i64,
    /// 仓库缺口 (向供应商补单信号)
    pub warehouse_shortfall: i64,
    /// 平台库存不足一周
    pub is_risky: bool,
    /// 平台库存超过 overstock_weeks 周
    pub is_overstock: bool,
}
