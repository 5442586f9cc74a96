// ==========================================
// 库存补货调拨系统 - 分配治理引擎
// ==========================================
// 红线: 治理比例是独立策略层,可替换,不掺入缺口计算
// ==========================================
// 职责: 调拨后缺口 → 治理限发 → 满足率 → 标记 + 说明
// 输入: FcPlanRecord + TransferRecord + 品类主数据
// 输出: AllocationRecord
// ==========================================

use crate::domain::facts::CategoryRef;
use crate::domain::frame::Frame;
use crate::domain::records::{AllocationRecord, FcPlanRecord, TransferRecord};
use crate::domain::types::{AllocationFlag, Category};
use crate::engine::arith::{finite_or_zero, round2, safe_divide};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use crate::engine::fc_transfer::FcTransferBalancer;
use std::collections::HashMap;
use tracing::{instrument, warn};

/// 每行附带的计算说明
pub const ALLOCATION_LOGIC: &str =
    "send_qty = max(0, weekly_velocity * replenish_weeks - (fc_inventory + transfer_in))";

/// 品类主数据缺失时的型号占位
pub const UNKNOWN_MODEL: &str = "-";

// ==========================================
// GovernancePolicy - 治理策略
// ==========================================

/// 治理策略: 决定一个缺口在本周期允许发出多少
pub trait GovernancePolicy: Send + Sync {
    /// 返回治理后的发货量 (不得超过 adjusted_shortfall)
    fn governed_send(&self, category: Category, adjusted_shortfall: f64) -> f64;

    /// 策略名称 (日志用)
    fn name(&self) -> &str;
}

/// 固定比例治理: 受管控品类按比例限发,豁免品类全量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioGovernance {
    ratio: f64,
}

impl RatioGovernance {
    pub fn new(ratio: f64) -> PipelineResult<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "governance_ratio".to_string(),
                message: format!("必须位于 (0, 1], 实际={}", ratio),
            });
        }
        Ok(Self { ratio })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Default for RatioGovernance {
    fn default() -> Self {
        Self { ratio: 0.35 }
    }
}

impl GovernancePolicy for RatioGovernance {
    fn governed_send(&self, category: Category, adjusted_shortfall: f64) -> f64 {
        match category {
            Category::Exempt => adjusted_shortfall,
            Category::Governed => round2(adjusted_shortfall * self.ratio),
        }
    }

    fn name(&self) -> &str {
        "ratio"
    }
}

// ==========================================
// AllocationGovernor - 分配治理引擎
// ==========================================
pub struct AllocationGovernor {
    policy: Box<dyn GovernancePolicy>,
    fill_ratio_threshold: f64,
}

impl AllocationGovernor {
    /// # 参数
    /// - policy: 治理策略
    /// - fill_ratio_threshold: 满足率阈值 (≤ 阈值标记 SHORT),取值 (0, 1]
    pub fn new(policy: Box<dyn GovernancePolicy>, fill_ratio_threshold: f64) -> PipelineResult<Self> {
        if !(fill_ratio_threshold > 0.0 && fill_ratio_threshold <= 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "fill_ratio_threshold".to_string(),
                message: format!("必须位于 (0, 1], 实际={}", fill_ratio_threshold),
            });
        }
        Ok(Self {
            policy,
            fill_ratio_threshold,
        })
    }

    /// 生成最终分配
    ///
    /// 品类主数据中缺失的 SKU 按豁免处理,型号记为 "-",并记录 WARN 日志。
    #[instrument(skip(self, plan, transfers, categories), fields(rows = plan.len(), policy = self.policy.name()))]
    pub fn allocate(
        &self,
        plan: &[FcPlanRecord],
        transfers: &[TransferRecord],
        categories: &Frame<CategoryRef>,
        replenish_weeks: i64,
    ) -> PipelineResult<Vec<AllocationRecord>> {
        if replenish_weeks <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "replenish_weeks".to_string(),
                value: replenish_weeks,
            });
        }
        ensure_columns(categories, &["sku"], "allocation.categories")?;
        for column in ["model", "category"] {
            if !categories.is_empty() && !categories.has_column(column) {
                warn!(column, "品类主数据缺少列,按缺省值处理");
            }
        }

        let refs: HashMap<&str, &CategoryRef> = categories
            .rows()
            .iter()
            .map(|r| (r.sku.as_str(), r))
            .collect();
        let transfer_in = FcTransferBalancer::transfer_in(transfers);

        let mut missing_category = 0usize;
        let records = plan
            .iter()
            .map(|row| {
                let reference = refs.get(row.sku.as_str()).copied();
                let category = reference.and_then(|r| r.category);
                if category.is_none() {
                    missing_category += 1;
                }
                let model = reference
                    .and_then(|r| r.model.clone())
                    .unwrap_or_else(|| UNKNOWN_MODEL.to_string());
                let inbound = transfer_in
                    .get(&(row.sku.clone(), row.fc.clone()))
                    .copied()
                    .unwrap_or(0) as f64;
                self.allocate_row(row, model, category, inbound, replenish_weeks)
            })
            .collect();

        if missing_category > 0 {
            warn!(
                missing_category,
                "SKU 缺少品类主数据,按豁免品类处理"
            );
        }
        Ok(records)
    }

    /// 单行分配
    pub fn allocate_row(
        &self,
        row: &FcPlanRecord,
        model: String,
        category: Option<Category>,
        transfer_in: f64,
        replenish_weeks: i64,
    ) -> AllocationRecord {
        // 1-4. 调拨后缺口
        let target_cover_units = round2(row.weekly_velocity * replenish_weeks as f64);
        let post_transfer_stock = round2(row.fc_inventory + transfer_in);
        let adjusted_shortfall = round2((target_cover_units - post_transfer_stock).max(0.0));
        let original_required_units = adjusted_shortfall;

        // 5. 治理 (缺失品类按豁免)
        let effective = category.unwrap_or(Category::Exempt);
        let send_qty = self
            .policy
            .governed_send(effective, adjusted_shortfall)
            .clamp(0.0, original_required_units);

        // 6. 满足率
        let fill_ratio = finite_or_zero(safe_divide(send_qty, original_required_units, 0.0));

        // 7. 标记
        let flag = if original_required_units == 0.0 {
            AllocationFlag::NoRequirement
        } else if fill_ratio <= self.fill_ratio_threshold {
            AllocationFlag::Short
        } else {
            AllocationFlag::Ok
        };

        AllocationRecord {
            sku: row.sku.clone(),
            fc: row.fc.clone(),
            model,
            category,
            weekly_velocity: row.weekly_velocity,
            fc_inventory: row.fc_inventory,
            transfer_in,
            target_cover_units,
            post_transfer_stock,
            adjusted_shortfall,
            original_required_units,
            send_qty,
            fill_ratio,
            fill_pct: round2(fill_ratio * 100.0),
            flag,
            allocation_logic: ALLOCATION_LOGIC.to_string(),
        }
    }
}

impl Default for AllocationGovernor {
    fn default() -> Self {
        Self {
            policy: Box::new(RatioGovernance::default()),
            fill_ratio_threshold: 0.70,
        }
    }
}
