// ==========================================
// 库存补货调拨系统 - 供应商补单建议引擎
// ==========================================
// 职责: 型号维度的供应商补单建议
// 规则:
// - avg_weekly_sales = 最近 lookback 周销量 ÷ lookback
// - 渠道为 open order 或类型为在途的库存归为未到货,其余为在库
// - target_stock = avg_weekly_sales × months × 4
// - suggested_reorder = max(0, target_stock - 在库)
// 说明: 未到货数量只展示,不从建议量中扣减
// ==========================================

use crate::domain::facts::{CategoryRef, ModelInventory, SalesFact};
use crate::domain::frame::Frame;
use crate::domain::records::SupplierReorderRecord;
use crate::domain::types::ChannelFilter;
use crate::engine::arith::{round2, safe_divide};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use crate::engine::velocity::VelocityEstimator;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 每月按 4 周计
const WEEKS_PER_MONTH: f64 = 4.0;

#[derive(Debug, Default, Clone, Copy)]
struct ModelStock {
    on_hand: i64,
    open_order: i64,
}

// ==========================================
// SupplierReorderCalculator - 供应商补单建议引擎
// ==========================================
pub struct SupplierReorderCalculator {
    velocity: VelocityEstimator,
}

impl SupplierReorderCalculator {
    pub fn new() -> Self {
        Self {
            velocity: VelocityEstimator::new(),
        }
    }

    /// 计算补单建议
    ///
    /// # 参数
    /// - sales: 周销量 (SKU 经品类主数据映射到型号)
    /// - references: 品类主数据
    /// - inventory: 型号库存快照
    /// - lookback_weeks: 回看周数
    /// - months_of_cover: 目标覆盖月数
    #[instrument(skip(self, sales, references, inventory), fields(sales = sales.len(), inventory = inventory.len()))]
    pub fn calculate(
        &self,
        sales: &Frame<SalesFact>,
        references: &[CategoryRef],
        inventory: &Frame<ModelInventory>,
        lookback_weeks: i64,
        months_of_cover: i64,
    ) -> PipelineResult<Vec<SupplierReorderRecord>> {
        if months_of_cover <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "supplier_months_of_cover".to_string(),
                value: months_of_cover,
            });
        }
        ensure_columns(inventory, &["model", "kind", "quantity"], "supplier_reorder.inventory")?;

        let velocity = self
            .velocity
            .estimate_by_model(sales, references, lookback_weeks, &ChannelFilter::All)?;

        let mut stock: BTreeMap<String, ModelStock> = BTreeMap::new();
        for row in inventory.rows() {
            let entry = stock.entry(row.model.clone()).or_default();
            if row.kind.is_inbound() {
                entry.open_order += row.quantity;
            } else {
                entry.on_hand += row.quantity;
            }
        }

        // 销量与库存型号全外连接
        let mut joined: BTreeMap<String, (i64, f64, ModelStock)> = BTreeMap::new();
        for v in velocity {
            joined.insert(v.sku, (v.units_in_window, v.avg_rate_per_period, ModelStock::default()));
        }
        for (model, s) in stock {
            joined.entry(model).or_insert((0, 0.0, ModelStock::default())).2 = s;
        }

        let target_weeks = months_of_cover as f64 * WEEKS_PER_MONTH;
        let records: Vec<SupplierReorderRecord> = joined
            .into_iter()
            .map(|(model, (units, avg, s))| {
                let target_stock = round2(avg * target_weeks);
                SupplierReorderRecord {
                    model,
                    units_in_window: units,
                    avg_weekly_sales: round2(avg),
                    current_inventory: s.on_hand,
                    open_order_qty: s.open_order,
                    weeks_cover: round2(safe_divide(s.on_hand as f64, avg, 0.0)),
                    target_stock,
                    suggested_reorder: round2((target_stock - s.on_hand as f64).max(0.0)),
                }
            })
            .collect();

        debug!(models = records.len(), "supplier reorder calculated");
        Ok(records)
    }
}

impl Default for SupplierReorderCalculator {
    fn default() -> Self {
        Self::new()
    }
}
