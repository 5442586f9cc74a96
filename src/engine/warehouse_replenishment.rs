// ==========================================
// 库存补货调拨系统 - 仓库到平台补货引擎
// ==========================================
// 职责: 型号维度平台补货量 + 仓库缺口 (补单信号) + 风险/积压标记
// 规则:
// - sales_velocity = round(窗口销量 ÷ 窗口周数)
// - required = round(velocity × replenish_weeks)
// - replenishment_qty = max(0, required - 平台库存)
// - warehouse_shortfall = max(0, replenishment_qty - 仓库库存)
// - is_risky: 平台库存 < 一周销量; is_overstock: 平台库存 > overstock_weeks 周销量
// ==========================================

use crate::domain::facts::{CategoryRef, ModelStockPosition, SalesFact};
use crate::domain::frame::Frame;
use crate::domain::records::WarehouseReplenishmentRecord;
use crate::domain::types::ChannelFilter;
use crate::engine::arith::round_units;
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use crate::engine::velocity::VelocityEstimator;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 仓库补货参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarehousePolicy {
    pub lookback_weeks: i64,
    pub replenish_weeks: i64,
    pub overstock_weeks: i64,
}

impl Default for WarehousePolicy {
    fn default() -> Self {
        Self {
            lookback_weeks: 8,
            replenish_weeks: 8,
            overstock_weeks: 8,
        }
    }
}

// ==========================================
// WarehouseReplenishmentPlanner - 仓库到平台补货引擎
// ==========================================
pub struct WarehouseReplenishmentPlanner {
    velocity: VelocityEstimator,
}

impl WarehouseReplenishmentPlanner {
    pub fn new() -> Self {
        Self {
            velocity: VelocityEstimator::new(),
        }
    }

    /// 以库存位置为左表,连接型号销量 (缺失补 0)
    #[instrument(skip(self, sales, references, positions), fields(models = positions.len()))]
    pub fn plan(
        &self,
        sales: &Frame<SalesFact>,
        references: &[CategoryRef],
        positions: &Frame<ModelStockPosition>,
        channel: &ChannelFilter,
        policy: &WarehousePolicy,
    ) -> PipelineResult<Vec<WarehouseReplenishmentRecord>> {
        for (name, value) in [
            ("replenish_weeks", policy.replenish_weeks),
            ("overstock_weeks", policy.overstock_weeks),
        ] {
            if value <= 0 {
                return Err(PipelineError::InvalidHorizon {
                    name: name.to_string(),
                    value,
                });
            }
        }
        ensure_columns(
            positions,
            &["model", "marketplace_inventory", "warehouse_inventory"],
            "warehouse.positions",
        )?;

        let velocity: HashMap<String, (i64, f64)> = self
            .velocity
            .estimate_by_model(sales, references, policy.lookback_weeks, channel)?
            .into_iter()
            .map(|v| (v.sku, (v.units_in_window, v.avg_rate_per_period)))
            .collect();

        let mut records: Vec<WarehouseReplenishmentRecord> = positions
            .rows()
            .iter()
            .map(|p| {
                let (units, avg) = velocity.get(&p.model).copied().unwrap_or((0, 0.0));
                let sales_velocity = round_units(avg);
                let required_units = sales_velocity * policy.replenish_weeks;
                let replenishment_qty = (required_units - p.marketplace_inventory).max(0);
                let warehouse_shortfall = (replenishment_qty - p.warehouse_inventory).max(0);
                WarehouseReplenishmentRecord {
                    model: p.model.clone(),
                    sales_velocity: sales_velocity as f64,
                    units_in_window: units,
                    marketplace_inventory: p.marketplace_inventory,
                    warehouse_inventory: p.warehouse_inventory,
                    required_units,
                    replenishment_qty,
                    warehouse_shortfall,
                    is_risky: p.marketplace_inventory < sales_velocity,
                    is_overstock: p.marketplace_inventory > sales_velocity * policy.overstock_weeks,
                }
            })
            .collect();
        records.sort_by(|a, b| a.model.cmp(&b.model));

        debug!(
            models = records.len(),
            risky = records.iter().filter(|r| r.is_risky).count(),
            "warehouse replenishment planned"
        );
        Ok(records)
    }
}

impl Default for WarehouseReplenishmentPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn sales(model: &str, weeks: u32, units: i64) -> Frame<SalesFact> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        Frame::from_rows(
            (0..weeks)
                .map(|w| SalesFact {
                    sku: model.to_string(),
                    fc: None,
                    channel: Some("amazon".to_string()),
                    period: start + Duration::weeks(w as i64),
                    units_sold: units,
                })
                .collect(),
        )
    }

    fn position(model: &str, marketplace: i64, warehouse: i64) -> ModelStockPosition {
        ModelStockPosition {
            model: model.to_string(),
            marketplace_inventory: marketplace,
            warehouse_inventory: warehouse,
        }
    }

    #[test]
    fn test_replenishment_and_warehouse_shortfall() {
        let planner = WarehouseReplenishmentPlanner::new();
        let out = planner
            .plan(
                &sales("M1", 8, 10),
                &[],
                &Frame::from_rows(vec![position("M1", 5, 30)]),
                &ChannelFilter::All,
                &WarehousePolicy::default(),
            )
            .unwrap();

        let r = &out[0];
        assert_eq!(r.sales_velocity, 10.0);
        assert_eq!(r.required_units, 80);
        assert_eq!(r.replenishment_qty, 75);
        assert_eq!(r.warehouse_shortfall, 45);
        assert!(r.is_risky);
        assert!(!r.is_overstock);
    }

    #[test]
    fn test_overstock_flag_and_missing_sales() {
        let planner = WarehouseReplenishmentPlanner::new();
        let out = planner
            .plan(
                &sales("M1", 8, 1),
                &[],
                &Frame::from_rows(vec![position("M1", 100, 0), position("M2", 0, 0)]),
                &ChannelFilter::All,
                &WarehousePolicy::default(),
            )
            .unwrap();

        assert!(out[0].is_overstock);
        assert_eq!(out[0].replenishment_qty, 0);
        assert_eq!(out[1].sales_velocity, 0.0);
        assert!(!out[1].is_risky);
    }
}
