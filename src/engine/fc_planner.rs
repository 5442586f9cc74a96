// ==========================================
// 库存补货调拨系统 - FC 维度计划引擎
// ==========================================
// 红线: 周销量为 0 时覆盖周数按除数 1 近似,并显式标记
// ==========================================
// 职责: (sku, fc) 维度需求/缺口/覆盖周数/富余量
// 输入: FC 周销量 (VelocityRecord, fc 非空) + 台账可售库存
// 输出: FcPlanRecord
// ==========================================

use crate::domain::facts::InventoryFact;
use crate::domain::frame::Frame;
use crate::domain::records::{FcPlanRecord, VelocityRecord};
use crate::engine::arith::{approximate_coverage, round2};
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::net_inventory::NetInventoryAggregator;
use tracing::{debug, instrument};

// ==========================================
// FcPlanner - FC 维度计划引擎
// ==========================================
pub struct FcPlanner {
    aggregator: NetInventoryAggregator,
}

impl FcPlanner {
    pub fn new() -> Self {
        Self {
            aggregator: NetInventoryAggregator::new(),
        }
    }

    /// 生成 FC 计划
    ///
    /// 以销量行为左表连接可售库存 (缺失补 0)。有库存但无销量的 FC 不出现在计划中,
    /// 因此也不会成为调拨来源。
    ///
    /// # 参数
    /// - velocity: FC 周销量
    /// - inventory: 库存台账
    /// - replenish_weeks: 补货覆盖周数 (>0)
    #[instrument(skip(self, velocity, inventory), fields(rows = velocity.len()))]
    pub fn plan(
        &self,
        velocity: &[VelocityRecord],
        inventory: &Frame<InventoryFact>,
        replenish_weeks: i64,
    ) -> PipelineResult<Vec<FcPlanRecord>> {
        if replenish_weeks <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "replenish_weeks".to_string(),
                value: replenish_weeks,
            });
        }
        let sellable = self.aggregator.sellable_by_fc(inventory)?;

        let mut records = Vec::with_capacity(velocity.len());
        for v in velocity {
            let fc = match &v.fc {
                Some(fc) => fc.clone(),
                None => {
                    return Err(PipelineError::MissingColumns {
                        context: "fc_plan.velocity".to_string(),
                        columns: vec!["fc".to_string()],
                    })
                }
            };
            let fc_inventory = sellable
                .get(&(v.sku.clone(), fc.clone()))
                .copied()
                .unwrap_or(0) as f64;
            records.push(Self::plan_row(
                &v.sku,
                &fc,
                v.units_in_window,
                v.avg_rate_per_period,
                fc_inventory,
                replenish_weeks,
            ));
        }
        records.sort_by(|a, b| (&a.sku, &a.fc).cmp(&(&b.sku, &b.fc)));

        debug!(
            rows = records.len(),
            approximated = records.iter().filter(|r| r.coverage_approximated).count(),
            "fc plan built"
        );
        Ok(records)
    }

    /// 单行计划
    pub fn plan_row(
        sku: &str,
        fc: &str,
        units_in_window: i64,
        weekly_velocity: f64,
        fc_inventory: f64,
        replenish_weeks: i64,
    ) -> FcPlanRecord {
        let required_units = round2(weekly_velocity * replenish_weeks as f64);
        let (coverage, coverage_approximated) = approximate_coverage(fc_inventory, weekly_velocity);
        FcPlanRecord {
            sku: sku.to_string(),
            fc: fc.to_string(),
            units_in_window,
            weekly_velocity,
            fc_inventory,
            required_units,
            fc_shortfall: round2((required_units - fc_inventory).max(0.0)),
            coverage_weeks: round2(coverage),
            coverage_approximated,
            excess: round2((fc_inventory - required_units).max(0.0)),
        }
    }
}

impl Default for FcPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Disposition;

    fn velocity(sku: &str, fc: &str, weekly: f64) -> VelocityRecord {
        VelocityRecord {
            sku: sku.to_string(),
            fc: Some(fc.to_string()),
            units_in_window: 0,
            avg_rate_per_period: weekly,
        }
    }

    fn sellable(sku: &str, fc: &str, qty: i64) -> InventoryFact {
        InventoryFact {
            sku: sku.to_string(),
            fc: fc.to_string(),
            disposition: Disposition::Sellable,
            quantity: qty,
            aging_days: None,
        }
    }

    #[test]
    fn test_plan_shortfall_and_excess() {
        let planner = FcPlanner::new();
        let ledger = Frame::from_rows(vec![sellable("A", "FC1", 10), sellable("A", "FC2", 80)]);
        let out = planner
            .plan(&[velocity("A", "FC1", 6.25), velocity("A", "FC2", 2.5)], &ledger, 8)
            .unwrap();

        assert_eq!(out[0].required_units, 50.0);
        assert_eq!(out[0].fc_shortfall, 40.0);
        assert_eq!(out[0].excess, 0.0);
        assert_eq!(out[0].coverage_weeks, 1.6);
        assert_eq!(out[1].required_units, 20.0);
        assert_eq!(out[1].excess, 60.0);
        assert_eq!(out[1].fc_shortfall, 0.0);
    }

    #[test]
    fn test_zero_velocity_coverage_is_flagged() {
        let planner = FcPlanner::new();
        let ledger = Frame::from_rows(vec![sellable("A", "FC1", 12)]);
        let out = planner.plan(&[velocity("A", "FC1", 0.0)], &ledger, 8).unwrap();

        assert!(out[0].coverage_approximated);
        assert_eq!(out[0].coverage_weeks, 12.0);
        assert_eq!(out[0].excess, 12.0);
    }

    #[test]
    fn test_velocity_without_inventory_zero_filled() {
        let planner = FcPlanner::new();
        let out = planner
            .plan(&[velocity("A", "FC9", 1.0)], &Frame::empty(), 8)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].fc_inventory, 0.0);
        assert_eq!(out[0].fc_shortfall, 8.0);
    }

    #[test]
    fn test_invalid_horizon() {
        let planner = FcPlanner::new();
        let err = planner.plan(&[], &Frame::empty(), 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidHorizon { .. }));
    }
}
