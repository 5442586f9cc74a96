// ==========================================
// 库存补货调拨系统 - 地区销量汇总
// ==========================================
// 职责: 发货明细 → SKU × 收货地区 的窗口销量、销售额、周销量
// 窗口: 截止点 = 全表最大发货日 - window_days (含)
// 说明: 只读报表,不参与补货计算
// ==========================================

use crate::domain::facts::RegionShipment;
use crate::domain::frame::Frame;
use crate::domain::records::RegionSalesRecord;
use crate::engine::arith::{round2, safe_divide};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use chrono::Duration;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[derive(Debug, Default, Clone, Copy)]
struct RegionTotals {
    units: i64,
    revenue: f64,
}

// ==========================================
// RegionSalesAggregator
// ==========================================
pub struct RegionSalesAggregator {}

impl RegionSalesAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 按 (sku, region) 汇总,结果按 sku、region 升序
    ///
    /// 缺少 item_price 列时销售额记 0。
    #[instrument(skip(self, shipments), fields(rows = shipments.len()))]
    pub fn aggregate(
        &self,
        shipments: &Frame<RegionShipment>,
        window_days: i64,
        weeks_per_window: f64,
    ) -> PipelineResult<Vec<RegionSalesRecord>> {
        if window_days <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "shipment_window_days".to_string(),
                value: window_days,
            });
        }
        if !(weeks_per_window > 0.0 && weeks_per_window.is_finite()) {
            return Err(PipelineError::InvalidParameter {
                name: "weeks_per_window".to_string(),
                message: format!("必须为正数, 实际={}", weeks_per_window),
            });
        }
        ensure_columns(
            shipments,
            &["sku", "region", "shipment_date", "quantity"],
            "region_sales.shipments",
        )?;

        let max_date = match shipments.rows().iter().map(|s| s.shipment_date).max() {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        let cutoff = max_date - Duration::days(window_days);

        let mut totals: BTreeMap<(String, String), RegionTotals> = BTreeMap::new();
        for s in shipments.rows().iter().filter(|s| s.shipment_date >= cutoff) {
            let entry = totals.entry((s.sku.clone(), s.region.clone())).or_default();
            entry.units += s.quantity;
            if s.item_price.is_finite() {
                entry.revenue += s.item_price;
            }
        }

        debug!(%cutoff, keys = totals.len(), "region window applied");

        Ok(totals
            .into_iter()
            .map(|((sku, region), t)| RegionSalesRecord {
                sku,
                region,
                units_in_window: t.units,
                revenue: round2(t.revenue),
                weekly_velocity: round2(safe_divide(t.units as f64, weeks_per_window, 0.0)),
            })
            .collect())
    }
}

impl Default for RegionSalesAggregator {
    fn default() -> Self {
        Self::new()
    }
}
