// ==========================================
// 库存补货调拨系统 - 销量速度估算引擎
// ==========================================
// 红线: 除数固定为回看窗口 W,缺失周期按 0 计 (保守估计)
// ==========================================
// 职责: 销量事实 → 每周期平均销量
// 输入: SalesFact / ShipmentFact
// 输出: VelocityRecord (按 key 排序)
// ==========================================

use crate::domain::facts::{CategoryRef, SalesFact, ShipmentFact};
use crate::domain::frame::Frame;
use crate::domain::records::VelocityRecord;
use crate::domain::types::{ChannelFilter, Granularity};
use crate::engine::arith::{round2, safe_divide};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

// ==========================================
// VelocityEstimator - 销量速度估算引擎
// ==========================================
pub struct VelocityEstimator {}

impl VelocityEstimator {
    pub fn new() -> Self {
        Self {}
    }

    /// 周期销量 → 平均每周期销量
    ///
    /// 规则:
    /// 1) 每个 key 取最近 W 个不同周期,第 W 个周期为截止点 (含边界周期的全部记录)
    /// 2) 不足 W 个周期时取全部
    /// 3) 合计 ÷ W
    ///
    /// # 参数
    /// - sales: 销量事实
    /// - lookback: 回看周期数 W (>0)
    /// - granularity: 计算粒度
    /// - channel: 渠道过滤
    #[instrument(skip(self, sales), fields(rows = sales.len()))]
    pub fn estimate(
        &self,
        sales: &Frame<SalesFact>,
        lookback: i64,
        granularity: Granularity,
        channel: &ChannelFilter,
    ) -> PipelineResult<Vec<VelocityRecord>> {
        if lookback <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "sales_lookback_weeks".to_string(),
                value: lookback,
            });
        }

        let mut required = vec!["sku", "period", "units_sold"];
        if granularity == Granularity::SkuFc {
            required.push("fc");
        }
        if !channel.is_all() {
            required.push("channel");
        }
        ensure_columns(sales, &required, "velocity.sales")?;

        let points = sales
            .rows()
            .iter()
            .filter(|f| channel.matches(f.channel.as_deref()))
            .map(|f| {
                let fc = match granularity {
                    Granularity::Sku => None,
                    Granularity::SkuFc => f.fc.clone(),
                };
                ((f.sku.clone(), fc), f.period, f.units_sold)
            });

        let records: Vec<VelocityRecord> = window_average(points, lookback)
            .into_iter()
            .map(|((sku, fc), (units, avg))| VelocityRecord {
                sku,
                fc,
                units_in_window: units,
                avg_rate_per_period: avg,
            })
            .collect();

        debug!(keys = records.len(), "velocity estimated");
        Ok(records)
    }

    /// 型号维度速度 (供应商补单/仓库补货使用)
    ///
    /// SKU 通过品类主数据映射到型号,无映射的 SKU 以自身作为型号。
    /// 返回记录中 sku 字段为型号,fc 为 None。
    #[instrument(skip(self, sales, references), fields(rows = sales.len()))]
    pub fn estimate_by_model(
        &self,
        sales: &Frame<SalesFact>,
        references: &[CategoryRef],
        lookback: i64,
        channel: &ChannelFilter,
    ) -> PipelineResult<Vec<VelocityRecord>> {
        if lookback <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "supplier_lookback_weeks".to_string(),
                value: lookback,
            });
        }
        let mut required = vec!["sku", "period", "units_sold"];
        if !channel.is_all() {
            required.push("channel");
        }
        ensure_columns(sales, &required, "velocity.model_sales")?;

        let models: HashMap<&str, &str> = references
            .iter()
            .filter_map(|r| r.model.as_deref().map(|m| (r.sku.as_str(), m)))
            .collect();

        let points = sales
            .rows()
            .iter()
            .filter(|f| channel.matches(f.channel.as_deref()))
            .map(|f| {
                let model = models.get(f.sku.as_str()).copied().unwrap_or(f.sku.as_str());
                (model.to_string(), f.period, f.units_sold)
            });

        Ok(window_average(points, lookback)
            .into_iter()
            .map(|(model, (units, avg))| VelocityRecord {
                sku: model,
                fc: None,
                units_in_window: units,
                avg_rate_per_period: avg,
            })
            .collect())
    }

    /// 日发货明细 → FC 周销量
    ///
    /// 截止点 = 全表最大发货日 - window_days (含);
    /// weekly_velocity = round2(窗口合计 ÷ weeks_per_window)
    #[instrument(skip(self, shipments), fields(rows = shipments.len()))]
    pub fn estimate_from_shipments(
        &self,
        shipments: &Frame<ShipmentFact>,
        window_days: i64,
        weeks_per_window: f64,
        channel: &ChannelFilter,
    ) -> PipelineResult<Vec<VelocityRecord>> {
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
        let mut required = vec!["sku", "fc", "shipment_date", "quantity"];
        if !channel.is_all() {
            required.push("channel");
        }
        ensure_columns(shipments, &required, "velocity.shipments")?;

        // 截止点取自全表,渠道过滤在其后
        let max_date = match shipments.rows().iter().map(|s| s.shipment_date).max() {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        let cutoff = max_date - Duration::days(window_days);

        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for s in shipments
            .rows()
            .iter()
            .filter(|s| s.shipment_date >= cutoff && channel.matches(s.channel.as_deref()))
        {
            *totals.entry((s.sku.clone(), s.fc.clone())).or_insert(0) += s.quantity;
        }

        debug!(%cutoff, keys = totals.len(), "shipment window applied");

        Ok(totals
            .into_iter()
            .map(|((sku, fc), units)| VelocityRecord {
                sku,
                fc: Some(fc),
                units_in_window: units,
                avg_rate_per_period: round2(safe_divide(units as f64, weeks_per_window, 0.0)),
            })
            .collect())
    }
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// 按 key 取最近 `lookback` 个周期求平均
///
/// 返回: key -> (窗口合计, 合计 ÷ lookback)
pub(crate) fn window_average<K, I>(points: I, lookback: i64) -> BTreeMap<K, (i64, f64)>
where
    K: Ord,
    I: IntoIterator<Item = (K, NaiveDate, i64)>,
{
    let mut grouped: BTreeMap<K, Vec<(NaiveDate, i64)>> = BTreeMap::new();
    for (key, period, units) in points {
        grouped.entry(key).or_default().push((period, units));
    }

    let window = lookback.max(1) as usize;
    grouped
        .into_iter()
        .map(|(key, facts)| {
            let periods: BTreeSet<NaiveDate> = facts.iter().map(|(p, _)| *p).collect();
            // 第 W 个最近周期; 不足 W 个时取最早周期
            let cutoff = periods
                .iter()
                .rev()
                .nth(window - 1)
                .or_else(|| periods.iter().next())
                .copied();
            let units: i64 = facts
                .iter()
                .filter(|(p, _)| cutoff.map(|c| *p >= c).unwrap_or(false))
                .map(|(_, u)| *u)
                .sum();
            (key, (units, units as f64 / lookback as f64))
        })
        .collect()
}
