// ==========================================
// 库存补货调拨系统 - 对账引擎
// ==========================================
// 红线: 不一致即失败,携带全部不一致行; 调用方据此阻断运行,不落库
// ==========================================
// 规则:
// - 库存平衡: opening + inbound - outbound == closing (按 sku, fc 全外连接, 缺失补 0)
// - 补货行: 不得为负, raw_shortfall == max(0, requirement - net_available)
// - 分配行: send_qty 不得为负
// ==========================================

use crate::domain::facts::StockMovement;
use crate::domain::frame::Frame;
use crate::domain::records::{AllocationRecord, ShortfallRecord};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult, ReconciliationMismatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

/// 单个 (sku, fc) 的库存平衡
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBalance {
    pub sku: String,
    pub fc: String,
    pub opening: i64,
    pub inbound: i64,
    pub outbound: i64,
    pub closing: i64,
    /// opening + inbound - outbound
    pub calculated: i64,
    /// closing - calculated
    pub delta: i64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Movements {
    opening: i64,
    inbound: i64,
    outbound: i64,
    closing: i64,
}

// ==========================================
// ReconciliationEngine - 对账引擎
// ==========================================
pub struct ReconciliationEngine {}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 库存平衡对账
    ///
    /// # 返回
    /// 全部一致时返回每个 (sku, fc) 的平衡明细 (按 key 排序)
    #[instrument(skip_all, fields(rows = closing.len()))]
    pub fn reconcile_stock(
        &self,
        opening: &Frame<StockMovement>,
        inbound: &Frame<StockMovement>,
        outbound: &Frame<StockMovement>,
        closing: &Frame<StockMovement>,
    ) -> PipelineResult<Vec<StockBalance>> {
        let required = ["sku", "fc", "quantity"];
        ensure_columns(opening, &required, "reconcile.opening")?;
        ensure_columns(inbound, &required, "reconcile.inbound")?;
        ensure_columns(outbound, &required, "reconcile.outbound")?;
        ensure_columns(closing, &required, "reconcile.closing")?;

        let mut joined: BTreeMap<(String, String), Movements> = BTreeMap::new();
        Self::accumulate(&mut joined, opening, |m, q| m.opening += q);
        Self::accumulate(&mut joined, inbound, |m, q| m.inbound += q);
        Self::accumulate(&mut joined, outbound, |m, q| m.outbound += q);
        Self::accumulate(&mut joined, closing, |m, q| m.closing += q);

        let balances: Vec<StockBalance> = joined
            .into_iter()
            .map(|((sku, fc), m)| {
                let calculated = m.opening + m.inbound - m.outbound;
                StockBalance {
                    sku,
                    fc,
                    opening: m.opening,
                    inbound: m.inbound,
                    outbound: m.outbound,
                    closing: m.closing,
                    calculated,
                    delta: m.closing - calculated,
                }
            })
            .collect();

        let mismatches: Vec<ReconciliationMismatch> = balances
            .iter()
            .filter(|b| b.delta != 0)
            .map(|b| ReconciliationMismatch {
                sku: b.sku.clone(),
                fc: Some(b.fc.clone()),
                expected: b.calculated,
                actual: b.closing,
                delta: b.delta,
            })
            .collect();

        Self::fail_on_mismatch("库存平衡不一致 (opening + inbound - outbound != closing)", mismatches)?;
        info!(keys = balances.len(), "stock reconciled");
        Ok(balances)
    }

    /// 补货行对账
    #[instrument(skip_all, fields(rows = shortfalls.len()))]
    pub fn reconcile_replenishment_vs_stock(&self, shortfalls: &[ShortfallRecord]) -> PipelineResult<()> {
        let mismatches: Vec<ReconciliationMismatch> = shortfalls
            .iter()
            .filter_map(|r| {
                let expected_raw = (r.requirement - r.net_available).max(0);
                if r.shortfall < 0 {
                    Some(ReconciliationMismatch {
                        sku: r.sku.clone(),
                        fc: r.fc.clone(),
                        expected: 0,
                        actual: r.shortfall,
                        delta: r.shortfall,
                    })
                } else if r.raw_shortfall != expected_raw {
                    Some(ReconciliationMismatch {
                        sku: r.sku.clone(),
                        fc: r.fc.clone(),
                        expected: expected_raw,
                        actual: r.raw_shortfall,
                        delta: r.raw_shortfall - expected_raw,
                    })
                } else {
                    None
                }
            })
            .collect();

        Self::fail_on_mismatch("补货行与库存不一致", mismatches)
    }

    /// 分配行对账: send_qty 不得为负
    #[instrument(skip_all, fields(rows = allocations.len()))]
    pub fn reconcile_allocations(&self, allocations: &[AllocationRecord]) -> PipelineResult<()> {
        let mismatches: Vec<ReconciliationMismatch> = allocations
            .iter()
            .filter(|r| r.send_qty < 0.0 || !r.send_qty.is_finite())
            .map(|r| {
                let actual = if r.send_qty.is_finite() {
                    r.send_qty.round() as i64
                } else {
                    0
                };
                ReconciliationMismatch {
                    sku: r.sku.clone(),
                    fc: Some(r.fc.clone()),
                    expected: 0,
                    actual,
                    delta: actual,
                }
            })
            .collect();

        Self::fail_on_mismatch("分配发货量为负或无效", mismatches)
    }

    fn accumulate<F>(
        joined: &mut BTreeMap<(String, String), Movements>,
        frame: &Frame<StockMovement>,
        apply: F,
    ) where
        F: Fn(&mut Movements, i64),
    {
        for row in frame.rows() {
            let entry = joined.entry((row.sku.clone(), row.fc.clone())).or_default();
            apply(entry, row.quantity);
        }
    }

    fn fail_on_mismatch(message: &str, mismatches: Vec<ReconciliationMismatch>) -> PipelineResult<()> {
        if mismatches.is_empty() {
            return Ok(());
        }
        error!(count = mismatches.len(), message, "reconciliation failed");
        Err(PipelineError::Reconciliation {
            message: message.to_string(),
            mismatches,
        })
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}
