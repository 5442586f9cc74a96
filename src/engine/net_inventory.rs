// ==========================================
// 库存补货调拨系统 - 净可用库存汇总引擎
// ==========================================
// 红线: 次级库存按 SKU 汇总后等额加到该 SKU 的每个 FC 行 (不按比例分摊)
// ==========================================
// 职责: 可售 - 召回 + 外部缓冲 + 加权次级库存,下限 0
// 输入: InventoryFact / SecondaryStockLot / BufferStock
// 输出: NetInventoryRecord (按 key 排序)
// ==========================================

use crate::domain::facts::{BufferStock, InventoryFact, SecondaryStockLot};
use crate::domain::frame::Frame;
use crate::domain::records::{NetInventoryRecord, SkuKey};
use crate::domain::types::{Disposition, Granularity};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// 次级库存折算参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryStockPolicy {
    /// 库龄上限 (天),超过的批次不计入
    pub max_age_days: i64,
    /// 信任权重 (0, 1]
    pub trust_weight: f64,
}

impl SecondaryStockPolicy {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.trust_weight > 0.0 && self.trust_weight <= 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "secondary_trust_weight".to_string(),
                message: format!("必须位于 (0, 1], 实际={}", self.trust_weight),
            });
        }
        if self.max_age_days < 0 {
            return Err(PipelineError::InvalidParameter {
                name: "secondary_max_age_days".to_string(),
                message: format!("不能为负数, 实际={}", self.max_age_days),
            });
        }
        Ok(())
    }

    /// 单批次有效数量: 超龄为 0,否则 trunc(qty × w)
    ///
    /// 库龄缺失的批次视为未超龄。
    pub fn effective_quantity(&self, lot: &SecondaryStockLot) -> i64 {
        match lot.aging_days {
            Some(age) if age as i64 > self.max_age_days => 0,
            _ => (lot.quantity as f64 * self.trust_weight) as i64,
        }
    }
}

impl Default for SecondaryStockPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 90,
            trust_weight: 0.6,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sellable: i64,
    recalled: i64,
}

// ==========================================
// NetInventoryAggregator - 净可用库存汇总引擎
// ==========================================
pub struct NetInventoryAggregator {}

impl NetInventoryAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 汇总净可用库存
    ///
    /// 规则:
    /// 1) 可售数量按 key 汇总
    /// 2) 召回数量按 key 汇总后扣减
    /// 3) 外部缓冲库存、加权次级库存按 SKU 汇总,等额加到该 SKU 的每一行
    /// 4) 结果下限为 0
    ///
    /// SKU 粒度下,只有缓冲/次级库存的 SKU 也会输出一行;
    /// FC 粒度下,没有台账行的 SKU 不会凭空生成 FC 行。
    #[instrument(skip(self, inventory, secondary, buffer), fields(rows = inventory.len()))]
    pub fn aggregate(
        &self,
        inventory: &Frame<InventoryFact>,
        secondary: Option<&Frame<SecondaryStockLot>>,
        buffer: Option<&Frame<BufferStock>>,
        policy: &SecondaryStockPolicy,
        granularity: Granularity,
    ) -> PipelineResult<Vec<NetInventoryRecord>> {
        policy.validate()?;
        ensure_columns(inventory, &["sku", "fc", "disposition", "quantity"], "net_inventory.ledger")?;
        if let Some(lots) = secondary {
            ensure_columns(lots, &["sku", "quantity", "aging_days"], "net_inventory.secondary")?;
        }
        if let Some(eb) = buffer {
            ensure_columns(eb, &["sku", "quantity"], "net_inventory.buffer")?;
        }

        // 1-2. 台账按 key 汇总
        let mut ledger: BTreeMap<SkuKey, Accumulator> = BTreeMap::new();
        for fact in inventory.rows() {
            let target = match fact.disposition {
                Disposition::Sellable => true,
                Disposition::Recalled => false,
                _ => continue,
            };
            let fc = match granularity {
                Granularity::Sku => None,
                Granularity::SkuFc => Some(fact.fc.clone()),
            };
            let acc = ledger.entry((fact.sku.clone(), fc)).or_default();
            if target {
                acc.sellable += fact.quantity;
            } else {
                acc.recalled += fact.quantity;
            }
        }

        // 3. SKU 维度附加库存
        let mut secondary_by_sku: HashMap<&str, i64> = HashMap::new();
        if let Some(lots) = secondary {
            for lot in lots.rows() {
                *secondary_by_sku.entry(lot.sku.as_str()).or_insert(0) +=
                    policy.effective_quantity(lot);
            }
        }
        let mut buffer_by_sku: HashMap<&str, i64> = HashMap::new();
        if let Some(eb) = buffer {
            for row in eb.rows() {
                *buffer_by_sku.entry(row.sku.as_str()).or_insert(0) += row.quantity;
            }
        }

        if granularity == Granularity::Sku {
            for sku in secondary_by_sku.keys().chain(buffer_by_sku.keys()) {
                ledger.entry((sku.to_string(), None)).or_default();
            }
        }

        let records: Vec<NetInventoryRecord> = ledger
            .into_iter()
            .map(|((sku, fc), acc)| {
                let secondary_effective = secondary_by_sku.get(sku.as_str()).copied().unwrap_or(0);
                let buffer_stock = buffer_by_sku.get(sku.as_str()).copied().unwrap_or(0);
                // 4. 下限 0
                let net_available =
                    (acc.sellable + buffer_stock + secondary_effective - acc.recalled).max(0);
                NetInventoryRecord {
                    sku,
                    fc,
                    sellable: acc.sellable,
                    buffer_stock,
                    secondary_effective,
                    recalled: acc.recalled,
                    net_available,
                }
            })
            .collect();

        debug!(keys = records.len(), "net inventory aggregated");
        Ok(records)
    }

    /// FC 可售库存 (不含召回/次级/缓冲),FC 计划使用
    pub fn sellable_by_fc(&self, inventory: &Frame<InventoryFact>) -> PipelineResult<BTreeMap<(String, String), i64>> {
        ensure_columns(inventory, &["sku", "fc", "disposition", "quantity"], "fc_plan.ledger")?;
        let mut out = BTreeMap::new();
        for fact in inventory.rows().iter().filter(|f| f.disposition == Disposition::Sellable) {
            *out.entry((fact.sku.clone(), fact.fc.clone())).or_insert(0) += fact.quantity;
        }
        Ok(out)
    }
}

impl Default for NetInventoryAggregator {
    fn default() -> Self {
        Self::new()
    }
}
