// ==========================================
// 库存补货调拨系统 - 入库前检查
// ==========================================
// 职责: 计算开始前对库存台账与出库发票做致命检查
// 红线: 任一检查失败直接中止本次运行 (与 ValidationEngine 的非致命报告相对)
// ==========================================

use crate::domain::facts::{InventoryFact, OutwardShipment};
use crate::domain::frame::Frame;
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, instrument};

/// 错误信息中最多列出的样例数
const SAMPLE_LIMIT: usize = 10;

fn sample<T: std::fmt::Display>(items: &BTreeSet<T>) -> String {
    let shown: Vec<String> = items.iter().take(SAMPLE_LIMIT).map(|i| i.to_string()).collect();
    if items.len() > SAMPLE_LIMIT {
        format!("{} ... (共 {} 项)", shown.join(", "), items.len())
    } else {
        shown.join(", ")
    }
}

// ==========================================
// IngestionGuard - 入库前检查
// ==========================================
pub struct IngestionGuard {
    /// FC 主数据 (为空时跳过 FC 编码检查)
    fc_master: BTreeSet<String>,
}

impl IngestionGuard {
    pub fn new<I, S>(fc_master: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fc_master: fc_master
                .into_iter()
                .map(|fc| fc.as_ref().trim().to_uppercase())
                .filter(|fc| !fc.is_empty())
                .collect(),
        }
    }

    /// 库存台账检查
    ///
    /// 1) FC 编码必须在主数据中
    /// 2) 数量不得为负
    /// 3) (sku, fc, disposition) 唯一
    #[instrument(skip_all, fields(rows = ledger.len()))]
    pub fn check_stock(&self, ledger: &Frame<InventoryFact>) -> PipelineResult<()> {
        ensure_columns(ledger, &["sku", "fc", "disposition", "quantity"], "ingestion.ledger")?;

        if !self.fc_master.is_empty() {
            let unknown: BTreeSet<String> = ledger
                .rows()
                .iter()
                .map(|r| r.fc.trim().to_uppercase())
                .filter(|fc| !self.fc_master.contains(fc))
                .collect();
            if !unknown.is_empty() {
                return Err(PipelineError::StockValidation(format!(
                    "未知 FC 编码: {}",
                    sample(&unknown)
                )));
            }
        }

        let negative: BTreeSet<String> = ledger
            .rows()
            .iter()
            .filter(|r| r.quantity < 0)
            .map(|r| format!("{}@{}", r.sku, r.fc))
            .collect();
        if !negative.is_empty() {
            return Err(PipelineError::StockValidation(format!(
                "存在负库存: {}",
                sample(&negative)
            )));
        }

        let mut seen = HashSet::new();
        let duplicates: BTreeSet<String> = ledger
            .rows()
            .iter()
            .filter(|r| !seen.insert((r.sku.as_str(), r.fc.as_str(), r.disposition)))
            .map(|r| format!("{}@{}/{}", r.sku, r.fc, r.disposition))
            .collect();
        if !duplicates.is_empty() {
            return Err(PipelineError::StockValidation(format!(
                "(sku, fc, disposition) 重复: {}",
                sample(&duplicates)
            )));
        }

        info!(rows = ledger.len(), "stock ledger accepted");
        Ok(())
    }

    /// 出库发票检查
    ///
    /// 1) (invoice_no, sku) 唯一
    /// 2) qty_sent > 0
    #[instrument(skip_all, fields(rows = shipments.len()))]
    pub fn check_invoices(&self, shipments: &Frame<OutwardShipment>) -> PipelineResult<()> {
        ensure_columns(shipments, &["invoice_no", "sku", "qty_sent"], "ingestion.invoices")?;

        let mut seen = HashSet::new();
        let duplicates: BTreeSet<String> = shipments
            .rows()
            .iter()
            .filter(|r| !seen.insert((r.invoice_no.as_str(), r.sku.as_str())))
            .map(|r| format!("{}/{}", r.invoice_no, r.sku))
            .collect();
        if !duplicates.is_empty() {
            return Err(PipelineError::InvoiceValidation(format!(
                "(invoice_no, sku) 重复: {}",
                sample(&duplicates)
            )));
        }

        let non_positive: BTreeSet<String> = shipments
            .rows()
            .iter()
            .filter(|r| r.qty_sent <= 0)
            .map(|r| format!("{}/{}", r.invoice_no, r.sku))
            .collect();
        if !non_positive.is_empty() {
            return Err(PipelineError::InvoiceValidation(format!(
                "qty_sent 必须大于 0: {}",
                sample(&non_positive)
            )));
        }

        Ok(())
    }

    /// 剔除已发货的发票行
    ///
    /// 以 (invoice_no, sku) 判定是否已在历史出库中出现。
    pub fn block_previously_shipped(
        &self,
        candidates: &Frame<OutwardShipment>,
        history: &[OutwardShipment],
    ) -> Frame<OutwardShipment> {
        let shipped: HashSet<(&str, &str)> = history
            .iter()
            .map(|h| (h.invoice_no.as_str(), h.sku.as_str()))
            .collect();
        candidates.map_rows(|rows| {
            rows.iter()
                .filter(|r| !shipped.contains(&(r.invoice_no.as_str(), r.sku.as_str())))
                .cloned()
                .collect()
        })
    }
}
