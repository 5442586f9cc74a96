// ==========================================
// 库存补货调拨系统 - FC 间调拨平衡引擎
// ==========================================
// 红线: SKU 之间互不借调; 调出 ≤ 富余, 调入 ≤ 缺口
// ==========================================
// 算法: 贪心匹配
// 1) 每个 SKU 拆分缺口集 (fc_shortfall > 0) 与富余集 (excess > 0)
// 2) 两集合各自按数量降序,同量按 FC 编码升序
// 3) 外层缺口、内层富余,逐对取 floor(min(剩余富余, 剩余缺口))
// 4) 仅整件 (≥1) 输出,同时扣减两侧工作池
// ==========================================

use crate::domain::records::{FcPlanRecord, TransferRecord};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 单个 SKU 的工作池 (FC → 剩余量)
///
/// 每个 SKU 独立构造,匹配结束即丢弃。
#[derive(Debug, Clone)]
struct TransferPool {
    entries: Vec<(String, f64)>,
}

impl TransferPool {
    /// 取正值并排序: 数量降序, FC 升序
    fn build<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut entries: Vec<(String, f64)> = items
            .into_iter()
            .filter(|(_, qty)| *qty > 0.0)
            .map(|(fc, qty)| (fc.to_string(), qty))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }
}

// ==========================================
// FcTransferBalancer - FC 间调拨平衡引擎
// ==========================================
pub struct FcTransferBalancer {}

impl FcTransferBalancer {
    pub fn new() -> Self {
        Self {}
    }

    /// 生成调拨建议
    ///
    /// 输出按 (sku, from_fc, to_fc) 汇总并排序,同一输入多次调用结果一致。
    #[instrument(skip(self, plan), fields(rows = plan.len()))]
    pub fn balance(&self, plan: &[FcPlanRecord]) -> Vec<TransferRecord> {
        let mut by_sku: BTreeMap<&str, Vec<&FcPlanRecord>> = BTreeMap::new();
        for row in plan {
            by_sku.entry(row.sku.as_str()).or_default().push(row);
        }

        let mut totals: BTreeMap<(String, String, String), i64> = BTreeMap::new();
        for (sku, rows) in by_sku {
            for (from_fc, to_fc, qty) in Self::balance_sku(&rows) {
                *totals.entry((sku.to_string(), from_fc, to_fc)).or_insert(0) += qty;
            }
        }

        let transfers: Vec<TransferRecord> = totals
            .into_iter()
            .map(|((sku, from_fc, to_fc), transfer_qty)| TransferRecord {
                sku,
                from_fc,
                to_fc,
                transfer_qty,
            })
            .collect();

        debug!(lines = transfers.len(), "transfers balanced");
        transfers
    }

    /// 单个 SKU 贪心匹配
    ///
    /// 返回: (from_fc, to_fc, qty) 列表 (未汇总)
    fn balance_sku(rows: &[&FcPlanRecord]) -> Vec<(String, String, i64)> {
        let mut shortfalls =
            TransferPool::build(rows.iter().map(|r| (r.fc.as_str(), r.fc_shortfall)));
        let mut excesses = TransferPool::build(rows.iter().map(|r| (r.fc.as_str(), r.excess)));

        let mut moves = Vec::new();
        if shortfalls.entries.is_empty() || excesses.entries.is_empty() {
            return moves;
        }

        for (to_fc, need) in shortfalls.entries.iter_mut() {
            for (from_fc, available) in excesses.entries.iter_mut() {
                if *need < 1.0 {
                    break;
                }
                if *available < 1.0 || from_fc == to_fc {
                    continue;
                }
                let qty = available.min(*need).floor();
                *available -= qty;
                *need -= qty;
                moves.push((from_fc.clone(), to_fc.clone(), qty as i64));
            }
        }
        moves
    }

    /// 按 (sku, to_fc) 汇总调入量
    pub fn transfer_in(transfers: &[TransferRecord]) -> BTreeMap<(String, String), i64> {
        let mut out = BTreeMap::new();
        for t in transfers {
            *out.entry((t.sku.clone(), t.to_fc.clone())).or_insert(0) += t.transfer_qty;
        }
        out
    }
}

impl Default for FcTransferBalancer {
    fn default() -> Self {
        Self::new()
    }
}
