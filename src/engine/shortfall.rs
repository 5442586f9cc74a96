// ==========================================
// 库存补货调拨系统 - 补货缺口引擎
// ==========================================
// 红线: 需求行左连接库存,无库存的行补 0,不丢行
// ==========================================
// 职责: max(0, 需求 - 净库存) → 安全上限 → 箱规取整
// 输出: 非负整数补货量
// ==========================================

use crate::domain::facts::LotSize;
use crate::domain::frame::Frame;
use crate::domain::records::{NetInventoryRecord, RequirementRecord, ShortfallRecord, SkuKey};
use crate::engine::arith::{floor_units, round_up_to_lot};
use crate::engine::error::{ensure_columns, PipelineError, PipelineResult};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// 缺口计算参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortfallPolicy {
    /// 安全上限倍数 (上限 = 周期销量 × 倍数)
    pub safety_multiplier: f64,
    /// 是否按箱规向上取整
    pub round_to_lot: bool,
}

impl Default for ShortfallPolicy {
    fn default() -> Self {
        Self {
            safety_multiplier: 2.5,
            round_to_lot: true,
        }
    }
}

// ==========================================
// ShortfallCalculator - 补货缺口引擎
// ==========================================
pub struct ShortfallCalculator {}

impl ShortfallCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算补货缺口
    ///
    /// # 参数
    /// - requirements: 需求行 (左表,行数守恒)
    /// - net_inventory: 净库存 (右表,缺失补 0)
    /// - lot_sizes: 箱规表 (仅 round_to_lot 时需要 sku/lot_size 列)
    /// - policy: 安全倍数 / 箱规开关
    #[instrument(skip(self, requirements, net_inventory, lot_sizes), fields(rows = requirements.len()))]
    pub fn calculate(
        &self,
        requirements: &[RequirementRecord],
        net_inventory: &[NetInventoryRecord],
        lot_sizes: &Frame<LotSize>,
        policy: &ShortfallPolicy,
    ) -> PipelineResult<Vec<ShortfallRecord>> {
        if !(policy.safety_multiplier > 0.0 && policy.safety_multiplier.is_finite()) {
            return Err(PipelineError::InvalidParameter {
                name: "safety_multiplier".to_string(),
                message: format!("必须为正数, 实际={}", policy.safety_multiplier),
            });
        }
        if policy.round_to_lot {
            ensure_columns(lot_sizes, &["sku", "lot_size"], "shortfall.lot_sizes")?;
        }

        let net: BTreeMap<SkuKey, i64> = net_inventory
            .iter()
            .map(|n| (n.key(), n.net_available))
            .collect();
        let mut lots: HashMap<&str, i64> = HashMap::new();
        for l in lot_sizes.rows().iter().filter(|l| l.lot_size > 0) {
            lots.entry(l.sku.as_str()).or_insert(l.lot_size);
        }

        let mut unmatched = 0usize;
        let records: Vec<ShortfallRecord> = requirements
            .iter()
            .map(|req| {
                let net_available = match net.get(&req.key()) {
                    Some(v) => *v,
                    None => {
                        unmatched += 1;
                        0
                    }
                };
                let raw_shortfall = (req.requirement - net_available).max(0);
                // 向下取整,保证 capped ≤ rate × multiplier
                let safety_cap = floor_units(req.avg_rate_per_period * policy.safety_multiplier);
                let capped_shortfall = raw_shortfall.min(safety_cap);
                let lot_size = lots.get(req.sku.as_str()).copied();
                let shortfall = match (policy.round_to_lot, lot_size) {
                    (true, Some(lot)) => round_up_to_lot(capped_shortfall, lot),
                    _ => capped_shortfall.max(0),
                };

                ShortfallRecord {
                    sku: req.sku.clone(),
                    fc: req.fc.clone(),
                    avg_rate_per_period: req.avg_rate_per_period,
                    requirement: req.requirement,
                    net_available,
                    raw_shortfall,
                    safety_cap,
                    capped_shortfall,
                    lot_size,
                    shortfall,
                }
            })
            .collect();

        debug!(rows = records.len(), unmatched, "shortfall calculated");
        Ok(records)
    }
}

impl Default for ShortfallCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(sku: &str, rate: f64, requirement: i64) -> RequirementRecord {
        RequirementRecord {
            sku: sku.to_string(),
            fc: None,
            avg_rate_per_period: rate,
            requirement,
        }
    }

    fn net(sku: &str, available: i64) -> NetInventoryRecord {
        NetInventoryRecord {
            sku: sku.to_string(),
            fc: None,
            sellable: available,
            buffer_stock: 0,
            secondary_effective: 0,
            recalled: 0,
            net_available: available,
        }
    }

    fn lots(entries: &[(&str, i64)]) -> Frame<LotSize> {
        Frame::from_rows(
            entries
                .iter()
                .map(|(sku, lot)| LotSize {
                    sku: sku.to_string(),
                    lot_size: *lot,
                })
                .collect(),
        )
    }

    #[test]
    fn test_shortfall_properties_hold() {
        let calc = ShortfallCalculator::new();
        let requirements = vec![req("A", 10.0, 20), req("B", 10.0, 20), req("C", 4.0, 100)];
        let inventory = vec![net("A", 5), net("B", 50), net("C", 0)];
        let policy = ShortfallPolicy {
            safety_multiplier: 2.5,
            round_to_lot: false,
        };

        let out = calc
            .calculate(&requirements, &inventory, &Frame::empty(), &policy)
            .unwrap();
        for r in &out {
            assert_eq!(r.raw_shortfall, (r.requirement - r.net_available).max(0));
            assert!(r.capped_shortfall as f64 <= r.avg_rate_per_period * policy.safety_multiplier);
            assert!(r.shortfall >= 0);
        }
        assert_eq!(out[0].shortfall, 15);
        assert_eq!(out[1].shortfall, 0);
        // C: raw 100, 上限 10
        assert_eq!(out[2].shortfall, 10);
    }

    #[test]
    fn test_left_join_conserves_rows_and_zero_fills() {
        let calc = ShortfallCalculator::new();
        let requirements = vec![req("A", 10.0, 20), req("Z", 10.0, 20)];
        let out = calc
            .calculate(&requirements, &[net("A", 5)], &Frame::empty(), &ShortfallPolicy::default())
            .unwrap();
        assert_eq!(out.len(), requirements.len());
        assert_eq!(out[1].net_available, 0);
        assert_eq!(out[1].raw_shortfall, 20);
    }

    #[test]
    fn test_lot_rounding() {
        let calc = ShortfallCalculator::new();
        let requirements = vec![req("A", 10.0, 20), req("B", 10.0, 20), req("C", 10.0, 20)];
        let inventory = vec![net("A", 3), net("B", 3), net("C", 30)];
        let out = calc
            .calculate(
                &requirements,
                &inventory,
                &lots(&[("A", 12), ("B", 0), ("C", 12)]),
                &ShortfallPolicy::default(),
            )
            .unwrap();
        assert_eq!(out[0].shortfall, 24);
        assert_eq!(out[0].lot_size, Some(12));
        // 箱规 ≤ 0 不取整
        assert_eq!(out[1].shortfall, 17);
        assert_eq!(out[1].lot_size, None);
        // 0 不会被取整为一箱
        assert_eq!(out[2].shortfall, 0);
    }

    #[test]
    fn test_invalid_multiplier() {
        let calc = ShortfallCalculator::new();
        let policy = ShortfallPolicy {
            safety_multiplier: 0.0,
            round_to_lot: false,
        };
        let err = calc.calculate(&[], &[], &Frame::empty(), &policy).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }
}
