// ==========================================
// 库存补货调拨系统 - 结果校验引擎
// ==========================================
// 红线: 永不报错,失败以报告形式返回,由调用方决定是否继续
// ==========================================
// 检查项:
// - 空值检查: 数值列出现 NaN / inf
// - 负值检查: 数量列出现负数
// - 逻辑检查: 各数据集专属规则
// 输入数据集 (发货明细 / 库存台账) 另附 SKU 数与日期范围
// ==========================================

use crate::domain::facts::{InventoryFact, ShipmentFact};
use crate::domain::records::{AllocationRecord, FcPlanRecord, ShortfallRecord, TransferRecord};
use crate::domain::frame::Frame;
use crate::domain::report::{CheckResult, DatasetReport, ValidationReport};
use crate::domain::types::CheckStatus;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

/// 浮点比较容差
const EPSILON: f64 = 1e-9;

/// 一列数值 (列名 + 每行取值)
struct NumericColumn {
    name: &'static str,
    values: Vec<f64>,
}

impl NumericColumn {
    fn new<R, F>(name: &'static str, rows: &[R], f: F) -> Self
    where
        F: Fn(&R) -> f64,
    {
        Self {
            name,
            values: rows.iter().map(f).collect(),
        }
    }
}

// ==========================================
// ValidationEngine - 结果校验引擎
// ==========================================
pub struct ValidationEngine {}

impl ValidationEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 通用检查
    // ==========================================

    /// 空值检查 (NaN / ±inf 视为空值)
    fn null_check(columns: &[NumericColumn]) -> CheckResult {
        let issues = columns
            .iter()
            .filter_map(|c| {
                let n = c.values.iter().filter(|v| !v.is_finite()).count();
                (n > 0).then(|| format!("列 {} 存在 {} 个空值", c.name, n))
            })
            .collect();
        CheckResult::from_issues(issues)
    }

    /// 负值检查
    fn negative_check(columns: &[NumericColumn]) -> CheckResult {
        let issues = columns
            .iter()
            .filter_map(|c| {
                let n = c.values.iter().filter(|v| **v < 0.0).count();
                (n > 0).then(|| format!("列 {} 存在 {} 个负值", c.name, n))
            })
            .collect();
        CheckResult::from_issues(issues)
    }

    /// 组装数据集报告
    fn build_report(
        dataset: &str,
        row_count: usize,
        columns: &[NumericColumn],
        logical: Vec<String>,
    ) -> DatasetReport {
        let aggregate_sums: BTreeMap<String, f64> = columns
            .iter()
            .map(|c| {
                let sum: f64 = c.values.iter().filter(|v| v.is_finite()).sum();
                (c.name.to_string(), sum)
            })
            .collect();

        let mut issues = Vec::new();
        issues.extend(Self::null_check(columns).issues);
        issues.extend(Self::negative_check(columns).issues);
        issues.extend(logical);

        let status = CheckStatus::from_passed(issues.is_empty());
        if !status.is_pass() {
            warn!(dataset, issue_count = issues.len(), "validation failed");
        }

        DatasetReport {
            dataset: dataset.to_string(),
            row_count,
            aggregate_sums,
            unique_skus: None,
            date_range: None,
            issues,
            status,
        }
    }

    /// 统计违反规则的行数,非零时生成一条问题描述
    fn count_violations<R, F>(rows: &[R], rule: &str, violated: F) -> Option<String>
    where
        F: Fn(&R) -> bool,
    {
        let n = rows.iter().filter(|r| violated(r)).count();
        (n > 0).then(|| format!("{} 行违反规则: {}", n, rule))
    }

    fn unique_skus<'a, I>(skus: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        skus.into_iter().collect::<BTreeSet<_>>().len()
    }

    // ==========================================
    // 数据集检查
    // ==========================================

    /// 发货明细: quantity 不得为负; 报告合计件数、SKU 数、日期范围
    pub fn validate_shipments(&self, shipments: &Frame<ShipmentFact>) -> DatasetReport {
        let rows = shipments.rows();
        let columns = vec![NumericColumn::new("quantity", rows, |r| r.quantity as f64)];
        let mut report = Self::build_report("shipments", rows.len(), &columns, Vec::new());
        report.unique_skus = Some(Self::unique_skus(rows.iter().map(|r| r.sku.as_str())));
        report.date_range = rows
            .iter()
            .map(|r| r.shipment_date)
            .min()
            .zip(rows.iter().map(|r| r.shipment_date).max());
        report
    }

    /// 库存台账: quantity 不得为负; 报告合计与 SKU 数
    pub fn validate_ledger(&self, ledger: &Frame<InventoryFact>) -> DatasetReport {
        let rows = ledger.rows();
        let columns = vec![NumericColumn::new("quantity", rows, |r| r.quantity as f64)];
        let mut report = Self::build_report("ledger", rows.len(), &columns, Vec::new());
        report.unique_skus = Some(Self::unique_skus(rows.iter().map(|r| r.sku.as_str())));
        report
    }

    /// 补货缺口: shortfall ≤ requirement (未取整前), 不得为负
    pub fn validate_shortfalls(&self, rows: &[ShortfallRecord]) -> DatasetReport {
        let columns = vec![
            NumericColumn::new("requirement", rows, |r| r.requirement as f64),
            NumericColumn::new("net_available", rows, |r| r.net_available as f64),
            NumericColumn::new("avg_rate_per_period", rows, |r| r.avg_rate_per_period),
            NumericColumn::new("shortfall", rows, |r| r.shortfall as f64),
        ];
        let logical = [Self::count_violations(
            rows,
            "capped_shortfall <= requirement",
            |r| r.capped_shortfall > r.requirement,
        )]
        .into_iter()
        .flatten()
        .collect();
        Self::build_report("shortfall", rows.len(), &columns, logical)
    }

    /// FC 计划: fc_shortfall ≤ required_units, coverage_weeks ≥ 0
    pub fn validate_fc_plan(&self, rows: &[FcPlanRecord]) -> DatasetReport {
        let columns = vec![
            NumericColumn::new("weekly_velocity", rows, |r| r.weekly_velocity),
            NumericColumn::new("fc_inventory", rows, |r| r.fc_inventory),
            NumericColumn::new("required_units", rows, |r| r.required_units),
            NumericColumn::new("fc_shortfall", rows, |r| r.fc_shortfall),
            NumericColumn::new("excess", rows, |r| r.excess),
        ];
        let logical = [
            Self::count_violations(rows, "fc_shortfall <= required_units", |r| {
                r.fc_shortfall > r.required_units + EPSILON
            }),
            Self::count_violations(rows, "coverage_weeks >= 0", |r| {
                !(r.coverage_weeks >= 0.0)
            }),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self::build_report("fc_plan", rows.len(), &columns, logical)
    }

    /// 调拨: transfer_qty > 0, from_fc ≠ to_fc
    pub fn validate_transfers(&self, rows: &[TransferRecord]) -> DatasetReport {
        let columns = vec![NumericColumn::new("transfer_qty", rows, |r| {
            r.transfer_qty as f64
        })];
        let logical = [
            Self::count_violations(rows, "transfer_qty > 0", |r| r.transfer_qty <= 0),
            Self::count_violations(rows, "from_fc != to_fc", |r| r.from_fc == r.to_fc),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self::build_report("transfers", rows.len(), &columns, logical)
    }

    /// 分配: send_qty ≤ original_required_units, fill_ratio 有限且 ≥ 0
    pub fn validate_allocations(&self, rows: &[AllocationRecord]) -> DatasetReport {
        let columns = vec![
            NumericColumn::new("target_cover_units", rows, |r| r.target_cover_units),
            NumericColumn::new("post_transfer_stock", rows, |r| r.post_transfer_stock),
            NumericColumn::new("original_required_units", rows, |r| r.original_required_units),
            NumericColumn::new("send_qty", rows, |r| r.send_qty),
            NumericColumn::new("fill_ratio", rows, |r| r.fill_ratio),
        ];
        let logical = [Self::count_violations(
            rows,
            "send_qty <= original_required_units",
            |r| r.send_qty > r.original_required_units + EPSILON,
        )]
        .into_iter()
        .flatten()
        .collect();
        Self::build_report("allocation", rows.len(), &columns, logical)
    }

    /// 汇总整体报告
    #[instrument(skip(self, datasets), fields(datasets = datasets.len()))]
    pub fn summarize(&self, datasets: Vec<DatasetReport>) -> ValidationReport {
        let report = ValidationReport::from_datasets(datasets);
        info!(overall = %report.overall_status, "validation summarized");
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}
