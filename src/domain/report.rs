// ==========================================
// 库存补货调拨系统 - 校验报告
// ==========================================
// 说明: 校验失败是数据而不是异常,由调用方决定是否继续
// ==========================================

use crate::domain::types::CheckStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单项检查结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub issues: Vec<String>,
}

impl CheckResult {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }
}

/// 单个数据集的校验报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub row_count: usize,
    /// 关键数值列合计 (列名 -> 合计)
    pub aggregate_sums: BTreeMap<String, f64>,
    /// 去重 SKU 数 (仅输入数据集)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_skus: Option<usize>,
    /// 日期范围 (仅带日期的输入数据集)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub issues: Vec<String>,
    pub status: CheckStatus,
}

impl DatasetReport {
    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }
}

/// 整体校验报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub overall_status: CheckStatus,
    pub datasets: Vec<DatasetReport>,
}

impl ValidationReport {
    /// 汇总多个数据集报告, overall = 全部 PASS
    pub fn from_datasets(datasets: Vec<DatasetReport>) -> Self {
        let overall_status = CheckStatus::from_passed(datasets.iter().all(|d| d.is_pass()));
        Self {
            overall_status,
            datasets,
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.dataset == name)
    }

    /// 所有失败数据集的问题列表 (带数据集前缀)
    pub fn all_issues(&self) -> Vec<String> {
        self.datasets
            .iter()
            .flat_map(|d| d.issues.iter().map(move |i| format!("[{}] {}", d.dataset, i)))
            .collect()
    }
}
