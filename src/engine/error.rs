// ==========================================
// 库存补货调拨系统 - 计算核心错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================
// 说明:
// - 结构/参数错误在阶段入口快速失败,不产生部分输出
// - 对账错误在全部计算完成后、落库之前抛出,携带明细行
// - 校验报告 (ValidationReport) 是数据,不是错误
// ==========================================

use crate::domain::frame::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 对账不一致明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMismatch {
    pub sku: String,
    pub fc: Option<String>,
    /// 期望值 (对库存平衡为 opening + inbound - outbound; 对补货行为 0)
    pub expected: i64,
    /// 实际值 (期末库存或补货量)
    pub actual: i64,
    /// actual - expected
    pub delta: i64,
}

impl fmt::Display for ReconciliationMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}: expected={} actual={} delta={}",
            self.sku,
            self.fc.as_deref().unwrap_or("-"),
            self.expected,
            self.actual,
            self.delta
        )
    }
}

/// 计算核心错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    // ===== 结构错误 =====
    #[error("缺少必需列 ({context}): {}", columns.join(", "))]
    MissingColumns {
        context: String,
        columns: Vec<String>,
    },

    // ===== 参数错误 =====
    #[error("无效的覆盖周期: {name}={value}")]
    InvalidHorizon { name: String, value: i64 },

    #[error("无效的参数 (name={name}): {message}")]
    InvalidParameter { name: String, message: String },

    // ===== 对账错误 =====
    #[error("对账失败: {message} (不一致行数={})", mismatches.len())]
    Reconciliation {
        message: String,
        mismatches: Vec<ReconciliationMismatch>,
    },

    // ===== 入库前检查错误 =====
    #[error("库存台账检查失败: {0}")]
    StockValidation(String),

    #[error("出库发票检查失败: {0}")]
    InvoiceValidation(String),
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;

/// 校验输入表包含所需列
///
/// # 参数
/// - frame: 输入表
/// - required: 必需列
/// - context: 错误上下文 (阶段名/表名)
pub fn ensure_columns<R>(frame: &Frame<R>, required: &[&str], context: &str) -> PipelineResult<()> {
    let missing = frame.missing_columns(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns {
            context: context.to_string(),
            columns: missing,
        })
    }
}
