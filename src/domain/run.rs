// ==========================================
// 库存补货调拨系统 - 补货运行
// ==========================================
// 说明: 运行身份与状态归持久化协作方所有,计算核心不感知
// ==========================================

use crate::domain::types::RunStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 一次补货运行 (品牌 + 周)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentRun {
    pub run_id: String,
    pub brand: String,
    /// 计划周 (YYYY-WW)
    pub week: String,
    pub status: RunStatus,
    pub blocked_reason: Option<String>,
    /// 本次运行参数快照 (JSON)
    pub params_json: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 人工改量审计记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideLog {
    pub run_id: String,
    pub sku: String,
    pub fc: String,
    pub field_changed: String,
    pub old_value: i64,
    pub new_value: i64,
    pub reason: String,
    pub user_name: String,
    pub created_at: NaiveDateTime,
}
