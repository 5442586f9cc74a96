// ==========================================
// 库存补货调拨系统 - 计划配置读取 Trait
// ==========================================
// 职责: 定义计划调用所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::planning_params::PlanningParams;
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PlanningConfigReader: Send + Sync {
    // ===== 覆盖周期 =====

    /// SKU 维度补货覆盖周数 (默认 2)
    async fn get_target_weeks(&self) -> ConfigResult<i64>;

    /// FC 维度补货覆盖周数 (默认 8)
    async fn get_replenish_weeks(&self) -> ConfigResult<i64>;

    /// 销量回看周数 (默认 8)
    async fn get_sales_lookback_weeks(&self) -> ConfigResult<i64>;

    // ===== 次级库存 =====

    /// 次级库存库龄上限 (默认 90 天)
    async fn get_secondary_max_age_days(&self) -> ConfigResult<i64>;

    /// 次级库存信任权重 (默认 0.6)
    async fn get_secondary_trust_weight(&self) -> ConfigResult<f64>;

    // ===== 缺口与治理 =====

    /// 安全上限倍数 (默认 2.5)
    async fn get_safety_multiplier(&self) -> ConfigResult<f64>;

    /// 是否按箱规取整 (默认 true)
    async fn get_round_to_lot(&self) -> ConfigResult<bool>;

    /// 治理比例 (默认 0.35)
    async fn get_governance_ratio(&self) -> ConfigResult<f64>;

    /// 满足率阈值 (默认 0.70)
    async fn get_fill_ratio_threshold(&self) -> ConfigResult<f64>;

    // ===== 主数据 =====

    /// FC 主数据
    async fn get_fc_master(&self) -> ConfigResult<Vec<String>>;

    /// 组装完整参数
    ///
    /// 未单独提供读取接口的参数取默认值。
    async fn load_planning_params(&self, account: &str) -> ConfigResult<PlanningParams> {
        Ok(PlanningParams {
            target_weeks: self.get_target_weeks().await?,
            replenish_weeks: self.get_replenish_weeks().await?,
            sales_lookback_weeks: self.get_sales_lookback_weeks().await?,
            secondary_max_age_days: self.get_secondary_max_age_days().await?,
            secondary_trust_weight: self.get_secondary_trust_weight().await?,
            safety_multiplier: self.get_safety_multiplier().await?,
            round_to_lot: self.get_round_to_lot().await?,
            governance_ratio: self.get_governance_ratio().await?,
            fill_ratio_threshold: self.get_fill_ratio_threshold().await?,
            fc_master: self.get_fc_master().await?,
            ..PlanningParams::for_account(account)
        })
    }
}
