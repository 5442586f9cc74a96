// ==========================================
// 库存补货调拨系统 - 计划参数
// ==========================================
// 职责: 一次计划调用的全部标量参数 + 边界校验 + 单次覆写
// 红线: 参数越界在计算开始前拒绝,不做截断
// ==========================================

use crate::domain::types::ChannelFilter;
use crate::engine::allocation::RatioGovernance;
use crate::engine::error::{PipelineError, PipelineResult};
use crate::engine::net_inventory::SecondaryStockPolicy;
use crate::engine::shortfall::ShortfallPolicy;
use crate::engine::warehouse_replenishment::WarehousePolicy;
use serde::{Deserialize, Serialize};

/// 覆盖周期上限 (周)
pub const MAX_HORIZON_WEEKS: i64 = 12;
/// 回看窗口上限 (周)
pub const MAX_LOOKBACK_WEEKS: i64 = 12;

/// 默认 FC 主数据
pub const DEFAULT_FC_MASTER: &[&str] = &[
    "DEL4", "HYD8", "BLR7", "DEL5", "AMD2", "BLR8", "BOM5", "CCX1", "CJB1", "DED4", "HYD3",
    "MAA4", "PNQ3", "BOM7", "ISK3", "LKO1", "CCX4",
];

// ==========================================
// PlanningParams - 计划参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningParams {
    /// 账号/品牌
    pub account: String,
    pub channel: ChannelFilter,
    /// SKU 维度补货覆盖周数
    pub target_weeks: i64,
    /// FC 维度补货覆盖周数
    pub replenish_weeks: i64,
    pub sales_lookback_weeks: i64,
    pub shipment_window_days: i64,
    pub weeks_per_window: f64,
    pub secondary_max_age_days: i64,
    pub secondary_trust_weight: f64,
    pub safety_multiplier: f64,
    pub round_to_lot: bool,
    pub governance_ratio: f64,
    pub fill_ratio_threshold: f64,
    pub supplier_lookback_weeks: i64,
    pub supplier_months_of_cover: i64,
    pub overstock_weeks: i64,
    /// FC 主数据 (为空时跳过 FC 编码检查)
    pub fc_master: Vec<String>,
}

impl Default for PlanningParams {
    fn default() -> Self {
        Self {
            account: String::new(),
            channel: ChannelFilter::All,
            target_weeks: 2,
            replenish_weeks: 8,
            sales_lookback_weeks: 8,
            shipment_window_days: 30,
            weeks_per_window: 4.285,
            secondary_max_age_days: 90,
            secondary_trust_weight: 0.6,
            safety_multiplier: 2.5,
            round_to_lot: true,
            governance_ratio: 0.35,
            fill_ratio_threshold: 0.70,
            supplier_lookback_weeks: 12,
            supplier_months_of_cover: 3,
            overstock_weeks: 8,
            fc_master: DEFAULT_FC_MASTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn check_horizon(name: &str, value: i64, max: i64) -> PipelineResult<()> {
    if value < 1 || value > max {
        return Err(PipelineError::InvalidHorizon {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_ratio(name: &str, value: f64) -> PipelineResult<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: name.to_string(),
            message: format!("必须位于 (0, 1], 实际={}", value),
        });
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> PipelineResult<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(PipelineError::InvalidParameter {
            name: name.to_string(),
            message: format!("必须为正数, 实际={}", value),
        });
    }
    Ok(())
}

impl PlanningParams {
    /// 以默认值创建指定账号的参数
    pub fn for_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Self::default()
        }
    }

    /// 边界校验
    pub fn validate(&self) -> PipelineResult<()> {
        if self.account.trim().is_empty() {
            return Err(PipelineError::InvalidParameter {
                name: "account".to_string(),
                message: "账号不能为空".to_string(),
            });
        }
        check_horizon("target_weeks", self.target_weeks, MAX_HORIZON_WEEKS)?;
        check_horizon("replenish_weeks", self.replenish_weeks, MAX_HORIZON_WEEKS)?;
        check_horizon("sales_lookback_weeks", self.sales_lookback_weeks, MAX_LOOKBACK_WEEKS)?;
        check_horizon("supplier_lookback_weeks", self.supplier_lookback_weeks, MAX_LOOKBACK_WEEKS)?;
        check_horizon("supplier_months_of_cover", self.supplier_months_of_cover, MAX_HORIZON_WEEKS)?;
        check_horizon("overstock_weeks", self.overstock_weeks, i64::MAX)?;
        check_horizon("shipment_window_days", self.shipment_window_days, i64::MAX)?;
        check_positive("weeks_per_window", self.weeks_per_window)?;
        check_positive("safety_multiplier", self.safety_multiplier)?;
        check_ratio("secondary_trust_weight", self.secondary_trust_weight)?;
        check_ratio("governance_ratio", self.governance_ratio)?;
        check_ratio("fill_ratio_threshold", self.fill_ratio_threshold)?;
        if self.secondary_max_age_days < 0 {
            return Err(PipelineError::InvalidParameter {
                name: "secondary_max_age_days".to_string(),
                message: format!("不能为负数, 实际={}", self.secondary_max_age_days),
            });
        }
        Ok(())
    }

    /// 应用单次调用覆写
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Self {
        if let Some(v) = &overrides.channel {
            self.channel = ChannelFilter::parse(v);
        }
        if let Some(v) = overrides.target_weeks {
            self.target_weeks = v;
        }
        if let Some(v) = overrides.replenish_weeks {
            self.replenish_weeks = v;
        }
        if let Some(v) = overrides.sales_lookback_weeks {
            self.sales_lookback_weeks = v;
        }
        if let Some(v) = overrides.safety_multiplier {
            self.safety_multiplier = v;
        }
        if let Some(v) = overrides.governance_ratio {
            self.governance_ratio = v;
        }
        if let Some(v) = overrides.fill_ratio_threshold {
            self.fill_ratio_threshold = v;
        }
        if let Some(v) = overrides.round_to_lot {
            self.round_to_lot = v;
        }
        self
    }

    // ===== 引擎参数视图 =====

    pub fn secondary_policy(&self) -> SecondaryStockPolicy {
        SecondaryStockPolicy {
            max_age_days: self.secondary_max_age_days,
            trust_weight: self.secondary_trust_weight,
        }
    }

    pub fn shortfall_policy(&self) -> ShortfallPolicy {
        ShortfallPolicy {
            safety_multiplier: self.safety_multiplier,
            round_to_lot: self.round_to_lot,
        }
    }

    pub fn governance(&self) -> PipelineResult<RatioGovernance> {
        RatioGovernance::new(self.governance_ratio)
    }

    pub fn warehouse_policy(&self) -> WarehousePolicy {
        WarehousePolicy {
            lookback_weeks: self.sales_lookback_weeks,
            replenish_weeks: self.replenish_weeks,
            overstock_weeks: self.overstock_weeks,
        }
    }
}

/// 单次调用参数覆写 (None 表示沿用配置值)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    pub channel: Option<String>,
    pub target_weeks: Option<i64>,
    pub replenish_weeks: Option<i64>,
    pub sales_lookback_weeks: Option<i64>,
    pub safety_multiplier: Option<f64>,
    pub governance_ratio: Option<f64>,
    pub fill_ratio_threshold: Option<f64>,
    pub round_to_lot: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = PlanningParams::for_account("ACME");
        assert!(params.validate().is_ok());
        assert_eq!(params.target_weeks, 2);
        assert_eq!(params.fc_master.len(), 17);
    }

    #[test]
    fn test_horizon_bounds() {
        for bad in [0, -2, 13] {
            let params = PlanningParams {
                target_weeks: bad,
                ..PlanningParams::for_account("ACME")
            };
            assert!(matches!(
                params.validate(),
                Err(PipelineError::InvalidHorizon { .. })
            ));
        }
    }

    #[test]
    fn test_ratio_and_multiplier_bounds() {
        let params = PlanningParams {
            governance_ratio: 1.5,
            ..PlanningParams::for_account("ACME")
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidParameter { ref name, .. }) if name == "governance_ratio"
        ));

        let params = PlanningParams {
            safety_multiplier: 0.0,
            ..PlanningParams::for_account("ACME")
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_empty_account_rejected() {
        assert!(PlanningParams::default().validate().is_err());
    }

    #[test]
    fn test_overrides_apply_on_top() {
        let overrides = ParamOverrides {
            channel: Some("Amazon".to_string()),
            target_weeks: Some(4),
            ..ParamOverrides::default()
        };
        let params = PlanningParams::for_account("ACME").with_overrides(&overrides);
        assert_eq!(params.target_weeks, 4);
        assert_eq!(params.channel, ChannelFilter::Named("amazon".to_string()));
        assert_eq!(params.replenish_weeks, 8);
    }
}
