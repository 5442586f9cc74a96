// ==========================================
// 库存补货调拨系统 - 目标库存需求引擎
// ==========================================
// 红线: 覆盖周期必须 > 0,违反直接失败,不做截断
// ==========================================

use crate::domain::records::{RequirementRecord, VelocityRecord};
use crate::engine::arith::round_units;
use crate::engine::error::{PipelineError, PipelineResult};
use tracing::instrument;

// ==========================================
// RequirementCalculator - 目标库存需求引擎
// ==========================================
pub struct RequirementCalculator {}

impl RequirementCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// requirement = round(avg_rate_per_period × target_periods)
    #[instrument(skip(self, velocity), fields(rows = velocity.len()))]
    pub fn calculate(
        &self,
        velocity: &[VelocityRecord],
        target_periods: i64,
    ) -> PipelineResult<Vec<RequirementRecord>> {
        if target_periods <= 0 {
            return Err(PipelineError::InvalidHorizon {
                name: "target_weeks".to_string(),
                value: target_periods,
            });
        }

        Ok(velocity
            .iter()
            .map(|v| RequirementRecord {
                sku: v.sku.clone(),
                fc: v.fc.clone(),
                avg_rate_per_period: v.avg_rate_per_period,
                requirement: round_units(v.avg_rate_per_period * target_periods as f64),
            })
            .collect())
    }
}

impl Default for RequirementCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn velocity(sku: &str, rate: f64) -> VelocityRecord {
        VelocityRecord {
            sku: sku.to_string(),
            fc: None,
            units_in_window: 0,
            avg_rate_per_period: rate,
        }
    }

    #[test]
    fn test_requirement_is_rate_times_horizon() {
        let calc = RequirementCalculator::new();
        let out = calc
            .calculate(&[velocity("A", 12.5), velocity("B", 0.0)], 2)
            .unwrap();
        assert_eq!(out[0].requirement, 25);
        assert_eq!(out[1].requirement, 0);
    }

    #[test]
    fn test_non_positive_horizon_is_fatal() {
        let calc = RequirementCalculator::new();
        for horizon in [0, -1] {
            let err = calc.calculate(&[velocity("A", 1.0)], horizon).unwrap_err();
            assert_eq!(
                err,
                PipelineError::InvalidHorizon {
                    name: "target_weeks".to_string(),
                    value: horizon
                }
            );
        }
    }
}
