// ==========================================
// 库存补货调拨系统 - 引擎编排器
// ==========================================
// 用途: 按严格顺序协调各计算引擎
// SKU 管线: 速度 -> 净库存 -> 需求 -> 缺口 -> 对账
// FC 管线: 发货速度 -> FC 计划 -> 调拨 -> 分配 -> 对账 -> 校验
// 型号管线: 供应商补单 / 仓库补货 (输入缺失时跳过)
// ==========================================

use crate::config::PlanningParams;
use crate::domain::facts::{
    BufferStock, CategoryRef, InventoryFact, LotSize, ModelInventory, ModelStockPosition,
    SalesFact, SecondaryStockLot, ShipmentFact,
};
use crate::domain::frame::Frame;
use crate::domain::records::{
    AllocationRecord, FcPlanRecord, NetInventoryRecord, RequirementRecord, ShortfallRecord,
    SupplierReorderRecord, TransferRecord, VelocityRecord, WarehouseReplenishmentRecord,
};
use crate::domain::report::ValidationReport;
use crate::domain::types::Granularity;
use crate::engine::error::PipelineResult;
use crate::engine::{
    AllocationGovernor, FcPlanner, FcTransferBalancer, NetInventoryAggregator,
    ReconciliationEngine, RequirementCalculator, ShortfallCalculator, SupplierReorderCalculator,
    ValidationEngine, VelocityEstimator, WarehouseReplenishmentPlanner,
};
use crate::perf::StageGuard;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

// ==========================================
// PlanningInputs - 一次计划调用的全部输入表
// ==========================================
#[derive(Debug, Clone)]
pub struct PlanningInputs {
    pub sales: Frame<SalesFact>,
    pub shipments: Frame<ShipmentFact>,
    pub inventory: Frame<InventoryFact>,
    pub secondary: Option<Frame<SecondaryStockLot>>,
    pub buffer: Option<Frame<BufferStock>>,
    pub lot_sizes: Frame<LotSize>,
    pub categories: Frame<CategoryRef>,
    pub model_inventory: Option<Frame<ModelInventory>>,
    pub stock_positions: Option<Frame<ModelStockPosition>>,
}

impl PlanningInputs {
    /// 仅含必需表的输入,可选表为 None
    pub fn new(
        sales: Frame<SalesFact>,
        shipments: Frame<ShipmentFact>,
        inventory: Frame<InventoryFact>,
        lot_sizes: Frame<LotSize>,
        categories: Frame<CategoryRef>,
    ) -> Self {
        Self {
            sales,
            shipments,
            inventory,
            secondary: None,
            buffer: None,
            lot_sizes,
            categories,
            model_inventory: None,
            stock_positions: None,
        }
    }
}

// ==========================================
// 管线输出
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuPipelineOutput {
    pub velocity: Vec<VelocityRecord>,
    pub net_inventory: Vec<NetInventoryRecord>,
    pub requirements: Vec<RequirementRecord>,
    pub shortfalls: Vec<ShortfallRecord>,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcPipelineOutput {
    pub velocity: Vec<VelocityRecord>,
    pub plan: Vec<FcPlanRecord>,
    pub transfers: Vec<TransferRecord>,
    pub allocations: Vec<AllocationRecord>,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPipelineOutput {
    pub supplier_reorder: Vec<SupplierReorderRecord>,
    pub warehouse_replenishment: Vec<WarehouseReplenishmentRecord>,
}

// ==========================================
// PlanningOrchestrator - 引擎编排器
// ==========================================
pub struct PlanningOrchestrator {
    granularity: Granularity,
    velocity: VelocityEstimator,
    aggregator: NetInventoryAggregator,
    requirement: RequirementCalculator,
    shortfall: ShortfallCalculator,
    planner: FcPlanner,
    balancer: FcTransferBalancer,
    validation: ValidationEngine,
    reconciliation: ReconciliationEngine,
    supplier: SupplierReorderCalculator,
    warehouse: WarehouseReplenishmentPlanner,
}

impl PlanningOrchestrator {
    /// 创建编排器 (SKU 管线默认按 SKU 粒度)
    pub fn new() -> Self {
        Self {
            granularity: Granularity::Sku,
            velocity: VelocityEstimator::new(),
            aggregator: NetInventoryAggregator::new(),
            requirement: RequirementCalculator::new(),
            shortfall: ShortfallCalculator::new(),
            planner: FcPlanner::new(),
            balancer: FcTransferBalancer::new(),
            validation: ValidationEngine::new(),
            reconciliation: ReconciliationEngine::new(),
            supplier: SupplierReorderCalculator::new(),
            warehouse: WarehouseReplenishmentPlanner::new(),
        }
    }

    /// 指定 SKU 管线的计算粒度
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// SKU 管线
    ///
    /// # 流程
    /// 1. 参数校验 (越界在任何计算之前拒绝)
    /// 2. 速度 -> 净库存 -> 需求 -> 缺口
    /// 3. 缺口对账 (负缺口为致命错误)
    #[instrument(skip(self, inputs, params), fields(account = %params.account, granularity = ?self.granularity))]
    pub fn run_sku_pipeline(
        &self,
        inputs: &PlanningInputs,
        params: &PlanningParams,
    ) -> PipelineResult<SkuPipelineOutput> {
        params.validate()?;
        info!("SKU 管线开始");

        let velocity = {
            let mut perf = StageGuard::new("velocity", inputs.sales.len());
            let out = self.velocity.estimate(
                &inputs.sales,
                params.sales_lookback_weeks,
                self.granularity,
                &params.channel,
            )?;
            perf.rows_out(out.len());
            out
        };

        let net_inventory = {
            let mut perf = StageGuard::new("net_inventory", inputs.inventory.len());
            let out = self.aggregator.aggregate(
                &inputs.inventory,
                inputs.secondary.as_ref(),
                inputs.buffer.as_ref(),
                &params.secondary_policy(),
                self.granularity,
            )?;
            perf.rows_out(out.len());
            out
        };

        let requirements = {
            let mut perf = StageGuard::new("requirement", velocity.len());
            let out = self.requirement.calculate(&velocity, params.target_weeks)?;
            perf.rows_out(out.len());
            out
        };

        let shortfalls = {
            let mut perf = StageGuard::new("shortfall", requirements.len());
            let out = self.shortfall.calculate(
                &requirements,
                &net_inventory,
                &inputs.lot_sizes,
                &params.shortfall_policy(),
            )?;
            perf.rows_out(out.len());
            out
        };

        self.reconciliation.reconcile_replenishment_vs_stock(&shortfalls)?;

        let validation = self
            .validation
            .summarize(vec![self.validation.validate_shortfalls(&shortfalls)]);

        info!(
            skus = velocity.len(),
            shortfall_rows = shortfalls.iter().filter(|s| s.shortfall > 0).count(),
            validation = ?validation.overall_status,
            "SKU 管线完成"
        );

        Ok(SkuPipelineOutput {
            velocity,
            net_inventory,
            requirements,
            shortfalls,
            validation,
        })
    }

    /// FC 管线
    ///
    /// # 流程
    /// 1. 参数校验
    /// 2. 发货速度 -> FC 计划 -> 调拨 -> 治理分配
    /// 3. 分配对账 (负发货量为致命错误)
    /// 4. 非致命校验报告
    #[instrument(skip(self, inputs, params), fields(account = %params.account))]
    pub fn run_fc_pipeline(
        &self,
        inputs: &PlanningInputs,
        params: &PlanningParams,
    ) -> PipelineResult<FcPipelineOutput> {
        params.validate()?;
        let governor = AllocationGovernor::new(
            Box::new(params.governance()?),
            params.fill_ratio_threshold,
        )?;
        info!("FC 管线开始");

        let velocity = {
            let mut perf = StageGuard::new("fc_velocity", inputs.shipments.len());
            let out = self.velocity.estimate_from_shipments(
                &inputs.shipments,
                params.shipment_window_days,
                params.weeks_per_window,
                &params.channel,
            )?;
            perf.rows_out(out.len());
            out
        };

        let plan = {
            let mut perf = StageGuard::new("fc_plan", velocity.len());
            let out = self
                .planner
                .plan(&velocity, &inputs.inventory, params.replenish_weeks)?;
            perf.rows_out(out.len());
            out
        };

        let transfers = {
            let mut perf = StageGuard::new("fc_transfer", plan.len());
            let out = self.balancer.balance(&plan);
            perf.rows_out(out.len());
            out
        };

        let allocations = {
            let mut perf = StageGuard::new("allocation", plan.len());
            let out = governor.allocate(
                &plan,
                &transfers,
                &inputs.categories,
                params.replenish_weeks,
            )?;
            perf.rows_out(out.len());
            out
        };

        self.reconciliation.reconcile_allocations(&allocations)?;

        let validation = self.validation.summarize(vec![
            self.validation.validate_shipments(&inputs.shipments),
            self.validation.validate_ledger(&inputs.inventory),
            self.validation.validate_fc_plan(&plan),
            self.validation.validate_transfers(&transfers),
            self.validation.validate_allocations(&allocations),
        ]);

        info!(
            plan_rows = plan.len(),
            transfers = transfers.len(),
            validation = ?validation.overall_status,
            "FC 管线完成"
        );

        Ok(FcPipelineOutput {
            velocity,
            plan,
            transfers,
            allocations,
            validation,
        })
    }

    /// 型号管线 (供应商补单 + 仓库补货)
    ///
    /// 对应输入表缺失时,该部分输出为空。
    #[instrument(skip(self, inputs, params), fields(account = %params.account))]
    pub fn run_model_pipeline(
        &self,
        inputs: &PlanningInputs,
        params: &PlanningParams,
    ) -> PipelineResult<ModelPipelineOutput> {
        params.validate()?;
        let mut output = ModelPipelineOutput::default();

        if let Some(model_inventory) = &inputs.model_inventory {
            let mut perf = StageGuard::new("supplier_reorder", model_inventory.len());
            output.supplier_reorder = self.supplier.calculate(
                &inputs.sales,
                inputs.categories.rows(),
                model_inventory,
                params.supplier_lookback_weeks,
                params.supplier_months_of_cover,
            )?;
            perf.rows_out(output.supplier_reorder.len());
        }

        if let Some(positions) = &inputs.stock_positions {
            let mut perf = StageGuard::new("warehouse_replenishment", positions.len());
            output.warehouse_replenishment = self.warehouse.plan(
                &inputs.sales,
                inputs.categories.rows(),
                positions,
                &params.channel,
                &params.warehouse_policy(),
            )?;
            perf.rows_out(output.warehouse_replenishment.len());
        }

        Ok(output)
    }
}

impl Default for PlanningOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Category, Disposition};
    use crate::engine::error::PipelineError;
    use chrono::{Duration, NaiveDate};

    fn week(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::weeks(n)
    }

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(n)
    }

    fn create_test_inputs() -> PlanningInputs {
        let sales = (0..8)
            .map(|i| SalesFact {
                sku: "A".to_string(),
                fc: None,
                channel: None,
                period: week(i),
                units_sold: 10,
            })
            .collect();

        let mut shipments = Vec::new();
        for d in 0..30 {
            shipments.push(ShipmentFact {
                sku: "A".to_string(),
                fc: "DEL4".to_string(),
                channel: None,
                shipment_date: day(d),
                quantity: 2,
            });
            shipments.push(ShipmentFact {
                sku: "A".to_string(),
                fc: "BLR7".to_string(),
                channel: None,
                shipment_date: day(d),
                quantity: 1,
            });
        }

        let inventory = vec![
            InventoryFact {
                sku: "A".to_string(),
                fc: "DEL4".to_string(),
                disposition: Disposition::Sellable,
                quantity: 5,
                aging_days: None,
            },
            InventoryFact {
                sku: "A".to_string(),
                fc: "BLR7".to_string(),
                disposition: Disposition::Sellable,
                quantity: 200,
                aging_days: None,
            },
        ];

        PlanningInputs::new(
            Frame::from_rows(sales),
            Frame::from_rows(shipments),
            Frame::from_rows(inventory),
            Frame::from_rows(vec![LotSize {
                sku: "A".to_string(),
                lot_size: 6,
            }]),
            Frame::from_rows(vec![CategoryRef {
                sku: "A".to_string(),
                model: Some("M1".to_string()),
                category: Some(Category::Governed),
            }]),
        )
    }

    #[test]
    fn test_sku_pipeline_end_to_end() {
        let orchestrator = PlanningOrchestrator::new();
        let params = PlanningParams::for_account("ACME");
        let out = orchestrator
            .run_sku_pipeline(&create_test_inputs(), &params)
            .unwrap();

        assert_eq!(out.shortfalls.len(), 1);
        let row = &out.shortfalls[0];
        // 80 / 8 = 10 -> requirement 20; net 205 -> 无缺口
        assert_eq!(row.avg_rate_per_period, 10.0);
        assert_eq!(row.requirement, 20);
        assert_eq!(row.net_available, 205);
        assert_eq!(row.shortfall, 0);
        assert!(out.validation.overall_status.is_pass());
    }

    #[test]
    fn test_sku_pipeline_lot_rounding() {
        let mut inputs = create_test_inputs();
        inputs.inventory = Frame::from_rows(vec![InventoryFact {
            sku: "A".to_string(),
            fc: "DEL4".to_string(),
            disposition: Disposition::Sellable,
            quantity: 5,
            aging_days: None,
        }]);

        let out = PlanningOrchestrator::new()
            .run_sku_pipeline(&inputs, &PlanningParams::for_account("ACME"))
            .unwrap();
        let row = &out.shortfalls[0];
        // raw 15, cap floor(10 × 2.5) = 25, 箱规 6 -> 18
        assert_eq!(row.raw_shortfall, 15);
        assert_eq!(row.safety_cap, 25);
        assert_eq!(row.shortfall, 18);
    }

    #[test]
    fn test_fc_pipeline_moves_excess_before_sending() {
        let out = PlanningOrchestrator::new()
            .run_fc_pipeline(&create_test_inputs(), &PlanningParams::for_account("ACME"))
            .unwrap();

        assert_eq!(out.plan.len(), 2);
        assert_eq!(out.allocations.len(), out.plan.len());
        assert!(!out.transfers.is_empty());
        for t in &out.transfers {
            assert_eq!(t.from_fc, "BLR7");
            assert_eq!(t.to_fc, "DEL4");
            assert!(t.transfer_qty > 0);
        }
        for a in &out.allocations {
            assert!(a.send_qty >= 0.0);
        }
    }

    #[test]
    fn test_fc_pipeline_reports_input_datasets() {
        let mut inputs = create_test_inputs();
        let mut ledger = inputs.inventory.rows().to_vec();
        ledger.push(InventoryFact {
            sku: "A".to_string(),
            fc: "BLR7".to_string(),
            disposition: Disposition::Damaged,
            quantity: -2,
            aging_days: None,
        });
        inputs.inventory = Frame::from_rows(ledger);

        let out = PlanningOrchestrator::new()
            .run_fc_pipeline(&inputs, &PlanningParams::for_account("ACME"))
            .unwrap();

        let shipments = out.validation.dataset("shipments").unwrap();
        assert!(shipments.is_pass());
        assert_eq!(shipments.unique_skus, Some(1));
        assert!(shipments.date_range.is_some());

        let ledger = out.validation.dataset("ledger").unwrap();
        assert!(!ledger.is_pass());
        assert!(out.validation.dataset("fc_plan").unwrap().is_pass());
        assert!(!out.validation.overall_status.is_pass());
    }

    #[test]
    fn test_invalid_params_rejected_before_computation() {
        let params = PlanningParams {
            target_weeks: 0,
            ..PlanningParams::for_account("ACME")
        };
        let result = PlanningOrchestrator::new().run_sku_pipeline(&create_test_inputs(), &params);
        assert!(matches!(result, Err(PipelineError::InvalidHorizon { .. })));
    }

    #[test]
    fn test_pipelines_are_idempotent() {
        let orchestrator = PlanningOrchestrator::new();
        let inputs = create_test_inputs();
        let params = PlanningParams::for_account("ACME");

        let first = serde_json::to_string(&orchestrator.run_fc_pipeline(&inputs, &params).unwrap()).unwrap();
        let second = serde_json::to_string(&orchestrator.run_fc_pipeline(&inputs, &params).unwrap()).unwrap();
        assert_eq!(first, second);

        let first = serde_json::to_string(&orchestrator.run_sku_pipeline(&inputs, &params).unwrap()).unwrap();
        let second = serde_json::to_string(&orchestrator.run_sku_pipeline(&inputs, &params).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_model_pipeline_skips_missing_inputs() {
        let out = PlanningOrchestrator::new()
            .run_model_pipeline(&create_test_inputs(), &PlanningParams::for_account("ACME"))
            .unwrap();
        assert!(out.supplier_reorder.is_empty());
        assert!(out.warehouse_replenishment.is_empty());
    }
}
