// ==========================================
// 库存补货调拨系统 - 周运行器
// ==========================================
// 流程:
// 1. 加载参数 (config_kv + 单次覆写) 并校验计划周
// 2. 创建运行 (DRAFT)
// 3. 并发加载事实表
// 4. 入库检查 (库存台账 / 出库发票)
// 5. SKU 管线 / FC 管线 / 型号管线
// 6. 写入明细 → LOCKED
// 任一步失败 → BLOCKED (记录原因) 并返回错误
// ==========================================

use crate::config::{ParamOverrides, PlanningConfigReader, PlanningParams};
use crate::domain::records::RegionSalesRecord;
use crate::domain::run::ReplenishmentRun;
use crate::domain::types::RunStatus;
use crate::engine::{
    FcPipelineOutput, IngestionGuard, ModelPipelineOutput, PipelineError, PlanningInputs,
    PlanningOrchestrator, RegionSalesAggregator, SkuPipelineOutput,
};
use crate::importer::{FactSource, ImportError};
use crate::repository::{PlanLineRepository, RepositoryError, RunRepository};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RunError - 运行错误
// ==========================================
#[derive(Error, Debug)]
pub enum RunError {
    #[error("计划周格式错误 (期望 YYYY-WW): {0}")]
    InvalidWeek(String),

    #[error("配置加载失败: {0}")]
    Config(String),

    #[error("参数序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 校验计划周 "YYYY-WW" (周 1..=53)
pub fn validate_week(week: &str) -> Result<(), RunError> {
    let invalid = || RunError::InvalidWeek(week.to_string());
    let (year, wk) = week.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || wk.len() != 2 {
        return Err(invalid());
    }
    let _year: i32 = year.parse().map_err(|_| invalid())?;
    let wk: u32 = wk.parse().map_err(|_| invalid())?;
    if !(1..=53).contains(&wk) {
        return Err(invalid());
    }
    Ok(())
}

// ==========================================
// RunOutcome - 成功运行的结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub brand: String,
    pub week: String,
    pub status: RunStatus,
    pub params: PlanningParams,
    pub sku: SkuPipelineOutput,
    pub fc: FcPipelineOutput,
    pub model: ModelPipelineOutput,
}

// ==========================================
// WeeklyRunner - 周运行器
// ==========================================
pub struct WeeklyRunner<S, C>
where
    S: FactSource,
    C: PlanningConfigReader,
{
    source: Arc<S>,
    config: Arc<C>,
    run_repo: Arc<RunRepository>,
    line_repo: Arc<PlanLineRepository>,
    orchestrator: PlanningOrchestrator,
}

impl<S, C> WeeklyRunner<S, C>
where
    S: FactSource,
    C: PlanningConfigReader,
{
    pub fn new(
        source: Arc<S>,
        config: Arc<C>,
        run_repo: Arc<RunRepository>,
        line_repo: Arc<PlanLineRepository>,
    ) -> Self {
        Self {
            source,
            config,
            run_repo,
            line_repo,
            orchestrator: PlanningOrchestrator::new(),
        }
    }

    /// 执行一次周运行
    ///
    /// 运行创建之后的任何失败都会把运行置为 BLOCKED,再返回原错误。
    #[instrument(skip(self, overrides))]
    pub async fn run(
        &self,
        brand: &str,
        week: &str,
        overrides: &ParamOverrides,
    ) -> Result<RunOutcome, RunError> {
        validate_week(week)?;
        let params = self
            .config
            .load_planning_params(brand)
            .await
            .map_err(|e| RunError::Config(e.to_string()))?
            .with_overrides(overrides);

        let run_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        self.run_repo.create(&ReplenishmentRun {
            run_id: run_id.clone(),
            brand: brand.to_string(),
            week: week.to_string(),
            status: RunStatus::Draft,
            blocked_reason: None,
            params_json: Some(serde_json::to_string(&params)?),
            created_at: now,
            updated_at: now,
        })?;
        info!(%run_id, "补货运行已创建");

        match self.execute(&run_id, brand, &params).await {
            Ok((sku, fc, model)) => {
                self.run_repo.update_status(&run_id, RunStatus::Locked, None)?;
                info!(
                    %run_id,
                    shortfall_lines = sku.shortfalls.len(),
                    allocation_lines = fc.allocations.len(),
                    transfer_lines = fc.transfers.len(),
                    "补货运行已锁定"
                );
                Ok(RunOutcome {
                    run_id,
                    brand: brand.to_string(),
                    week: week.to_string(),
                    status: RunStatus::Locked,
                    params,
                    sku,
                    fc,
                    model,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                error!(%run_id, %reason, "补货运行已阻断");
                if let Err(status_err) =
                    self.run_repo
                        .update_status(&run_id, RunStatus::Blocked, Some(&reason))
                {
                    warn!(%run_id, error = %status_err, "阻断状态写入失败");
                }
                Err(e)
            }
        }
    }

    /// 地区销量报表 (不创建运行,不落库)
    ///
    /// 窗口与周换算沿用发货速度参数。
    #[instrument(skip(self, overrides))]
    pub async fn region_sales(
        &self,
        brand: &str,
        overrides: &ParamOverrides,
    ) -> Result<Vec<RegionSalesRecord>, RunError> {
        let params = self
            .config
            .load_planning_params(brand)
            .await
            .map_err(|e| RunError::Config(e.to_string()))?
            .with_overrides(overrides);
        params.validate()?;

        let shipments = self.source.load_region_shipments(brand).await?;
        let records = RegionSalesAggregator::new().aggregate(
            &shipments,
            params.shipment_window_days,
            params.weeks_per_window,
        )?;
        info!(rows = records.len(), "地区销量汇总完成");
        Ok(records)
    }

    async fn execute(
        &self,
        run_id: &str,
        brand: &str,
        params: &PlanningParams,
    ) -> Result<(SkuPipelineOutput, FcPipelineOutput, ModelPipelineOutput), RunError> {
        // 1. 并发加载
        let source = &self.source;
        let (
            sales,
            shipments,
            inventory,
            secondary,
            buffer,
            lot_sizes,
            categories,
            outward,
            model_inventory,
            stock_positions,
        ) = futures::try_join!(
            source.load_sales(brand),
            source.load_shipments(brand),
            source.load_inventory(brand),
            source.load_secondary(brand),
            source.load_buffer(brand),
            source.load_lot_sizes(brand),
            source.load_categories(brand),
            source.load_outward_shipments(brand),
            source.load_model_inventory(brand),
            source.load_stock_positions(brand),
        )?;

        // 2. 入库检查
        let guard = IngestionGuard::new(params.fc_master.iter());
        guard.check_stock(&inventory)?;
        guard.check_invoices(&outward)?;

        // 3. 计算
        let inputs = PlanningInputs {
            sales,
            shipments,
            inventory,
            secondary,
            buffer,
            lot_sizes,
            categories,
            model_inventory,
            stock_positions,
        };
        let sku = self.orchestrator.run_sku_pipeline(&inputs, params)?;
        let fc = self.orchestrator.run_fc_pipeline(&inputs, params)?;
        let model = self.orchestrator.run_model_pipeline(&inputs, params)?;

        // 4. 落库 (只追加)
        self.line_repo.insert_replenishment_lines(run_id, &sku.shortfalls)?;
        self.line_repo.insert_allocation_lines(run_id, &fc.allocations)?;
        self.line_repo.insert_transfer_lines(run_id, &fc.transfers)?;

        Ok((sku, fc, model))
    }
}
