// ==========================================
// 库存补货调拨系统 - 引擎层
// ==========================================
// 职责: 纯计算引擎,输入/输出均为内存中的类型化表
// 红线: Engine 不做 I/O, 不拼 SQL; 同一输入多次调用结果一致
// ==========================================

pub mod allocation;
pub mod arith;
pub mod error;
pub mod fc_planner;
pub mod fc_transfer;
pub mod ingestion_guard;
pub mod net_inventory;
pub mod orchestrator;
pub mod reconciliation;
pub mod region_sales;
pub mod requirement;
pub mod shortfall;
pub mod supplier_reorder;
pub mod validation;
pub mod velocity;
pub mod warehouse_replenishment;

// 重导出核心引擎
pub use allocation::{
    AllocationGovernor, GovernancePolicy, RatioGovernance, ALLOCATION_LOGIC, UNKNOWN_MODEL,
};
pub use error::{PipelineError, PipelineResult, ReconciliationMismatch};
pub use fc_planner::FcPlanner;
pub use fc_transfer::FcTransferBalancer;
pub use ingestion_guard::IngestionGuard;
pub use net_inventory::{NetInventoryAggregator, SecondaryStockPolicy};
pub use orchestrator::{
    FcPipelineOutput, ModelPipelineOutput, PlanningInputs, PlanningOrchestrator,
    SkuPipelineOutput,
};
pub use reconciliation::{ReconciliationEngine, StockBalance};
pub use region_sales::RegionSalesAggregator;
pub use requirement::RequirementCalculator;
pub use shortfall::{ShortfallCalculator, ShortfallPolicy};
pub use supplier_reorder::SupplierReorderCalculator;
pub use validation::ValidationEngine;
pub use velocity::VelocityEstimator;
pub use warehouse_replenishment::{WarehousePolicy, WarehouseReplenishmentPlanner};
