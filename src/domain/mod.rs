// ==========================================
// 库存补货调拨系统 - 领域模型层
// ==========================================
// 职责: 定义输入事实、计算结果记录、校验报告与运行实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod facts;
pub mod frame;
pub mod records;
pub mod report;
pub mod run;
pub mod types;

// 重导出核心类型
pub use facts::{
    BufferStock, CategoryRef, InventoryFact, LotSize, ModelInventory, ModelStockPosition,
    OutwardShipment, RegionShipment, SalesFact, SecondaryStockLot, ShipmentFact, StockMovement,
};
pub use frame::{Frame, Tabular};
pub use records::{
    AllocationRecord, FcPlanRecord, NetInventoryRecord, RegionSalesRecord, RequirementRecord,
    ShortfallRecord, SkuKey, SupplierReorderRecord, TransferRecord, VelocityRecord,
    WarehouseReplenishmentRecord,
};
pub use report::{CheckResult, DatasetReport, ValidationReport};
pub use run::{OverrideLog, ReplenishmentRun};
pub use types::{
    AllocationFlag, Category, ChannelFilter, CheckStatus, Disposition, Granularity, InventoryKind,
    RunStatus,
};
