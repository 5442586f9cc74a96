// ==========================================
// 库存补货调拨系统 - 数据仓储层
// ==========================================
// 职责: 数据访问,不含业务逻辑
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod error;
pub mod override_log_repo;
pub mod plan_line_repo;
pub mod run_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use override_log_repo::OverrideLogRepository;
pub use plan_line_repo::PlanLineRepository;
pub use run_repo::RunRepository;
