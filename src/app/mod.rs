// ==========================================
// 库存补货调拨系统 - 应用层
// ==========================================
// 职责: 组装仓储/配置/数据源,驱动周运行
// ==========================================

pub mod state;
pub mod weekly_runner;

// 重导出
pub use state::{get_default_data_dir, get_default_db_path, AppState};
pub use weekly_runner::{validate_week, RunError, RunOutcome, WeeklyRunner};
