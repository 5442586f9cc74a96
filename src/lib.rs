// ==========================================
// 库存补货调拨系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 周度补货计算 (人工最终控制权)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 事实/记录/报告
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 计算管线
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 计划参数
pub mod config;

// 应用层 - 周运行
pub mod app;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 阶段耗时/慢查询
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationFlag, Category, Disposition, Granularity, RunStatus};

// 领域实体
pub use domain::{
    Frame, ReplenishmentRun, ShortfallRecord, TransferRecord, ValidationReport,
};

// 引擎
pub use engine::{PipelineError, PlanningInputs, PlanningOrchestrator};

// 配置
pub use config::{ConfigManager, ParamOverrides, PlanningParams};

// 应用
pub use app::{AppState, RunError, RunOutcome, WeeklyRunner};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存补货调拨系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
