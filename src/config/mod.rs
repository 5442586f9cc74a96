// ==========================================
// 库存补货调拨系统 - 配置层
// ==========================================
// 职责: 计划参数默认值、校验、覆写; config_kv 读取
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod planning_config_trait;
pub mod planning_params;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use planning_config_trait::{ConfigResult, PlanningConfigReader};
pub use planning_params::{ParamOverrides, PlanningParams, DEFAULT_FC_MASTER};
