// ==========================================
// 库存补货调拨系统 - 应用状态
// ==========================================
// 职责: 管理共享数据库连接与各仓储实例
// ==========================================

use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{OverrideLogRepository, PlanLineRepository, RunRepository};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 应用状态
///
/// 所有仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub config_manager: Arc<ConfigManager>,
    pub run_repo: Arc<RunRepository>,
    pub line_repo: Arc<PlanLineRepository>,
    pub override_repo: Arc<OverrideLogRepository>,
}

impl AppState {
    /// 打开数据库、建表并创建仓储
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建库失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 从已初始化 schema 的连接创建 (测试使用内存库)
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        Ok(Self {
            db_path,
            config_manager,
            run_repo: Arc::new(RunRepository::new(conn.clone())),
            line_repo: Arc::new(PlanLineRepository::new(conn.clone())),
            override_repo: Arc::new(OverrideLogRepository::new(conn)),
        })
    }
}

/// 环境变量优先,其次用户数据目录
fn resolve_path(env_key: &str, fallback: &str, leaf: Option<&str>) -> PathBuf {
    // 允许通过环境变量显式指定路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(env_key) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    let mut path = PathBuf::from(fallback);
    if let Some(data_dir) = dirs::data_dir() {
        path = data_dir.join("fc-replenishment");
        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        if let Some(leaf) = leaf {
            path = path.join(leaf);
        }
    }
    path
}

/// 默认数据库路径 (FC_REPLENISH_DB_PATH)
pub fn get_default_db_path() -> String {
    resolve_path("FC_REPLENISH_DB_PATH", "./fc_replenishment.db", Some("fc_replenishment.db"))
        .to_string_lossy()
        .to_string()
}

/// 默认输入数据目录 (FC_REPLENISH_DATA_DIR)
pub fn get_default_data_dir() -> PathBuf {
    resolve_path("FC_REPLENISH_DATA_DIR", "./data/input", Some("input"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(path.ends_with(".db") || std::env::var("FC_REPLENISH_DB_PATH").is_ok());
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.run_repo.find_by_id("none").unwrap().is_none());
    }
}
