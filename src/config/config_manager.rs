// ==========================================
// 库存补货调拨系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、快照与恢复
// 存储: config_kv 表 (key-value + scope)
// 说明: 配置值格式错误时记录 WARN 并使用默认值,不中断计划
// ==========================================

use crate::config::planning_config_trait::{ConfigResult, PlanningConfigReader};
use crate::config::planning_params::{PlanningParams, DEFAULT_FC_MASTER};
use crate::db::{init_schema, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例 (必要时建库)
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置,缺失或格式错误时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// 在创建运行时记录,保证结果可追溯。
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 覆盖现有的 global 配置
    /// - `__meta_` 前缀的键为快照元信息,不回写
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        tracing::info!(count, "config restored from snapshot");
        Ok(count)
    }
}

// ==========================================
// PlanningConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlanningConfigReader for ConfigManager {
    async fn get_target_weeks(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::TARGET_WEEKS, PlanningParams::default().target_weeks)
    }

    async fn get_replenish_weeks(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::REPLENISH_WEEKS, 8)
    }

    async fn get_sales_lookback_weeks(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::SALES_LOOKBACK_WEEKS, 8)
    }

    async fn get_secondary_max_age_days(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::SECONDARY_MAX_AGE_DAYS, 90)
    }

    async fn get_secondary_trust_weight(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::SECONDARY_TRUST_WEIGHT, 0.6)
    }

    async fn get_safety_multiplier(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::SAFETY_MULTIPLIER, 2.5)
    }

    async fn get_round_to_lot(&self) -> ConfigResult<bool> {
        let value = self.get_config_value(config_keys::ROUND_TO_LOT)?;
        Ok(match value.as_deref().map(|v| v.trim().to_lowercase()) {
            None => true,
            Some(v) => !matches!(v.as_str(), "0" | "false" | "no" | "off"),
        })
    }

    async fn get_governance_ratio(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::GOVERNANCE_RATIO, 0.35)
    }

    async fn get_fill_ratio_threshold(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::FILL_RATIO_THRESHOLD, 0.70)
    }

    async fn get_fc_master(&self) -> ConfigResult<Vec<String>> {
        let value = self.get_config_value(config_keys::FC_MASTER)?;
        let fcs: Vec<String> = value
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        if fcs.is_empty() {
            Ok(DEFAULT_FC_MASTER.iter().map(|s| s.to_string()).collect())
        } else {
            Ok(fcs)
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 覆盖周期
    pub const TARGET_WEEKS: &str = "target_weeks";
    pub const REPLENISH_WEEKS: &str = "replenish_weeks";
    pub const SALES_LOOKBACK_WEEKS: &str = "sales_lookback_weeks";

    // 次级库存
    pub const SECONDARY_MAX_AGE_DAYS: &str = "secondary_max_age_days";
    pub const SECONDARY_TRUST_WEIGHT: &str = "secondary_trust_weight";

    // 缺口与治理
    pub const SAFETY_MULTIPLIER: &str = "safety_multiplier";
    pub const ROUND_TO_LOT: &str = "round_to_lot";
    pub const GOVERNANCE_RATIO: &str = "governance_ratio";
    pub const FILL_RATIO_THRESHOLD: &str = "fill_ratio_threshold";

    // 主数据 (逗号分隔)
    pub const FC_MASTER: &str = "fc_master";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let manager = create_test_manager();
        let params = manager.load_planning_params("ACME").await.unwrap();
        assert_eq!(params, PlanningParams::for_account("ACME"));
    }

    #[tokio::test]
    async fn test_stored_values_override_defaults() {
        let manager = create_test_manager();
        manager.set_global_config_value(config_keys::TARGET_WEEKS, "4").unwrap();
        manager.set_global_config_value(config_keys::ROUND_TO_LOT, "false").unwrap();
        manager.set_global_config_value(config_keys::FC_MASTER, "del4, blr7").unwrap();

        let params = manager.load_planning_params("ACME").await.unwrap();
        assert_eq!(params.target_weeks, 4);
        assert!(!params.round_to_lot);
        assert_eq!(params.fc_master, vec!["DEL4".to_string(), "BLR7".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_value_falls_back() {
        let manager = create_test_manager();
        manager.set_global_config_value(config_keys::GOVERNANCE_RATIO, "abc").unwrap();
        assert_eq!(manager.get_governance_ratio().await.unwrap(), 0.35);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let manager = create_test_manager();
        manager.set_global_config_value(config_keys::TARGET_WEEKS, "3").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();

        manager.set_global_config_value(config_keys::TARGET_WEEKS, "6").unwrap();
        let restored = manager.restore_config_from_snapshot(&snapshot).unwrap();

        assert_eq!(restored, 1);
        assert_eq!(
            manager.get_global_config_value(config_keys::TARGET_WEEKS).unwrap(),
            Some("3".to_string())
        );
    }
}
