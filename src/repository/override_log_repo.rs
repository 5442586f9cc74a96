// ==========================================
// 库存补货调拨系统 - 人工改量审计仓储
// ==========================================
// 表: override_log (只追加)
// ==========================================

use crate::domain::run::OverrideLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub struct OverrideLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OverrideLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一条改量记录,返回自增 id
    pub fn insert(&self, entry: &OverrideLog) -> RepositoryResult<i64> {
        if entry.reason.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "reason".to_string(),
                message: "改量原因不能为空".to_string(),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO override_log (
                run_id, sku, fc, field_changed, old_value, new_value,
                reason, user_name, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &entry.run_id,
                &entry.sku,
                &entry.fc,
                &entry.field_changed,
                entry.old_value,
                entry.new_value,
                &entry.reason,
                &entry.user_name,
                &entry.created_at,
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!(
            run_id = %entry.run_id,
            sku = %entry.sku,
            field = %entry.field_changed,
            old_value = entry.old_value,
            new_value = entry.new_value,
            user = %entry.user_name,
            "override logged"
        );
        Ok(id)
    }

    /// 查询运行的全部改量记录 (按写入顺序)
    pub fn find_by_run(&self, run_id: &str) -> RepositoryResult<Vec<OverrideLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT run_id, sku, fc, field_changed, old_value, new_value,
                      reason, user_name, created_at
               FROM override_log
               WHERE run_id = ?
               ORDER BY id ASC"#,
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(OverrideLog {
                    run_id: row.get(0)?,
                    sku: row.get(1)?,
                    fc: row.get(2)?,
                    field_changed: row.get(3)?,
                    old_value: row.get(4)?,
                    new_value: row.get(5)?,
                    reason: row.get(6)?,
                    user_name: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use chrono::Utc;

    fn create_test_entry(reason: &str) -> OverrideLog {
        OverrideLog {
            run_id: "r1".to_string(),
            sku: "A".to_string(),
            fc: "DEL4".to_string(),
            field_changed: "shortfall".to_string(),
            old_value: 18,
            new_value: 24,
            reason: reason.to_string(),
            user_name: "planner".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = OverrideLogRepository::new(Arc::new(Mutex::new(conn)));

        let first = repo.insert(&create_test_entry("促销备货")).unwrap();
        let second = repo.insert(&create_test_entry("补差")).unwrap();
        assert!(second > first);

        let entries = repo.find_by_run("r1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason, "促销备货");
        assert_eq!(entries[1].new_value, 24);
    }

    #[test]
    fn test_empty_reason_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = OverrideLogRepository::new(Arc::new(Mutex::new(conn)));
        assert!(matches!(
            repo.insert(&create_test_entry("  ")),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }
}
