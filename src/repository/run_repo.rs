// ==========================================
// 库存补货调拨系统 - 补货运行仓储
// ==========================================
// 红线: 状态只允许 DRAFT -> LOCKED | BLOCKED
// ==========================================

use crate::domain::run::ReplenishmentRun;
use crate::domain::types::RunStatus;
use crate::repository::error::{
    conversion_error, transaction_error, RepositoryError, RepositoryResult,
};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

// ==========================================
// RunRepository - 补货运行仓储
// ==========================================
pub struct RunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建运行
    pub fn create(&self, run: &ReplenishmentRun) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO replenishment_run (
                run_id, brand, week, status, blocked_reason, params_json,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &run.run_id,
                &run.brand,
                &run.week,
                run.status.to_string(),
                &run.blocked_reason,
                &run.params_json,
                &run.created_at,
                &run.updated_at,
            ],
        )?;

        Ok(run.run_id.clone())
    }

    /// 按 run_id 查询
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<ReplenishmentRun>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT run_id, brand, week, status, blocked_reason, params_json,
                      created_at, updated_at
               FROM replenishment_run
               WHERE run_id = ?"#,
            params![run_id],
            Self::map_row,
        ) {
            Ok(run) => Ok(Some(run)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询品牌 + 周的全部运行 (按创建时间升序)
    pub fn find_by_brand_week(&self, brand: &str, week: &str) -> RepositoryResult<Vec<ReplenishmentRun>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT run_id, brand, week, status, blocked_reason, params_json,
                      created_at, updated_at
               FROM replenishment_run
               WHERE brand = ? AND week = ?
               ORDER BY created_at ASC, run_id ASC"#,
        )?;
        let runs = stmt
            .query_map(params![brand, week], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// 状态流转
    ///
    /// 在同一事务内读取当前状态并校验流转合法性。
    pub fn update_status(
        &self,
        run_id: &str,
        target: RunStatus,
        blocked_reason: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(transaction_error("begin"))?;

        let current: String = match tx.query_row(
            "SELECT status FROM replenishment_run WHERE run_id = ?",
            params![run_id],
            |row| row.get(0),
        ) {
            Ok(s) => s,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(RepositoryError::NotFound {
                    entity: "ReplenishmentRun".to_string(),
                    id: run_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let current_status = RunStatus::parse(&current).ok_or_else(|| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message: format!("无法识别的状态: {}", current),
        })?;
        if !current_status.can_transition_to(target) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current_status.to_string(),
                to: target.to_string(),
            });
        }

        tx.execute(
            "UPDATE replenishment_run SET status = ?, blocked_reason = ?, updated_at = ? WHERE run_id = ?",
            params![
                target.to_string(),
                blocked_reason,
                Utc::now().naive_utc(),
                run_id
            ],
        )?;
        tx.commit().map_err(transaction_error("commit"))?;

        info!(run_id, from = %current_status, to = %target, "run status updated");
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ReplenishmentRun> {
        let status_raw: String = row.get(3)?;
        let status = RunStatus::parse(&status_raw).ok_or_else(|| conversion_error(3, &status_raw, "status"))?;
        Ok(ReplenishmentRun {
            run_id: row.get(0)?,
            brand: row.get(1)?,
            week: row.get(2)?,
            status,
            blocked_reason: row.get(4)?,
            params_json: row.get(5)?,
            created_at: row.get::<_, NaiveDateTime>(6)?,
            updated_at: row.get::<_, NaiveDateTime>(7)?,
        })
    }
}
