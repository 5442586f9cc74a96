// ==========================================
// 库存补货调拨系统 - 计划明细仓储
// ==========================================
// 表: replenishment_line / allocation_line / transfer_line
// 红线: 每次运行只追加一次; 重复写入 → UniqueConstraintViolation
// ==========================================

use crate::domain::records::{AllocationRecord, ShortfallRecord, TransferRecord};
use crate::domain::types::{AllocationFlag, Category};
use crate::repository::error::{
    conversion_error, transaction_error, RepositoryError, RepositoryResult,
};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

fn parse_category(raw: &str) -> Option<Category> {
    match raw {
        "GOVERNED" => Some(Category::Governed),
        "EXEMPT" => Some(Category::Exempt),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<AllocationFlag> {
    match raw {
        "NO_REQUIREMENT" => Some(AllocationFlag::NoRequirement),
        "SHORT" => Some(AllocationFlag::Short),
        "OK" => Some(AllocationFlag::Ok),
        _ => None,
    }
}

// ==========================================
// PlanLineRepository - 计划明细仓储
// ==========================================
pub struct PlanLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 补货缺口明细 =====

    /// 批量写入 (单事务),SKU 粒度的 fc 存为空串
    pub fn insert_replenishment_lines(
        &self,
        run_id: &str,
        lines: &[ShortfallRecord],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(transaction_error("begin"))?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO replenishment_line (
                    run_id, sku, fc, avg_rate_per_period, requirement, net_available,
                    raw_shortfall, safety_cap, capped_shortfall, lot_size, shortfall
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;
            for line in lines {
                stmt.execute(params![
                    run_id,
                    &line.sku,
                    line.fc.as_deref().unwrap_or(""),
                    line.avg_rate_per_period,
                    line.requirement,
                    line.net_available,
                    line.raw_shortfall,
                    line.safety_cap,
                    line.capped_shortfall,
                    line.lot_size,
                    line.shortfall,
                ])?;
            }
        }
        tx.commit().map_err(transaction_error("commit"))?;

        debug!(run_id, rows = lines.len(), "replenishment lines written");
        Ok(lines.len())
    }

    pub fn find_replenishment_lines(&self, run_id: &str) -> RepositoryResult<Vec<ShortfallRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT sku, fc, avg_rate_per_period, requirement, net_available,
                      raw_shortfall, safety_cap, capped_shortfall, lot_size, shortfall
               FROM replenishment_line
               WHERE run_id = ?
               ORDER BY sku, fc"#,
        )?;
        let lines = stmt
            .query_map(params![run_id], |row| {
                let fc: String = row.get(1)?;
                Ok(ShortfallRecord {
                    sku: row.get(0)?,
                    fc: if fc.is_empty() { None } else { Some(fc) },
                    avg_rate_per_period: row.get(2)?,
                    requirement: row.get(3)?,
                    net_available: row.get(4)?,
                    raw_shortfall: row.get(5)?,
                    safety_cap: row.get(6)?,
                    capped_shortfall: row.get(7)?,
                    lot_size: row.get(8)?,
                    shortfall: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    // ===== 最终分配明细 =====

    pub fn insert_allocation_lines(
        &self,
        run_id: &str,
        lines: &[AllocationRecord],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(transaction_error("begin"))?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO allocation_line (
                    run_id, sku, fc, model, category, weekly_velocity, fc_inventory,
                    transfer_in, target_cover_units, post_transfer_stock, adjusted_shortfall,
                    original_required_units, send_qty, fill_ratio, fill_pct, flag, allocation_logic
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;
            for line in lines {
                stmt.execute(params![
                    run_id,
                    &line.sku,
                    &line.fc,
                    &line.model,
                    line.category.map(|c| c.to_string()),
                    line.weekly_velocity,
                    line.fc_inventory,
                    line.transfer_in,
                    line.target_cover_units,
                    line.post_transfer_stock,
                    line.adjusted_shortfall,
                    line.original_required_units,
                    line.send_qty,
                    line.fill_ratio,
                    line.fill_pct,
                    line.flag.to_string(),
                    &line.allocation_logic,
                ])?;
            }
        }
        tx.commit().map_err(transaction_error("commit"))?;

        debug!(run_id, rows = lines.len(), "allocation lines written");
        Ok(lines.len())
    }

    pub fn find_allocation_lines(&self, run_id: &str) -> RepositoryResult<Vec<AllocationRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT sku, fc, model, category, weekly_velocity, fc_inventory,
                      transfer_in, target_cover_units, post_transfer_stock, adjusted_shortfall,
                      original_required_units, send_qty, fill_ratio, fill_pct, flag, allocation_logic
               FROM allocation_line
               WHERE run_id = ?
               ORDER BY sku, fc"#,
        )?;
        let lines = stmt
            .query_map(params![run_id], Self::map_allocation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    fn map_allocation_row(row: &Row<'_>) -> rusqlite::Result<AllocationRecord> {
        let category_raw: Option<String> = row.get(3)?;
        let category = match category_raw {
            Some(raw) => Some(parse_category(&raw).ok_or_else(|| conversion_error(3, &raw, "category"))?),
            None => None,
        };
        let flag_raw: String = row.get(14)?;
        let flag = parse_flag(&flag_raw).ok_or_else(|| conversion_error(14, &flag_raw, "flag"))?;

        Ok(AllocationRecord {
            sku: row.get(0)?,
            fc: row.get(1)?,
            model: row.get(2)?,
            category,
            weekly_velocity: row.get(4)?,
            fc_inventory: row.get(5)?,
            transfer_in: row.get(6)?,
            target_cover_units: row.get(7)?,
            post_transfer_stock: row.get(8)?,
            adjusted_shortfall: row.get(9)?,
            original_required_units: row.get(10)?,
            send_qty: row.get(11)?,
            fill_ratio: row.get(12)?,
            fill_pct: row.get(13)?,
            flag,
            allocation_logic: row.get(15)?,
        })
    }

    // ===== 调拨明细 =====

    pub fn insert_transfer_lines(
        &self,
        run_id: &str,
        lines: &[TransferRecord],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(transaction_error("begin"))?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transfer_line (run_id, sku, from_fc, to_fc, transfer_qty) VALUES (?, ?, ?, ?, ?)",
            )?;
            for line in lines {
                stmt.execute(params![
                    run_id,
                    &line.sku,
                    &line.from_fc,
                    &line.to_fc,
                    line.transfer_qty
                ])?;
            }
        }
        tx.commit().map_err(transaction_error("commit"))?;

        debug!(run_id, rows = lines.len(), "transfer lines written");
        Ok(lines.len())
    }

    pub fn find_transfer_lines(&self, run_id: &str) -> RepositoryResult<Vec<TransferRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT sku, from_fc, to_fc, transfer_qty
               FROM transfer_line
               WHERE run_id = ?
               ORDER BY sku, from_fc, to_fc"#,
        )?;
        let lines = stmt
            .query_map(params![run_id], |row| {
                Ok(TransferRecord {
                    sku: row.get(0)?,
                    from_fc: row.get(1)?,
                    to_fc: row.get(2)?,
                    transfer_qty: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}
