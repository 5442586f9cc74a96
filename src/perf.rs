// ==========================================
// 库存补货调拨系统 - 性能统计
// ==========================================
// 职责: 阶段耗时 + 行数日志 (target = "perf"); SQLite 慢查询日志 (target = "slow_sql")
// ==========================================

use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.trim().replace('\n', " ");
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s,
    }
}

/// 安装慢 SQL 日志
///
/// - `FC_REPLENISH_SLOW_SQL_MS=50` 配置阈值 (毫秒)
/// - 未配置时 Debug 默认 50ms,Release 默认关闭
pub fn install_slow_sql_logging(conn: &mut Connection) {
    let threshold = std::env::var("FC_REPLENISH_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 0 });
    SLOW_SQL_THRESHOLD_MS.store(threshold, Ordering::Relaxed);

    if threshold == 0 {
        conn.profile(None);
    } else {
        conn.profile(Some(sql_profile_callback));
    }
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %truncate_sql(sql, 420),
            "slow sql"
        );
    }
}

/// 阶段统计 Guard: Drop 时记录 elapsed_ms + 输入/输出行数
///
/// ```ignore
/// let mut perf = StageGuard::new("fc_transfer", plan.len());
/// let transfers = balancer.balance(&plan);
/// perf.rows_out(transfers.len());
/// ```
pub struct StageGuard {
    stage: &'static str,
    start: Instant,
    rows_in: usize,
    rows_out: Option<usize>,
}

impl StageGuard {
    pub fn new(stage: &'static str, rows_in: usize) -> Self {
        Self {
            stage,
            start: Instant::now(),
            rows_in,
            rows_out: None,
        }
    }

    pub fn rows_out(&mut self, rows: usize) {
        self.rows_out = Some(rows);
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        match self.rows_out {
            Some(rows_out) => tracing::info!(
                target: "perf",
                stage = self.stage,
                elapsed_ms,
                rows_in = self.rows_in,
                rows_out,
                "done"
            ),
            // 阶段以错误提前返回
            None => tracing::info!(
                target: "perf",
                stage = self.stage,
                elapsed_ms,
                rows_in = self.rows_in,
                "aborted"
            ),
        }
    }
}
