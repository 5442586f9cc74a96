// ==========================================
// 库存补货调拨系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 建库脚本集中维护,幂等执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前 schema 版本
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建库脚本
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER NOT NULL,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS replenishment_run (
    run_id          TEXT PRIMARY KEY,
    brand           TEXT NOT NULL,
    week            TEXT NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('DRAFT', 'LOCKED', 'BLOCKED')),
    blocked_reason  TEXT,
    params_json     TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_run_brand_week ON replenishment_run (brand, week);

CREATE TABLE IF NOT EXISTS replenishment_line (
    run_id              TEXT NOT NULL REFERENCES replenishment_run (run_id),
    sku                 TEXT NOT NULL,
    fc                  TEXT NOT NULL DEFAULT '',
    avg_rate_per_period REAL NOT NULL,
    requirement         INTEGER NOT NULL,
    net_available       INTEGER NOT NULL,
    raw_shortfall       INTEGER NOT NULL,
    safety_cap          INTEGER NOT NULL,
    capped_shortfall    INTEGER NOT NULL,
    lot_size            INTEGER,
    shortfall           INTEGER NOT NULL CHECK (shortfall >= 0),
    PRIMARY KEY (run_id, sku, fc)
);

CREATE TABLE IF NOT EXISTS allocation_line (
    run_id                  TEXT NOT NULL REFERENCES replenishment_run (run_id),
    sku                     TEXT NOT NULL,
    fc                      TEXT NOT NULL,
    model                   TEXT NOT NULL,
    category                TEXT,
    weekly_velocity         REAL NOT NULL,
    fc_inventory            REAL NOT NULL,
    transfer_in             REAL NOT NULL,
    target_cover_units      REAL NOT NULL,
    post_transfer_stock     REAL NOT NULL,
    adjusted_shortfall      REAL NOT NULL,
    original_required_units REAL NOT NULL,
    send_qty                REAL NOT NULL,
    fill_ratio              REAL NOT NULL,
    fill_pct                REAL NOT NULL,
    flag                    TEXT NOT NULL,
    allocation_logic        TEXT NOT NULL,
    PRIMARY KEY (run_id, sku, fc)
);

CREATE TABLE IF NOT EXISTS transfer_line (
    run_id       TEXT NOT NULL REFERENCES replenishment_run (run_id),
    sku          TEXT NOT NULL,
    from_fc      TEXT NOT NULL,
    to_fc        TEXT NOT NULL,
    transfer_qty INTEGER NOT NULL CHECK (transfer_qty > 0),
    PRIMARY KEY (run_id, sku, from_fc, to_fc)
);

CREATE TABLE IF NOT EXISTS override_log (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id        TEXT NOT NULL REFERENCES replenishment_run (run_id),
    sku           TEXT NOT NULL,
    fc            TEXT NOT NULL,
    field_changed TEXT NOT NULL,
    old_value     INTEGER NOT NULL,
    new_value     INTEGER NOT NULL,
    reason        TEXT NOT NULL,
    user_name     TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_override_run ON override_log (run_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_slow_sql_logging(&mut conn);
    Ok(conn)
}

/// 建库 (幂等)
///
/// 首次执行时写入 schema_version。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
        tracing::info!(version = CURRENT_SCHEMA_VERSION, "schema initialized");
    }
    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
