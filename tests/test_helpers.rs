// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化与输入目录准备
// ==========================================

#![allow(dead_code)]

use fc_replenishment::db::{init_schema, open_sqlite_connection};
use rusqlite::Connection;
use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库的共享连接
pub fn open_shared_conn(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 创建空的输入数据目录
pub fn create_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp data dir")
}

/// 写入一个 CSV 文件
pub fn write_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write test file");
}

/// 统计表行数
pub fn count_rows(db_path: &str, table: &str) -> i64 {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}
