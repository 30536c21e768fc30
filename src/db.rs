// ==========================================
// 献血决策支持系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发读写时的偶发 busy 错误
// - 集中 observation 表的建表语句
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout(毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化 observation 表与索引(幂等)
///
/// - date_ms / created_at_ms: Unix 毫秒,时间窗口与月分桶都走这两列
/// - attributes: JSON 对象,分类属性与数值度量
pub fn init_schema(conn: &Connection) -> RepositoryResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS observation (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            date_ms INTEGER NOT NULL,
            created_at_ms INTEGER NOT NULL,
            attributes TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_observation_collection_date
            ON observation (collection, date_ms);
        CREATE INDEX IF NOT EXISTS idx_observation_collection_created
            ON observation (collection, created_at_ms);
        "#,
    )?;
    Ok(())
}
