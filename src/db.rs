// ==========================================
// 枪托生产流水排程系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 集中 production_order 建表语句,测试与宿主层共用
// ==========================================

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

/// 初始化订单表 schema(幂等)
///
/// # 说明
/// - revision 为乐观锁版本号,每次写入 +1
/// - queue_position 仅入口段订单非空,且段内 1..N 连续
/// - replaced_order_id 为弱引用,不加外键约束(原单可能已归档);
///   唯一索引保证一张原单至多一张补做单
pub fn init_order_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS production_order (
            order_id            TEXT PRIMARY KEY,
            fb_order_number     TEXT,
            current_department  TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'ACTIVE',
            entered_department_at TEXT NOT NULL,
            order_date          TEXT,
            due_date            TEXT,
            is_replacement      INTEGER NOT NULL DEFAULT 0,
            replaced_order_id   TEXT,
            scrap_reason        TEXT,
            scrap_date          TEXT,
            scrap_disposition   TEXT,
            scrap_authorization TEXT,
            priority_score      REAL,
            queue_position      INTEGER,
            model_id            TEXT,
            features            TEXT,
            revision            INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_order_department
            ON production_order (current_department, status);

        CREATE INDEX IF NOT EXISTS idx_order_queue_position
            ON production_order (queue_position)
            WHERE queue_position IS NOT NULL;

        CREATE UNIQUE INDEX IF NOT EXISTS idx_order_replaced
            ON production_order (replaced_order_id)
            WHERE replaced_order_id IS NOT NULL;
        "#,
    )?;
    Ok(())
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_order_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_order_schema(&conn).unwrap();
        // 再次执行不应报错
        init_order_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='production_order'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "应创建 production_order 表");
    }
}
