// ==========================================
// 宿舍管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 提供建库脚本，保证测试与生产使用同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

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
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建库（幂等）
///
/// 住宿关系双向存储:
/// - student.room_id: 学生所住房间
/// - room_occupant: 房间住户集合（随房间状态在同一事务内写入）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS room (
            id TEXT PRIMARY KEY,
            building TEXT NOT NULL,
            block TEXT,
            floor INTEGER NOT NULL DEFAULT 0,
            room_number TEXT NOT NULL,
            capacity INTEGER NOT NULL CHECK (capacity > 0),
            gender TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Available',
            revision INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_room_candidates
            ON room (gender, status, building, block);

        CREATE TABLE IF NOT EXISTS student (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            gender TEXT,
            department TEXT NOT NULL DEFAULT '',
            year INTEGER NOT NULL DEFAULT 1,
            room_id TEXT REFERENCES room(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_student_room ON student (room_id);

        CREATE TABLE IF NOT EXISTS room_occupant (
            room_id TEXT NOT NULL REFERENCES room(id) ON DELETE CASCADE,
            student_id TEXT NOT NULL UNIQUE REFERENCES student(id) ON DELETE CASCADE,
            PRIMARY KEY (room_id, student_id)
        );

        CREATE TABLE IF NOT EXISTS allocation_log (
            run_id TEXT PRIMARY KEY,
            run_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            request_json TEXT NOT NULL,
            outcome TEXT NOT NULL,
            allocated INTEGER NOT NULL,
            unallocated INTEGER NOT NULL,
            message TEXT NOT NULL,
            placements_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_allocation_log_ts ON allocation_log (run_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
