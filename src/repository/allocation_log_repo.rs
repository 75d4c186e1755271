// ==========================================
// 宿舍管理系统 - 分配运行日志数据仓储
// ==========================================
// 对齐: allocation_log 表
// 红线: 每次分配运行都必须记录
// ==========================================

use crate::domain::allocation_log::AllocationLog;
use crate::domain::types::AllocationRunOutcome;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ==========================================
// AllocationLogRepository - 分配日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AllocationLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationLogRepository {
    /// 创建新的分配日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入运行日志
    ///
    /// # 返回
    /// - `Ok(run_id)`: 成功插入
    pub fn insert(&self, log: &AllocationLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO allocation_log (
                run_id, run_ts, actor, request_json, outcome,
                allocated, unallocated, message, placements_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.run_id,
                log.run_ts.format(TS_FORMAT).to_string(),
                log.actor,
                log.request_json.to_string(),
                log.outcome.to_db_str(),
                log.allocated,
                log.unallocated,
                log.message,
                log.placements_json.to_string(),
            ],
        )?;

        Ok(log.run_id.clone())
    }

    /// 按 run_id 查询
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<AllocationLog>> {
        let conn = self.get_conn()?;
        let log = conn
            .query_row(
                r#"
                SELECT run_id, run_ts, actor, request_json, outcome,
                       allocated, unallocated, message, placements_json
                FROM allocation_log
                WHERE run_id = ?1
                "#,
                params![run_id],
                map_log_row,
            )
            .optional()?;
        Ok(log)
    }

    /// 查询最近的运行日志（时间倒序）
    pub fn find_recent(&self, limit: usize) -> RepositoryResult<Vec<AllocationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, run_ts, actor, request_json, outcome,
                   allocated, unallocated, message, placements_json
            FROM allocation_log
            ORDER BY run_ts DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let logs = stmt
            .query_map(params![limit as i64], map_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<AllocationLog> {
    let run_ts: String = row.get(1)?;
    let request_json: String = row.get(3)?;
    let outcome: String = row.get(4)?;
    let placements_json: String = row.get(8)?;

    Ok(AllocationLog {
        run_id: row.get(0)?,
        run_ts: NaiveDateTime::parse_from_str(&run_ts, TS_FORMAT)
            .map_err(|e| invalid_column(1, e))?,
        actor: row.get(2)?,
        request_json: serde_json::from_str(&request_json).map_err(|e| invalid_column(3, e))?,
        outcome: AllocationRunOutcome::from_db_str(&outcome).ok_or_else(|| {
            invalid_column(4, std::io::Error::other(format!("未知运行结果: {}", outcome)))
        })?,
        allocated: row.get(5)?,
        unallocated: row.get(6)?,
        message: row.get(7)?,
        placements_json: serde_json::from_str(&placements_json)
            .map_err(|e| invalid_column(8, e))?,
    })
}

fn invalid_column<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
