// ==========================================
// 宿舍管理系统 - 房间数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: room.revision 乐观锁
// ==========================================

use crate::domain::room::Room;
use crate::domain::types::{Gender, RoomGender, RoomStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::RoomRepository;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::warn;

const ROOM_COLUMNS: &str =
    "id, building, block, floor, room_number, capacity, gender, status, revision";

/// 数据库原始行（性别/状态尚未解析）
struct RoomRow {
    id: String,
    building: String,
    block: Option<String>,
    floor: i32,
    room_number: String,
    capacity: i64,
    gender: String,
    status: String,
    revision: i64,
}

// ==========================================
// SqliteRoomRepository - 房间仓储
// ==========================================
pub struct SqliteRoomRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRoomRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增房间（含初始住户）
    pub fn insert(&self, room: &Room) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO room (id, building, block, floor, room_number, capacity, gender, status, revision)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                room.id,
                room.building,
                room.block,
                room.floor,
                room.room_number,
                i64::from(room.capacity),
                room.gender.to_db_str(),
                room.status.to_db_str(),
                room.revision,
            ],
        )?;
        for student_id in &room.occupants {
            tx.execute(
                "INSERT INTO room_occupant (room_id, student_id) VALUES (?1, ?2)",
                params![room.id, student_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 查询全部房间（含维修中、含混住），按ID排序
    pub fn find_all(&self) -> RepositoryResult<Vec<Room>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM room ORDER BY id", ROOM_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_room_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        load_rooms(&conn, rows)
    }
}

impl RoomRepository for SqliteRoomRepository {
    fn find_candidates(
        &self,
        gender: Gender,
        building: Option<&str>,
        block: Option<&str>,
    ) -> RepositoryResult<Vec<Room>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            "SELECT {} FROM room WHERE gender = ?1 AND status != ?2",
            ROOM_COLUMNS
        );
        let mut values: Vec<Value> = vec![
            Value::Text(RoomGender::from(gender).to_db_str().to_string()),
            Value::Text(RoomStatus::UnderMaintenance.to_db_str().to_string()),
        ];

        if let Some(building) = building {
            values.push(Value::Text(building.to_string()));
            sql.push_str(&format!(" AND building = ?{}", values.len()));
        }
        if let Some(block) = block {
            values.push(Value::Text(block.to_string()));
            sql.push_str(&format!(" AND block = ?{}", values.len()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_room_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        load_rooms(&conn, rows)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Room>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM room WHERE id = ?1", ROOM_COLUMNS);
        let row = conn.query_row(&sql, params![id], map_room_row).optional()?;

        match row {
            Some(row) => Ok(load_rooms(&conn, vec![row])?.into_iter().next()),
            None => Ok(None),
        }
    }

    fn save(&self, room: &Room) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 带 revision 检查的更新
        let rows_affected = tx.execute(
            r#"
            UPDATE room
               SET building = ?1, block = ?2, floor = ?3, room_number = ?4,
                   capacity = ?5, gender = ?6, status = ?7, revision = revision + 1
             WHERE id = ?8 AND revision = ?9
            "#,
            params![
                room.building,
                room.block,
                room.floor,
                room.room_number,
                i64::from(room.capacity),
                room.gender.to_db_str(),
                room.status.to_db_str(),
                room.id,
                room.revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是revision冲突
            let actual: Option<i64> = tx
                .query_row(
                    "SELECT revision FROM room WHERE id = ?1",
                    params![room.id],
                    |row| row.get(0),
                )
                .optional()?;

            return Err(match actual {
                Some(actual) => RepositoryError::OptimisticLockFailure {
                    entity: "Room".to_string(),
                    id: room.id.clone(),
                    expected: room.revision,
                    actual,
                },
                None => RepositoryError::NotFound {
                    entity: "Room".to_string(),
                    id: room.id.clone(),
                },
            });
        }

        // 住户集合整体替换
        tx.execute(
            "DELETE FROM room_occupant WHERE room_id = ?1",
            params![room.id],
        )?;
        for student_id in &room.occupants {
            tx.execute(
                "INSERT INTO room_occupant (room_id, student_id) VALUES (?1, ?2)",
                params![room.id, student_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn map_room_row(row: &Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        building: row.get(1)?,
        block: row.get(2)?,
        floor: row.get(3)?,
        room_number: row.get(4)?,
        capacity: row.get(5)?,
        gender: row.get(6)?,
        status: row.get(7)?,
        revision: row.get(8)?,
    })
}

/// 解析原始行并带出住户
///
/// 性别/状态无法识别的房间直接跳过（记录告警），不中断查询
fn load_rooms(conn: &Connection, rows: Vec<RoomRow>) -> RepositoryResult<Vec<Room>> {
    let mut stmt =
        conn.prepare("SELECT student_id FROM room_occupant WHERE room_id = ?1 ORDER BY student_id")?;

    let mut rooms = Vec::with_capacity(rows.len());
    for row in rows {
        let (gender, status) = match (
            RoomGender::from_db_str(&row.gender),
            RoomStatus::from_db_str(&row.status),
        ) {
            (Some(gender), Some(status)) => (gender, status),
            _ => {
                warn!(
                    room_id = %row.id,
                    gender = %row.gender,
                    status = %row.status,
                    "房间性别或状态无法识别, 已跳过"
                );
                continue;
            }
        };

        let occupants = stmt
            .query_map(params![row.id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rooms.push(Room {
            id: row.id,
            building: row.building,
            block: row.block,
            floor: row.floor,
            room_number: row.room_number,
            capacity: u32::try_from(row.capacity).unwrap_or(0),
            gender,
            status,
            occupants,
            revision: row.revision,
        });
    }

    Ok(rooms)
}
