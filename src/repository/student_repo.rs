// ==========================================
// 宿舍管理系统 - 学生数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::allocation::AllocationCriteria;
use crate::domain::student::Student;
use crate::domain::types::Gender;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::StudentRepository;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const STUDENT_COLUMNS: &str = "id, student_id, full_name, gender, department, year, room_id";

// ==========================================
// SqliteStudentRepository - 学生仓储
// ==========================================
pub struct SqliteStudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStudentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增学生（导入/初始化数据用，不属于分配引擎写路径）
    pub fn insert(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO student (id, student_id, full_name, gender, department, year, room_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                student.id,
                student.student_id,
                student.full_name,
                student.gender.map(|g| g.to_db_str()),
                student.department,
                i64::from(student.year),
                student.room_id,
            ],
        )?;
        Ok(())
    }
}

impl StudentRepository for SqliteStudentRepository {
    fn find_unassigned(&self, criteria: &AllocationCriteria) -> RepositoryResult<Vec<Student>> {
        let conn = self.get_conn()?;

        // 已被某房间登记为住户的学生同样视为已分配（学生侧写入可能尚未完成）
        let mut sql = format!(
            r#"
            SELECT {} FROM student
            WHERE room_id IS NULL
              AND id NOT IN (SELECT student_id FROM room_occupant)
            "#,
            STUDENT_COLUMNS
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(department) = &criteria.department {
            values.push(Value::Text(department.clone()));
            sql.push_str(&format!(" AND department = ?{}", values.len()));
        }
        if let Some(year) = criteria.year {
            values.push(Value::Integer(i64::from(year)));
            sql.push_str(&format!(" AND year = ?{}", values.len()));
        }
        if let Some(gender) = criteria.gender {
            values.push(Value::Text(gender.to_db_str().to_string()));
            sql.push_str(&format!(" AND TRIM(gender) = ?{}", values.len()));
        }

        let mut stmt = conn.prepare(&sql)?;
        let students = stmt
            .query_map(params_from_iter(values.iter()), map_student_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(students)
    }

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM student WHERE id = ?1", STUDENT_COLUMNS);
        let student = conn
            .query_row(&sql, params![id], map_student_row)
            .optional()?;
        Ok(student)
    }

    fn save(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows_affected = conn.execute(
            r#"
            UPDATE student
               SET student_id = ?1, full_name = ?2, gender = ?3,
                   department = ?4, year = ?5, room_id = ?6
             WHERE id = ?7
            "#,
            params![
                student.student_id,
                student.full_name,
                student.gender.map(|g| g.to_db_str()),
                student.department,
                i64::from(student.year),
                student.room_id,
                student.id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: student.id.clone(),
            });
        }

        Ok(())
    }
}

fn map_student_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let gender: Option<String> = row.get(3)?;
    let year: i64 = row.get(5)?;
    Ok(Student {
        id: row.get(0)?,
        student_id: row.get(1)?,
        full_name: row.get(2)?,
        gender: gender.as_deref().and_then(Gender::from_db_str),
        department: row.get(4)?,
        year: u32::try_from(year).unwrap_or(0),
        room_id: row.get(6)?,
    })
}
