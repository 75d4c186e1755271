// ==========================================
// 宿舍管理系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合分配引擎所需的 Repository，并实现单间房提交
// ==========================================

use std::sync::Arc;

use crate::domain::room::Room;
use crate::domain::student::Student;
use crate::engine::bin_filler::{CommitError, RoomCommitter};
use crate::repository::{RepositoryError, RoomRepository, StudentRepository};

/// 分配引擎仓储集合
///
/// 以 trait object 持有，便于测试时替换为内存实现或注入故障
#[derive(Clone)]
pub struct AllocationRepositories {
    /// 学生仓储
    pub student_repo: Arc<dyn StudentRepository>,
    /// 房间仓储
    pub room_repo: Arc<dyn RoomRepository>,
}

impl AllocationRepositories {
    pub fn new(
        student_repo: Arc<dyn StudentRepository>,
        room_repo: Arc<dyn RoomRepository>,
    ) -> Self {
        Self {
            student_repo,
            room_repo,
        }
    }

    pub fn student_repo(&self) -> &Arc<dyn StudentRepository> {
        &self.student_repo
    }

    pub fn room_repo(&self) -> &Arc<dyn RoomRepository> {
        &self.room_repo
    }
}

impl RoomCommitter for AllocationRepositories {
    /// 提交顺序:
    /// 1) 房间（住户集合 + 状态 + revision 检查，单事务）
    /// 2) 逐个学生写入房间引用
    ///
    /// 第 1 步失败时本房间无任何写入；第 2 步失败时房间侧已生效
    fn commit_room(&self, room: &Room, placed: &[Student]) -> Result<(), CommitError> {
        self.room_repo.save(room).map_err(CommitError::before_room)?;

        for student in placed {
            let mut assigned = student.clone();
            assigned.assign_to(&room.id);
            self.student_repo
                .save(&assigned)
                .map_err(CommitError::after_room)?;
        }

        Ok(())
    }

    fn reload_room(&self, room_id: &str) -> Result<Option<Room>, RepositoryError> {
        self.room_repo.find_by_id(room_id)
    }
}
