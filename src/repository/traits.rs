// ==========================================
// 宿舍管理系统 - 仓储 Trait
// ==========================================
// 职责: 定义分配引擎所需的数据访问接口（不包含业务逻辑）
// 实现者: SqliteStudentRepository / SqliteRoomRepository
// ==========================================

use crate::domain::allocation::AllocationCriteria;
use crate::domain::room::Room;
use crate::domain::student::Student;
use crate::domain::types::Gender;
use crate::repository::error::RepositoryResult;

// ==========================================
// StudentRepository Trait
// ==========================================
pub trait StudentRepository: Send + Sync {
    /// 查询未分配房间、且符合过滤条件的学生
    ///
    /// 返回顺序不作保证（排序由 OrderingPolicy 负责）
    fn find_unassigned(&self, criteria: &AllocationCriteria) -> RepositoryResult<Vec<Student>>;

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>>;

    /// 保存学生（分配引擎只写 room_id）
    fn save(&self, student: &Student) -> RepositoryResult<()>;
}

// ==========================================
// RoomRepository Trait
// ==========================================
pub trait RoomRepository: Send + Sync {
    /// 查询候选房间
    ///
    /// 约束:
    /// - 房间性别严格等于 gender（不含 Co-ed）
    /// - 排除 UnderMaintenance
    /// - 必须带出当前住户列表
    fn find_candidates(
        &self,
        gender: Gender,
        building: Option<&str>,
        block: Option<&str>,
    ) -> RepositoryResult<Vec<Room>>;

    fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Room>>;

    /// 保存房间（住户集合 + 状态在同一事务内写入）
    ///
    /// # 并发控制
    /// 以 room.revision 做乐观锁；不匹配返回 `RepositoryError::OptimisticLockFailure`
    fn save(&self, room: &Room) -> RepositoryResult<()>;
}
