// ==========================================
// 宿舍管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、分配值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod allocation_log;
pub mod room;
pub mod student;
pub mod types;

// 重导出核心类型
pub use allocation::{
    AllocationCriteria, AllocationOutcome, AllocationRequest, AllocationTarget, CohortOutcome,
    PlacementRecord,
};
pub use allocation_log::AllocationLog;
pub use room::Room;
pub use student::Student;
pub use types::{AllocationRunOutcome, Gender, RoomGender, RoomStatus};
