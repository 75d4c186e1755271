// ==========================================
// 宿舍管理系统 - 引擎层
// ==========================================
// 职责: 实现分配规则（排序、性别分区、逐间填充），不拼 SQL
// 红线: 房间只接收同性别学生，前一间房未满不得向后安排
// ==========================================

pub mod bin_filler;
pub mod cancellation;
pub mod error;
pub mod ordering;
pub mod orchestrator;
pub mod partitioner;
pub mod repositories;

// 重导出核心引擎
pub use bin_filler::{
    BinFiller, CohortError, CohortFailure, CommitError, RoomCommitter,
    DEFAULT_CONFLICT_RETRY_LIMIT,
};
pub use cancellation::CancellationFlag;
pub use error::{AllocationError, AllocationResult};
pub use orchestrator::{AllocationOrchestrator, NO_CANDIDATES_MESSAGE};
pub use ordering::{parse_room_number, OrderingPolicy};
pub use partitioner::{GenderPartitioner, StudentCohorts};
pub use repositories::AllocationRepositories;
