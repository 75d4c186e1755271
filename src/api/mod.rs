// ==========================================
// 宿舍管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行/上层服务调用
// ==========================================

pub mod allocation_api;
pub mod dto;
pub mod error;

// 重导出核心类型
pub use allocation_api::{AllocationApi, DEFAULT_HISTORY_LIMIT};
pub use dto::{
    AllocationDetailsDto, AllocationDto, AllocationRunDto, CriteriaDto, RunAllocationRequest,
    RunAllocationResponse,
};
pub use error::{ApiError, ApiResult};
