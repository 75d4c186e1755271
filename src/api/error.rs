// ==========================================
// 宿舍管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换仓储/引擎错误为用户可读的错误消息
// 红线: 错误信息必须包含显式原因
// ==========================================

use crate::domain::allocation::PlacementRecord;
use crate::engine::error::AllocationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("已有分配任务正在运行，请稍后重试")]
    AllocationInProgress,

    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 分配运行错误（携带已提交落位）
    // ==========================================
    #[error("分配中断 (已提交 {} 条落位): {message}", .committed.len())]
    PersistenceFailure {
        message: String,
        committed: Vec<PlacementRecord>,
    },

    #[error("分配已取消 (已提交 {} 条落位)", .committed.len())]
    Cancelled { committed: Vec<PlacementRecord> },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 中断前已生效的落位（非分配运行错误返回空）
    pub fn committed(&self) -> &[PlacementRecord] {
        match self {
            ApiError::PersistenceFailure { committed, .. } => committed,
            ApiError::Cancelled { committed } => committed,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "{}({})已被其他操作修改（期望revision={}，实际revision={}）",
                entity, id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Persistence { source, committed, .. } => ApiError::PersistenceFailure {
                message: source.to_string(),
                committed,
            },
            AllocationError::Cancelled { committed, .. } => ApiError::Cancelled { committed },
            AllocationError::Config(msg) => ApiError::ConfigError(msg),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(student_id: &str) -> PlacementRecord {
        PlacementRecord {
            student_id: student_id.to_string(),
            full_name: "Amy".to_string(),
            year: 1,
            department: "CS".to_string(),
            room: "BuildingX-101".to_string(),
        }
    }

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "Room".to_string(),
            id: "R001".to_string(),
        }
        .into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Room"));
                assert!(msg.contains("R001"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::OptimisticLockFailure {
            entity: "Room".to_string(),
            id: "R001".to_string(),
            expected: 1,
            actual: 2,
        }
        .into();
        match api_err {
            ApiError::OptimisticLockFailure(msg) => {
                assert!(msg.contains("R001"));
                assert!(msg.contains("已被其他操作修改"));
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_lock_error_maps_to_connection_error() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        match api_err {
            ApiError::DatabaseConnectionError(msg) => assert!(msg.contains("poisoned")),
            other => panic!("Expected DatabaseConnectionError, got {:?}", other),
        }
    }

    #[test]
    fn test_allocation_error_keeps_committed_prefix() {
        let api_err: ApiError = AllocationError::Persistence {
            source: RepositoryError::DatabaseQueryError("disk I/O error".to_string()),
            committed: vec![record("S001"), record("S002")],
            unallocated: 1,
        }
        .into();

        assert_eq!(api_err.committed().len(), 2);
        assert!(api_err.to_string().contains("已提交 2 条落位"));
        assert!(api_err.to_string().contains("disk I/O error"));

        let api_err: ApiError = AllocationError::Cancelled {
            committed: vec![record("S001")],
            unallocated: 0,
        }
        .into();
        assert!(matches!(api_err, ApiError::Cancelled { .. }));
        assert_eq!(api_err.committed().len(), 1);
    }

    #[test]
    fn test_non_run_errors_have_no_committed() {
        let api_err = ApiError::InvalidInput("gender".to_string());
        assert!(api_err.committed().is_empty());
        assert!(ApiError::AllocationInProgress.committed().is_empty());
    }
}
