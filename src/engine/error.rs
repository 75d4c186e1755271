// ==========================================
// 宿舍管理系统 - 引擎层错误类型
// ==========================================
// 语义: 至少一次（at-least-once），不做跨房间回滚
// 已提交的落位随错误一并返回
// ==========================================

use crate::domain::allocation::PlacementRecord;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 分配运行错误
#[derive(Error, Debug)]
pub enum AllocationError {
    /// 仓储读取/写入失败，committed 为失败前已生效的落位
    /// unallocated 为中断时仍未落位的候选人数
    #[error("持久化失败 (已提交 {} 条落位): {source}", .committed.len())]
    Persistence {
        source: RepositoryError,
        committed: Vec<PlacementRecord>,
        unallocated: usize,
    },

    /// 在房间边界被取消
    #[error("分配已取消 (已提交 {} 条落位)", .committed.len())]
    Cancelled {
        committed: Vec<PlacementRecord>,
        unallocated: usize,
    },

    #[error("配置读取失败: {0}")]
    Config(String),
}

impl AllocationError {
    /// 失败前已生效的落位
    pub fn committed(&self) -> &[PlacementRecord] {
        match self {
            AllocationError::Persistence { committed, .. } => committed,
            AllocationError::Cancelled { committed, .. } => committed,
            AllocationError::Config(_) => &[],
        }
    }

    /// 中断时仍未落位的候选人数（性别无法识别者不计入）
    pub fn unallocated(&self) -> usize {
        match self {
            AllocationError::Persistence { unallocated, .. } => *unallocated,
            AllocationError::Cancelled { unallocated, .. } => *unallocated,
            AllocationError::Config(_) => 0,
        }
    }

    /// 尚未产生落位时的仓储失败
    pub(crate) fn persistence(source: RepositoryError, candidates: usize) -> Self {
        AllocationError::Persistence {
            source,
            committed: Vec::new(),
            unallocated: candidates,
        }
    }
}

pub type AllocationResult<T> = Result<T, AllocationError>;
