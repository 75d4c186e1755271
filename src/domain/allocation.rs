// ==========================================
// 宿舍管理系统 - 分配请求与分配结果
// ==========================================
// 瞬态对象，不持久化（审计日志见 allocation_log）
// ==========================================

use crate::domain::types::Gender;
use serde::{Deserialize, Serialize};

// ==========================================
// 分配请求
// ==========================================

/// 学生候选池过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationCriteria {
    pub department: Option<String>,
    pub year: Option<u32>,
    pub gender: Option<Gender>,
}

/// 房间候选池过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTarget {
    pub building: Option<String>,
    pub block: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub criteria: AllocationCriteria,
    pub target: AllocationTarget,
}

// ==========================================
// 分配记录 / 结果
// ==========================================

/// 单条落位记录（审计/展示用），按落位发生顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub student_id: String, // 学号
    pub full_name: String,
    pub year: u32,
    pub department: String,
    pub room: String, // 房间标签
}

/// 单个性别队列的填充结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortOutcome {
    pub candidates: usize,
    pub allocated: usize,
    pub placements: Vec<PlacementRecord>,
    pub rooms_filled: usize,
}

impl CohortOutcome {
    pub fn empty(candidates: usize) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn unallocated(&self) -> usize {
        self.candidates.saturating_sub(self.allocated)
    }
}

/// 一次分配运行的汇总结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub message: String,
    pub male: CohortOutcome,
    pub female: CohortOutcome,

    // 因性别缺失/无法识别而被排除的学生数（不计入 unallocated）
    pub excluded: usize,
}

impl AllocationOutcome {
    pub fn allocated(&self) -> usize {
        self.male.allocated + self.female.allocated
    }

    pub fn unallocated(&self) -> usize {
        self.male.unallocated() + self.female.unallocated()
    }

    /// 全部落位记录（男生队列在前，女生队列在后）
    pub fn placements(&self) -> Vec<PlacementRecord> {
        self.male
            .placements
            .iter()
            .chain(self.female.placements.iter())
            .cloned()
            .collect()
    }
}
