// ==========================================
// 宿舍管理系统 - 领域类型定义
// ==========================================
// 职责: 性别 / 房间性别 / 房间状态 / 分配运行结果 枚举
// 序列化格式: 与数据库存储值一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 学生性别 (Gender)
// ==========================================
// 红线: 分配中唯一的硬约束, 两个性别队列绝不混住
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// 从数据库字符串解析
    ///
    /// 无法识别的值返回 None（调用方将其排除出候选池，不视为错误）
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value.trim() {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 房间性别 (Room Gender)
// ==========================================
// 注意: Co-ed 为合法取值，但分配引擎只按 M / F 查询房间，混住房间不参与自动分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomGender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "Co-ed")]
    CoEd,
}

impl RoomGender {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RoomGender::Male => "M",
            RoomGender::Female => "F",
            RoomGender::CoEd => "Co-ed",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value.trim() {
            "M" => Some(RoomGender::Male),
            "F" => Some(RoomGender::Female),
            "Co-ed" => Some(RoomGender::CoEd),
            _ => None,
        }
    }

    /// 房间是否可以接纳指定性别的学生
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            RoomGender::CoEd => true,
            RoomGender::Male => gender == Gender::Male,
            RoomGender::Female => gender == Gender::Female,
        }
    }
}

impl From<Gender> for RoomGender {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => RoomGender::Male,
            Gender::Female => RoomGender::Female,
        }
    }
}

impl fmt::Display for RoomGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 房间状态 (Room Status)
// ==========================================
// 不变式: status == Full 当且仅当 occupants.len() >= capacity
// 维修中的房间无论容量如何都不参与分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    Full,
    UnderMaintenance,
}

impl RoomStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "Available",
            RoomStatus::Full => "Full",
            RoomStatus::UnderMaintenance => "UnderMaintenance",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value.trim() {
            "Available" => Some(RoomStatus::Available),
            "Full" => Some(RoomStatus::Full),
            "UnderMaintenance" => Some(RoomStatus::UnderMaintenance),
            _ => None,
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 分配运行结果类型 (审计日志)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationRunOutcome {
    Success,        // 正常完成（可能存在未分配学生）
    PartialFailure, // 持久化失败，已提交前缀保留
    Cancelled,      // 在房间边界被取消
}

impl AllocationRunOutcome {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AllocationRunOutcome::Success => "SUCCESS",
            AllocationRunOutcome::PartialFailure => "PARTIAL_FAILURE",
            AllocationRunOutcome::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "SUCCESS" => Some(AllocationRunOutcome::Success),
            "PARTIAL_FAILURE" => Some(AllocationRunOutcome::PartialFailure),
            "CANCELLED" => Some(AllocationRunOutcome::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AllocationRunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
