// ==========================================
// 宿舍管理系统 - AllocationApi DTO 定义
// ==========================================
// 职责: 定义自动分配的请求和响应结构
// 字段命名: camelCase（与前端/调用方约定一致）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::allocation::{
    AllocationCriteria, AllocationOutcome, AllocationRequest, AllocationTarget, PlacementRecord,
};
use crate::domain::allocation_log::AllocationLog;
use crate::domain::types::Gender;
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

/// 学生过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// 年级（>= 1）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,

    /// 性别 ("M" | "F")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// 自动分配请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAllocationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<CriteriaDto>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_building: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_block: Option<String>,
}

impl RunAllocationRequest {
    /// 校验并转换为领域请求
    ///
    /// 规则:
    /// - 空白字符串视为未指定
    /// - gender 只接受 M / F
    /// - year 必须 >= 1
    pub fn to_domain(&self) -> ApiResult<AllocationRequest> {
        let criteria = match &self.criteria {
            None => AllocationCriteria::default(),
            Some(c) => AllocationCriteria {
                department: non_blank(c.department.as_deref()),
                year: parse_year(c.year)?,
                gender: parse_gender(c.gender.as_deref())?,
            },
        };

        Ok(AllocationRequest {
            criteria,
            target: AllocationTarget {
                building: non_blank(self.target_building.as_deref()),
                block: non_blank(self.target_block.as_deref()),
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_year(year: Option<i64>) -> ApiResult<Option<u32>> {
    match year {
        None => Ok(None),
        Some(y) if (1..=i64::from(u32::MAX)).contains(&y) => Ok(Some(y as u32)),
        Some(y) => Err(ApiError::InvalidInput(format!(
            "year 必须为正整数, 实际为 {}",
            y
        ))),
    }
}

fn parse_gender(gender: Option<&str>) -> ApiResult<Option<Gender>> {
    match non_blank(gender) {
        None => Ok(None),
        Some(g) => Gender::from_db_str(&g).map(Some).ok_or_else(|| {
            ApiError::InvalidInput(format!("gender 只接受 M 或 F, 实际为 '{}'", g))
        }),
    }
}

// ==========================================
// 响应
// ==========================================

/// 单条落位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDto {
    pub student_id: String,
    pub full_name: String,
    pub room: String,
    pub year: u32,
    pub department: String,
}

impl From<&PlacementRecord> for AllocationDto {
    fn from(record: &PlacementRecord) -> Self {
        Self {
            student_id: record.student_id.clone(),
            full_name: record.full_name.clone(),
            room: record.room.clone(),
            year: record.year,
            department: record.department.clone(),
        }
    }
}

/// 分配明细
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDetailsDto {
    pub males_allocated: usize,
    pub females_allocated: usize,
    pub unallocated_males: usize,
    pub unallocated_females: usize,

    /// 性别无法识别、未进入候选池的学生数
    pub excluded_students: usize,

    pub allocations: Vec<AllocationDto>,
}

/// 自动分配响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAllocationResponse {
    pub success: bool,
    pub message: String,
    pub allocated: usize,
    pub unallocated: usize,
    pub details: AllocationDetailsDto,
}

impl From<&AllocationOutcome> for RunAllocationResponse {
    fn from(outcome: &AllocationOutcome) -> Self {
        let allocations = outcome
            .male
            .placements
            .iter()
            .chain(outcome.female.placements.iter())
            .map(AllocationDto::from)
            .collect();

        Self {
            success: true,
            message: outcome.message.clone(),
            allocated: outcome.allocated(),
            unallocated: outcome.unallocated(),
            details: AllocationDetailsDto {
                males_allocated: outcome.male.allocated,
                females_allocated: outcome.female.allocated,
                unallocated_males: outcome.male.unallocated(),
                unallocated_females: outcome.female.unallocated(),
                excluded_students: outcome.excluded,
                allocations,
            },
        }
    }
}

// ==========================================
// 运行历史
// ==========================================

/// 分配运行记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRunDto {
    pub run_id: String,
    pub run_ts: String, // ISO 8601
    pub actor: String,
    pub outcome: String,
    pub allocated: i64,
    pub unallocated: i64,
    pub message: String,
    pub request: serde_json::Value,
    pub placements: serde_json::Value,
}

impl From<AllocationLog> for AllocationRunDto {
    fn from(log: AllocationLog) -> Self {
        Self {
            run_id: log.run_id,
            run_ts: log.run_ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            actor: log.actor,
            outcome: log.outcome.to_db_str().to_string(),
            allocated: log.allocated,
            unallocated: log.unallocated,
            message: log.message,
            request: log.request_json,
            placements: log.placements_json,
        }
    }
}
