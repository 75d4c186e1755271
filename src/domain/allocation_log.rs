// ==========================================
// 宿舍管理系统 - 分配运行审计日志
// ==========================================
// 红线: 每次自动分配运行都必须可追溯（成功 / 部分失败 / 取消）
// 对齐: allocation_log 表
// ==========================================

use crate::domain::allocation::{AllocationRequest, PlacementRecord};
use crate::domain::types::AllocationRunOutcome;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// AllocationLog - 分配运行日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLog {
    pub run_id: String,                // 运行ID (uuid v4)
    pub run_ts: NaiveDateTime,         // 运行时间
    pub actor: String,                 // 操作人
    pub request_json: JsonValue,       // 请求参数
    pub outcome: AllocationRunOutcome, // 运行结果
    pub allocated: i64,                // 已分配人数（已提交）
    pub unallocated: i64,              // 未分配人数
    pub message: String,               // 说明 / 错误信息
    pub placements_json: JsonValue,    // 已提交的落位记录
}

impl AllocationLog {
    /// 根据运行结果构造日志（生成新的 run_id 与时间戳）
    pub fn new(
        actor: &str,
        request: &AllocationRequest,
        outcome: AllocationRunOutcome,
        placements: &[PlacementRecord],
        unallocated: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            run_ts: Utc::now().naive_utc(),
            actor: actor.to_string(),
            request_json: serde_json::to_value(request).unwrap_or(JsonValue::Null),
            outcome,
            allocated: placements.len() as i64,
            unallocated: unallocated as i64,
            message: message.into(),
            placements_json: serde_json::to_value(placements)
                .unwrap_or_else(|_| JsonValue::Array(Vec::new())),
        }
    }
}
