// ==========================================
// 宿舍管理系统 - 自动分配 API
// ==========================================
// 职责: 请求校验、运行互斥、调用编排器、写审计日志
// 红线: 每次运行（成功 / 部分失败 / 取消）都写 allocation_log
// ==========================================

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::api::dto::{AllocationRunDto, RunAllocationRequest, RunAllocationResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::config::{AllocationConfigReader, ConfigManager};
use crate::domain::allocation::{AllocationOutcome, AllocationRequest};
use crate::domain::allocation_log::AllocationLog;
use crate::domain::types::AllocationRunOutcome;
use crate::engine::{
    AllocationError, AllocationOrchestrator, AllocationRepositories, CancellationFlag,
};
use crate::repository::AllocationLogRepository;

/// 历史查询默认条数
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ==========================================
// AllocationApi - 自动分配 API
// ==========================================

/// 自动分配API
///
/// 职责：
/// 1. 校验请求（DTO → 领域请求）
/// 2. 进程内运行互斥（同一时刻只允许一个分配任务）
/// 3. 调用编排器并转换结果
/// 4. 写入运行审计日志
pub struct AllocationApi {
    config_manager: Arc<ConfigManager>,
    orchestrator: AllocationOrchestrator<ConfigManager>,
    allocation_log_repo: Arc<AllocationLogRepository>,
    run_lock: AsyncMutex<()>,
}

impl AllocationApi {
    /// 创建新的AllocationApi实例
    pub fn new(
        config_manager: Arc<ConfigManager>,
        repos: AllocationRepositories,
        allocation_log_repo: Arc<AllocationLogRepository>,
    ) -> Self {
        Self {
            orchestrator: AllocationOrchestrator::new(config_manager.clone(), repos),
            config_manager,
            allocation_log_repo,
            run_lock: AsyncMutex::new(()),
        }
    }

    /// 执行自动分配
    ///
    /// # 参数
    /// - request: 分配请求（camelCase DTO）
    /// - actor: 操作人（None 时使用配置的默认操作人）
    pub async fn run_allocation(
        &self,
        request: RunAllocationRequest,
        actor: Option<&str>,
    ) -> ApiResult<RunAllocationResponse> {
        self.run_allocation_with_cancel(request, actor, &CancellationFlag::new())
            .await
    }

    /// 执行自动分配（可取消）
    ///
    /// # 返回
    /// - Ok(RunAllocationResponse): 运行完成
    /// - Err(ApiError::AllocationInProgress): 已有任务在运行
    /// - Err(ApiError::PersistenceFailure / Cancelled): 中断，携带已提交落位
    #[instrument(skip_all, fields(actor = ?actor))]
    pub async fn run_allocation_with_cancel(
        &self,
        request: RunAllocationRequest,
        actor: Option<&str>,
        cancel: &CancellationFlag,
    ) -> ApiResult<RunAllocationResponse> {
        let request = request.to_domain()?;

        let _guard = self.run_lock.try_lock().map_err(|_| {
            warn!("已有分配任务正在运行, 拒绝本次请求");
            ApiError::AllocationInProgress
        })?;

        let actor = match actor.map(str::trim).filter(|a| !a.is_empty()) {
            Some(a) => a.to_string(),
            None => self
                .config_manager
                .get_default_actor()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };

        let result = self.orchestrator.run(&request, cancel).await;
        self.record_run(&actor, &request, &result).await;

        let outcome = result?;
        Ok(RunAllocationResponse::from(&outcome))
    }

    /// 查询最近的分配运行记录（时间倒序）
    pub fn list_recent_runs(&self, limit: usize) -> ApiResult<Vec<AllocationRunDto>> {
        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let logs = self.allocation_log_repo.find_recent(limit)?;
        Ok(logs.into_iter().map(AllocationRunDto::from).collect())
    }

    /// 查询单次分配运行记录
    pub fn get_run(&self, run_id: &str) -> ApiResult<AllocationRunDto> {
        self.allocation_log_repo
            .find_by_id(run_id)?
            .map(AllocationRunDto::from)
            .ok_or_else(|| ApiError::NotFound(format!("分配运行(run_id={})不存在", run_id)))
    }

    // ==========================================
    // 审计日志
    // ==========================================

    /// 写入运行日志；失败只告警，不影响已生效的分配结果
    async fn record_run(
        &self,
        actor: &str,
        request: &AllocationRequest,
        result: &Result<AllocationOutcome, AllocationError>,
    ) {
        let enabled = match self.config_manager.is_audit_log_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(error = %e, "读取审计开关失败, 按开启处理");
                true
            }
        };
        if !enabled {
            return;
        }

        let log = match result {
            Ok(outcome) => AllocationLog::new(
                actor,
                request,
                AllocationRunOutcome::Success,
                &outcome.placements(),
                outcome.unallocated(),
                outcome.message.clone(),
            ),
            Err(err @ AllocationError::Cancelled { .. }) => AllocationLog::new(
                actor,
                request,
                AllocationRunOutcome::Cancelled,
                err.committed(),
                err.unallocated(),
                err.to_string(),
            ),
            Err(err) => AllocationLog::new(
                actor,
                request,
                AllocationRunOutcome::PartialFailure,
                err.committed(),
                err.unallocated(),
                err.to_string(),
            ),
        };

        match self.allocation_log_repo.insert(&log) {
            Ok(run_id) => info!(
                run_id = %run_id,
                outcome = %log.outcome,
                allocated = log.allocated,
                "分配运行日志已记录"
            ),
            Err(e) => warn!(error = %e, "分配运行日志写入失败"),
        }
    }
}
