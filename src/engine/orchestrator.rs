// ==========================================
// 宿舍管理系统 - 分配编排器
// ==========================================
// 主流程: 查询学生 → 性别分区 + 排序 → 查询房间 → 逐队列填充 → 汇总
// 语义: 单次运行顺序执行；逐间提交，不做跨房间回滚
// ==========================================

use crate::config::AllocationConfigReader;
use crate::domain::allocation::{AllocationOutcome, AllocationRequest, CohortOutcome};
use crate::domain::room::Room;
use crate::domain::types::Gender;
use crate::engine::bin_filler::{BinFiller, CohortError, CohortFailure};
use crate::engine::cancellation::CancellationFlag;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::ordering::OrderingPolicy;
use crate::engine::partitioner::GenderPartitioner;
use crate::engine::repositories::AllocationRepositories;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 没有候选学生时的提示
pub const NO_CANDIDATES_MESSAGE: &str = "没有符合条件的未分配学生";

// ==========================================
// AllocationOrchestrator - 分配编排器
// ==========================================
pub struct AllocationOrchestrator<C>
where
    C: AllocationConfigReader,
{
    config: Arc<C>,
    repos: AllocationRepositories,
    ordering: OrderingPolicy,
    partitioner: GenderPartitioner,
}

impl<C> AllocationOrchestrator<C>
where
    C: AllocationConfigReader,
{
    /// 创建新的编排器实例
    pub fn new(config: Arc<C>, repos: AllocationRepositories) -> Self {
        Self {
            config,
            repos,
            ordering: OrderingPolicy::new(),
            partitioner: GenderPartitioner::new(),
        }
    }

    /// 执行一次自动分配
    ///
    /// # 返回
    /// - Ok: 运行完成（unallocated > 0 属正常结果）
    /// - Err(Persistence): 仓储失败，已提交前缀随错误返回，不回滚
    /// - Err(Cancelled): 在房间边界被取消
    #[instrument(skip_all, fields(
        department = ?request.criteria.department,
        year = ?request.criteria.year,
        gender = ?request.criteria.gender,
        building = ?request.target.building,
        block = ?request.target.block
    ))]
    pub async fn run(
        &self,
        request: &AllocationRequest,
        cancel: &CancellationFlag,
    ) -> AllocationResult<AllocationOutcome> {
        let retry_limit = self
            .config
            .get_conflict_retry_limit()
            .await
            .map_err(|e| AllocationError::Config(e.to_string()))?;
        let filler = BinFiller::with_conflict_retry_limit(retry_limit);

        // ==========================================
        // 步骤1: 查询未分配学生
        // ==========================================
        let students = self
            .repos
            .student_repo
            .find_unassigned(&request.criteria)
            .map_err(|e| AllocationError::persistence(e, 0))?;

        if students.is_empty() {
            info!("没有候选学生, 跳过分配");
            return Ok(AllocationOutcome {
                message: NO_CANDIDATES_MESSAGE.to_string(),
                ..AllocationOutcome::default()
            });
        }

        // ==========================================
        // 步骤2: 性别分区 + 学生排序
        // ==========================================
        let mut cohorts = self.partitioner.partition_students(students);
        let male_students = self.ordering.order_students(cohorts.take(Gender::Male));
        let female_students = self.ordering.order_students(cohorts.take(Gender::Female));
        let candidates = male_students.len() + female_students.len();

        // ==========================================
        // 步骤3: 按性别查询候选房间 + 排序
        // ==========================================
        let male_rooms = self.fetch_room_cohort(Gender::Male, request, candidates)?;
        let female_rooms = self.fetch_room_cohort(Gender::Female, request, candidates)?;
        let male_rooms = self.ordering.order_rooms(male_rooms);
        let female_rooms = self.ordering.order_rooms(female_rooms);

        info!(
            male_candidates = male_students.len(),
            female_candidates = female_students.len(),
            excluded = cohorts.excluded.len(),
            male_rooms = male_rooms.len(),
            female_rooms = female_rooms.len(),
            "候选池准备完成"
        );

        // ==========================================
        // 步骤4: 逐队列填充（男生 → 女生，房间集合互不相交）
        // ==========================================
        debug!("步骤4: 填充男生队列");
        let male = filler
            .fill_cohort(Gender::Male, &male_students, male_rooms, &self.repos, cancel)
            .map_err(|failure| into_allocation_error(&[], failure, candidates))?;

        debug!("步骤4: 填充女生队列");
        let female = filler
            .fill_cohort(Gender::Female, &female_students, female_rooms, &self.repos, cancel)
            .map_err(|failure| into_allocation_error(&[&male], failure, candidates))?;

        // ==========================================
        // 步骤5: 汇总
        // ==========================================
        let mut outcome = AllocationOutcome {
            message: String::new(),
            male,
            female,
            excluded: cohorts.excluded.len(),
        };
        outcome.message = format!(
            "自动分配完成: 已分配 {} 人, 未分配 {} 人",
            outcome.allocated(),
            outcome.unallocated()
        );

        info!(
            allocated = outcome.allocated(),
            unallocated = outcome.unallocated(),
            excluded = outcome.excluded,
            "自动分配完成"
        );

        Ok(outcome)
    }

    /// 查询并筛选单一性别的候选房间
    fn fetch_room_cohort(
        &self,
        gender: Gender,
        request: &AllocationRequest,
        candidates: usize,
    ) -> AllocationResult<Vec<Room>> {
        let rooms = self
            .repos
            .room_repo
            .find_candidates(
                gender,
                request.target.building.as_deref(),
                request.target.block.as_deref(),
            )
            .map_err(|e| AllocationError::persistence(e, candidates))?;

        Ok(self.partitioner.room_cohort(gender, rooms))
    }
}

/// 队列失败 → 运行错误（合并此前已完成队列的落位）
///
/// candidates 为本次运行两个性别队列的候选总数，未落位数 = 候选总数 - 已提交数
fn into_allocation_error(
    done: &[&CohortOutcome],
    failure: CohortFailure,
    candidates: usize,
) -> AllocationError {
    let committed: Vec<_> = done
        .iter()
        .flat_map(|o| o.placements.iter().cloned())
        .chain(failure.outcome.placements)
        .collect();
    let unallocated = candidates.saturating_sub(committed.len());

    match failure.error {
        CohortError::Persistence(source) => AllocationError::Persistence {
            source,
            committed,
            unallocated,
        },
        CohortError::Cancelled => AllocationError::Cancelled {
            committed,
            unallocated,
        },
    }
}
