// ==========================================
// 宿舍管理系统 - 床位填充引擎
// ==========================================
// 红线: 逐间填满，前一间房有空位时不得向后一间房安排学生
// ==========================================
// 职责: 单一性别队列的贪心填充
// 输入: 排序后学生列表 + 排序后房间列表（同性别）
// 输出: 落位记录 + 每间房提交后的住户/状态
// ==========================================

use crate::domain::allocation::{CohortOutcome, PlacementRecord};
use crate::domain::room::Room;
use crate::domain::student::Student;
use crate::domain::types::Gender;
use crate::engine::cancellation::CancellationFlag;
use crate::repository::error::RepositoryError;
use tracing::{debug, info, instrument, warn};

/// 乐观锁冲突默认重试次数
pub const DEFAULT_CONFLICT_RETRY_LIMIT: u32 = 3;

// ==========================================
// RoomCommitter - 单间房提交接口
// ==========================================
// 用途: 让填充引擎与存储解耦
// 实现者: AllocationRepositories
pub trait RoomCommitter {
    /// 提交一间房的填充结果（房间住户+状态，以及每个学生的房间引用）
    fn commit_room(&self, room: &Room, placed: &[Student]) -> Result<(), CommitError>;

    /// 重新读取房间（乐观锁冲突后使用）
    fn reload_room(&self, room_id: &str) -> Result<Option<Room>, RepositoryError>;
}

/// 单间房提交失败
#[derive(Debug)]
pub struct CommitError {
    pub source: RepositoryError,

    // 房间侧是否已提交（已提交时该房间的落位视为生效）
    pub room_committed: bool,
}

impl CommitError {
    pub fn before_room(source: RepositoryError) -> Self {
        Self {
            source,
            room_committed: false,
        }
    }

    pub fn after_room(source: RepositoryError) -> Self {
        Self {
            source,
            room_committed: true,
        }
    }

    /// 可重试: 房间侧尚未提交且为乐观锁冲突
    pub fn is_retryable_conflict(&self) -> bool {
        !self.room_committed && self.source.is_conflict()
    }
}

/// 队列填充中断原因
#[derive(Debug)]
pub enum CohortError {
    Persistence(RepositoryError),
    Cancelled,
}

/// 队列填充失败（outcome 为已提交前缀）
#[derive(Debug)]
pub struct CohortFailure {
    pub error: CohortError,
    pub outcome: CohortOutcome,
}

/// 单间房处理结果
enum RoomFill {
    Skipped,
    // consumed: 游标前移量（含已是该房间住户而跳过的学生）
    Filled {
        room: Room,
        placed: Vec<Student>,
        consumed: usize,
    },
}

// ==========================================
// BinFiller - 床位填充引擎
// ==========================================
pub struct BinFiller {
    conflict_retry_limit: u32,
}

impl BinFiller {
    pub fn new() -> Self {
        Self {
            conflict_retry_limit: DEFAULT_CONFLICT_RETRY_LIMIT,
        }
    }

    pub fn with_conflict_retry_limit(conflict_retry_limit: u32) -> Self {
        Self {
            conflict_retry_limit,
        }
    }

    pub fn conflict_retry_limit(&self) -> u32 {
        self.conflict_retry_limit
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 填充单一性别队列
    ///
    /// 规则:
    /// 1) 学生游标从 0 开始，按顺序遍历房间
    /// 2) 剩余床位 <= 0 的房间直接跳过（不修正状态、不移动游标）
    /// 3) 学生已全部落位时停止遍历
    /// 4) 取 min(剩余床位, 剩余学生) 名学生入住，游标前移
    /// 5) 刷新房间状态（Full / Available）并在处理下一间房前提交
    ///
    /// 取消只在房间边界检查；提交失败时返回已提交前缀
    #[instrument(skip_all, fields(
        gender = %gender,
        students_count = students.len(),
        rooms_count = rooms.len()
    ))]
    pub fn fill_cohort<C>(
        &self,
        gender: Gender,
        students: &[Student],
        rooms: Vec<Room>,
        committer: &C,
        cancel: &CancellationFlag,
    ) -> Result<CohortOutcome, CohortFailure>
    where
        C: RoomCommitter + ?Sized,
    {
        let mut outcome = CohortOutcome::empty(students.len());
        let mut cursor = 0usize;

        for room in rooms {
            if cursor >= students.len() {
                break;
            }
            if cancel.is_cancelled() {
                info!(
                    allocated = outcome.allocated,
                    "分配已取消, 停止在房间边界"
                );
                return Err(CohortFailure {
                    error: CohortError::Cancelled,
                    outcome,
                });
            }

            if !room.gender.accepts(gender) {
                warn!(room_id = %room.id, room_gender = %room.gender, "房间性别与队列不符, 跳过");
                continue;
            }

            let remaining = &students[cursor..];
            match self.fill_room(room, remaining, committer) {
                Ok(RoomFill::Skipped) => {}
                Ok(RoomFill::Filled {
                    room,
                    placed,
                    consumed,
                }) => {
                    if !placed.is_empty() {
                        record_placements(&mut outcome, &room, &placed);
                    }
                    cursor += consumed;
                }
                Err((err, Some((room, placed)))) => {
                    // 房间侧已提交，落位生效
                    record_placements(&mut outcome, &room, &placed);
                    return Err(CohortFailure {
                        error: CohortError::Persistence(err),
                        outcome,
                    });
                }
                Err((err, None)) => {
                    return Err(CohortFailure {
                        error: CohortError::Persistence(err),
                        outcome,
                    });
                }
            }
        }

        info!(
            allocated = outcome.allocated,
            unallocated = outcome.unallocated(),
            rooms_filled = outcome.rooms_filled,
            "性别队列填充完成"
        );

        Ok(outcome)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 填充并提交单间房（含乐观锁冲突重试）
    ///
    /// 错误时附带“房间侧已提交”的填充结果
    fn fill_room<C>(
        &self,
        mut room: Room,
        remaining: &[Student],
        committer: &C,
    ) -> Result<RoomFill, (RepositoryError, Option<(Room, Vec<Student>)>)>
    where
        C: RoomCommitter + ?Sized,
    {
        let mut attempt = 0u32;

        loop {
            let available = room.available_space();
            if available <= 0 {
                debug!(room_id = %room.id, available, "房间无剩余床位, 跳过");
                return Ok(RoomFill::Skipped);
            }

            let (batch, consumed) = take_batch(&room, remaining, available as usize);
            if batch.is_empty() {
                debug!(room_id = %room.id, consumed, "候选学生均已是该房间住户, 无需提交");
                return Ok(RoomFill::Filled {
                    room,
                    placed: batch,
                    consumed,
                });
            }

            let mut filled = room.clone();
            let placed = filled.place(&batch);

            match committer.commit_room(&filled, &batch) {
                Ok(()) => {
                    debug!(
                        room = %filled.label(),
                        placed,
                        status = %filled.status,
                        "房间填充已提交"
                    );
                    return Ok(RoomFill::Filled {
                        room: filled,
                        placed: batch,
                        consumed,
                    });
                }
                Err(err) if err.is_retryable_conflict() && attempt < self.conflict_retry_limit => {
                    attempt += 1;
                    warn!(
                        room_id = %room.id,
                        attempt,
                        error = %err.source,
                        "房间乐观锁冲突, 重新读取后重试"
                    );
                    match committer.reload_room(&room.id).map_err(|e| (e, None))? {
                        Some(fresh) if !fresh.is_under_maintenance() && fresh.gender == room.gender => {
                            room = fresh;
                        }
                        _ => {
                            warn!(room_id = %room.id, "房间已不可分配, 跳过");
                            return Ok(RoomFill::Skipped);
                        }
                    }
                }
                Err(err) => {
                    let committed = err.room_committed.then_some((filled, batch));
                    return Err((err.source, committed));
                }
            }
        }
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for BinFiller {
    fn default() -> Self {
        Self::new()
    }
}

/// 从游标处取本房间的入住批次
///
/// 已是该房间住户的学生（冲突重读后可见）不占床位，只推进游标
/// # 返回
/// - (入住批次, 游标前移量)
fn take_batch(room: &Room, remaining: &[Student], available: usize) -> (Vec<Student>, usize) {
    let mut batch = Vec::with_capacity(available.min(remaining.len()));
    let mut consumed = 0usize;

    for student in remaining {
        if batch.len() >= available {
            break;
        }
        consumed += 1;
        if room.has_occupant(&student.id) {
            debug!(student_id = %student.id, room_id = %room.id, "学生已是该房间住户, 跳过");
            continue;
        }
        batch.push(student.clone());
    }

    (batch, consumed)
}

fn record_placements(outcome: &mut CohortOutcome, room: &Room, placed: &[Student]) {
    let label = room.label();
    outcome.placements.extend(placed.iter().map(|s| PlacementRecord {
        student_id: s.student_id.clone(),
        full_name: s.full_name.clone(),
        year: s.year,
        department: s.department.clone(),
        room: label.clone(),
    }));
    outcome.allocated += placed.len();
    outcome.rooms_filled += 1;
}
