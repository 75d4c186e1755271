// ==========================================
// 宿舍管理系统 - 性别分区器
// ==========================================
// 红线: 男女队列互不混合（本领域唯一硬约束）
// 输入: 候选学生池 / 候选房间池
// 输出: 按性别拆分的队列（性别无法识别的学生被排除，不视为错误）
// ==========================================

use crate::domain::room::Room;
use crate::domain::student::Student;
use crate::domain::types::{Gender, RoomGender};
use tracing::{debug, warn};

/// 学生性别队列
#[derive(Debug, Clone, Default)]
pub struct StudentCohorts {
    pub male: Vec<Student>,
    pub female: Vec<Student>,

    // 性别缺失/无法识别，留在未分配状态
    pub excluded: Vec<Student>,
}

impl StudentCohorts {
    pub fn cohort(&self, gender: Gender) -> &[Student] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    pub fn take(&mut self, gender: Gender) -> Vec<Student> {
        match gender {
            Gender::Male => std::mem::take(&mut self.male),
            Gender::Female => std::mem::take(&mut self.female),
        }
    }
}

// ==========================================
// GenderPartitioner - 性别分区器
// ==========================================
pub struct GenderPartitioner {
    // 无状态引擎
}

impl GenderPartitioner {
    pub fn new() -> Self {
        Self {}
    }

    /// 按性别拆分学生池（保持输入相对顺序）
    pub fn partition_students(&self, students: Vec<Student>) -> StudentCohorts {
        let mut cohorts = StudentCohorts::default();

        for student in students {
            match student.gender {
                Some(Gender::Male) => cohorts.male.push(student),
                Some(Gender::Female) => cohorts.female.push(student),
                None => {
                    debug!(
                        student_id = %student.student_id,
                        "学生性别缺失或无法识别, 排除出候选池"
                    );
                    cohorts.excluded.push(student);
                }
            }
        }

        if !cohorts.excluded.is_empty() {
            warn!(
                excluded_count = cohorts.excluded.len(),
                "部分学生因性别无法识别被排除"
            );
        }

        cohorts
    }

    /// 排除维修中的房间
    pub fn exclude_maintenance(&self, rooms: Vec<Room>) -> Vec<Room> {
        rooms
            .into_iter()
            .filter(|room| !room.is_under_maintenance())
            .collect()
    }

    /// 取出指定性别的房间队列
    ///
    /// 仅匹配严格同性别房间；Co-ed 房间不进入任何队列
    pub fn room_cohort(&self, gender: Gender, rooms: Vec<Room>) -> Vec<Room> {
        let wanted = RoomGender::from(gender);
        self.exclude_maintenance(rooms)
            .into_iter()
            .filter(|room| room.gender == wanted)
            .collect()
    }
}

impl Default for GenderPartitioner {
    fn default() -> Self {
        Self::new()
    }
}
