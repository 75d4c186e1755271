// ==========================================
// 宿舍管理系统 - 房间领域模型
// ==========================================
// 所有者: RoomRepository
// 分配引擎只追加住户并在 Available / Full 之间切换状态
// ==========================================

use crate::domain::student::Student;
use crate::domain::types::{RoomGender, RoomStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// Room - 房间
// ==========================================
// 不变式:
// - occupants.len() <= capacity
// - status == Full 当且仅当 occupants.len() >= capacity
// - UnderMaintenance 房间不参与分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,                // 内部唯一ID
    pub building: String,          // 楼栋
    pub block: Option<String>,     // 单元（楼栋内分组，可选）
    pub floor: i32,                // 楼层
    pub room_number: String,       // 房间号（按数值排序）
    pub capacity: u32,             // 床位数
    pub gender: RoomGender,        // 房间性别
    pub status: RoomStatus,        // 房间状态
    pub occupants: Vec<String>,    // 住户（学生内部ID集合，顺序无关）

    // 乐观锁版本号，每次保存成功 +1
    pub revision: i64,
}

impl Room {
    /// 剩余床位（capacity - 当前住户数）
    ///
    /// 使用有符号数：历史数据可能已经超员，此时返回负值
    pub fn available_space(&self) -> i64 {
        i64::from(self.capacity) - self.occupants.len() as i64
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() as u64 >= u64::from(self.capacity)
    }

    pub fn is_under_maintenance(&self) -> bool {
        self.status == RoomStatus::UnderMaintenance
    }

    /// 房间展示标签: `楼栋-单元-房间号`，无单元时为 `楼栋-房间号`
    pub fn label(&self) -> String {
        match self.block.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(block) => format!("{}-{}-{}", self.building, block, self.room_number),
            None => format!("{}-{}", self.building, self.room_number),
        }
    }

    /// 将学生加入住户列表并刷新状态
    ///
    /// 已是住户的学生跳过；返回实际新增的人数
    /// 调用方负责保证 students.len() <= available_space()
    pub fn place(&mut self, students: &[Student]) -> usize {
        let before = self.occupants.len();
        for student in students {
            if !self.occupants.contains(&student.id) {
                self.occupants.push(student.id.clone());
            }
        }
        self.refresh_status();
        self.occupants.len() - before
    }

    pub fn has_occupant(&self, student_id: &str) -> bool {
        self.occupants.iter().any(|id| id == student_id)
    }

    /// 按住户数重新计算状态（维修状态保持不变）
    pub fn refresh_status(&mut self) {
        if self.is_under_maintenance() {
            return;
        }
        self.status = if self.is_full() {
            RoomStatus::Full
        } else {
            RoomStatus::Available
        };
    }
}
