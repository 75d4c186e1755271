// ==========================================
// 宿舍管理系统 - 学生领域模型
// ==========================================
// 所有者: StudentRepository
// 分配引擎只修改 room_id（建立/解除住宿关系），从不创建或删除学生
// ==========================================

use crate::domain::types::Gender;
use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学生
// ==========================================
// 不变式: room_id 为空（未分配），或指向一个性别匹配的房间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,                // 内部唯一ID
    pub student_id: String,        // 学号（人可读）
    pub full_name: String,         // 姓名
    pub gender: Option<Gender>,    // 性别（None = 缺失或无法识别）
    pub department: String,        // 院系
    pub year: u32,                 // 年级
    pub room_id: Option<String>,   // 所住房间
}

impl Student {
    /// 是否为新生（year == 1）
    ///
    /// 非法年级 0 也按新生处理，只有 year > 1 才享有高年级优先
    pub fn is_fresh(&self) -> bool {
        self.year <= 1
    }

    /// 是否为高年级学生（year > 1）
    pub fn is_senior(&self) -> bool {
        self.year > 1
    }

    pub fn is_assigned(&self) -> bool {
        self.room_id.is_some()
    }

    /// 建立住宿关系
    pub fn assign_to(&mut self, room_id: &str) {
        self.room_id = Some(room_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(year: u32) -> Student {
        Student {
            id: "s-1".to_string(),
            student_id: "2024001".to_string(),
            full_name: "Amy".to_string(),
            gender: Some(Gender::Female),
            department: "CS".to_string(),
            year,
            room_id: None,
        }
    }

    #[test]
    fn test_seniority_split() {
        assert!(student(1).is_fresh());
        assert!(!student(1).is_senior());
        assert!(student(2).is_senior());
        assert!(student(0).is_fresh());
    }

    #[test]
    fn test_assign_to_sets_room_reference() {
        let mut s = student(1);
        assert!(!s.is_assigned());
        s.assign_to("room-101");
        assert_eq!(s.room_id.as_deref(), Some("room-101"));
    }
}
