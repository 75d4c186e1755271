// ==========================================
// 宿舍管理系统 - 排序策略
// ==========================================
// 职责: 为学生与房间生成确定性的全序（与存储顺序无关）
// 输入: 单一性别的学生列表 / 单一性别的房间列表
// 输出: 排序后的列表（稳定排序，相同键保持输入顺序）
// ==========================================

use crate::domain::room::Room;
use crate::domain::student::Student;
use std::cmp::Ordering;
use tracing::warn;

// ==========================================
// OrderingPolicy - 排序策略
// ==========================================
pub struct OrderingPolicy {
    // 无状态引擎，不需要注入依赖
}

impl OrderingPolicy {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 学生排序
    // ==========================================

    /// 学生排序
    ///
    /// 规则:
    /// 1) 高年级 (year > 1) 在前，新生 (year == 1) 在后
    /// 2) 高年级: 院系升序，同院系按姓名升序
    /// 3) 新生: 姓名升序
    ///
    /// 字符串按存储值逐字节比较（区分大小写）
    pub fn order_students(&self, students: Vec<Student>) -> Vec<Student> {
        let (mut seniors, mut fresh): (Vec<Student>, Vec<Student>) =
            students.into_iter().partition(Student::is_senior);

        // sort_by 为稳定排序
        seniors.sort_by(|a, b| self.compare_seniors(a, b));
        fresh.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        seniors.extend(fresh);
        seniors
    }

    fn compare_seniors(&self, a: &Student, b: &Student) -> Ordering {
        a.department
            .cmp(&b.department)
            .then_with(|| a.full_name.cmp(&b.full_name))
    }

    // ==========================================
    // 房间排序
    // ==========================================

    /// 房间排序
    ///
    /// 规则: 楼栋升序 → 单元升序（无单元排在任何有名单元之前）→ 房间号数值升序
    ///
    /// 房间号无法解析为整数时按 0 处理（排在所有数值房间号之前）
    pub fn order_rooms(&self, rooms: Vec<Room>) -> Vec<Room> {
        let mut keyed: Vec<(i64, Room)> = rooms
            .into_iter()
            .map(|room| (self.room_number_key(&room), room))
            .collect();

        keyed.sort_by(|(num_a, a), (num_b, b)| {
            a.building
                .cmp(&b.building)
                .then_with(|| block_key(a).cmp(&block_key(b)))
                .then_with(|| num_a.cmp(num_b))
        });

        keyed.into_iter().map(|(_, room)| room).collect()
    }

    /// 房间号排序键
    fn room_number_key(&self, room: &Room) -> i64 {
        match parse_room_number(&room.room_number) {
            Some(n) => n,
            None => {
                warn!(
                    room_id = %room.id,
                    room_number = %room.room_number,
                    "房间号无法解析为整数, 按 0 参与排序"
                );
                0
            }
        }
    }
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// 空单元与缺失单元等价，统一为 None（None < Some）
fn block_key(room: &Room) -> Option<&str> {
    room.block.as_deref().filter(|b| !b.is_empty())
}

/// 解析房间号（允许首尾空白）
pub fn parse_room_number(room_number: &str) -> Option<i64> {
    room_number.trim().parse::<i64>().ok()
}
