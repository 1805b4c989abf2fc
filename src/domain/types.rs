// ==========================================
// 枪托生产流水排程系统 - 领域类型定义
// ==========================================
// 红线: 部门顺序为固定拓扑,不可由外部配置改变
// 红线: 部门名称与外部渲染层逐字节一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 部门 / 工序 (Department)
// ==========================================
// 固定管线顺序:
//   Production Queue(虚拟入口) → Layup → Plugging → CNC
//   → Finish → Gunsmith → Paint → QC → Shipping(终点)
// 排序语义: Ord 按管线顺序,供看板按工序展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Department {
    ProductionQueue, // 生产队列(虚拟前置段,未排产订单在此等待)
    Layup,           // 铺层
    Plugging,        // 封堵
    Cnc,             // CNC 加工
    Finish,          // 表面处理
    Gunsmith,        // 枪匠装配
    Paint,           // 喷涂
    Qc,              // 质检
    Shipping,        // 发运(终点段)
}

impl Department {
    /// 管线全序列(含虚拟入口段)
    pub const SEQUENCE: [Department; 9] = [
        Department::ProductionQueue,
        Department::Layup,
        Department::Plugging,
        Department::Cnc,
        Department::Finish,
        Department::Gunsmith,
        Department::Paint,
        Department::Qc,
        Department::Shipping,
    ];

    /// 生产段序列(不含虚拟入口段)
    pub const PRODUCTION_STAGES: [Department; 8] = [
        Department::Layup,
        Department::Plugging,
        Department::Cnc,
        Department::Finish,
        Department::Gunsmith,
        Department::Paint,
        Department::Qc,
        Department::Shipping,
    ];

    /// 入口段(优先队列作用域)
    pub fn entry() -> Department {
        Department::ProductionQueue
    }

    /// 第一个生产段
    pub fn first_production_stage() -> Department {
        Department::Layup
    }

    /// 管线序号(0 起,用于前后判断)
    pub fn index(&self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|d| d == self)
            .unwrap_or(0)
    }

    /// 后继段
    ///
    /// # 返回
    /// - Some(Department): 下一段
    /// - None: 已是终点段
    pub fn successor(&self) -> Option<Department> {
        let idx = self.index();
        Self::SEQUENCE.get(idx + 1).copied()
    }

    /// 前驱段
    ///
    /// # 返回
    /// - Some(Department): 上一段
    /// - None: 已是入口段
    pub fn predecessor(&self) -> Option<Department> {
        let idx = self.index();
        if idx == 0 {
            None
        } else {
            Self::SEQUENCE.get(idx - 1).copied()
        }
    }

    /// 是否终点段(Shipping)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Department::Shipping)
    }

    /// 是否入口段(Production Queue)
    pub fn is_entry(&self) -> bool {
        matches!(self, Department::ProductionQueue)
    }

    /// 外部约定的部门名称(逐字节一致,含 "Production Queue" 中的空格)
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::ProductionQueue => "Production Queue",
            Department::Layup => "Layup",
            Department::Plugging => "Plugging",
            Department::Cnc => "CNC",
            Department::Finish => "Finish",
            Department::Gunsmith => "Gunsmith",
            Department::Paint => "Paint",
            Department::Qc => "QC",
            Department::Shipping => "Shipping",
        }
    }

    /// 从外部名称解析部门
    ///
    /// 严格逐字节匹配,未知名称返回 None(由 API 层转为 InvalidDepartment)
    pub fn parse(s: &str) -> Option<Department> {
        match s {
            "Production Queue" => Some(Department::ProductionQueue),
            "Layup" => Some(Department::Layup),
            "Plugging" => Some(Department::Plugging),
            "CNC" => Some(Department::Cnc),
            "Finish" => Some(Department::Finish),
            "Gunsmith" => Some(Department::Gunsmith),
            "Paint" => Some(Department::Paint),
            "QC" => Some(Department::Qc),
            "Shipping" => Some(Department::Shipping),
            _ => None,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 红线: SCRAPPED 为终态,后续只能通过补做单继续
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,   // 在制
    Scrapped, // 已报废(终态)
}

impl OrderStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "ACTIVE",
            OrderStatus::Scrapped => "SCRAPPED",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<OrderStatus> {
        match s {
            "ACTIVE" => Some(OrderStatus::Active),
            "SCRAPPED" => Some(OrderStatus::Scrapped),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 紧急等级 (Urgency Tier)
// ==========================================
// 红线: 等级制,不是评分制
// 顺序: Unknown < Normal < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyTier {
    Unknown,  // 交期缺失,无法判定
    Normal,   // 正常
    Medium,   // 关注
    High,     // 紧急
    Critical, // 红线(已超期)
}

impl UrgencyTier {
    /// 等级秩(用于优先分计算)
    pub fn rank(&self) -> f64 {
        match self {
            UrgencyTier::Unknown => 0.0,
            UrgencyTier::Normal => 0.0,
            UrgencyTier::Medium => 1.0,
            UrgencyTier::High => 2.0,
            UrgencyTier::Critical => 3.0,
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrgencyTier::Unknown => write!(f, "UNKNOWN"),
            UrgencyTier::Normal => write!(f, "NORMAL"),
            UrgencyTier::Medium => write!(f, "MEDIUM"),
            UrgencyTier::High => write!(f, "HIGH"),
            UrgencyTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 在段告警 (Stage Alert)
// ==========================================
// 与交期紧急等级正交: 只看当前段停留时长是否超过该段 SLA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageAlert {
    OnTrack,     // 在段时长正常
    DeptOverdue, // 在段超时(超过该段 SLA)
}

impl fmt::Display for StageAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageAlert::OnTrack => write!(f, "ON_TRACK"),
            StageAlert::DeptOverdue => write!(f, "DEPT_OVERDUE"),
        }
    }
}

// ==========================================
// 队列移动方向 (Move Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,   // 向队首移动(位置号减一)
    Down, // 向队尾移动(位置号加一)
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Up => write!(f, "up"),
            MoveDirection::Down => write!(f, "down"),
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_chain_from_layup() {
        // Layup 起连续取后继,7 跳到达 Shipping
        let mut dept = Department::Layup;
        let mut hops = 0;
        while let Some(next) = dept.successor() {
            dept = next;
            hops += 1;
        }
        assert_eq!(dept, Department::Shipping, "链条终点应为 Shipping");
        assert_eq!(hops, 7, "Layup 到 Shipping 应为 7 跳");
    }

    #[test]
    fn test_topology_closure() {
        // 每个非终点段: successor(predecessor(d)) == d
        for dept in Department::SEQUENCE {
            if dept.is_terminal() {
                continue;
            }
            if let Some(prev) = dept.predecessor() {
                assert_eq!(prev.successor(), Some(dept), "前驱的后继应回到 {}", dept);
            }
        }
        assert_eq!(Department::Shipping.successor(), None, "终点段无后继");
        assert_eq!(Department::ProductionQueue.predecessor(), None, "入口段无前驱");
    }

    #[test]
    fn test_department_wire_names_roundtrip() {
        for dept in Department::SEQUENCE {
            assert_eq!(Department::parse(dept.as_str()), Some(dept));
        }
        // 大小写/空格不匹配的名称一律拒绝
        assert_eq!(Department::parse("layup"), None);
        assert_eq!(Department::parse("ProductionQueue"), None);
        assert_eq!(Department::parse("shipping "), None);
    }

    #[test]
    fn test_entry_and_first_production_stage() {
        assert!(Department::entry().is_entry());
        assert_eq!(Department::entry().successor(), Some(Department::Layup));
        assert_eq!(Department::first_production_stage(), Department::Layup);
    }

    #[test]
    fn test_urgency_tier_ordering() {
        assert!(UrgencyTier::Critical > UrgencyTier::High);
        assert!(UrgencyTier::High > UrgencyTier::Medium);
        assert!(UrgencyTier::Medium > UrgencyTier::Normal);
        assert!(UrgencyTier::Normal > UrgencyTier::Unknown);
    }

    #[test]
    fn test_order_status_db_roundtrip() {
        assert_eq!(OrderStatus::from_db_str("ACTIVE"), Some(OrderStatus::Active));
        assert_eq!(OrderStatus::from_db_str("SCRAPPED"), Some(OrderStatus::Scrapped));
        assert_eq!(OrderStatus::from_db_str("active"), None);
    }
}
