// ==========================================
// 枪托生产流水排程系统 - 排程策略配置
// ==========================================
// 红线: 紧急窗口/在段 SLA/超载阈值均为注入配置,引擎不得内联数字
// 存储: 由宿主层注入(JSON 可序列化,便于落盘或下发)
// ==========================================

use crate::domain::types::Department;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

// ==========================================
// 紧急等级窗口
// ==========================================
// 判定口径(边界含端点,与交期比较均为 <=):
// - days_to_due < 0                      → CRITICAL
// - 0 <= days_to_due <= high_within_days → HIGH
// - .. <= medium_within_days             → MEDIUM
// - 其他                                  → NORMAL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyThresholds {
    pub high_within_days: i64,   // 紧急窗口(天)
    pub medium_within_days: i64, // 关注窗口(天)
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            high_within_days: 3,
            medium_within_days: 7,
        }
    }
}

// ==========================================
// 在段 SLA
// ==========================================
// 每段允许的停留天数,超过则标记 DEPT_OVERDUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeptSlaPolicy {
    pub default_days: i64,                     // 未单独配置的段使用的默认 SLA
    pub overrides: HashMap<Department, i64>,   // 按段覆写
}

impl Default for DeptSlaPolicy {
    fn default() -> Self {
        Self {
            default_days: 5,
            overrides: HashMap::new(),
        }
    }
}

impl DeptSlaPolicy {
    /// 查询某段的 SLA 天数
    pub fn days_for(&self, dept: Department) -> i64 {
        self.overrides.get(&dept).copied().unwrap_or(self.default_days)
    }
}

// ==========================================
// 队列优先分权重
// ==========================================
// 线性加权: score = tier_weight * tier_rank + due_date_weight * due_urgency
// due_urgency = -(days_to_due),越接近/越超期越大;缺交期按 0 计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueScoringWeights {
    pub tier_weight: f64,     // 紧急等级秩权重
    pub due_date_weight: f64, // 交期紧迫度权重
    pub due_horizon_days: i64, // days_to_due 截断范围,防止极端日期放大分值
}

impl Default for QueueScoringWeights {
    fn default() -> Self {
        Self {
            tier_weight: 100.0,
            due_date_weight: 1.0,
            due_horizon_days: 3650,
        }
    }
}

// ==========================================
// SchedulingPolicy - 策略配置全集
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    pub urgency: UrgencyThresholds,
    pub dept_sla: DeptSlaPolicy,
    pub queue: QueueScoringWeights,
    #[serde(default = "default_overload_threshold")]
    pub overload_threshold: i64, // 单段在制订单数超过此值即视为超载
}

fn default_overload_threshold() -> i64 {
    45
}

impl SchedulingPolicy {
    /// 校验配置有效性
    ///
    /// # 校验规则
    /// 1. 紧急窗口非负且 high <= medium
    /// 2. SLA 天数为正
    /// 3. 权重为有限数
    /// 4. 超载阈值为正
    pub fn validate(&self) -> Result<(), String> {
        if self.urgency.high_within_days < 0 || self.urgency.medium_within_days < 0 {
            warn!("紧急窗口为负数");
            return Err("紧急窗口天数不能为负".to_string());
        }
        if self.urgency.high_within_days > self.urgency.medium_within_days {
            warn!(
                high = self.urgency.high_within_days,
                medium = self.urgency.medium_within_days,
                "紧急窗口顺序错误"
            );
            return Err(format!(
                "紧急窗口配置无效: high_within_days({}) 不能大于 medium_within_days({})",
                self.urgency.high_within_days, self.urgency.medium_within_days
            ));
        }

        if self.dept_sla.default_days <= 0 {
            return Err(format!("默认在段 SLA 必须为正: {}", self.dept_sla.default_days));
        }
        for (dept, days) in &self.dept_sla.overrides {
            if *days <= 0 {
                return Err(format!("{} 段 SLA 必须为正: {}", dept, days));
            }
        }

        for (name, value) in [
            ("tier_weight", self.queue.tier_weight),
            ("due_date_weight", self.queue.due_date_weight),
        ] {
            if !value.is_finite() {
                return Err(format!("权重 {} 不是有限数", name));
            }
        }
        if self.queue.due_horizon_days <= 0 {
            return Err(format!("due_horizon_days 必须为正: {}", self.queue.due_horizon_days));
        }

        if self.overload_threshold <= 0 {
            return Err(format!("超载阈值必须为正: {}", self.overload_threshold));
        }

        Ok(())
    }

    /// 从 JSON 字符串加载(宿主层配置下发入口)
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let policy: SchedulingPolicy =
            serde_json::from_str(raw).map_err(|e| format!("策略配置解析失败: {}", e))?;
        policy.validate()?;
        Ok(policy)
    }
}

// 注: Default::default() 即观测到的线上口径(3/7 天窗口、5 天 SLA、45 单超载),
// 宿主层可整体覆写。
