// ==========================================
// 枪托生产流水排程系统 - 紧急等级判定引擎
// ==========================================
// 红线: 紧急等级是"等级制",不是评分制
// 红线: 交期等级与在段告警为两个正交信号,必须可独立计算、合并暴露
// ==========================================
// 职责: 按交期计算紧急等级 + 按在段时长判定 SLA 告警
// 输入: production_order + 注入的当前时间 + 策略配置
// 输出: UrgencyAssessment(纯函数,无副作用)
// ==========================================

use crate::config::policy::SchedulingPolicy;
use crate::domain::order::ProductionOrder;
use crate::domain::types::{StageAlert, UrgencyTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

// ==========================================
// UrgencyAssessment - 合并评估结果
// ==========================================
/// 单订单的完整紧急评估
///
/// 看板消费此结构,不再自行推导日期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    /// 交期紧急等级
    pub tier: UrgencyTier,
    /// 在段告警(与 tier 正交)
    pub stage_alert: StageAlert,
    /// 距交期天数(负数=已超期;交期缺失为 None)
    pub days_to_due: Option<i64>,
    /// 在当前段停留天数
    pub days_in_department: i64,
    /// 判定原因(JSON 格式,可解释性)
    pub reason: String,
}

// ==========================================
// UrgencyEngine - 紧急等级判定引擎
// ==========================================
// 无状态引擎,阈值经策略配置注入
pub struct UrgencyEngine;

impl UrgencyEngine {
    /// 创建新的紧急等级判定引擎
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 判定交期紧急等级
    ///
    /// 规则(顺序执行,命中即定级,边界含端点):
    /// 1) 交期缺失 → Unknown(总函数,不报错)
    /// 2) days_to_due < 0 → Critical
    /// 3) days_to_due <= high_within_days → High
    /// 4) days_to_due <= medium_within_days → Medium
    /// 5) 其他 → Normal
    pub fn classify(
        &self,
        order: &ProductionOrder,
        today: chrono::NaiveDate,
        policy: &SchedulingPolicy,
    ) -> UrgencyTier {
        let days_to_due = match order.days_to_due(today) {
            Some(days) => days,
            None => return UrgencyTier::Unknown,
        };

        if days_to_due < 0 {
            UrgencyTier::Critical
        } else if days_to_due <= policy.urgency.high_within_days {
            UrgencyTier::High
        } else if days_to_due <= policy.urgency.medium_within_days {
            UrgencyTier::Medium
        } else {
            UrgencyTier::Normal
        }
    }

    /// 判定在段告警
    ///
    /// 在段天数严格超过该段 SLA 时标记 DEPT_OVERDUE;
    /// 与交期等级无关,入口段同样适用(等待超时同样需要关注)
    pub fn stage_alert(
        &self,
        order: &ProductionOrder,
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> StageAlert {
        let days_in_dept = order.days_in_department(now);
        let sla_days = policy.dept_sla.days_for(order.current_department);

        if days_in_dept > sla_days {
            StageAlert::DeptOverdue
        } else {
            StageAlert::OnTrack
        }
    }

    /// 合并评估(两个信号一次算齐)
    pub fn assess(
        &self,
        order: &ProductionOrder,
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> UrgencyAssessment {
        let today = now.date_naive();
        let tier = self.classify(order, today, policy);
        let stage_alert = self.stage_alert(order, now, policy);
        let days_to_due = order.days_to_due(today);
        let days_in_department = order.days_in_department(now);

        let primary_reason = match (tier, stage_alert) {
            (UrgencyTier::Critical, _) => "OVERDUE",
            (_, StageAlert::DeptOverdue) => "DEPT_OVERDUE",
            (UrgencyTier::High, _) => "NEAR_DUE_HIGH",
            (UrgencyTier::Medium, _) => "NEAR_DUE_MEDIUM",
            (UrgencyTier::Unknown, _) => "DUE_DATE_MISSING",
            _ => "NORMAL",
        };

        let reason = json!({
            "tier": tier.to_string(),
            "stage_alert": stage_alert.to_string(),
            "primary_reason": primary_reason,
            "details": {
                "department": order.current_department.as_str(),
                "days_to_due": days_to_due,
                "days_in_department": days_in_department,
                "sla_days": policy.dept_sla.days_for(order.current_department),
                "today": today.to_string(),
            }
        });

        UrgencyAssessment {
            tier,
            stage_alert,
            days_to_due,
            days_in_department,
            reason: reason.to_string(),
        }
    }

    /// 批量评估
    #[instrument(skip(self, orders, policy), fields(count = orders.len()))]
    pub fn assess_batch(
        &self,
        orders: &[ProductionOrder],
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> Vec<UrgencyAssessment> {
        orders
            .iter()
            .map(|order| self.assess(order, now, policy))
            .collect()
    }
}

impl Default for UrgencyEngine {
    fn default() -> Self {
        Self::new()
    }
}
