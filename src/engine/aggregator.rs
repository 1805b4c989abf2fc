// ==========================================
// 枪托生产流水排程系统 - 管线看板聚合
// ==========================================
// 职责: 只读投影,按部门输出在制订单的计数/明细/负载
// 说明: 读侧允许轻微滞后(看板轮询口径),写路径一致性不经此处
// 红线: 紧急评估在此一次算齐,看板不得自行推导日期
// ==========================================

use crate::api::error::ApiResult;
use crate::config::policy::SchedulingPolicy;
use crate::domain::order::ProductionOrder;
use crate::domain::types::Department;
use crate::engine::urgency::{UrgencyAssessment, UrgencyEngine};
use crate::repository::order_repo::OrderRepository;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// OrderSummary - 看板订单摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub fb_order_number: Option<String>,
    pub model_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_replacement: bool,
    pub queue_position: Option<i32>,
    pub priority_score: Option<f64>,
    /// 完整紧急评估(交期等级 + 在段告警)
    pub urgency: UrgencyAssessment,
}

// ==========================================
// DepartmentLoad - 部门负载
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentLoad {
    pub count: i64,
    /// 在制数超过策略阈值
    pub overloaded: bool,
}

// ==========================================
// PipelineAggregator - 看板聚合器
// ==========================================
pub struct PipelineAggregator {
    repo: Arc<OrderRepository>,
    urgency: UrgencyEngine,
}

impl PipelineAggregator {
    /// 创建新的看板聚合器
    pub fn new(repo: Arc<OrderRepository>) -> Self {
        Self {
            repo,
            urgency: UrgencyEngine::new(),
        }
    }

    /// 按部门计数(仅在制订单;所有部门齐全,无单部门也给 0)
    pub fn counts_by_department(&self) -> ApiResult<BTreeMap<Department, i64>> {
        let mut counts: BTreeMap<Department, i64> =
            Department::SEQUENCE.iter().map(|d| (*d, 0)).collect();

        for order in self.repo.list_active()? {
            *counts.entry(order.current_department).or_insert(0) += 1;
        }

        Ok(counts)
    }

    /// 按部门输出明细
    ///
    /// 排序: 入口段按队列位置(未编位的排在已编位之后),
    ///       生产段按交期升序(缺交期排最后)
    #[instrument(skip(self, policy))]
    pub fn details_by_department(
        &self,
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> ApiResult<BTreeMap<Department, Vec<OrderSummary>>> {
        let mut details: BTreeMap<Department, Vec<ProductionOrder>> =
            Department::SEQUENCE.iter().map(|d| (*d, Vec::new())).collect();

        for order in self.repo.list_active()? {
            details.entry(order.current_department).or_default().push(order);
        }

        let mut result: BTreeMap<Department, Vec<OrderSummary>> = BTreeMap::new();
        for (dept, mut orders) in details {
            if dept.is_entry() {
                orders.sort_by_key(|o| o.queue_position.map(|p| p as i64).unwrap_or(i64::MAX));
            } else {
                orders.sort_by_key(|o| o.due_date.unwrap_or(NaiveDate::MAX));
            }

            let summaries = orders
                .into_iter()
                .map(|order| {
                    let urgency = self.urgency.assess(&order, now, policy);
                    OrderSummary {
                        order_id: order.order_id,
                        fb_order_number: order.fb_order_number,
                        model_id: order.model_id,
                        due_date: order.due_date,
                        is_replacement: order.is_replacement,
                        queue_position: order.queue_position,
                        priority_score: order.priority_score,
                        urgency,
                    }
                })
                .collect();
            result.insert(dept, summaries);
        }

        Ok(result)
    }

    /// 按部门输出负载(计数 + 超载标记)
    pub fn load_by_department(
        &self,
        policy: &SchedulingPolicy,
    ) -> ApiResult<BTreeMap<Department, DepartmentLoad>> {
        let counts = self.counts_by_department()?;
        Ok(counts
            .into_iter()
            .map(|(dept, count)| {
                let load = DepartmentLoad {
                    count,
                    overloaded: count > policy.overload_threshold,
                };
                (dept, load)
            })
            .collect())
    }
}
