// ==========================================
// 枪托生产流水排程系统 - 看板读接口
// ==========================================
// 职责: 对外暴露按部门的计数/明细/负载投影
// 说明: 读侧为轮询口径,允许轻微滞后;不参与写路径一致性
// ==========================================

use crate::api::error::ApiResult;
use crate::clock::Clock;
use crate::config::policy::SchedulingPolicy;
use crate::domain::types::Department;
use crate::engine::aggregator::{DepartmentLoad, OrderSummary, PipelineAggregator};
use crate::repository::order_repo::OrderRepository;
use std::collections::BTreeMap;
use std::sync::Arc;

// ==========================================
// DashboardApi - 看板读接口
// ==========================================
pub struct DashboardApi {
    aggregator: PipelineAggregator,
    clock: Arc<dyn Clock>,
    policy: SchedulingPolicy,
}

impl DashboardApi {
    /// 创建新的看板接口
    pub fn new(
        repo: Arc<OrderRepository>,
        clock: Arc<dyn Clock>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            aggregator: PipelineAggregator::new(repo),
            clock,
            policy,
        }
    }

    /// 按部门计数(仅在制订单)
    pub fn counts_by_department(&self) -> ApiResult<BTreeMap<Department, i64>> {
        self.aggregator.counts_by_department()
    }

    /// 按部门明细(含完整紧急评估)
    pub fn details_by_department(&self) -> ApiResult<BTreeMap<Department, Vec<OrderSummary>>> {
        self.aggregator
            .details_by_department(self.clock.now(), &self.policy)
    }

    /// 按部门负载(计数 + 超载标记)
    pub fn load_by_department(&self) -> ApiResult<BTreeMap<Department, DepartmentLoad>> {
        self.aggregator.load_by_department(&self.policy)
    }
}
