// ==========================================
// 枪托生产流水排程系统 - 管线写操作接口
// ==========================================
// 职责: 对外暴露 progress / scrap / 补做操作
// 说明: 部门名称以字符串进出(与外部渲染层逐字节一致),
//       在此边界完成校验;时间由注入时钟取值
// ==========================================

use crate::api::error::ApiResult;
use crate::api::parse_department;
use crate::clock::Clock;
use crate::domain::order::ProductionOrder;
use crate::engine::coordinator::{ScrapAndReplaceOutcome, ScrapReplaceCoordinator};
use crate::engine::events::{OptionalEventPublisher, PipelineEvent, PipelineEventType};
use crate::engine::transition::{BulkTransitionOutcome, TransitionEngine};
use crate::repository::order_repo::OrderRepository;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// PipelineApi - 管线写操作接口
// ==========================================
pub struct PipelineApi {
    transition: Arc<TransitionEngine>,
    coordinator: ScrapReplaceCoordinator,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
}

impl PipelineApi {
    /// 创建新的管线接口
    pub fn new(
        repo: Arc<OrderRepository>,
        clock: Arc<dyn Clock>,
        events: OptionalEventPublisher,
    ) -> Self {
        let transition = Arc::new(TransitionEngine::new(repo));
        let coordinator = ScrapReplaceCoordinator::new(transition.clone());
        Self {
            transition,
            coordinator,
            clock,
            events,
        }
    }

    /// 推进订单到下一段(或显式指定的下游段)
    #[instrument(skip(self))]
    pub fn progress(
        &self,
        order_id: &str,
        explicit_next: Option<&str>,
    ) -> ApiResult<ProductionOrder> {
        let next = explicit_next.map(parse_department).transpose()?;
        let order = self.transition.progress(order_id, next, self.clock.now())?;

        self.events.publish_quietly(PipelineEvent::single(
            PipelineEventType::DepartmentChanged,
            order.order_id.clone(),
            Some(order.current_department.as_str().to_string()),
        ));
        Ok(order)
    }

    /// 批量推进到同一目标段(逐单独立,部分失败不回滚)
    #[instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    pub fn progress_bulk(
        &self,
        order_ids: &[String],
        next_dept: &str,
    ) -> ApiResult<BulkTransitionOutcome> {
        let next = parse_department(next_dept)?;
        let outcome = self
            .transition
            .progress_bulk(order_ids, next, self.clock.now());

        if !outcome.succeeded.is_empty() {
            self.events.publish_quietly(PipelineEvent::batch(
                PipelineEventType::DepartmentChanged,
                outcome.succeeded.iter().map(|o| o.order_id.clone()).collect(),
                Some(next.as_str().to_string()),
            ));
        }
        Ok(outcome)
    }

    /// 报废订单
    #[instrument(skip(self, reason, disposition, authorization))]
    pub fn scrap(
        &self,
        order_id: &str,
        reason: &str,
        disposition: &str,
        authorization: &str,
    ) -> ApiResult<ProductionOrder> {
        let order = self
            .transition
            .scrap(order_id, reason, disposition, authorization, self.clock.now())?;

        self.events.publish_quietly(PipelineEvent::single(
            PipelineEventType::OrderScrapped,
            order.order_id.clone(),
            Some(order.current_department.as_str().to_string()),
        ));
        Ok(order)
    }

    /// 为已报废订单创建补做单
    #[instrument(skip(self))]
    pub fn create_replacement(&self, scrapped_order_id: &str) -> ApiResult<ProductionOrder> {
        let replacement = self
            .transition
            .create_replacement(scrapped_order_id, self.clock.now())?;

        self.events.publish_quietly(PipelineEvent::single(
            PipelineEventType::ReplacementCreated,
            replacement.order_id.clone(),
            None,
        ));
        Ok(replacement)
    }

    /// 报废并补做(组合操作,结果两半必须同时检查)
    #[instrument(skip(self, reason, disposition, authorization))]
    pub fn scrap_and_replace(
        &self,
        order_id: &str,
        reason: &str,
        disposition: &str,
        authorization: &str,
    ) -> ApiResult<ScrapAndReplaceOutcome> {
        let outcome = self.coordinator.scrap_and_replace(
            order_id,
            reason,
            disposition,
            authorization,
            self.clock.now(),
        )?;

        self.events.publish_quietly(PipelineEvent::single(
            PipelineEventType::OrderScrapped,
            outcome.scrapped.order_id.clone(),
            Some(outcome.scrapped.current_department.as_str().to_string()),
        ));
        if let Some(replacement) = &outcome.replacement {
            self.events.publish_quietly(PipelineEvent::single(
                PipelineEventType::ReplacementCreated,
                replacement.order_id.clone(),
                None,
            ));
        }
        Ok(outcome)
    }
}
