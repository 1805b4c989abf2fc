// ==========================================
// 枪托生产流水排程系统 - 入口队列接口
// ==========================================
// 职责: 对外暴露队列编位/交换/覆写/重算操作
// ==========================================

use crate::api::error::ApiResult;
use crate::clock::Clock;
use crate::config::policy::SchedulingPolicy;
use crate::domain::order::ProductionOrder;
use crate::domain::types::MoveDirection;
use crate::engine::events::{OptionalEventPublisher, PipelineEvent, PipelineEventType};
use crate::engine::queue::{AutoPopulateOutcome, QueueEngine};
use crate::repository::order_repo::OrderRepository;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// QueueApi - 入口队列接口
// ==========================================
pub struct QueueApi {
    queue: QueueEngine,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
    policy: SchedulingPolicy,
}

impl QueueApi {
    /// 创建新的队列接口
    pub fn new(
        repo: Arc<OrderRepository>,
        clock: Arc<dyn Clock>,
        events: OptionalEventPublisher,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            queue: QueueEngine::new(repo),
            clock,
            events,
            policy,
        }
    }

    /// 自动编位: 未编位的入口段订单追加入队(幂等)
    #[instrument(skip(self))]
    pub fn auto_populate(&self) -> ApiResult<AutoPopulateOutcome> {
        let outcome = self.queue.auto_populate(self.clock.now(), &self.policy)?;

        if outcome.added > 0 {
            self.publish_queue_changed();
        }
        Ok(outcome)
    }

    /// 相邻交换,返回交换后的完整队列
    #[instrument(skip(self))]
    pub fn move_order(
        &self,
        order_id: &str,
        direction: MoveDirection,
    ) -> ApiResult<Vec<ProductionOrder>> {
        let reordered = self.queue.move_order(order_id, direction, self.clock.now())?;
        self.publish_queue_changed();
        Ok(reordered)
    }

    /// 批量覆写队列顺序(先校验 1..N 排列,后写入)
    #[instrument(skip(self, pairs), fields(count = pairs.len()))]
    pub fn set_priorities(&self, pairs: &[(String, i32)]) -> ApiResult<Vec<ProductionOrder>> {
        let reordered = self.queue.set_priorities(pairs, self.clock.now())?;
        self.publish_queue_changed();
        Ok(reordered)
    }

    /// 重算全队列优先分(不改变位置)
    #[instrument(skip(self))]
    pub fn recompute_scores(&self) -> ApiResult<usize> {
        self.queue.recompute_scores(self.clock.now(), &self.policy)
    }

    /// 当前队列快照(按位置升序)
    pub fn list(&self) -> ApiResult<Vec<ProductionOrder>> {
        self.queue.list()
    }

    fn publish_queue_changed(&self) {
        // 顺序变化以全队列口径通知,订阅方整体刷新
        let order_ids = match self.queue.list() {
            Ok(queue) => queue.into_iter().map(|o| o.order_id).collect(),
            Err(_) => Vec::new(),
        };
        self.events.publish_quietly(PipelineEvent::batch(
            PipelineEventType::QueueChanged,
            order_ids,
            None,
        ));
    }
}
