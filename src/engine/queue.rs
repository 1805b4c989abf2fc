// ==========================================
// 枪托生产流水排程系统 - 入口优先队列引擎
// ==========================================
// 红线: queue_position 在入口段内必须保持 1..N 连续无重复
// 红线: 优先分仅为建议值,人工顺序永远优先
// 红线: 同分并列保持既有相对顺序,不得隐式按订单号/入库时间破并列
// ==========================================
// 职责: 入口段订单的自动编位、相邻交换、批量覆写与优先分重算
// 作用域: 仅 current_department == Production Queue 的在制订单
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::policy::SchedulingPolicy;
use crate::domain::order::ProductionOrder;
use crate::domain::types::MoveDirection;
use crate::engine::urgency::UrgencyEngine;
use crate::repository::error::MutateError;
use crate::repository::order_repo::OrderRepository;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// AutoPopulateOutcome - 自动编位结果
// ==========================================
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AutoPopulateOutcome {
    /// 本次新编入队列的订单数
    pub added: usize,
}

// ==========================================
// QueueEngine - 优先队列引擎
// ==========================================
pub struct QueueEngine {
    repo: Arc<OrderRepository>,
    urgency: UrgencyEngine,
}

impl QueueEngine {
    /// 创建新的优先队列引擎
    pub fn new(repo: Arc<OrderRepository>) -> Self {
        Self {
            repo,
            urgency: UrgencyEngine::new(),
        }
    }

    // ==========================================
    // 优先分计算
    // ==========================================

    /// 计算初始优先分
    ///
    /// 线性加权: tier_weight * 等级秩 + due_date_weight * 交期紧迫度
    /// 交期紧迫度 = -(days_to_due),越接近/越超期分值越高;
    /// days_to_due 截断在 ±due_horizon_days,防止极端日期放大分值;
    /// 交期缺失按紧迫度 0 计
    pub fn compute_priority_score(
        &self,
        order: &ProductionOrder,
        today: NaiveDate,
        policy: &SchedulingPolicy,
    ) -> f64 {
        let tier = self.urgency.classify(order, today, policy);

        let due_urgency = match order.days_to_due(today) {
            Some(days) => {
                let horizon = policy.queue.due_horizon_days;
                let clamped = days.clamp(-horizon, horizon);
                -(clamped as f64)
            }
            None => 0.0,
        };

        policy.queue.tier_weight * tier.rank() + policy.queue.due_date_weight * due_urgency
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 自动编位: 扫描入口段未编位订单,追加到队尾
    ///
    /// # 语义
    /// - 已编位订单一律不动(幂等)
    /// - 新订单之间按初始优先分降序排列,同分保持到达顺序(稳定排序)
    /// - 新位置从现有队尾 +1 起连续分配
    #[instrument(skip(self, policy))]
    pub fn auto_populate(
        &self,
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> ApiResult<AutoPopulateOutcome> {
        let today = now.date_naive();

        let candidates = self.repo.list_unqueued_entry()?;
        if candidates.is_empty() {
            debug!("入口段无未编位订单");
            return Ok(AutoPopulateOutcome { added: 0 });
        }

        let queue = self.repo.list_queue()?;
        let tail = queue
            .last()
            .and_then(|order| order.queue_position)
            .unwrap_or(0);

        // 预计算分值;稳定排序保证同分并列保持到达顺序
        let mut scored: Vec<(ProductionOrder, f64)> = candidates
            .into_iter()
            .map(|order| {
                let score = self.compute_priority_score(&order, today, policy);
                (order, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut added = 0usize;
        for (idx, (order, score)) in scored.iter().enumerate() {
            let position = tail + idx as i32 + 1;
            let result = self.repo.mutate::<(), _>(&order.order_id, now, |o| {
                // 列表快照与写入之间状态可能已变,闭包内复核资格
                if !o.current_department.is_entry() || o.is_scrapped() || o.queue_position.is_some()
                {
                    return Err(());
                }
                o.queue_position = Some(position);
                o.priority_score = Some(*score);
                Ok(())
            });

            match result {
                Ok(_) => added += 1,
                Err(MutateError::Rejected(())) => {
                    debug!(order_id = %order.order_id, "编位期间资格变化,跳过");
                }
                Err(MutateError::Store(e)) => return Err(e.into()),
            }
        }

        info!(added, "入口队列自动编位完成");
        Ok(AutoPopulateOutcome { added })
    }

    /// 相邻交换: 将订单与其紧邻的前/后一位交换
    ///
    /// # 返回
    /// 交换后的完整队列(按位置升序),供调用方整体持久化展示
    ///
    /// # 错误
    /// - AtBoundary: 已在队首(up)或队尾(down)
    /// - NotFound: 订单不存在或不在入口队列中
    pub fn move_order(
        &self,
        order_id: &str,
        direction: MoveDirection,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<ProductionOrder>> {
        // 先确认订单存在,区分"不存在"与"不在队列"
        let order = self.repo.get(order_id)?;
        if !order.is_queued() {
            return Err(ApiError::NotFound(format!(
                "订单{}不在入口队列中(当前部门: {})",
                order_id, order.current_department
            )));
        }

        let queue = self.repo.list_queue()?;
        let idx = queue
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or_else(|| ApiError::NotFound(format!("订单{}不在入口队列中", order_id)))?;

        let neighbor_idx = match direction {
            MoveDirection::Up => {
                if idx == 0 {
                    return Err(ApiError::AtBoundary {
                        order_id: order_id.to_string(),
                        direction,
                    });
                }
                idx - 1
            }
            MoveDirection::Down => {
                if idx + 1 >= queue.len() {
                    return Err(ApiError::AtBoundary {
                        order_id: order_id.to_string(),
                        direction,
                    });
                }
                idx + 1
            }
        };

        let self_pos = queue[idx].queue_position.unwrap_or(idx as i32 + 1);
        let neighbor_pos = queue[neighbor_idx]
            .queue_position
            .unwrap_or(neighbor_idx as i32 + 1);

        self.repo.apply_queue_positions(
            &[
                (queue[idx].order_id.clone(), neighbor_pos),
                (queue[neighbor_idx].order_id.clone(), self_pos),
            ],
            now,
        )?;

        info!(order_id, %direction, "队列相邻交换完成");
        self.repo.list_queue().map_err(Into::into)
    }

    /// 批量覆写队列顺序
    ///
    /// # 校验(先校验后写入,防止破坏 1..N 不变量)
    /// 1. 提交项数与现有队列项数一致
    /// 2. 订单集合与现有队列成员完全一致,无重复
    /// 3. 位置构成 1..N 的排列,无越界无重复
    pub fn set_priorities(
        &self,
        pairs: &[(String, i32)],
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<ProductionOrder>> {
        let queue = self.repo.list_queue()?;
        let n = queue.len();

        if pairs.len() != n {
            return Err(ApiError::InvalidOrdering(format!(
                "提交{}项,入口队列现有{}项",
                pairs.len(),
                n
            )));
        }

        let members: HashSet<&str> = queue.iter().map(|o| o.order_id.as_str()).collect();
        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(n);
        let mut seen_positions = vec![false; n];

        for (order_id, position) in pairs {
            if !members.contains(order_id.as_str()) {
                return Err(ApiError::InvalidOrdering(format!(
                    "订单{}不在入口队列中",
                    order_id
                )));
            }
            if !seen_ids.insert(order_id.as_str()) {
                return Err(ApiError::InvalidOrdering(format!("订单{}重复提交", order_id)));
            }
            if *position < 1 || *position > n as i32 {
                return Err(ApiError::InvalidOrdering(format!(
                    "位置{}越界(有效范围 1..{})",
                    position, n
                )));
            }
            let slot = (*position - 1) as usize;
            if seen_positions[slot] {
                return Err(ApiError::InvalidOrdering(format!("位置{}重复", position)));
            }
            seen_positions[slot] = true;
        }

        self.repo.apply_queue_positions(pairs, now)?;

        info!(count = n, "队列顺序批量覆写完成");
        self.repo.list_queue().map_err(Into::into)
    }

    /// 重算全队列优先分(不改变位置)
    ///
    /// 优先分为建议值,位置由人工顺序决定,因此重算绝不触碰 queue_position
    #[instrument(skip(self, policy))]
    pub fn recompute_scores(
        &self,
        now: DateTime<Utc>,
        policy: &SchedulingPolicy,
    ) -> ApiResult<usize> {
        let today = now.date_naive();
        let queue = self.repo.list_queue()?;

        let mut updated = 0usize;
        for order in &queue {
            let score = self.compute_priority_score(order, today, policy);
            self.repo
                .mutate::<ApiError, _>(&order.order_id, now, |o| {
                    o.priority_score = Some(score);
                    Ok(())
                })
                .map_err(ApiError::from)?;
            updated += 1;
        }

        debug!(updated, "队列优先分重算完成");
        Ok(updated)
    }

    /// 当前队列快照(按位置升序)
    pub fn list(&self) -> ApiResult<Vec<ProductionOrder>> {
        self.repo.list_queue().map_err(Into::into)
    }
}
