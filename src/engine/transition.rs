// ==========================================
// 枪托生产流水排程系统 - 管线转移引擎
// ==========================================
// 红线: SCRAPPED 为终态,任何后续转移一律拒绝
// 红线: 除补做单外,订单绝不回流到上游段
// 红线: 报废审计字段一次写入,此后不可变
// ==========================================
// 职责: 单/批量段转移、终态报废、补做单创建
// 状态机: ACTIVE@stage[i] →(progress)→ ACTIVE@stage[i+1] → … → ACTIVE@Shipping
//         ACTIVE@stage[i] →(scrap)→ SCRAPPED →(create_replacement)→ 新单@入口段
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::ProductionOrder;
use crate::domain::types::Department;
use crate::repository::order_repo::OrderRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// BulkTransitionOutcome - 批量转移结果
// ==========================================
// 单项失败绝不回滚其他成功项,两半必须同时呈现
#[derive(Debug)]
pub struct BulkTransitionOutcome {
    /// 转移成功的订单(已落库)
    pub succeeded: Vec<ProductionOrder>,
    /// 失败项: (order_id, 错误)
    pub failed: Vec<(String, ApiError)>,
}

impl BulkTransitionOutcome {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

// ==========================================
// TransitionEngine - 管线转移引擎
// ==========================================
pub struct TransitionEngine {
    repo: Arc<OrderRepository>,
}

impl TransitionEngine {
    /// 创建新的管线转移引擎
    pub fn new(repo: Arc<OrderRepository>) -> Self {
        Self { repo }
    }

    // ==========================================
    // 段转移
    // ==========================================

    /// 将订单推进到下一段(或显式指定的下游段)
    ///
    /// # 语义
    /// - next = explicit_next ?? successor(current)
    /// - 显式目标必须严格位于当前段下游(状态机不回流)
    /// - 成功时原子地: 更新部门、重置进段时间;
    ///   若订单离开入口段,同时清空队列元数据并压实剩余队列位置
    ///
    /// # 错误
    /// - AlreadyScrapped: 订单已报废
    /// - NoNextDepartment: 已在终点段且无显式目标
    /// - InvalidDepartment: 显式目标不在当前段下游
    pub fn progress(
        &self,
        order_id: &str,
        explicit_next: Option<Department>,
        now: DateTime<Utc>,
    ) -> ApiResult<ProductionOrder> {
        let mut left_queue = false;

        let updated = self
            .repo
            .mutate::<ApiError, _>(order_id, now, |order| {
                if order.is_scrapped() {
                    return Err(ApiError::AlreadyScrapped {
                        order_id: order.order_id.clone(),
                    });
                }

                let current = order.current_department;
                let next = match explicit_next {
                    Some(target) => {
                        if target.index() <= current.index() {
                            return Err(ApiError::InvalidDepartment(format!(
                                "{} 不在 {} 的下游,订单不可回流",
                                target, current
                            )));
                        }
                        target
                    }
                    None => current.successor().ok_or_else(|| ApiError::NoNextDepartment {
                        order_id: order.order_id.clone(),
                        department: current.as_str().to_string(),
                    })?,
                };

                if current.is_entry() {
                    left_queue = order.queue_position.is_some();
                    order.queue_position = None;
                    order.priority_score = None;
                }
                order.current_department = next;
                order.entered_department_at = now;
                Ok(())
            })
            .map_err(ApiError::from)?;

        if left_queue {
            self.compact_queue(now)?;
        }

        info!(
            order_id,
            department = %updated.current_department,
            "订单段转移完成"
        );
        Ok(updated)
    }

    /// 批量段转移(同一目标段)
    ///
    /// 逐单独立执行: 每单自行校验下游约束,单项失败不影响其他项
    #[instrument(skip(self, order_ids), fields(count = order_ids.len(), next = %next_dept))]
    pub fn progress_bulk(
        &self,
        order_ids: &[String],
        next_dept: Department,
        now: DateTime<Utc>,
    ) -> BulkTransitionOutcome {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for order_id in order_ids {
            match self.progress(order_id, Some(next_dept), now) {
                Ok(order) => succeeded.push(order),
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "批量转移单项失败");
                    failed.push((order_id.clone(), e));
                }
            }
        }

        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            "批量段转移完成"
        );
        BulkTransitionOutcome { succeeded, failed }
    }

    // ==========================================
    // 报废
    // ==========================================

    /// 报废订单(终态)
    ///
    /// # 语义
    /// - 原子地写入四个审计字段与 scrap_date = now
    /// - current_department 保留最后值供追溯,不重置
    /// - 若订单在入口队列中,移出并压实剩余位置
    /// - 重复报废返回 AlreadyScrapped,首次审计字段不受影响
    pub fn scrap(
        &self,
        order_id: &str,
        reason: &str,
        disposition: &str,
        authorization: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<ProductionOrder> {
        let mut left_queue = false;

        let updated = self
            .repo
            .mutate::<ApiError, _>(order_id, now, |order| {
                if order.is_scrapped() {
                    return Err(ApiError::AlreadyScrapped {
                        order_id: order.order_id.clone(),
                    });
                }

                order.status = crate::domain::types::OrderStatus::Scrapped;
                order.scrap_reason = Some(reason.to_string());
                order.scrap_disposition = Some(disposition.to_string());
                order.scrap_authorization = Some(authorization.to_string());
                order.scrap_date = Some(now);

                left_queue = order.is_queued();
                order.queue_position = None;
                order.priority_score = None;
                Ok(())
            })
            .map_err(ApiError::from)?;

        if left_queue {
            self.compact_queue(now)?;
        }

        info!(
            order_id,
            reason,
            department = %updated.current_department,
            "订单已报废"
        );
        Ok(updated)
    }

    // ==========================================
    // 补做单
    // ==========================================

    /// 为已报废订单创建补做单
    ///
    /// 核心内部唯一的建单路径;其余建单均为外部关心
    ///
    /// # 语义
    /// - 新单以全新 order_id 在入口段以 ACTIVE 起步
    /// - 携带血缘: is_replacement = true, replaced_order_id = 原单
    /// - 复制可继承载荷: model_id、features、due_date、fb_order_number
    ///
    /// # 错误
    /// - NotScrapped: 原单未报废
    /// - AlreadyReplaced: 原单已有补做单(含并发竞争,由唯一索引兜底)
    pub fn create_replacement(
        &self,
        scrapped_order_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<ProductionOrder> {
        let source = self.repo.get(scrapped_order_id)?;

        if !source.is_scrapped() {
            return Err(ApiError::NotScrapped {
                order_id: scrapped_order_id.to_string(),
            });
        }

        if let Some(existing) = self.repo.find_replacement_of(scrapped_order_id)? {
            return Err(ApiError::AlreadyReplaced {
                order_id: scrapped_order_id.to_string(),
                replacement_id: existing.order_id,
            });
        }

        let mut replacement =
            ProductionOrder::new_at_entry(Uuid::new_v4().to_string(), now);
        replacement.fb_order_number = source.fb_order_number.clone();
        replacement.model_id = source.model_id.clone();
        replacement.features = source.features.clone();
        replacement.due_date = source.due_date;
        replacement.is_replacement = true;
        replacement.replaced_order_id = Some(source.order_id.clone());

        match self.repo.insert(&replacement) {
            Ok(()) => {}
            Err(crate::repository::error::RepositoryError::UniqueConstraintViolation(_)) => {
                // 并发竞争: 另一调用已抢先创建,唯一索引拦下本次插入
                let existing = self.repo.find_replacement_of(scrapped_order_id)?;
                return Err(match existing {
                    Some(order) => ApiError::AlreadyReplaced {
                        order_id: scrapped_order_id.to_string(),
                        replacement_id: order.order_id,
                    },
                    None => ApiError::Conflict(format!(
                        "订单{}的补做单创建发生并发冲突",
                        scrapped_order_id
                    )),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            source = scrapped_order_id,
            replacement = %replacement.order_id,
            "补做单已创建"
        );
        Ok(replacement)
    }

    // ==========================================
    // 队列压实
    // ==========================================

    /// 压实入口队列位置为 1..N(保持相对顺序)
    ///
    /// 订单离开队列后调用;仅改写位置有偏差的行,减少写放大
    fn compact_queue(&self, now: DateTime<Utc>) -> ApiResult<()> {
        let queue = self.repo.list_queue()?;

        let changes: Vec<(String, i32)> = queue
            .iter()
            .enumerate()
            .filter_map(|(idx, order)| {
                let expected = idx as i32 + 1;
                if order.queue_position != Some(expected) {
                    Some((order.order_id.clone(), expected))
                } else {
                    None
                }
            })
            .collect();

        if !changes.is_empty() {
            self.repo.apply_queue_positions(&changes, now)?;
        }
        Ok(())
    }
}
