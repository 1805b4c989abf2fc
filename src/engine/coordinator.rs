// ==========================================
// 枪托生产流水排程系统 - 报废补做协调器
// ==========================================
// 红线: 补做失败不回滚报废 —— "已报废未补做"是合法状态,
//       必须作为部分失败结果呈现,绝不吞掉
// ==========================================
// 职责: 将 scrap + create_replacement 组合为单一对外操作
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::ProductionOrder;
use crate::engine::transition::TransitionEngine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// ScrapAndReplaceOutcome - 组合操作结果
// ==========================================
/// 报废补做的组合结果
///
/// 调用方必须同时检查两半: replacement 为 None 时
/// replacement_error 给出原因,报废本身已生效
#[derive(Debug)]
pub struct ScrapAndReplaceOutcome {
    /// 已报废的原单
    pub scrapped: ProductionOrder,
    /// 新建的补做单(第二步失败时为 None)
    pub replacement: Option<ProductionOrder>,
    /// 第二步失败原因
    pub replacement_error: Option<ApiError>,
}

impl ScrapAndReplaceOutcome {
    /// 两步是否都已完成
    pub fn is_complete(&self) -> bool {
        self.replacement.is_some()
    }
}

// ==========================================
// ScrapReplaceCoordinator - 协调器
// ==========================================
pub struct ScrapReplaceCoordinator {
    transition: Arc<TransitionEngine>,
}

impl ScrapReplaceCoordinator {
    /// 创建新的协调器
    pub fn new(transition: Arc<TransitionEngine>) -> Self {
        Self { transition }
    }

    /// 报废并补做
    ///
    /// # 语义
    /// - 先报废;报废失败则整个操作以该错误终止,无任何可见变更
    /// - 报废成功后创建补做单;补做失败不回滚报废,
    ///   以部分失败结果返回(Ok,但 replacement 为 None)
    pub fn scrap_and_replace(
        &self,
        order_id: &str,
        reason: &str,
        disposition: &str,
        authorization: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<ScrapAndReplaceOutcome> {
        let scrapped = self
            .transition
            .scrap(order_id, reason, disposition, authorization, now)?;

        match self.transition.create_replacement(order_id, now) {
            Ok(replacement) => {
                info!(
                    order_id,
                    replacement = %replacement.order_id,
                    "报废补做完成"
                );
                Ok(ScrapAndReplaceOutcome {
                    scrapped,
                    replacement: Some(replacement),
                    replacement_error: None,
                })
            }
            Err(e) => {
                warn!(
                    order_id,
                    error = %e,
                    "报废已生效但补做单创建失败,以部分失败返回"
                );
                Ok(ScrapAndReplaceOutcome {
                    scrapped,
                    replacement: None,
                    replacement_error: Some(e),
                })
            }
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_order_schema};
    use crate::domain::types::{Department, OrderStatus};
    use crate::repository::order_repo::OrderRepository;
    use chrono::TimeZone;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn base_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    fn test_coordinator() -> (ScrapReplaceCoordinator, Arc<TransitionEngine>, Arc<OrderRepository>) {
        let conn = Connection::open_in_memory().expect("内存库打开失败");
        configure_sqlite_connection(&conn).expect("PRAGMA 配置失败");
        init_order_schema(&conn).expect("schema 初始化失败");
        let repo = Arc::new(OrderRepository::from_connection(Arc::new(Mutex::new(conn))));
        let transition = Arc::new(TransitionEngine::new(repo.clone()));
        (
            ScrapReplaceCoordinator::new(transition.clone()),
            transition,
            repo,
        )
    }

    fn insert_order_at(repo: &OrderRepository, order_id: &str, dept: Department) {
        let mut order = crate::domain::order::ProductionOrder::new_at_entry(
            order_id.to_string(),
            base_now(),
        );
        order.current_department = dept;
        order.model_id = Some("AT-X".to_string());
        repo.insert(&order).expect("插入失败");
    }

    #[test]
    fn test_scrap_and_replace_complete() {
        let (coordinator, _transition, repo) = test_coordinator();
        insert_order_at(&repo, "A-200", Department::Finish);

        let outcome = coordinator
            .scrap_and_replace("A-200", "defect", "rework", "mgr1", base_now())
            .expect("组合操作失败");

        assert!(outcome.is_complete());
        assert_eq!(outcome.scrapped.status, OrderStatus::Scrapped);
        assert_eq!(outcome.scrapped.scrap_reason.as_deref(), Some("defect"));

        let replacement = outcome.replacement.expect("应有补做单");
        assert_eq!(replacement.status, OrderStatus::Active);
        assert_eq!(replacement.current_department, Department::entry());
        assert_eq!(replacement.replaced_order_id.as_deref(), Some("A-200"));
        assert!(outcome.replacement_error.is_none());
    }

    #[test]
    fn test_scrap_failure_aborts_whole_operation() {
        let (coordinator, transition, repo) = test_coordinator();
        insert_order_at(&repo, "A-200", Department::Finish);
        transition
            .scrap("A-200", "先行报废", "废弃", "mgr0", base_now())
            .expect("报废失败");

        // 已报废订单再次组合操作: 第一步失败,整体终止
        let err = coordinator
            .scrap_and_replace("A-200", "defect", "rework", "mgr1", base_now())
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyScrapped { .. }));

        // 未产生补做单
        assert!(repo.find_replacement_of("A-200").unwrap().is_none());
    }

    #[test]
    fn test_partial_failure_is_surfaced_not_swallowed() {
        let (coordinator, _transition, repo) = test_coordinator();
        insert_order_at(&repo, "A-300", Department::Finish);

        // 构造第二步必然失败的局面: 先经仓储直插一行占住 A-300 的补做血缘
        // (仓储不做业务校验,恰好用于模拟历史脏数据)
        let mut squatter = crate::domain::order::ProductionOrder::new_at_entry(
            "GS-SQUATTER".to_string(),
            base_now(),
        );
        squatter.is_replacement = true;
        squatter.replaced_order_id = Some("A-300".to_string());
        repo.insert(&squatter).expect("插入失败");

        let outcome = coordinator
            .scrap_and_replace("A-300", "defect", "rework", "mgr1", base_now())
            .expect("组合操作应以部分失败返回,而非 Err");

        // 报废已生效
        assert_eq!(outcome.scrapped.status, OrderStatus::Scrapped);
        assert_eq!(
            repo.get("A-300").unwrap().status,
            OrderStatus::Scrapped,
            "补做失败不回滚报废"
        );

        // 第二步失败被显式呈现
        assert!(!outcome.is_complete());
        assert!(outcome.replacement.is_none());
        assert!(matches!(
            outcome.replacement_error,
            Some(ApiError::AlreadyReplaced { .. })
        ));
    }
}
