// ==========================================
// API 集成测试辅助工具
// ==========================================
// 职责: 提供临时数据库环境、API 装配与订单构造器
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use tempfile::NamedTempFile;

use gunstock_aps::api::{DashboardApi, PipelineApi, QueueApi};
use gunstock_aps::clock::FixedClock;
use gunstock_aps::config::SchedulingPolicy;
use gunstock_aps::db::{configure_sqlite_connection, init_order_schema};
use gunstock_aps::domain::types::Department;
use gunstock_aps::domain::ProductionOrder;
use gunstock_aps::engine::events::OptionalEventPublisher;
use gunstock_aps::repository::OrderRepository;

/// 基准时刻: 2026-03-10 08:00 UTC
pub fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

pub fn base_today() -> NaiveDate {
    base_now().date_naive()
}

// ==========================================
// API 测试环境
// ==========================================

/// API 测试环境
///
/// 使用临时数据库文件,装配全部 API 与共享固定时钟
pub struct ApiTestEnv {
    pub pipeline_api: PipelineApi,
    pub queue_api: QueueApi,
    pub dashboard_api: DashboardApi,
    pub repo: Arc<OrderRepository>,
    pub clock: Arc<FixedClock>,

    // 临时文件(确保生命周期)
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 以默认策略创建测试环境
    pub fn new() -> Self {
        Self::with_policy(SchedulingPolicy::default())
    }

    /// 以指定策略创建测试环境
    pub fn with_policy(policy: SchedulingPolicy) -> Self {
        let temp_file = NamedTempFile::new().expect("无法创建临时数据库文件");
        let db_path = temp_file
            .path()
            .to_str()
            .expect("临时路径非 UTF-8")
            .to_string();

        let conn = Connection::open(&db_path).expect("无法打开数据库");
        configure_sqlite_connection(&conn).expect("PRAGMA 配置失败");
        init_order_schema(&conn).expect("schema 初始化失败");

        let repo = Arc::new(OrderRepository::from_connection(Arc::new(Mutex::new(conn))));
        let clock = Arc::new(FixedClock::at(base_now()));

        let pipeline_api = PipelineApi::new(
            repo.clone(),
            clock.clone(),
            OptionalEventPublisher::none(),
        );
        let queue_api = QueueApi::new(
            repo.clone(),
            clock.clone(),
            OptionalEventPublisher::none(),
            policy.clone(),
        );
        let dashboard_api = DashboardApi::new(repo.clone(), clock.clone(), policy);

        Self {
            pipeline_api,
            queue_api,
            dashboard_api,
            repo,
            clock,
            _temp_file: temp_file,
        }
    }

    /// 插入订单(测试数据准备)
    pub fn insert(&self, order: &ProductionOrder) {
        self.repo.insert(order).expect("测试订单插入失败");
    }

    /// 断言入口队列位置为 1..N 连续无重复
    pub fn assert_queue_contiguous(&self) {
        let queue = self.queue_api.list().expect("队列读取失败");
        for (idx, order) in queue.iter().enumerate() {
            assert_eq!(
                order.queue_position,
                Some(idx as i32 + 1),
                "队列位置必须为 1..N 连续: {:?}",
                queue
                    .iter()
                    .map(|o| (o.order_id.clone(), o.queue_position))
                    .collect::<Vec<_>>()
            );
        }
    }
}

// ==========================================
// 订单构造器
// ==========================================

/// 订单构造器(测试数据准备)
pub struct OrderBuilder {
    order: ProductionOrder,
}

impl OrderBuilder {
    pub fn new(order_id: &str) -> Self {
        Self {
            order: ProductionOrder::new_at_entry(order_id.to_string(), base_now()),
        }
    }

    pub fn department(mut self, dept: Department) -> Self {
        self.order.current_department = dept;
        self
    }

    /// 距基准日期的交期偏移(天,可为负)
    pub fn due_in_days(mut self, days: i64) -> Self {
        self.order.due_date = Some(base_today() + Duration::days(days));
        self
    }

    pub fn model(mut self, model_id: &str) -> Self {
        self.order.model_id = Some(model_id.to_string());
        self
    }

    pub fn features(mut self, features: serde_json::Value) -> Self {
        self.order.features = Some(features);
        self
    }

    pub fn fb_number(mut self, fb: &str) -> Self {
        self.order.fb_order_number = Some(fb.to_string());
        self
    }

    pub fn queued_at(mut self, position: i32) -> Self {
        self.order.queue_position = Some(position);
        self
    }

    pub fn entered_days_ago(mut self, days: i64) -> Self {
        self.order.entered_department_at = base_now() - Duration::days(days);
        self
    }

    pub fn build(self) -> ProductionOrder {
        self.order
    }
}
