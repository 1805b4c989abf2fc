// ==========================================
// 枪托生产流水排程系统 - 订单领域模型
// ==========================================
// 红线: production_order 为唯一事实层,引擎写入必须经仓储原子变更
// 红线: model_id/features 为透传载荷,核心不解释其内部结构
// ==========================================

use crate::domain::types::{Department, OrderStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionOrder - 生产订单
// ==========================================
// 对齐: production_order 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    // ===== 主键与别名 =====
    pub order_id: String,                  // 订单唯一标识,创建后不可变
    pub fb_order_number: Option<String>,   // 外部订单别名,仅用于展示

    // ===== 管线位置与状态 =====
    pub current_department: Department,    // 当前部门,仅转移引擎可变更
    pub status: OrderStatus,               // ACTIVE / SCRAPPED(终态)
    pub entered_department_at: DateTime<Utc>, // 进入当前段的时间,转移时重置

    // ===== 时间信息 =====
    pub order_date: Option<NaiveDate>,     // 下单日期
    pub due_date: Option<NaiveDate>,       // 交期(紧急等级唯一读取的载荷字段)

    // ===== 补做单血缘 =====
    pub is_replacement: bool,              // 是否为补做单
    pub replaced_order_id: Option<String>, // 被补做的原单(弱引用,原单必为 SCRAPPED)

    // ===== 报废审计字段(报废时一次性写入,此后不可变) =====
    pub scrap_reason: Option<String>,        // 报废原因
    pub scrap_date: Option<DateTime<Utc>>,   // 报废时间
    pub scrap_disposition: Option<String>,   // 处置方式
    pub scrap_authorization: Option<String>, // 审批人

    // ===== 排程元数据(仅入口段有意义,队列引擎独占写入) =====
    pub priority_score: Option<f64>,  // 派生优先分(建议值,人工顺序优先)
    pub queue_position: Option<i32>,  // 队列位置,入口段内 1..N 连续无重复

    // ===== 透传载荷 =====
    pub model_id: Option<String>,             // 型号,核心不解释
    pub features: Option<serde_json::Value>,  // 自由结构配置,核心不解释

    // ===== 并发与审计 =====
    pub revision: i64,                 // 乐观锁版本号,每次写入 +1
    pub created_at: DateTime<Utc>,     // 记录创建时间
    pub updated_at: DateTime<Utc>,     // 记录更新时间
}

impl ProductionOrder {
    /// 构造一个位于入口段的新订单
    ///
    /// 外部建单与补做单共用此入口;其余字段由调用方按需补充
    pub fn new_at_entry(order_id: String, now: DateTime<Utc>) -> Self {
        Self {
            order_id,
            fb_order_number: None,
            current_department: Department::entry(),
            status: OrderStatus::Active,
            entered_department_at: now,
            order_date: Some(now.date_naive()),
            due_date: None,
            is_replacement: false,
            replaced_order_id: None,
            scrap_reason: None,
            scrap_date: None,
            scrap_disposition: None,
            scrap_authorization: None,
            priority_score: None,
            queue_position: None,
            model_id: None,
            features: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否已报废(终态)
    pub fn is_scrapped(&self) -> bool {
        self.status == OrderStatus::Scrapped
    }

    /// 是否在入口队列中(入口段且已有位置号)
    pub fn is_queued(&self) -> bool {
        self.current_department.is_entry() && self.queue_position.is_some()
    }

    /// 距交期天数(负数表示已超期;交期缺失返回 None)
    pub fn days_to_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    /// 在当前段停留的整天数
    pub fn days_in_department(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entered_department_at).num_days()
    }
}
