// ==========================================
// 枪托生产流水排程系统 - 引擎层事件发布
// ==========================================
// 职责: 定义管线事件发布 trait,实现依赖倒置
// 说明: 核心定义 trait,下游(刷新/通知层)实现适配器,
//       核心不反向依赖任何下游系统
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 管线事件类型
// ==========================================

/// 管线事件触发类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEventType {
    /// 订单段转移
    DepartmentChanged,
    /// 订单报废
    OrderScrapped,
    /// 补做单创建
    ReplacementCreated,
    /// 入口队列顺序变化
    QueueChanged,
}

impl PipelineEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            PipelineEventType::DepartmentChanged => "DepartmentChanged",
            PipelineEventType::OrderScrapped => "OrderScrapped",
            PipelineEventType::ReplacementCreated => "ReplacementCreated",
            PipelineEventType::QueueChanged => "QueueChanged",
        }
    }
}

/// 管线事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// 事件类型
    pub event_type: PipelineEventType,
    /// 受影响的订单
    pub order_ids: Vec<String>,
    /// 相关部门(段转移为目标段)
    pub department: Option<String>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl PipelineEvent {
    /// 单订单事件
    pub fn single(
        event_type: PipelineEventType,
        order_id: String,
        department: Option<String>,
    ) -> Self {
        Self {
            event_type,
            order_ids: vec![order_id],
            department,
            source: None,
        }
    }

    /// 多订单事件
    pub fn batch(
        event_type: PipelineEventType,
        order_ids: Vec<String>,
        department: Option<String>,
    ) -> Self {
        Self {
            event_type,
            order_ids,
            department,
            source: None,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 管线事件发布者 Trait
pub trait PipelineEventPublisher: Send + Sync {
    /// 发布管线事件
    fn publish(&self, event: PipelineEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景(如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PipelineEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PipelineEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            event_type = event.event_type.as_str(),
            count = event.order_ids.len(),
            "NoOpEventPublisher: 跳过事件发布"
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn PipelineEventPublisher>> 的使用;
/// 发布失败只记日志,绝不让通知问题污染写路径结果
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PipelineEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn PipelineEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 静默发布: 失败降级为 warn 日志
    pub fn publish_quietly(&self, event: PipelineEvent) {
        if let Some(publisher) = &self.inner {
            if let Err(e) = publisher.publish(event) {
                tracing::warn!(error = %e, "管线事件发布失败(已忽略)");
            }
        }
    }
}
