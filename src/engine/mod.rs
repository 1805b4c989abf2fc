// ==========================================
// 枪托生产流水排程系统 - 引擎层
// ==========================================
// 职责: 实现调度业务规则
// 红线: Engine 不拼 SQL,所有判定输出 reason
// ==========================================

pub mod aggregator;
pub mod coordinator;
pub mod events;
pub mod queue;
pub mod transition;
pub mod urgency;

// 重导出核心引擎
pub use aggregator::{DepartmentLoad, OrderSummary, PipelineAggregator};
pub use coordinator::{ScrapAndReplaceOutcome, ScrapReplaceCoordinator};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, PipelineEvent, PipelineEventPublisher,
    PipelineEventType,
};
pub use queue::{AutoPopulateOutcome, QueueEngine};
pub use transition::{BulkTransitionOutcome, TransitionEngine};
pub use urgency::{UrgencyAssessment, UrgencyEngine};
