// ==========================================
// 枪托生产流水排程系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 生产管线调度核心(订单录入/展示等 CRUD 面在外部)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 排程策略
pub mod config;

// API 层 - 业务接口
pub mod api;

// 数据库基础设施(连接初始化/PRAGMA/建表统一)
pub mod db;

// 时钟注入
pub mod clock;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Department, MoveDirection, OrderStatus, StageAlert, UrgencyTier};

// 领域实体
pub use domain::ProductionOrder;

// 引擎
pub use engine::{
    PipelineAggregator, QueueEngine, ScrapReplaceCoordinator, TransitionEngine, UrgencyEngine,
};

// 引擎结果类型
pub use engine::{
    AutoPopulateOutcome, BulkTransitionOutcome, DepartmentLoad, OrderSummary,
    ScrapAndReplaceOutcome, UrgencyAssessment,
};

// 配置
pub use config::SchedulingPolicy;

// 时钟
pub use clock::{Clock, FixedClock, SystemClock};

// API
pub use api::{ApiError, ApiResult, DashboardApi, PipelineApi, QueueApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "枪托生产流水排程系统";

// ==========================================
// 预编译检查
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
