// ==========================================
// 枪托生产流水排程系统 - 业务错误类型
// ==========================================
// 职责: 定义对外暴露的错误全集,转换仓储错误为业务语义
// 说明: 引擎层与 API 层共用同一套业务错误,不做两级重复定义;
//       批量操作绝不因单项错误中断其他项
// ==========================================

use crate::domain::types::MoveDirection;
use crate::repository::error::{MutateError, RepositoryError};
use thiserror::Error;

/// 业务错误全集
///
/// 除 StoreUnavailable 外均为调用方错误,立即上抛,不做内部恢复;
/// StoreUnavailable 由调用方决定重试,核心不做隐式退避重试
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 拓扑与转移错误
    // ==========================================
    #[error("无效部门: {0}")]
    InvalidDepartment(String),

    #[error("无后继部门: order_id={order_id} 已在终点段 {department}")]
    NoNextDepartment { order_id: String, department: String },

    #[error("订单已报废: order_id={order_id}")]
    AlreadyScrapped { order_id: String },

    #[error("订单未报废: order_id={order_id}")]
    NotScrapped { order_id: String },

    #[error("订单已有补做单: order_id={order_id}, replacement_id={replacement_id}")]
    AlreadyReplaced {
        order_id: String,
        replacement_id: String,
    },

    // ==========================================
    // 队列错误
    // ==========================================
    #[error("已到队列边界: order_id={order_id}, direction={direction}")]
    AtBoundary {
        order_id: String,
        direction: MoveDirection,
    },

    #[error("无效的队列排列: {0}")]
    InvalidOrdering(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将存储层技术错误收敛到业务错误的三个口径
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::OptimisticLockFailure { order_id, expected } => ApiError::Conflict(
                format!("订单{}已被并发修改(expected_revision={})", order_id, expected),
            ),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::LockError(msg)
            | RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::StoreUnavailable(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::StoreUnavailable(format!("字段{}数据异常: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// 闭包变更结果展开: 业务拒绝原样上抛,存储错误走统一收敛
impl From<MutateError<ApiError>> for ApiError {
    fn from(err: MutateError<ApiError>) -> Self {
        match err {
            MutateError::Rejected(e) => e,
            MutateError::Store(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "ProductionOrder".to_string(),
            id: "GS-1001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductionOrder"));
                assert!(msg.contains("GS-1001"));
            }
            _ => panic!("期望 NotFound"),
        }

        let repo_err = RepositoryError::OptimisticLockFailure {
            order_id: "GS-1001".to_string(),
            expected: 3,
        };
        let api_err: ApiError = repo_err.into();
        assert!(matches!(api_err, ApiError::Conflict(_)));

        let repo_err = RepositoryError::LockError("poisoned".to_string());
        let api_err: ApiError = repo_err.into();
        assert!(matches!(api_err, ApiError::StoreUnavailable(_)));
    }

    #[test]
    fn test_mutate_error_unwrap() {
        let rejected: MutateError<ApiError> = MutateError::Rejected(ApiError::AlreadyScrapped {
            order_id: "GS-1001".to_string(),
        });
        assert!(matches!(
            ApiError::from(rejected),
            ApiError::AlreadyScrapped { .. }
        ));

        let store: MutateError<ApiError> =
            MutateError::Store(RepositoryError::DatabaseQueryError("io".to_string()));
        assert!(matches!(ApiError::from(store), ApiError::StoreUnavailable(_)));
    }
}
