// ==========================================
// 献血决策支持系统 - API层错误类型
// ==========================================
// 职责: 把引擎/仓储错误转换为调用方可见的错误分类
// 约定: ForecastFit 不从 forecast_series 泄出(降级为无预测),
//       超出末页的页号是空结果而非错误
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无效过滤条件: {0}")]
    InvalidFilter(String),

    #[error("未注册的报表: {0}")]
    UnknownReport(String),

    #[error("聚合查询失败: {0}")]
    Aggregation(String),

    #[error("预测模型拟合失败: {0}")]
    ForecastFit(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::DatabaseError(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidFilter(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidFilter(msg) => ApiError::InvalidFilter(msg),
            EngineError::Aggregation { message, predicate } => {
                ApiError::Aggregation(format!("{} (predicate={})", message, predicate))
            }
            EngineError::ForecastFit(msg) => ApiError::ForecastFit(msg),
            EngineError::Repository(err) => err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversion() {
        let err: ApiError = EngineError::InvalidFilter("页号必须 >= 1".to_string()).into();
        assert!(matches!(err, ApiError::InvalidFilter(_)));

        let err: ApiError = EngineError::Aggregation {
            message: "no such column".to_string(),
            predicate: "Predicate { clauses: [] }".to_string(),
        }
        .into();
        match err {
            ApiError::Aggregation(msg) => assert!(msg.contains("predicate=")),
            _ => panic!("Expected Aggregation"),
        }
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: ApiError = RepositoryError::FieldValueError {
            field: "bloodtype".to_string(),
            message: "列键名含非法字符".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::InvalidFilter(_)));
    }
}
