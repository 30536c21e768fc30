// ==========================================
// 献血决策支持系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 聚合失败随错误携带触发谓词,便于诊断;
//       本层不做任何重试,瞬时失败由调用方决定
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 过滤条件非法(时间窗口/分页参数),在访问存储前拒绝
    #[error("无效过滤条件: {0}")]
    InvalidFilter(String),

    /// 分组聚合执行失败,携带触发谓词
    #[error("聚合查询失败: {message} (predicate={predicate})")]
    Aggregation { message: String, predicate: String },

    /// 预测模型数值拟合失败(调用方降级为"无预测",不崩溃)
    #[error("预测模型拟合失败: {0}")]
    ForecastFit(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
