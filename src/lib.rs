// ==========================================
// 献血决策支持系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 统计报表 + 短期预测的决策支持核心
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

// 配置层 - 报表注册表
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ColumnType, TimeField, TrendStatus, BLOOD_TYPES, MONTH_LABELS};

// 领域实体
pub use domain::{
    Clause, ColumnDescriptor, ComparisonDefinition, ForecastOutcome, GroupKey, Measure,
    Observation, Predicate, ReportDefinition, Series, SeriesDefinition, SeriesKind, SortKey,
    TrendVerdict,
};

// 引擎
pub use engine::{
    AggregationEngine, ChartData, ChartDataset, ComparisonResult, EngineError, EngineResult,
    FilterBuilder, Forecaster, GridQueryEngine, ListResult, QueryFilter,
};

// 仓储
pub use repository::{ObservationStore, RepositoryError, RepositoryResult, SqliteObservationStore};

// 配置
pub use config::ReportRegistry;

// API
pub use api::{ApiError, ApiResult, ChartResponse, ForecastResponse, ReportApi};
