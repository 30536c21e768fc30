// ==========================================
// 献血决策支持系统 - 领域模型层
// ==========================================
// 职责: 定义观测实体、报表配置值、序列/预测值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod observation;
pub mod predicate;
pub mod report;
pub mod series;
pub mod types;

// 重导出核心类型
pub use observation::Observation;
pub use predicate::{Clause, GroupKey, Measure, Predicate, SortKey};
pub use report::{
    ColumnDescriptor, ComparisonDefinition, MeasureDataset, ReportDefinition, SeriesDefinition,
    SeriesKind, SupplySide, TimeBound,
};
pub use series::{ForecastOutcome, Series, SeriesPoint, TrendVerdict};
pub use types::{ColumnType, TimeField, TrendStatus, BLOOD_TYPES, MONTH_LABELS};
