// ==========================================
// 献血决策支持系统 - 引擎层
// ==========================================
// 过滤器构建 / 表格查询 / 分组聚合 / 预测 / 趋势分类
// ==========================================

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod grid;
pub mod trend;

pub use aggregate::{year_window_ms, AggregationEngine, ChartData, ChartDataset};
pub use error::{EngineError, EngineResult};
pub use filter::{FilterBuilder, QueryFilter, DAY_CLOSE_MS, MAX_PAGE_LIMIT};
pub use forecast::{Forecaster, MIN_HISTORY_POINTS};
pub use grid::{ComparisonResult, GridQueryEngine, ListResult};
pub use trend::{classify, classify_outcome};
