// ==========================================
// 献血决策支持系统 - API层
// ==========================================

pub mod error;
pub mod report_api;

pub use error::{ApiError, ApiResult};
pub use report_api::{
    ChartResponse, ComparisonResponse, ForecastResponse, ListResponse, ReportApi, Spreadsheet,
    SpreadsheetColumn,
};
