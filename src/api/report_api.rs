// ==========================================
// 献血决策支持系统 - 报表API门面
// ==========================================
// 职责: 按 id 解析注册表定义,编排引擎,返回可序列化 DTO
// 约定: 未注册 id → UnknownReport;预测拟合失败在此降级为
//       "无预测 + NoData",绝不向调用方抛 ForecastFit
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ReportRegistry;
use crate::domain::series::ForecastOutcome;
use crate::domain::types::{TrendStatus, MONTH_LABELS};
use crate::engine::aggregate::{AggregationEngine, ChartData, ChartDataset};
use crate::engine::error::EngineError;
use crate::engine::filter::QueryFilter;
use crate::engine::forecast::Forecaster;
use crate::engine::grid::{ComparisonResult, GridQueryEngine, ListResult};
use crate::engine::trend;
use crate::repository::observation_repo::ObservationStore;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{instrument, warn};

/// 表格报表响应
pub type ListResponse = ListResult;
/// 年度对比响应
pub type ComparisonResponse = ComparisonResult;

// ==========================================
// 图表/预测响应 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetColumn {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spreadsheet {
    pub header: Vec<SpreadsheetColumn>,
    pub body: Vec<Map<String, Value>>,
}

impl Spreadsheet {
    /// 非预测图表不带表格数据,返回空壳
    pub fn empty() -> Self {
        Self {
            header: Vec::new(),
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartResponse {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub spreadsheet: Spreadsheet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// 趋势解读文案
    pub analysis: String,
    /// 趋势状态(展示文本)
    pub status: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub spreadsheet: Spreadsheet,
}

// ==========================================
// ReportApi - 报表API门面
// ==========================================
pub struct ReportApi {
    registry: ReportRegistry,
    grid: GridQueryEngine,
    aggregation: AggregationEngine,
    forecaster: Forecaster,
}

impl ReportApi {
    /// 使用内置注册表创建
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self::with_registry(store, ReportRegistry::builtin())
    }

    /// 使用自定义注册表创建(测试/扩展用)
    pub fn with_registry(store: Arc<dyn ObservationStore>, registry: ReportRegistry) -> Self {
        Self {
            registry,
            grid: GridQueryEngine::new(store.clone()),
            aggregation: AggregationEngine::new(store),
            forecaster: Forecaster::new(),
        }
    }

    /// 表格报表: 计数 + 分页行
    #[instrument(skip(self, filter))]
    pub fn list_report(
        &self,
        report_id: &str,
        filter: &QueryFilter,
        now: DateTime<Utc>,
    ) -> ApiResult<ListResponse> {
        let definition = self
            .registry
            .report(report_id)
            .ok_or_else(|| ApiError::UnknownReport(report_id.to_string()))?;
        Ok(self.grid.list(definition, filter, now)?)
    }

    /// 年度对比计数: 当年/上一年/全量 + 同比文案
    #[instrument(skip(self))]
    pub fn count_with_comparison(
        &self,
        report_id: &str,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<ComparisonResponse> {
        let definition = self
            .registry
            .comparison(report_id)
            .ok_or_else(|| ApiError::UnknownReport(report_id.to_string()))?;
        Ok(self.grid.count_with_comparison(definition, owner_id, now)?)
    }

    /// 图表序列聚合
    ///
    /// 预测序列在此返回其图表部分(不含趋势解读)
    #[instrument(skip(self))]
    pub fn aggregate(
        &self,
        series_id: &str,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<ChartResponse> {
        let definition = self
            .registry
            .series(series_id)
            .ok_or_else(|| ApiError::UnknownReport(series_id.to_string()))?;

        if matches!(
            definition.kind,
            crate::domain::report::SeriesKind::Forecast { .. }
        ) {
            let forecast = self.forecast_series(series_id, now)?;
            return Ok(ChartResponse {
                labels: forecast.labels,
                datasets: forecast.datasets,
                spreadsheet: forecast.spreadsheet,
            });
        }

        let ChartData { labels, datasets } = self.aggregation.chart(definition, owner_id, now)?;
        Ok(ChartResponse {
            labels,
            datasets,
            spreadsheet: Spreadsheet::empty(),
        })
    }

    /// 预测序列: 月度历史 + ARIMA 预测 + 趋势结论
    ///
    /// 水平 = 12 - 历史月数(历史覆盖当年 1 月至 now 所在月);
    /// 拟合失败降级为零预测 + NoData,不向调用方抛错
    #[instrument(skip(self))]
    pub fn forecast_series(
        &self,
        series_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<ForecastResponse> {
        let definition = self
            .registry
            .series(series_id)
            .ok_or_else(|| ApiError::UnknownReport(series_id.to_string()))?;
        let crate::domain::report::SeriesKind::Forecast {
            measure,
            dataset_label,
        } = &definition.kind
        else {
            return Err(ApiError::InvalidFilter(format!(
                "序列 {} 不是预测序列",
                series_id
            )));
        };

        let months = now.month() as usize;
        let history = self
            .aggregation
            .month_history(definition, measure, months, now)?;
        let actuals = history.values();
        let horizon = 12usize.saturating_sub(actuals.len());

        let outcome = match self.forecaster.forecast(&actuals, horizon) {
            Ok(outcome) => outcome,
            Err(EngineError::ForecastFit(msg)) => {
                warn!(series_id, error = %msg, "预测拟合失败,降级为零预测");
                ForecastOutcome::degenerate(horizon)
            }
            Err(err) => return Err(err.into()),
        };

        let verdict = trend::classify_outcome(&outcome);
        let year = now.year();
        let analysis = if verdict.status == TrendStatus::NoData {
            format!(
                "For the year {}, there's no forecasted data available.",
                year
            )
        } else {
            verdict.analysis
        };

        Ok(ForecastResponse {
            analysis,
            status: verdict.status.to_string(),
            labels: forecast_labels(year),
            datasets: forecast_datasets(dataset_label, &actuals, &outcome.points),
            spreadsheet: forecast_spreadsheet(year, &actuals, &outcome.points),
        })
    }
}

// ==========================================
// 预测响应装配
// ==========================================

/// 标签: [年份, Jan..Dec],共 13 项
fn forecast_labels(year: i32) -> Vec<String> {
    let mut labels = Vec::with_capacity(13);
    labels.push(year.to_string());
    labels.extend(MONTH_LABELS.iter().map(|s| s.to_string()));
    labels
}

/// 双数据集: 实测段(尾部留空) + 预测段(实测接续,虚线)
fn forecast_datasets(
    dataset_label: &str,
    actuals: &[i64],
    forecast: &[i64],
) -> Vec<ChartDataset> {
    let mut actual_data: Vec<Option<i64>> = Vec::with_capacity(13);
    actual_data.push(Some(0));
    actual_data.extend(actuals.iter().map(|&v| Some(v)));
    actual_data.resize(13, None);

    let mut forecast_data: Vec<Option<i64>> = Vec::with_capacity(13);
    forecast_data.push(Some(0));
    forecast_data.extend(actuals.iter().map(|&v| Some(v)));
    forecast_data.extend(forecast.iter().map(|&v| Some(v)));

    vec![
        ChartDataset {
            label: Some(dataset_label.to_string()),
            data: actual_data,
            fill: Some(1),
            border_dash: None,
        },
        ChartDataset {
            label: Some("forecast".to_string()),
            data: forecast_data,
            fill: Some(1),
            border_dash: Some(vec![10, 5]),
        },
    ]
}

/// 12 行表格: 实测段 bleed 列有值,预测段 forecasted 列有值,
/// 其余为 "-"(0 是有效值,照常输出)
fn forecast_spreadsheet(year: i32, actuals: &[i64], forecast: &[i64]) -> Spreadsheet {
    let header = vec![
        SpreadsheetColumn {
            key: "timeframe".to_string(),
            label: "Timeframe".to_string(),
        },
        SpreadsheetColumn {
            key: "bleed".to_string(),
            label: "Total Bleed".to_string(),
        },
        SpreadsheetColumn {
            key: "forecasted".to_string(),
            label: "Forecasting".to_string(),
        },
    ];

    let body = (0..12)
        .map(|i| {
            let mut row = Map::new();
            row.insert(
                "timeframe".to_string(),
                json!(format!("{} {}", year, MONTH_LABELS[i])),
            );
            let bleed = match actuals.get(i) {
                Some(&v) => json!(v),
                None => json!("-"),
            };
            let forecasted = if i >= actuals.len() {
                match forecast.get(i - actuals.len()) {
                    Some(&v) => json!(v),
                    None => json!("-"),
                }
            } else {
                json!("-")
            };
            row.insert("bleed".to_string(), bleed);
            row.insert("forecasted".to_string(), forecasted);
            row
        })
        .collect();

    Spreadsheet { header, body }
}
