// ==========================================
// 献血决策支持系统 - 分组聚合引擎
// ==========================================
// 职责: 执行分类/月度分组计数与求和,产出密集序列
// 红线: 月度序列固定 12 桶,缺失桶补 0,绝不省略
//       (图表与预测模型都依赖无缺口序列)
// 失败策略: 聚合失败包装为 Aggregation 错误并附带触发
//           谓词,本层不重试
// ==========================================

use crate::domain::predicate::{Clause, GroupKey, Measure, Predicate};
use crate::domain::report::{SeriesDefinition, SeriesKind, SupplySide};
use crate::domain::series::{Series, SeriesPoint};
use crate::domain::types::MONTH_LABELS;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::observation_repo::{GroupBucket, ObservationStore};
use crate::repository::RepositoryError;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 图表输出值对象
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// None 表示该期无值(预测图中实测/预测段互补留空)
    pub data: Vec<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<u32>,
    #[serde(rename = "borderDash", skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<Vec<u32>>,
}

impl ChartDataset {
    /// 无空洞的实心数据集
    pub fn solid(label: Option<String>, values: Vec<i64>) -> Self {
        Self {
            label,
            data: values.into_iter().map(Some).collect(),
            fill: None,
            border_dash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

// ==========================================
// 日历年窗口
// ==========================================

/// year 年的 UTC 日历年闭区间(毫秒)
pub fn year_window_ms(year: i32) -> EngineResult<(i64, i64)> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| EngineError::InvalidFilter(format!("非法年份: {}", year)))?;
    let next = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| EngineError::InvalidFilter(format!("非法年份: {}", year)))?;
    Ok((start.timestamp_millis(), next.timestamp_millis() - 1))
}

// ==========================================
// AggregationEngine - 分组聚合引擎
// ==========================================
pub struct AggregationEngine {
    store: Arc<dyn ObservationStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self { store }
    }

    /// 按序列定义产出图表数据(预测序列不在此处理)
    #[instrument(skip(self, definition), fields(series_id = %definition.id))]
    pub fn chart(
        &self,
        definition: &SeriesDefinition,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<ChartData> {
        match &definition.kind {
            SeriesKind::Category {
                group_key,
                labels,
                dataset_label,
                year_window,
            } => self.category_chart(
                definition,
                group_key,
                labels.as_deref(),
                dataset_label.clone(),
                *year_window,
                owner_id,
                now,
            ),
            SeriesKind::Month { datasets } => self.month_chart(definition, datasets, owner_id, now),
            SeriesKind::SupplyDemand {
                supply,
                demand,
                group_key,
                labels,
            } => self.supply_demand_chart(definition, supply, demand, group_key, labels, owner_id),
            SeriesKind::Forecast { .. } => Err(EngineError::InvalidFilter(format!(
                "序列 {} 为预测序列,应通过 forecast_series 查询",
                definition.id
            ))),
        }
    }

    /// 预测序列的月度历史: 当年 1 月至 months 月,密集补 0
    pub fn month_history(
        &self,
        definition: &SeriesDefinition,
        measure: &Measure,
        months: usize,
        now: DateTime<Utc>,
    ) -> EngineResult<Series> {
        let months = months.min(12);
        let mut predicate = Predicate::from_clauses(definition.base.clone());
        let (start_ms, end_ms) = year_window_ms(now.year())?;
        predicate.push(Clause::TimeRange {
            field: definition.time_field,
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
        });

        let buckets = self.group(
            &definition.collection,
            &predicate,
            &GroupKey::Month(definition.time_field),
            measure,
        )?;
        Ok(dense_month_series(&buckets, months))
    }

    // ==========================================
    // 内部实现
    // ==========================================

    fn group(
        &self,
        collection: &str,
        predicate: &Predicate,
        group: &GroupKey,
        measure: &Measure,
    ) -> EngineResult<Vec<GroupBucket>> {
        self.store
            .group_count(collection, predicate, group, measure)
            .map_err(|e| aggregation_error(e, predicate))
    }

    fn scoped(
        &self,
        base: &[Clause],
        owner_key: &Option<String>,
        owner_id: Option<&str>,
    ) -> Predicate {
        let mut predicate = Predicate::from_clauses(base.to_vec());
        if let (Some(key), Some(id)) = (owner_key, owner_id) {
            predicate.push(Clause::AttrEq {
                key: key.clone(),
                value: id.to_string(),
            });
        }
        predicate
    }

    fn category_chart(
        &self,
        definition: &SeriesDefinition,
        group_key: &str,
        fixed_labels: Option<&[String]>,
        dataset_label: Option<String>,
        year_window: bool,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<ChartData> {
        let mut predicate = self.scoped(&definition.base, &definition.owner_key, owner_id);
        if year_window {
            let (start_ms, end_ms) = year_window_ms(now.year())?;
            predicate.push(Clause::TimeRange {
                field: definition.time_field,
                start_ms: Some(start_ms),
                end_ms: Some(end_ms),
            });
        }

        let buckets = self.group(
            &definition.collection,
            &predicate,
            &GroupKey::Attr(group_key.to_string()),
            &Measure::Count,
        )?;

        let (labels, values) = match fixed_labels {
            // 固定标签列表: 缺失桶补 0
            Some(fixed) => {
                let map: HashMap<&str, i64> =
                    buckets.iter().map(|b| (b.key.as_str(), b.value)).collect();
                let values = fixed
                    .iter()
                    .map(|l| map.get(l.as_str()).copied().unwrap_or(0))
                    .collect();
                (fixed.to_vec(), values)
            }
            // 标签取自数据(仓储层按桶键排序,结果确定)
            None => (
                buckets.iter().map(|b| b.key.clone()).collect(),
                buckets.iter().map(|b| b.value).collect(),
            ),
        };

        Ok(ChartData {
            labels,
            datasets: vec![ChartDataset::solid(dataset_label, values)],
        })
    }

    fn month_chart(
        &self,
        definition: &SeriesDefinition,
        datasets: &[crate::domain::report::MeasureDataset],
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<ChartData> {
        let (start_ms, end_ms) = year_window_ms(now.year())?;
        let mut chart_datasets = Vec::with_capacity(datasets.len());

        for dataset in datasets {
            let mut predicate = self.scoped(&definition.base, &definition.owner_key, owner_id);
            for clause in &dataset.clauses {
                predicate.push(clause.clone());
            }
            predicate.push(Clause::TimeRange {
                field: definition.time_field,
                start_ms: Some(start_ms),
                end_ms: Some(end_ms),
            });

            let buckets = self.group(
                &definition.collection,
                &predicate,
                &GroupKey::Month(definition.time_field),
                &dataset.measure,
            )?;
            let series = dense_month_series(&buckets, 12);
            chart_datasets.push(ChartDataset::solid(
                Some(dataset.label.clone()),
                series.values(),
            ));
        }

        Ok(ChartData {
            labels: MONTH_LABELS.iter().map(|s| s.to_string()).collect(),
            datasets: chart_datasets,
        })
    }

    fn supply_demand_chart(
        &self,
        definition: &SeriesDefinition,
        supply: &SupplySide,
        demand: &SupplySide,
        group_key: &str,
        labels: &[String],
        owner_id: Option<&str>,
    ) -> EngineResult<ChartData> {
        let group = GroupKey::Attr(group_key.to_string());

        let supply_pred = self.scoped(&supply.clauses, &definition.owner_key, owner_id);
        let supply_buckets =
            self.group(&supply.collection, &supply_pred, &group, &Measure::Count)?;

        let demand_pred = self.scoped(&demand.clauses, &definition.owner_key, owner_id);
        let demand_buckets =
            self.group(&demand.collection, &demand_pred, &group, &Measure::Count)?;

        // 两侧缺失桶先补 0 再做差分
        let supply_map: HashMap<&str, i64> = supply_buckets
            .iter()
            .map(|b| (b.key.as_str(), b.value))
            .collect();
        let demand_map: HashMap<&str, i64> = demand_buckets
            .iter()
            .map(|b| (b.key.as_str(), b.value))
            .collect();

        let mut available = Vec::with_capacity(labels.len());
        let mut demand_signed = Vec::with_capacity(labels.len());
        for label in labels {
            let s = supply_map.get(label.as_str()).copied().unwrap_or(0);
            let d = demand_map.get(label.as_str()).copied().unwrap_or(0);
            available.push((s - d).max(0));
            demand_signed.push(-d);
        }

        Ok(ChartData {
            labels: labels.to_vec(),
            datasets: vec![
                ChartDataset::solid(Some("Supply".to_string()), available),
                ChartDataset::solid(Some("Demand".to_string()), demand_signed),
            ],
        })
    }
}

/// 分组结果 → 密集月度序列(1..=months,缺失补 0)
fn dense_month_series(buckets: &[GroupBucket], months: usize) -> Series {
    let mut values = vec![0i64; months];
    for bucket in buckets {
        if let Ok(month) = bucket.key.parse::<usize>() {
            if (1..=months).contains(&month) {
                values[month - 1] = bucket.value;
            }
        }
    }
    let points = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| SeriesPoint {
            label: MONTH_LABELS[i].to_string(),
            value,
        })
        .collect();
    Series::new(points)
}

fn aggregation_error(err: RepositoryError, predicate: &Predicate) -> EngineError {
    EngineError::Aggregation {
        message: err.to_string(),
        predicate: format!("{:?}", predicate),
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_month_series_fills_gaps() {
        let buckets = vec![
            GroupBucket {
                key: "2".to_string(),
                value: 5,
            },
            GroupBucket {
                key: "11".to_string(),
                value: 3,
            },
        ];
        let series = dense_month_series(&buckets, 12);
        assert_eq!(series.len(), 12);
        assert_eq!(series.points[1].value, 5);
        assert_eq!(series.points[10].value, 3);
        assert_eq!(series.values().iter().sum::<i64>(), 8);
        assert_eq!(series.points[0].label, "Jan");
    }

    #[test]
    fn test_dense_month_series_ignores_out_of_range() {
        let buckets = vec![GroupBucket {
            key: "7".to_string(),
            value: 4,
        }];
        let series = dense_month_series(&buckets, 5);
        assert_eq!(series.len(), 5);
        assert!(series.values().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_year_window_bounds() {
        let (start, end) = year_window_ms(2024).unwrap();
        assert_eq!(start, 1_704_067_200_000); // 2024-01-01T00:00:00Z
        assert_eq!(end, 1_735_689_599_999); // 2024-12-31T23:59:59.999Z
    }
}
