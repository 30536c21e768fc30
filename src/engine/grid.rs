// ==========================================
// 献血决策支持系统 - 表格查询引擎
// ==========================================
// 职责: 报表列表(计数 + 分页拉取 + 行投影)与年度对比计数
// 约定: 超出末页的页号返回空 body 与正确 total,不算错误
// 红线: 年度窗口锚定显式传入的 now,UTC 日历年边界
// ==========================================

use crate::domain::observation::Observation;
use crate::domain::predicate::{Clause, Predicate};
use crate::domain::report::{ColumnDescriptor, ComparisonDefinition, ReportDefinition};
use crate::domain::types::ColumnType;
use crate::engine::aggregate::year_window_ms;
use crate::engine::error::EngineResult;
use crate::engine::filter::{FilterBuilder, QueryFilter};
use crate::repository::observation_repo::ObservationStore;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 输出值对象
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult {
    /// 满足谓词的总记录数(与分页无关)
    pub total: i64,
    /// 可见列结构
    pub header: Vec<ColumnDescriptor>,
    /// 当前页行,键为可见列键,另附 id
    pub body: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub current: i64,
    pub previous: i64,
    pub overall: i64,
    /// 同比解读文案
    pub status: String,
}

// ==========================================
// GridQueryEngine - 表格查询引擎
// ==========================================
pub struct GridQueryEngine {
    store: Arc<dyn ObservationStore>,
}

impl GridQueryEngine {
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self { store }
    }

    /// 报表列表查询: 总数 + 当前页行投影
    #[instrument(skip(self, definition, filter), fields(report_id = %definition.id))]
    pub fn list(
        &self,
        definition: &ReportDefinition,
        filter: &QueryFilter,
        now: DateTime<Utc>,
    ) -> EngineResult<ListResult> {
        let (skip, limit) = filter.pagination()?;
        let predicate = FilterBuilder::build(definition, filter, now)?;

        let total = self.store.count(&definition.collection, &predicate)?;
        let observations = self.store.fetch_page(
            &definition.collection,
            &predicate,
            &definition.sort,
            skip,
            limit,
        )?;

        let visible: Vec<ColumnDescriptor> = definition
            .header
            .iter()
            .filter(|col| col.view)
            .cloned()
            .collect();
        let body = observations
            .iter()
            .map(|obs| project_row(obs, &visible))
            .collect();

        Ok(ListResult {
            total,
            header: visible,
            body,
        })
    }

    /// 年度对比计数: 当年 / 上一年 / 全量,UTC 日历年窗口
    #[instrument(skip(self, definition), fields(report_id = %definition.id))]
    pub fn count_with_comparison(
        &self,
        definition: &ComparisonDefinition,
        owner_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<ComparisonResult> {
        let base = scoped_predicate(&definition.base, &definition.owner_key, owner_id);

        let current = self.count_in_year(definition, &base, now.year())?;
        let previous = self.count_in_year(definition, &base, now.year() - 1)?;
        let overall = self.store.count(&definition.collection, &base)?;

        Ok(ComparisonResult {
            current,
            previous,
            overall,
            status: comparison_status(current, previous),
        })
    }

    fn count_in_year(
        &self,
        definition: &ComparisonDefinition,
        base: &Predicate,
        year: i32,
    ) -> EngineResult<i64> {
        let (start_ms, end_ms) = year_window_ms(year)?;
        let predicate = base.clone().and(Clause::TimeRange {
            field: definition.time_field,
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
        });
        Ok(self.store.count(&definition.collection, &predicate)?)
    }
}

fn scoped_predicate(
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

/// 同比解读文案
///
/// 落后分支保留带符号差值(current - previous 为负)
fn comparison_status(current: i64, previous: i64) -> String {
    if previous == 0 {
        "No data for the previous year".to_string()
    } else if current == previous {
        "Same with previous year".to_string()
    } else if current > previous {
        format!(
            "Shows {} items ahead from ({}) previous year",
            current - previous,
            previous
        )
    } else {
        format!(
            "Shows {} items behind from ({}) previous year",
            current - previous,
            previous
        )
    }
}

// ==========================================
// 行投影
// ==========================================

/// 观测记录 → 表格行(只保留可见列,日期列格式化)
fn project_row(observation: &Observation, visible: &[ColumnDescriptor]) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("id".to_string(), Value::String(observation.id.clone()));
    for col in visible {
        let value = match col.key.as_str() {
            "date" => Value::String(format_date_ms(observation.date_ms())),
            "created_at" => Value::String(format_date_ms(observation.created_at_ms())),
            key => match observation.attributes.get(key) {
                Some(raw) => format_cell(raw, col.col_type),
                None => Value::Null,
            },
        };
        row.insert(col.key.clone(), value);
    }
    row
}

/// 属性值 → 单元格值;日期列的毫秒数值格式化为 YYYY-MM-DD
fn format_cell(raw: &Value, col_type: Option<ColumnType>) -> Value {
    if col_type == Some(ColumnType::Date) {
        if let Some(ms) = raw.as_i64() {
            return Value::String(format_date_ms(ms));
        }
    }
    raw.clone()
}

fn format_date_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .format("%Y-%m-%d")
        .to_string()
}
