// ==========================================
// 献血决策支持系统 - 过滤器构建引擎
// ==========================================
// 职责: 把请求级的可选过滤参数规范化为结构化谓词
// 输入: 报表定义 + QueryFilter + 显式 now
// 输出: Predicate(基础子句 AND 归属 AND 时间窗口 AND 搜索)
// 红线: 空搜索词绝不产生空 OR(空 OR 即"排除一切")
// ==========================================

use crate::domain::predicate::{Clause, Predicate};
use crate::domain::report::{ReportDefinition, TimeBound};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 时间窗口结束端的闭合偏移:一天减一毫秒
/// 调用方给出的是"日"粒度时间戳,闭区间要覆盖到当天最后一毫秒
pub const DAY_CLOSE_MS: i64 = 86_399_999;

/// 单页上限,服务端强制收敛
pub const MAX_PAGE_LIMIT: i64 = 500;

// ==========================================
// QueryFilter - 请求级过滤参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFilter {
    /// 页号,从 1 开始
    pub page: i64,
    /// 单页条数
    pub limit: i64,
    /// 自由文本搜索词
    pub search: Option<String>,
    /// 时间窗口 "<startMillis>-<endMillis>"
    pub timeframe: Option<String>,
    /// 归属机构ID(血库/医院)
    pub owner_id: Option<String>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            timeframe: None,
            owner_id: None,
        }
    }
}

impl QueryFilter {
    /// 校验分页参数并返回收敛后的 (skip, limit)
    pub fn pagination(&self) -> EngineResult<(i64, i64)> {
        if self.page < 1 {
            return Err(EngineError::InvalidFilter(format!(
                "页号必须 >= 1, 实际 {}",
                self.page
            )));
        }
        if self.limit < 1 {
            return Err(EngineError::InvalidFilter(format!(
                "单页条数必须 >= 1, 实际 {}",
                self.limit
            )));
        }
        let limit = self.limit.min(MAX_PAGE_LIMIT);
        Ok(((self.page - 1) * limit, limit))
    }
}

/// 结束时间戳 → 其所在 UTC 日的最后一毫秒
fn close_end_of_day(end_ms: i64) -> i64 {
    const DAY_MS: i64 = 86_400_000;
    end_ms - end_ms.rem_euclid(DAY_MS) + DAY_CLOSE_MS
}

// ==========================================
// FilterBuilder - 过滤器构建引擎
// ==========================================
pub struct FilterBuilder;

impl FilterBuilder {
    /// 解析 "<startMillis>-<endMillis>" 时间窗口
    ///
    /// 结束端闭合到其所在 UTC 日的最后一毫秒,使"日"粒度窗口
    /// 成为闭区间;对日零点时间戳等价于加 DAY_CLOSE_MS
    pub fn parse_timeframe(raw: &str) -> EngineResult<(i64, i64)> {
        let parts: Vec<&str> = raw.split('-').collect();
        if parts.len() != 2 {
            return Err(EngineError::InvalidFilter(format!(
                "时间窗口格式应为 <start>-<end>, 实际 {:?}",
                raw
            )));
        }
        let start: i64 = parts[0].trim().parse().map_err(|_| {
            EngineError::InvalidFilter(format!("时间窗口起点非数值: {:?}", parts[0]))
        })?;
        let end: i64 = parts[1].trim().parse().map_err(|_| {
            EngineError::InvalidFilter(format!("时间窗口终点非数值: {:?}", parts[1]))
        })?;
        Ok((start, close_end_of_day(end)))
    }

    /// 构建列表/计数查询谓词
    ///
    /// 组合顺序(全部 AND):
    /// 1. 报表基础子句
    /// 2. 归属机构子句(owner_id 存在时)
    /// 3. 时间窗口子句(显式窗口优先,否则报表默认时间约束)
    /// 4. 跨列搜索子句(搜索词非空白时)
    pub fn build(
        definition: &ReportDefinition,
        filter: &QueryFilter,
        now: DateTime<Utc>,
    ) -> EngineResult<Predicate> {
        let mut predicate = Predicate::from_clauses(definition.base.clone());

        if let (Some(owner_key), Some(owner_id)) = (&definition.owner_key, &filter.owner_id) {
            predicate.push(Clause::AttrEq {
                key: owner_key.clone(),
                value: owner_id.clone(),
            });
        }

        match &filter.timeframe {
            Some(raw) => {
                let (start_ms, end_ms) = Self::parse_timeframe(raw)?;
                predicate.push(Clause::TimeRange {
                    field: definition.time_field,
                    start_ms: Some(start_ms),
                    end_ms: Some(end_ms),
                });
            }
            None => {
                if let Some(bound) = definition.time_default {
                    let now_ms = now.timestamp_millis();
                    let (start_ms, end_ms) = match bound {
                        TimeBound::FromNow => (Some(now_ms), None),
                        TimeBound::UntilNow => (None, Some(now_ms)),
                    };
                    predicate.push(Clause::TimeRange {
                        field: definition.time_field,
                        start_ms,
                        end_ms,
                    });
                }
            }
        }

        if let Some(term) = filter.search.as_deref() {
            let term = term.trim();
            if !term.is_empty() {
                let keys: Vec<String> = definition
                    .header
                    .iter()
                    .map(|col| col.key.clone())
                    .filter(|key| !definition.search_excluded.contains(key))
                    .collect();
                // keys 为空时不追加子句:零分支的 OR 是"无约束"而非"排除一切"
                if !keys.is_empty() {
                    predicate.push(Clause::SearchAny {
                        keys,
                        term: term.to_string(),
                    });
                }
            }
        }

        Ok(predicate)
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::ColumnDescriptor;
    use crate::domain::types::TimeField;

    fn test_definition() -> ReportDefinition {
        ReportDefinition {
            id: "request-pending".to_string(),
            collection: "request".to_string(),
            header: vec![
                ColumnDescriptor::date("date", "Requested Date"),
                ColumnDescriptor::new("patient", "Patient"),
                ColumnDescriptor::new("bloodtype", "Bloodtype"),
            ],
            base: vec![Clause::AttrEq {
                key: "status".to_string(),
                value: "Pending".to_string(),
            }],
            search_excluded: vec!["date".to_string()],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::CreatedAt,
            time_default: None,
            sort: vec![],
        }
    }

    #[test]
    fn test_blank_search_adds_no_clause() {
        let def = test_definition();
        let base = FilterBuilder::build(&def, &QueryFilter::default(), Utc::now()).unwrap();

        let blank = QueryFilter {
            search: Some("   ".to_string()),
            ..QueryFilter::default()
        };
        let with_blank = FilterBuilder::build(&def, &blank, Utc::now()).unwrap();

        assert_eq!(base, with_blank);
    }

    #[test]
    fn test_search_excludes_strict_keys() {
        let def = test_definition();
        let filter = QueryFilter {
            search: Some("abc".to_string()),
            ..QueryFilter::default()
        };
        let predicate = FilterBuilder::build(&def, &filter, Utc::now()).unwrap();

        let search = predicate
            .clauses
            .iter()
            .find_map(|c| match c {
                Clause::SearchAny { keys, .. } => Some(keys.clone()),
                _ => None,
            })
            .expect("应包含搜索子句");
        assert_eq!(search, vec!["patient".to_string(), "bloodtype".to_string()]);
    }

    #[test]
    fn test_timeframe_closes_end_of_day() {
        // 2024-01-01T00:00:00Z .. 2024-01-31T23:59:59Z
        let (start, end) = FilterBuilder::parse_timeframe("1704067200000-1706745599000").unwrap();
        assert_eq!(start, 1_704_067_200_000);
        // 终点闭合到 2024-01-31T23:59:59.999Z,不越入 2 月
        assert_eq!(end, 1_706_745_599_999);

        // 日零点时间戳等价于加 DAY_CLOSE_MS
        let (_, end) = FilterBuilder::parse_timeframe("1704067200000-1706659200000").unwrap();
        assert_eq!(end, 1_706_659_200_000 + DAY_CLOSE_MS);
    }

    #[test]
    fn test_malformed_timeframe_rejected() {
        assert!(matches!(
            FilterBuilder::parse_timeframe("abc-123"),
            Err(EngineError::InvalidFilter(_))
        ));
        assert!(matches!(
            FilterBuilder::parse_timeframe("123"),
            Err(EngineError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_pagination_validation() {
        let bad_page = QueryFilter {
            page: 0,
            ..QueryFilter::default()
        };
        assert!(bad_page.pagination().is_err());

        let oversized = QueryFilter {
            page: 3,
            limit: 10_000,
            ..QueryFilter::default()
        };
        let (skip, limit) = oversized.pagination().unwrap();
        assert_eq!(limit, MAX_PAGE_LIMIT);
        assert_eq!(skip, 2 * MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_owner_clause_added_when_present() {
        let def = test_definition();
        let filter = QueryFilter {
            owner_id: Some("H001".to_string()),
            ..QueryFilter::default()
        };
        let predicate = FilterBuilder::build(&def, &filter, Utc::now()).unwrap();
        assert!(predicate.clauses.contains(&Clause::AttrEq {
            key: "hospital_id".to_string(),
            value: "H001".to_string(),
        }));
    }
}
