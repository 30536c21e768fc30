// ==========================================
// 献血决策支持系统 - 观测记录仓储
// ==========================================
// 职责: 把结构化谓词渲染为参数化 SQL 并执行
//       计数 / 分页拉取 / 分组聚合三类查询
// 红线: 所有查询使用参数化,防止 SQL 注入;
//       列键名只允许标识符字符,渲染前校验
// ==========================================
// 存储形态: 单表 observation
// - date_ms / created_at_ms 为 Unix 毫秒整数列
// - 其余分类属性与数值度量放在 attributes JSON 列,
//   经 json_extract 查询(原系统为文档型存储,此处等价实现)
// ==========================================

use crate::domain::observation::Observation;
use crate::domain::predicate::{Clause, GroupKey, Measure, Predicate, SortKey};
use crate::domain::types::TimeField;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ObservationStore - 存储抽象
// ==========================================

/// 分组聚合结果行
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBucket {
    /// 分桶键(分类属性值,或月份 "1".."12")
    pub key: String,
    /// 计数或求和值
    pub value: i64,
}

/// 观测存储抽象
///
/// 本核心对持久层的全部要求:在时间过滤、可分页的记录集上
/// 执行计数 / 排序分页拉取 / 分组计数与求和,返回普通行。
pub trait ObservationStore: Send + Sync {
    /// 写入一条观测(上游数据录入使用,本核心的查询路径不调用)
    fn insert(&self, observation: &Observation) -> RepositoryResult<()>;

    /// 统计满足谓词的记录数
    fn count(&self, collection: &str, predicate: &Predicate) -> RepositoryResult<i64>;

    /// 排序分页拉取
    fn fetch_page(
        &self,
        collection: &str,
        predicate: &Predicate,
        sort: &[SortKey],
        skip: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Observation>>;

    /// 分组计数/求和
    fn group_count(
        &self,
        collection: &str,
        predicate: &Predicate,
        group: &GroupKey,
        measure: &Measure,
    ) -> RepositoryResult<Vec<GroupBucket>>;
}

// ==========================================
// SqliteObservationStore - SQLite 实现
// ==========================================
pub struct SqliteObservationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteObservationStore {
    /// 打开数据库文件并初始化 schema
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

// ==========================================
// 谓词 → SQL 渲染
// ==========================================

/// 校验列键名只含标识符字符(键来自静态配置,仍做硬校验)
fn ensure_ident(key: &str) -> RepositoryResult<()> {
    let mut chars = key.chars();
    let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RepositoryError::FieldValueError {
            field: key.to_string(),
            message: "列键名含非法字符".to_string(),
        })
    }
}

/// 时间字段对应的物理列
fn time_column(field: TimeField) -> &'static str {
    match field {
        TimeField::Date => "date_ms",
        TimeField::CreatedAt => "created_at_ms",
    }
}

/// 列键名 → SQL 取值表达式
///
/// date / created_at 命中物理列,其余键走 attributes JSON
fn column_expr(key: &str) -> RepositoryResult<String> {
    ensure_ident(key)?;
    Ok(match key {
        "date" => "date_ms".to_string(),
        "created_at" => "created_at_ms".to_string(),
        other => format!("json_extract(attributes, '$.{}')", other),
    })
}

/// 把谓词渲染为 WHERE 片段与绑定参数
///
/// 固定以 collection = ? 开头;SearchAny 的空 keys 渲染为
/// 无约束(不产生空 OR)
fn render_predicate(
    collection: &str,
    predicate: &Predicate,
) -> RepositoryResult<(String, Vec<SqlValue>)> {
    let mut fragments = vec!["collection = ?".to_string()];
    let mut params: Vec<SqlValue> = vec![SqlValue::from(collection.to_string())];

    for clause in &predicate.clauses {
        match clause {
            Clause::AttrEq { key, value } => {
                let expr = column_expr(key)?;
                fragments.push(format!("{} = ?", expr));
                params.push(SqlValue::from(value.clone()));
            }
            Clause::AttrNe { key, value } => {
                // 文档型语义: 缺失属性同样视为"不等"
                let expr = column_expr(key)?;
                fragments.push(format!("({expr} IS NULL OR {expr} <> ?)", expr = expr));
                params.push(SqlValue::from(value.clone()));
            }
            Clause::AttrNotNull { key } => {
                let expr = column_expr(key)?;
                fragments.push(format!("{} IS NOT NULL", expr));
            }
            Clause::TimeRange {
                field,
                start_ms,
                end_ms,
            } => {
                let col = time_column(*field);
                if let Some(start) = start_ms {
                    fragments.push(format!("{} >= ?", col));
                    params.push(SqlValue::from(*start));
                }
                if let Some(end) = end_ms {
                    fragments.push(format!("{} <= ?", col));
                    params.push(SqlValue::from(*end));
                }
            }
            Clause::SearchAny { keys, term } => {
                if keys.is_empty() {
                    continue;
                }
                let mut branches = Vec::with_capacity(keys.len());
                for key in keys {
                    let expr = column_expr(key)?;
                    branches.push(format!(
                        "instr(lower(COALESCE(CAST({} AS TEXT), '')), ?) > 0",
                        expr
                    ));
                    params.push(SqlValue::from(term.to_lowercase()));
                }
                fragments.push(format!("({})", branches.join(" OR ")));
            }
        }
    }

    Ok((fragments.join(" AND "), params))
}

/// 渲染排序片段,空排序键返回空串
fn render_sort(sort: &[SortKey]) -> RepositoryResult<String> {
    if sort.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(sort.len());
    for key in sort {
        let expr = column_expr(&key.field)?;
        let dir = if key.descending { "DESC" } else { "ASC" };
        parts.push(format!("{} {}", expr, dir));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// 度量 → SQL 聚合表达式
fn measure_expr(measure: &Measure) -> RepositoryResult<String> {
    Ok(match measure {
        Measure::Count => "COUNT(*)".to_string(),
        Measure::SumAttr(key) => {
            ensure_ident(key)?;
            format!(
                "COALESCE(SUM(CAST(json_extract(attributes, '$.{}') AS INTEGER)), 0)",
                key
            )
        }
    })
}

// ==========================================
// Trait 实现
// ==========================================
impl ObservationStore for SqliteObservationStore {
    fn insert(&self, observation: &Observation) -> RepositoryResult<()> {
        let attributes = serde_json::to_string(&observation.attributes)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO observation (id, collection, date_ms, created_at_ms, attributes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                observation.id,
                observation.collection,
                observation.date_ms(),
                observation.created_at_ms(),
                attributes,
            ],
        )?;
        Ok(())
    }

    fn count(&self, collection: &str, predicate: &Predicate) -> RepositoryResult<i64> {
        let (where_sql, params) = render_predicate(collection, predicate)?;
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM observation WHERE {}", where_sql);
        let total = conn.query_row(&sql, params_from_iter(params), |row| row.get::<_, i64>(0))?;
        Ok(total)
    }

    fn fetch_page(
        &self,
        collection: &str,
        predicate: &Predicate,
        sort: &[SortKey],
        skip: i64,
        limit: i64,
    ) -> RepositoryResult<Vec<Observation>> {
        let (where_sql, mut params) = render_predicate(collection, predicate)?;
        let sort_sql = render_sort(sort)?;
        let sql = format!(
            "SELECT id, collection, date_ms, created_at_ms, attributes \
             FROM observation WHERE {}{} LIMIT ? OFFSET ?",
            where_sql, sort_sql
        );
        params.push(SqlValue::from(limit));
        params.push(SqlValue::from(skip));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut observations = Vec::new();
        for row in rows {
            let (id, collection, date_ms, created_at_ms, attributes) = row?;
            observations.push(Observation {
                id,
                collection,
                date: millis_to_datetime(date_ms),
                created_at: millis_to_datetime(created_at_ms),
                attributes: parse_attributes(&attributes)?,
            });
        }
        Ok(observations)
    }

    fn group_count(
        &self,
        collection: &str,
        predicate: &Predicate,
        group: &GroupKey,
        measure: &Measure,
    ) -> RepositoryResult<Vec<GroupBucket>> {
        let (where_sql, params) = render_predicate(collection, predicate)?;
        let measure_sql = measure_expr(measure)?;

        let bucket_expr = match group {
            GroupKey::Attr(key) => {
                let expr = column_expr(key)?;
                format!("COALESCE(CAST({} AS TEXT), '')", expr)
            }
            GroupKey::Month(field) => format!(
                "CAST(strftime('%m', {} / 1000, 'unixepoch') AS INTEGER)",
                time_column(*field)
            ),
        };

        let sql = format!(
            "SELECT {} AS bucket, {} FROM observation WHERE {} GROUP BY bucket ORDER BY bucket",
            bucket_expr, measure_sql, where_sql
        );

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            let key = match group {
                GroupKey::Attr(_) => row.get::<_, String>(0)?,
                GroupKey::Month(_) => row.get::<_, i64>(0)?.to_string(),
            };
            Ok(GroupBucket {
                key,
                value: row.get::<_, i64>(1)?,
            })
        })?;

        let mut buckets = Vec::new();
        for row in rows {
            buckets.push(row?);
        }
        Ok(buckets)
    }
}

/// Unix 毫秒 → DateTime<Utc>,越界值回退到纪元起点
fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// 解析 attributes JSON 列
fn parse_attributes(raw: &str) -> RepositoryResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(RepositoryError::FieldValueError {
            field: "attributes".to_string(),
            message: "attributes 列不是合法 JSON 对象".to_string(),
        }),
    }
}
