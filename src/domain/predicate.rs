// ==========================================
// 献血决策支持系统 - 查询谓词值对象
// ==========================================
// 职责: 以显式子句列表表达过滤条件(AND 连接)
// 红线: 谓词是结构化值,不含 SQL 拼接;渲染由仓储层负责
// ==========================================
// 设计说明:
// - 搜索子句 SearchAny 是"零分支即无约束":空 keys 不产生
//   永假的空 OR,这是结构性保证而非调用方约定
// ==========================================

use crate::domain::types::TimeField;
use serde::{Deserialize, Serialize};

// ==========================================
// Clause - 过滤子句
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    /// 属性等值匹配
    AttrEq { key: String, value: String },
    /// 属性不等匹配(缺失属性视为不等,与文档型存储一致)
    AttrNe { key: String, value: String },
    /// 属性存在且非空
    AttrNotNull { key: String },
    /// 时间窗口(闭区间,毫秒;任一端可省略)
    TimeRange {
        field: TimeField,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    },
    /// 跨列大小写不敏感子串搜索(OR 连接)
    /// keys 为空时整个子句视为"无约束"
    SearchAny { keys: Vec<String>, term: String },
}

// ==========================================
// Predicate - 谓词(子句的 AND 组合)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self { clauses: Vec::new() }
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// 追加一个子句(AND)
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

// ==========================================
// GroupKey - 分组维度
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupKey {
    /// 按分类属性分组(血型/性别/状态)
    Attr(String),
    /// 按时间字段的日历月分组(1..=12)
    Month(TimeField),
}

// ==========================================
// Measure - 聚合度量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Measure {
    /// 记录计数
    Count,
    /// 数值属性求和(按整数截断,与原始数据的字符串数值兼容)
    SumAttr(String),
}

// ==========================================
// SortKey - 排序键
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}
