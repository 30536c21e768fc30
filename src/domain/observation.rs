// ==========================================
// 献血决策支持系统 - 观测记录实体
// ==========================================
// 职责: 定义不可变的时间戳观测记录
// 红线: 观测由上游录入创建,本核心只读不改
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 观测记录
///
/// 一条带时间戳的事件记录:献血场次、血液申请、捐献者登记等。
/// 分类属性(血型/状态/归属机构)与数值度量(数量/采血数)统一
/// 存放在 attributes 中,列结构由 ReportDefinition 描述。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// 记录ID
    pub id: String,
    /// 所属集合(event / request / donor / user)
    pub collection: String,
    /// 业务日期
    pub date: DateTime<Utc>,
    /// 提交时间
    pub created_at: DateTime<Utc>,
    /// 分类属性与数值度量
    pub attributes: Map<String, Value>,
}

impl Observation {
    /// 创建新的观测记录(生成随机ID)
    pub fn new(
        collection: &str,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection: collection.to_string(),
            date,
            created_at,
            attributes,
        }
    }

    /// 业务日期的 Unix 毫秒
    pub fn date_ms(&self) -> i64 {
        self.date.timestamp_millis()
    }

    /// 提交时间的 Unix 毫秒
    pub fn created_at_ms(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// 读取字符串属性
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// 读取整数属性(兼容字符串数值)
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
