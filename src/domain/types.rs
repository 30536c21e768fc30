// ==========================================
// 献血决策支持系统 - 领域类型定义
// ==========================================
// 职责: 定义报表/预测核心共享的基础类型与常量
// 红线: 类型层不含查询逻辑,不含存储细节
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 血型常量 (Blood Types)
// ==========================================
// 图表桶的固定顺序,缺失桶补 0,不允许省略
pub const BLOOD_TYPES: [&str; 8] = ["A+", "B+", "AB+", "O+", "A-", "B-", "AB-", "O-"];

// ==========================================
// 月份标签 (Month Labels)
// ==========================================
// 月度序列的固定 12 桶标签,索引 0 对应 1 月
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sept", "Oct", "Nov", "Dec",
];

// ==========================================
// 时间字段 (Time Field)
// ==========================================
// 观测记录有两个时间轴: 业务日期 date 与提交时间 created_at
// 报表定义按需选择其一作为时间窗口/分桶字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Date,
    CreatedAt,
}

impl TimeField {
    /// 对应的列键名(与 ColumnDescriptor.key 一致)
    pub fn key(&self) -> &'static str {
        match self {
            TimeField::Date => "date",
            TimeField::CreatedAt => "created_at",
        }
    }
}

// ==========================================
// 列类型 (Column Type)
// ==========================================
// 仅用于表格输出格式化,date 列输出 YYYY-MM-DD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
}

// ==========================================
// 趋势状态 (Trend Status)
// ==========================================
// 预测序列的定性分类,优先级:
// Increasing > Decreasing > Fluctuating > Stable > Mixed
// 空预测序列或退化拟合 → NoData
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    Increasing,
    Decreasing,
    Fluctuating,
    Stable,
    Mixed,
    NoData,
}

impl fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStatus::Increasing => write!(f, "Increasing Trend"),
            TrendStatus::Decreasing => write!(f, "Decreasing Trend"),
            TrendStatus::Fluctuating => write!(f, "Fluctuating Trend"),
            TrendStatus::Stable => write!(f, "Stable Trend"),
            TrendStatus::Mixed => write!(f, "Mixed Trend"),
            TrendStatus::NoData => write!(f, "No data available"),
        }
    }
}
