// ==========================================
// 献血决策支持系统 - 序列与预测值对象
// ==========================================
// 职责: 聚合输出/预测输出/趋势结论的请求级值对象
// 约束: 全部不可变,随请求构造随请求丢弃,不做缓存
// ==========================================

use crate::domain::types::TrendStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// Series - 有序无缺口的 (标签, 值) 序列
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.label.clone()).collect()
    }

    pub fn values(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

// ==========================================
// ForecastOutcome - 预测输出
// ==========================================
// degenerate: 历史过短/常数/全零导致拟合退化,点值全零;
// 趋势分类层据此输出 NoData 而不是 Stable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    /// 非负整数点预测,每期一个
    pub points: Vec<i64>,
    /// 拟合是否退化(失败关闭)
    pub degenerate: bool,
}

impl ForecastOutcome {
    pub fn degenerate(horizon: usize) -> Self {
        Self {
            points: vec![0; horizon],
            degenerate: true,
        }
    }
}

// ==========================================
// TrendVerdict - 趋势结论
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendVerdict {
    pub status: TrendStatus,
    pub analysis: String,
}
