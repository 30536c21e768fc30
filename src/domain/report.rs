// ==========================================
// 献血决策支持系统 - 报表/序列/对比定义
// ==========================================
// 职责: 把"按字符串分发"的报表分支固化为不可变配置值
// 红线: 定义在配置期构造,运行期只读
// ==========================================

use crate::domain::predicate::{Clause, Measure, SortKey};
use crate::domain::types::{ColumnType, TimeField};
use serde::{Deserialize, Serialize};

// ==========================================
// ColumnDescriptor - 列描述符
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub col_type: Option<ColumnType>,
    /// 是否出现在表格输出中
    pub view: bool,
    /// 是否允许编辑(仅供前端呈现,本核心不使用)
    pub edit: bool,
}

impl ColumnDescriptor {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            col_type: None,
            view: true,
            edit: false,
        }
    }

    /// 日期列(输出时格式化为 YYYY-MM-DD)
    pub fn date(key: &str, label: &str) -> Self {
        Self {
            col_type: Some(ColumnType::Date),
            ..Self::new(key, label)
        }
    }

    pub fn editable(mut self) -> Self {
        self.edit = true;
        self
    }

    /// 不可见列(参与搜索,但从表格输出中剔除)
    pub fn hidden(mut self) -> Self {
        self.view = false;
        self
    }
}

// ==========================================
// TimeBound - 默认时间约束
// ==========================================
// 部分报表默认只看未来(排期)或只看过去(结果);
// 调用方显式给出时间窗口时,默认约束被替换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBound {
    FromNow,
    UntilNow,
}

// ==========================================
// ReportDefinition - 表格报表定义
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub id: String,
    /// 目标观测集合
    pub collection: String,
    /// 固定列结构
    pub header: Vec<ColumnDescriptor>,
    /// 基础谓词子句(状态/角色约束)
    pub base: Vec<Clause>,
    /// 不参与自由文本搜索的列键(日期/数量/生日类)
    pub search_excluded: Vec<String>,
    /// 归属机构过滤键(bloodbank_id / hospital_id)
    pub owner_key: Option<String>,
    /// 时间窗口作用的字段
    pub time_field: TimeField,
    /// 默认时间约束(显式窗口优先)
    pub time_default: Option<TimeBound>,
    /// 排序键,默认 date desc + 主标签 asc
    pub sort: Vec<SortKey>,
}

// ==========================================
// SeriesDefinition - 图表序列定义
// ==========================================
/// 单个度量数据集(月度序列中一条曲线)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureDataset {
    pub label: String,
    /// 在序列基础谓词之上追加的子句
    pub clauses: Vec<Clause>,
    pub measure: Measure,
}

/// 供给/需求一侧的查询定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplySide {
    pub collection: String,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SeriesKind {
    /// 按分类属性分桶;labels 给定时按固定标签补齐,否则取自数据
    Category {
        group_key: String,
        labels: Option<Vec<String>>,
        dataset_label: Option<String>,
        /// 是否限定在 now 所在日历年
        year_window: bool,
    },
    /// 按日历月分桶,固定 12 桶补 0,可多数据集
    Month { datasets: Vec<MeasureDataset> },
    /// 供需差分:max(supply-demand,0) 与 -demand 双向序列
    SupplyDemand {
        supply: SupplySide,
        demand: SupplySide,
        group_key: String,
        labels: Vec<String>,
    },
    /// 月度历史 + ARIMA 预测补全 12 期
    Forecast {
        measure: Measure,
        dataset_label: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDefinition {
    pub id: String,
    /// 目标观测集合(SupplyDemand 的两侧各自声明集合)
    pub collection: String,
    pub base: Vec<Clause>,
    pub owner_key: Option<String>,
    pub time_field: TimeField,
    pub kind: SeriesKind,
}

// ==========================================
// ComparisonDefinition - 年度对比定义
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonDefinition {
    pub id: String,
    pub collection: String,
    pub base: Vec<Clause>,
    pub owner_key: Option<String>,
    pub time_field: TimeField,
}
