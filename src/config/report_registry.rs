// ==========================================
// 献血决策支持系统 - 内置报表注册表
// ==========================================
// 职责: 以不可变定义描述全部表格报表/图表序列/年度对比
// 红线: 定义在构造期建好,运行期只读按 id 解析;
//       未注册 id 由 API 层映射为 UnknownReport
// 依据: 原系统按字符串分支逐个拼查询,此处固化为配置
// ==========================================

use crate::domain::predicate::{Clause, Measure, SortKey};
use crate::domain::report::{
    ColumnDescriptor, ComparisonDefinition, MeasureDataset, ReportDefinition, SeriesDefinition,
    SeriesKind, SupplySide, TimeBound,
};
use crate::domain::types::{TimeField, BLOOD_TYPES};
use std::collections::HashMap;

/// 默认不参与自由文本搜索的列键
fn strict_search_keys() -> Vec<String> {
    ["date", "quantity", "birthday", "created_at", "modified_at"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// 默认排序: 业务日期倒序,主标签正序
fn default_sort() -> Vec<SortKey> {
    vec![SortKey::desc("date"), SortKey::asc("fullname")]
}

fn attr_eq(key: &str, value: &str) -> Clause {
    Clause::AttrEq {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn attr_ne(key: &str, value: &str) -> Clause {
    Clause::AttrNe {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn not_null(key: &str) -> Clause {
    Clause::AttrNotNull {
        key: key.to_string(),
    }
}

fn blood_type_labels() -> Vec<String> {
    BLOOD_TYPES.iter().map(|s| s.to_string()).collect()
}

// ==========================================
// ReportRegistry - 注册表
// ==========================================
pub struct ReportRegistry {
    reports: HashMap<String, ReportDefinition>,
    series: HashMap<String, SeriesDefinition>,
    comparisons: HashMap<String, ComparisonDefinition>,
}

impl ReportRegistry {
    /// 内置定义全集
    pub fn builtin() -> Self {
        let mut registry = Self {
            reports: HashMap::new(),
            series: HashMap::new(),
            comparisons: HashMap::new(),
        };
        registry.register_reports();
        registry.register_series();
        registry.register_comparisons();
        registry
    }

    pub fn report(&self, id: &str) -> Option<&ReportDefinition> {
        self.reports.get(id)
    }

    pub fn series(&self, id: &str) -> Option<&SeriesDefinition> {
        self.series.get(id)
    }

    pub fn comparison(&self, id: &str) -> Option<&ComparisonDefinition> {
        self.comparisons.get(id)
    }

    fn add_report(&mut self, definition: ReportDefinition) {
        self.reports.insert(definition.id.clone(), definition);
    }

    fn add_series(&mut self, definition: SeriesDefinition) {
        self.series.insert(definition.id.clone(), definition);
    }

    fn add_comparison(&mut self, definition: ComparisonDefinition) {
        self.comparisons.insert(definition.id.clone(), definition);
    }

    // ==========================================
    // 表格报表
    // ==========================================
    fn register_reports(&mut self) {
        // 献血活动排期: 默认只看未来
        self.add_report(ReportDefinition {
            id: "event-schedule".to_string(),
            collection: "event".to_string(),
            header: vec![
                ColumnDescriptor::date("date", "Date").editable(),
                ColumnDescriptor::new("venue", "Venue").editable(),
                ColumnDescriptor::new("chc", "CHC").editable(),
                ColumnDescriptor::new("barangay", "Barangay"),
                ColumnDescriptor::new("bloodbank", "Bloodbank").editable(),
                ColumnDescriptor::new("status", "Status"),
            ],
            base: vec![attr_eq("status", "Active")],
            search_excluded: strict_search_keys(),
            owner_key: None,
            time_field: TimeField::Date,
            time_default: Some(TimeBound::FromNow),
            sort: default_sort(),
        });

        // 献血活动结果: 默认只看过去
        self.add_report(ReportDefinition {
            id: "event-result".to_string(),
            collection: "event".to_string(),
            header: vec![
                ColumnDescriptor::date("date", "Event Date"),
                ColumnDescriptor::new("venue", "Event Venue"),
                ColumnDescriptor::new("bloodbank", "Bloodbank"),
                ColumnDescriptor::new("chc", "CHC"),
                ColumnDescriptor::new("barangay", "Barangay"),
                ColumnDescriptor::new("screened", "Screened"),
                ColumnDescriptor::new("bleed", "Bleed"),
                ColumnDescriptor::new("status", "Status"),
            ],
            base: vec![attr_eq("status", "Active")],
            search_excluded: strict_search_keys(),
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            time_default: Some(TimeBound::UntilNow),
            sort: default_sort(),
        });

        for (id, status) in [
            ("request-pending", "Pending"),
            ("request-approved", "Approved"),
            ("request-rejected", "Declined"),
        ] {
            self.add_report(ReportDefinition {
                id: id.to_string(),
                collection: "request".to_string(),
                header: vec![
                    ColumnDescriptor::new("created_at", "Date Submitted"),
                    ColumnDescriptor::date("date", "Requested Date"),
                    ColumnDescriptor::new("patient", "Patient"),
                    ColumnDescriptor::new("hospital", "Hospital"),
                    ColumnDescriptor::new("diagnosis", "Diagnosis"),
                    ColumnDescriptor::new("bloodtype", "Bloodtype"),
                    ColumnDescriptor::new("bloodbank", "Bloodbank"),
                    ColumnDescriptor::new("status", "Status"),
                ],
                base: vec![attr_eq("status", status)],
                search_excluded: strict_search_keys(),
                owner_key: Some("hospital_id".to_string()),
                time_field: TimeField::CreatedAt,
                time_default: None,
                sort: default_sort(),
            });
        }

        // 申请总报表: 除 Pending 外全部状态
        self.add_report(ReportDefinition {
            id: "request-report".to_string(),
            collection: "request".to_string(),
            header: vec![
                ColumnDescriptor::new("created_at", "Date Submitted"),
                ColumnDescriptor::date("date", "Requested Date"),
                ColumnDescriptor::new("patient", "Patient"),
                ColumnDescriptor::new("hospital", "Hospital"),
                ColumnDescriptor::new("diagnosis", "Diagnosis"),
                ColumnDescriptor::new("bloodtype", "Bloodtype"),
                ColumnDescriptor::new("bloodbank", "Bloodbank"),
                ColumnDescriptor::new("status", "Status"),
            ],
            base: vec![attr_ne("status", "Pending")],
            search_excluded: strict_search_keys(),
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::CreatedAt,
            time_default: None,
            sort: default_sort(),
        });

        // 捐献结果: 成功采血的捐献明细,按日期正序
        self.add_report(ReportDefinition {
            id: "donor-result".to_string(),
            collection: "donor".to_string(),
            header: vec![
                ColumnDescriptor::date("date", "Date Donated"),
                ColumnDescriptor::new("fullname", "Full Name"),
                ColumnDescriptor::new("firstname", "First Name"),
                ColumnDescriptor::new("lastname", "Last Name"),
                ColumnDescriptor::date("birthday", "Birthday"),
                ColumnDescriptor::new("barangay", "Barangay").editable(),
                ColumnDescriptor::new("gender", "Gender"),
                ColumnDescriptor::new("bloodbank", "Blood Bank"),
                ColumnDescriptor::new("bloodtype", "Bloodtype"),
            ],
            base: vec![attr_eq("bleed", "Yes")],
            search_excluded: strict_search_keys(),
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            time_default: None,
            sort: vec![SortKey::asc("date")],
        });

        for (id, role, status, affiliation_label) in [
            ("hospital-active", "hospital", "Active", "Hospital Name"),
            ("hospital-inactive", "hospital", "Inactive", "Hospital Name"),
            ("bloodbank-active", "bloodbank", "Active", "Bloodbank Name"),
            ("bloodbank-inactive", "bloodbank", "Inactive", "Bloodbank Name"),
        ] {
            self.add_report(ReportDefinition {
                id: id.to_string(),
                collection: "user".to_string(),
                header: vec![
                    ColumnDescriptor::new("fullname", "Full Name"),
                    ColumnDescriptor::new("email", "Email"),
                    ColumnDescriptor::new("contact", "Contact").editable(),
                    ColumnDescriptor::new("affiliation", affiliation_label),
                    ColumnDescriptor::new("status", "Status"),
                ],
                base: vec![attr_eq("role", role), attr_eq("status", status)],
                search_excluded: strict_search_keys(),
                owner_key: None,
                time_field: TimeField::CreatedAt,
                time_default: None,
                sort: default_sort(),
            });
        }
    }

    // ==========================================
    // 图表序列
    // ==========================================
    fn register_series(&mut self) {
        // 血液可用量: 供给(捐献) - 需求(已批准申请),按血型分桶
        self.add_series(SeriesDefinition {
            id: "blood-availability".to_string(),
            collection: "donor".to_string(),
            base: vec![],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::SupplyDemand {
                supply: SupplySide {
                    collection: "donor".to_string(),
                    clauses: vec![],
                },
                demand: SupplySide {
                    collection: "request".to_string(),
                    clauses: vec![attr_eq("status", "Approved")],
                },
                group_key: "bloodtype".to_string(),
                labels: blood_type_labels(),
            },
        });

        // 采血量按血型分布(标签取自数据)
        self.add_series(SeriesDefinition {
            id: "bleed-bloodtype".to_string(),
            collection: "donor".to_string(),
            base: vec![attr_eq("bleed", "Yes"), attr_eq("screened", "Yes")],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Category {
                group_key: "bloodtype".to_string(),
                labels: None,
                dataset_label: None,
                year_window: false,
            },
        });

        // 捐献者性别分布
        self.add_series(SeriesDefinition {
            id: "donor-gender".to_string(),
            collection: "donor".to_string(),
            base: vec![not_null("gender"), attr_eq("bleed", "Yes")],
            owner_key: None,
            time_field: TimeField::Date,
            kind: SeriesKind::Category {
                group_key: "gender".to_string(),
                labels: None,
                dataset_label: Some("Gender".to_string()),
                year_window: false,
            },
        });

        // 年内申请量按血型(固定 8 血型补 0)
        self.add_series(SeriesDefinition {
            id: "request-bloodtype".to_string(),
            collection: "request".to_string(),
            base: vec![],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Category {
                group_key: "bloodtype".to_string(),
                labels: Some(blood_type_labels()),
                dataset_label: Some("Total Request by Blood Type".to_string()),
                year_window: true,
            },
        });

        // 年内血袋数量按月求和
        self.add_series(SeriesDefinition {
            id: "request-bloodbag".to_string(),
            collection: "request".to_string(),
            base: vec![],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Month {
                datasets: vec![MeasureDataset {
                    label: "Blood Bag Quantity by Month".to_string(),
                    clauses: vec![],
                    measure: Measure::SumAttr("quantity".to_string()),
                }],
            },
        });

        // 年内申请按月双曲线: 批准/拒绝
        self.add_series(SeriesDefinition {
            id: "request-status".to_string(),
            collection: "request".to_string(),
            base: vec![],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Month {
                datasets: vec![
                    MeasureDataset {
                        label: "Approved Requests".to_string(),
                        clauses: vec![attr_eq("status", "Approved")],
                        measure: Measure::Count,
                    },
                    MeasureDataset {
                        label: "Declined Requests".to_string(),
                        clauses: vec![attr_eq("status", "Declined")],
                        measure: Measure::Count,
                    },
                ],
            },
        });

        // 年内申请总量按月
        self.add_series(SeriesDefinition {
            id: "request-total".to_string(),
            collection: "request".to_string(),
            base: vec![],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Month {
                datasets: vec![MeasureDataset {
                    label: "Total Request by Months".to_string(),
                    clauses: vec![],
                    measure: Measure::Count,
                }],
            },
        });

        // 年内捐献活动量按月
        self.add_series(SeriesDefinition {
            id: "donation-activity".to_string(),
            collection: "donor".to_string(),
            base: vec![],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Month {
                datasets: vec![MeasureDataset {
                    label: "Total Donation by Months".to_string(),
                    clauses: vec![],
                    measure: Measure::Count,
                }],
            },
        });

        // 年内筛查/采血量按月双曲线
        self.add_series(SeriesDefinition {
            id: "bleed-screened".to_string(),
            collection: "event".to_string(),
            base: vec![
                attr_eq("status", "Active"),
                not_null("screened"),
                not_null("bleed"),
            ],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
            kind: SeriesKind::Month {
                datasets: vec![
                    MeasureDataset {
                        label: "screened".to_string(),
                        clauses: vec![],
                        measure: Measure::SumAttr("screened".to_string()),
                    },
                    MeasureDataset {
                        label: "bleed".to_string(),
                        clauses: vec![],
                        measure: Measure::SumAttr("bleed".to_string()),
                    },
                ],
            },
        });

        // 采血量预测: 月度历史 + ARIMA 补全 12 期
        self.add_series(SeriesDefinition {
            id: "bleed-forecast".to_string(),
            collection: "event".to_string(),
            base: vec![
                attr_eq("status", "Active"),
                not_null("bleed"),
                not_null("screened"),
            ],
            owner_key: None,
            time_field: TimeField::Date,
            kind: SeriesKind::Forecast {
                measure: Measure::SumAttr("bleed".to_string()),
                dataset_label: "bleed".to_string(),
            },
        });
    }

    // ==========================================
    // 年度对比
    // ==========================================
    fn register_comparisons(&mut self) {
        self.add_comparison(ComparisonDefinition {
            id: "donor-total".to_string(),
            collection: "donor".to_string(),
            base: vec![attr_eq("bleed", "Yes")],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
        });

        self.add_comparison(ComparisonDefinition {
            id: "event-total".to_string(),
            collection: "event".to_string(),
            base: vec![attr_eq("status", "Active")],
            owner_key: Some("bloodbank_id".to_string()),
            time_field: TimeField::Date,
        });

        self.add_comparison(ComparisonDefinition {
            id: "event-screened".to_string(),
            collection: "event".to_string(),
            base: vec![attr_eq("status", "Active"), not_null("screened")],
            owner_key: None,
            time_field: TimeField::Date,
        });

        self.add_comparison(ComparisonDefinition {
            id: "event-bleed".to_string(),
            collection: "event".to_string(),
            base: vec![attr_eq("status", "Active"), not_null("bleed")],
            owner_key: None,
            time_field: TimeField::Date,
        });

        for (id, status) in [
            ("request-approved", "Approved"),
            ("request-declined", "Declined"),
        ] {
            self.add_comparison(ComparisonDefinition {
                id: id.to_string(),
                collection: "request".to_string(),
                base: vec![attr_eq("status", status)],
                owner_key: Some("hospital_id".to_string()),
                time_field: TimeField::Date,
            });
        }

        self.add_comparison(ComparisonDefinition {
            id: "request-total".to_string(),
            collection: "request".to_string(),
            base: vec![not_null("status")],
            owner_key: Some("hospital_id".to_string()),
            time_field: TimeField::Date,
        });
    }
}

impl Default for ReportRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_report_lookup() {
        let registry = ReportRegistry::builtin();
        let report = registry.report("request-pending").expect("内置报表应存在");
        assert_eq!(report.collection, "request");
        assert!(report
            .base
            .contains(&attr_eq("status", "Pending")));
        assert!(registry.report("no-such-report").is_none());
    }

    #[test]
    fn test_every_report_has_header_and_exclusions() {
        let registry = ReportRegistry::builtin();
        for id in [
            "event-schedule",
            "event-result",
            "request-pending",
            "request-approved",
            "request-rejected",
            "request-report",
            "donor-result",
            "hospital-active",
            "hospital-inactive",
            "bloodbank-active",
            "bloodbank-inactive",
        ] {
            let report = registry.report(id).unwrap_or_else(|| panic!("缺少报表 {}", id));
            assert!(!report.header.is_empty(), "{} 应有列结构", id);
            assert!(
                report.search_excluded.contains(&"date".to_string()),
                "{} 的搜索排除集应含 date",
                id
            );
        }
    }

    #[test]
    fn test_builtin_series_lookup() {
        let registry = ReportRegistry::builtin();
        for id in [
            "blood-availability",
            "bleed-bloodtype",
            "donor-gender",
            "request-bloodtype",
            "request-bloodbag",
            "request-status",
            "request-total",
            "donation-activity",
            "bleed-screened",
            "bleed-forecast",
        ] {
            assert!(registry.series(id).is_some(), "缺少序列 {}", id);
        }
        let forecast = registry.series("bleed-forecast").unwrap();
        assert!(matches!(forecast.kind, SeriesKind::Forecast { .. }));
    }

    #[test]
    fn test_builtin_comparison_lookup() {
        let registry = ReportRegistry::builtin();
        for id in [
            "donor-total",
            "event-total",
            "event-screened",
            "event-bleed",
            "request-approved",
            "request-declined",
            "request-total",
        ] {
            assert!(registry.comparison(id).is_some(), "缺少对比 {}", id);
        }
    }
}
