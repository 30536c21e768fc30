// ==========================================
// 分组聚合引擎集成测试
// ==========================================
// 覆盖: 月度 12 桶密集性 / 固定血型标签补 0 / 求和度量 /
//       数据驱动标签 / 供需差分 / 日历年窗口
// ==========================================


use blood_donation_dss::{ApiError, ReportApi};
use test_helpers::{create_test_store, seed_donor, seed_request, utc};

#[test]
fn test_month_series_is_dense_12_buckets() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_request(&store, utc(2024, 2, 3), "Approved", "A+", 2).expect("播种失败");
    seed_request(&store, utc(2024, 2, 20), "Declined", "B+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 11, 5), "Approved", "O-", 3).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("request-total", None, utc(2024, 12, 1))
        .expect("聚合失败");

    assert_eq!(chart.labels.len(), 12);
    assert_eq!(chart.labels[0], "Jan");
    assert_eq!(chart.labels[8], "Sept");
    let data = &chart.datasets[0].data;
    assert_eq!(data.len(), 12);
    assert_eq!(data[1], Some(2)); // Feb
    assert_eq!(data[10], Some(1)); // Nov
    assert_eq!(data[0], Some(0)); // 缺失桶补 0
    assert_eq!(data[5], Some(0));
}

#[test]
fn test_year_window_excludes_other_years() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_request(&store, utc(2024, 2, 3), "Approved", "A+", 2).expect("播种失败");
    seed_request(&store, utc(2023, 2, 3), "Approved", "A+", 2).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("request-total", None, utc(2024, 12, 1))
        .expect("聚合失败");
    assert_eq!(chart.datasets[0].data[1], Some(1), "不应统计 2023 年记录");
}

#[test]
fn test_sum_measure_by_month() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_request(&store, utc(2024, 4, 1), "Approved", "A+", 3).expect("播种失败");
    seed_request(&store, utc(2024, 4, 15), "Pending", "B+", 5).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("request-bloodbag", None, utc(2024, 12, 1))
        .expect("聚合失败");
    assert_eq!(chart.datasets[0].label.as_deref(), Some("Blood Bag Quantity by Month"));
    assert_eq!(chart.datasets[0].data[3], Some(8)); // Apr = 3 + 5
}

#[test]
fn test_month_series_multi_dataset_status_split() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_request(&store, utc(2024, 6, 1), "Approved", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 6, 2), "Approved", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 6, 3), "Declined", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 6, 4), "Pending", "A+", 1).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("request-status", None, utc(2024, 12, 1))
        .expect("聚合失败");

    let approved = &chart.datasets[0];
    let declined = &chart.datasets[1];
    assert_eq!(approved.label.as_deref(), Some("Approved Requests"));
    assert_eq!(approved.data[5], Some(2));
    assert_eq!(declined.data[5], Some(1)); // Pending 不计入
}

#[test]
fn test_category_fixed_blood_type_labels_zero_filled() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_request(&store, utc(2024, 3, 1), "Approved", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 3, 2), "Pending", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 3, 3), "Approved", "O-", 1).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("request-bloodtype", None, utc(2024, 12, 1))
        .expect("聚合失败");

    assert_eq!(
        chart.labels,
        vec!["A+", "B+", "AB+", "O+", "A-", "B-", "AB-", "O-"]
    );
    let data = &chart.datasets[0].data;
    assert_eq!(data[0], Some(2)); // A+
    assert_eq!(data[7], Some(1)); // O-
    assert_eq!(data[1], Some(0)); // B+ 无数据补 0
}

#[test]
fn test_category_labels_from_data() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_donor(&store, utc(2024, 1, 5), "A+", "Female").expect("播种失败");
    seed_donor(&store, utc(2024, 1, 6), "A+", "Female").expect("播种失败");
    seed_donor(&store, utc(2024, 1, 7), "A+", "Male").expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("donor-gender", None, utc(2024, 12, 1))
        .expect("聚合失败");

    // 标签取自数据,仓储按桶键排序
    assert_eq!(chart.labels, vec!["Female", "Male"]);
    assert_eq!(chart.datasets[0].data, vec![Some(2), Some(1)]);
}

#[test]
fn test_supply_demand_differencing() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    // 供给: A+ x3
    for day in 1u32..=3 {
        seed_donor(&store, utc(2024, 5, day), "A+", "Male").expect("播种失败");
    }
    // 需求: A+ x1 批准, B+ x2 批准, O+ x1 未批准(不计)
    seed_request(&store, utc(2024, 5, 1), "Approved", "A+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 5, 2), "Approved", "B+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 5, 3), "Approved", "B+", 1).expect("播种失败");
    seed_request(&store, utc(2024, 5, 4), "Pending", "O+", 1).expect("播种失败");
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("blood-availability", None, utc(2024, 12, 1))
        .expect("聚合失败");

    assert_eq!(chart.labels.len(), 8);
    let supply = &chart.datasets[0];
    let demand = &chart.datasets[1];
    assert_eq!(supply.label.as_deref(), Some("Supply"));
    assert_eq!(demand.label.as_deref(), Some("Demand"));

    // A+: max(3-1, 0) = 2, 需求 -1
    assert_eq!(supply.data[0], Some(2));
    assert_eq!(demand.data[0], Some(-1));
    // B+: max(0-2, 0) = 0, 需求 -2
    assert_eq!(supply.data[1], Some(0));
    assert_eq!(demand.data[1], Some(-2));
    // O+: 未批准申请不计入需求
    assert_eq!(demand.data[3], Some(0));
}

#[test]
fn test_unknown_series_id() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    let api = ReportApi::new(store);
    let err = api
        .aggregate("no-such-series", None, utc(2024, 6, 1))
        .unwrap_err();
    assert!(matches!(err, ApiError::UnknownReport(_)));
}
