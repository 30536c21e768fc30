// ==========================================
// 报表API门面集成测试
// ==========================================
// 覆盖: 预测响应封套(标签/双数据集/表格) / 退化降级 /
//       预测序列经 aggregate 的图表视图 / 错误分类
// ==========================================


use blood_donation_dss::{ApiError, ReportApi};
use serde_json::json;
use test_helpers::{create_test_store, seed_event, utc};

/// 2024 年 1-6 月各一场活动,采血量非常数
fn seed_half_year(store: &blood_donation_dss::SqliteObservationStore) {
    let bleeds = [14i64, 18, 11, 22, 16, 25];
    for (i, &bleed) in bleeds.iter().enumerate() {
        seed_event(store, utc(2024, i as u32 + 1, 10), bleed, bleed + 5).expect("播种失败");
    }
}

#[test]
fn test_forecast_envelope_shape() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_half_year(&store);
    let api = ReportApi::new(store);

    let response = api
        .forecast_series("bleed-forecast", utc(2024, 6, 15))
        .expect("预测查询失败");

    // 标签: [年份, Jan..Dec]
    assert_eq!(response.labels.len(), 13);
    assert_eq!(response.labels[0], "2024");
    assert_eq!(response.labels[1], "Jan");
    assert_eq!(response.labels[12], "Dec");

    // 实测数据集: 前导 0 + 6 个月实测 + 尾部留空
    let actual = &response.datasets[0];
    assert_eq!(actual.label.as_deref(), Some("bleed"));
    assert_eq!(actual.data.len(), 13);
    assert_eq!(actual.data[0], Some(0));
    assert_eq!(actual.data[1], Some(14));
    assert_eq!(actual.data[6], Some(25));
    assert_eq!(actual.data[7], None);
    assert_eq!(actual.data[12], None);

    // 预测数据集: 实测接续 6 期预测,虚线样式
    let forecast = &response.datasets[1];
    assert_eq!(forecast.label.as_deref(), Some("forecast"));
    assert_eq!(forecast.data.len(), 13);
    assert_eq!(forecast.data[1], Some(14));
    assert!(forecast.data[7].is_some());
    assert!(forecast.data[12].is_some());
    assert_eq!(forecast.border_dash, Some(vec![10, 5]));

    // 预测点非负
    for cell in &forecast.data[7..] {
        assert!(cell.unwrap() >= 0);
    }

    // 趋势结论非空,状态为展示文本
    assert!(!response.analysis.is_empty());
    assert!(response.status.ends_with("Trend"));
}

#[test]
fn test_forecast_spreadsheet_rows() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_half_year(&store);
    let api = ReportApi::new(store);

    let response = api
        .forecast_series("bleed-forecast", utc(2024, 6, 15))
        .expect("预测查询失败");
    let sheet = &response.spreadsheet;

    assert_eq!(sheet.header.len(), 3);
    assert_eq!(sheet.header[0].key, "timeframe");
    assert_eq!(sheet.body.len(), 12);

    // 实测段: bleed 有值, forecasted 为 "-"
    assert_eq!(sheet.body[0]["timeframe"], json!("2024 Jan"));
    assert_eq!(sheet.body[0]["bleed"], json!(14));
    assert_eq!(sheet.body[0]["forecasted"], json!("-"));

    // 预测段: bleed 为 "-", forecasted 有值
    assert_eq!(sheet.body[6]["timeframe"], json!("2024 Jul"));
    assert_eq!(sheet.body[6]["bleed"], json!("-"));
    assert!(sheet.body[6]["forecasted"].is_i64());
    assert!(sheet.body[11]["forecasted"].is_i64());
}

#[test]
fn test_forecast_deterministic() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_half_year(&store);
    let api = ReportApi::new(store);

    let first = api
        .forecast_series("bleed-forecast", utc(2024, 6, 15))
        .expect("预测查询失败");
    let second = api
        .forecast_series("bleed-forecast", utc(2024, 6, 15))
        .expect("预测查询失败");
    assert_eq!(first.datasets[1].data, second.datasets[1].data);
    assert_eq!(first.status, second.status);
}

#[test]
fn test_forecast_without_history_degrades_to_no_data() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    let api = ReportApi::new(store);

    let response = api
        .forecast_series("bleed-forecast", utc(2024, 6, 15))
        .expect("无数据不应报错");

    assert_eq!(response.status, "No data available");
    assert_eq!(
        response.analysis,
        "For the year 2024, there's no forecasted data available."
    );
    // 历史全零 → 零预测
    let forecast = &response.datasets[1];
    assert!(forecast.data.iter().all(|cell| cell == &Some(0)));
}

#[test]
fn test_full_year_history_has_no_forecast() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    for month in 1u32..=12 {
        seed_event(&store, utc(2024, month, 10), 10 + month as i64, 20).expect("播种失败");
    }
    let api = ReportApi::new(store);

    // 12 月时历史已满,预测水平为 0
    let response = api
        .forecast_series("bleed-forecast", utc(2024, 12, 20))
        .expect("预测查询失败");
    assert_eq!(response.status, "No data available");
    assert_eq!(response.datasets[0].data.len(), 13);
    // 表格预测列全为 "-"
    for row in &response.spreadsheet.body {
        assert_eq!(row["forecasted"], json!("-"));
    }
}

#[test]
fn test_aggregate_routes_forecast_series_to_chart_view() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    seed_half_year(&store);
    let api = ReportApi::new(store);

    let chart = api
        .aggregate("bleed-forecast", None, utc(2024, 6, 15))
        .expect("聚合路由失败");
    assert_eq!(chart.labels.len(), 13);
    assert_eq!(chart.datasets.len(), 2);
    assert_eq!(chart.spreadsheet.body.len(), 12);
}

#[test]
fn test_forecast_on_non_forecast_series_rejected() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    let api = ReportApi::new(store);
    let err = api
        .forecast_series("donor-gender", utc(2024, 6, 15))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidFilter(_)));
}

#[test]
fn test_forecast_unknown_series() {
    let (_tmp, store) = create_test_store().expect("创建测试库失败");
    let api = ReportApi::new(store);
    let err = api
        .forecast_series("no-such-series", utc(2024, 6, 15))
        .unwrap_err();
    assert!(matches!(err, ApiError::UnknownReport(_)));
}
