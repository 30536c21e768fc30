// ==========================================
// 献血决策支持系统 - 趋势分类引擎
// ==========================================
// 职责: 把预测序列定性为五类趋势 + NoData
// 判定优先级(固定,不得"更聪明"):
//   Increasing > Decreasing > Fluctuating > Stable > Mixed
// 约定: 相邻相等同时清除 increasing 与 decreasing,
//       但不清除 stable;中间元素的严格局部极值置 fluctuating
// 边界: 空序列 → NoData;单点序列 → Stable
// ==========================================

use crate::domain::series::{ForecastOutcome, TrendVerdict};
use crate::domain::types::TrendStatus;

/// 各趋势类别的固定解读文案
fn analysis_text(status: TrendStatus) -> &'static str {
    match status {
        TrendStatus::Increasing => {
            "The forecasted model indicates a consistent upward trend in blood donation \
             participation over the forecasted period, reflecting a positive growth in \
             community engagement."
        }
        TrendStatus::Decreasing => {
            "The forecasted model signals a consistent decline in blood donation \
             participation. Further analysis is crucial to identify contributing factors \
             and implement strategies to encourage more donors."
        }
        TrendStatus::Fluctuating => {
            "Fluctuations in the forecasted data indicate variability in blood donation \
             participation. Explore contributing factors to better understand the nature \
             of these fluctuations."
        }
        TrendStatus::Stable => {
            "The forecasted model suggests a stable trend in blood donation participation \
             with minimal variation. Evaluate whether this stability aligns with \
             expectations."
        }
        TrendStatus::Mixed => {
            "The data exhibits a mix of trends without a clear pattern. Further \
             investigation is necessary to understand the complex nature of blood \
             donation participation."
        }
        TrendStatus::NoData => "There's no forecasted data available.",
    }
}

fn verdict(status: TrendStatus) -> TrendVerdict {
    TrendVerdict {
        status,
        analysis: analysis_text(status).to_string(),
    }
}

/// 对预测序列做趋势分类
pub fn classify(forecast: &[i64]) -> TrendVerdict {
    if forecast.is_empty() {
        return verdict(TrendStatus::NoData);
    }
    if forecast.len() == 1 {
        return verdict(TrendStatus::Stable);
    }

    let mut increasing = true;
    let mut decreasing = true;
    let mut fluctuating = false;
    let mut stable = true;

    for i in 1..forecast.len() {
        if forecast[i] > forecast[i - 1] {
            decreasing = false;
            stable = false;
        } else if forecast[i] < forecast[i - 1] {
            increasing = false;
            stable = false;
        } else {
            increasing = false;
            decreasing = false;
        }

        // 中间元素的严格局部极值 → 波动
        if i > 1
            && ((forecast[i] > forecast[i - 1] && forecast[i - 1] < forecast[i - 2])
                || (forecast[i] < forecast[i - 1] && forecast[i - 1] > forecast[i - 2]))
        {
            fluctuating = true;
        }
    }

    if increasing {
        verdict(TrendStatus::Increasing)
    } else if decreasing {
        verdict(TrendStatus::Decreasing)
    } else if fluctuating {
        verdict(TrendStatus::Fluctuating)
    } else if stable {
        verdict(TrendStatus::Stable)
    } else {
        verdict(TrendStatus::Mixed)
    }
}

/// 对预测输出做趋势分类
///
/// 退化拟合不看点值(全零会被误判为 Stable),直接 NoData
pub fn classify_outcome(outcome: &ForecastOutcome) -> TrendVerdict {
    if outcome.degenerate || outcome.points.is_empty() {
        return verdict(TrendStatus::NoData);
    }
    classify(&outcome.points)
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increasing() {
        assert_eq!(classify(&[1, 2, 3, 4]).status, TrendStatus::Increasing);
    }

    #[test]
    fn test_decreasing() {
        assert_eq!(classify(&[4, 3, 2, 1]).status, TrendStatus::Decreasing);
    }

    #[test]
    fn test_fluctuating() {
        assert_eq!(classify(&[2, 5, 1, 6, 0]).status, TrendStatus::Fluctuating);
    }

    #[test]
    fn test_stable() {
        assert_eq!(classify(&[3, 3, 3, 3]).status, TrendStatus::Stable);
    }

    #[test]
    fn test_empty_is_no_data() {
        let result = classify(&[]);
        assert_eq!(result.status, TrendStatus::NoData);
        assert!(result
            .analysis
            .to_lowercase()
            .contains("no forecasted data available"));
    }

    #[test]
    fn test_single_point_is_stable() {
        assert_eq!(classify(&[9]).status, TrendStatus::Stable);
    }

    #[test]
    fn test_plateau_then_rise_is_mixed() {
        // 相等对清除 increasing,但序列又非全平 → Mixed
        assert_eq!(classify(&[2, 2, 5]).status, TrendStatus::Mixed);
    }

    #[test]
    fn test_degenerate_outcome_is_no_data() {
        let outcome = ForecastOutcome::degenerate(8);
        assert_eq!(outcome.points, vec![0; 8]);
        assert_eq!(classify_outcome(&outcome).status, TrendStatus::NoData);
    }

    #[test]
    fn test_non_degenerate_zeros_are_stable() {
        let outcome = ForecastOutcome {
            points: vec![0, 0, 0],
            degenerate: false,
        };
        assert_eq!(classify_outcome(&outcome).status, TrendStatus::Stable);
    }
}
