// ==========================================
// 献血决策支持系统 - 月度计数预测引擎
// ==========================================
// 模型: ARIMA(1,1,1)
// - 一阶差分消除捐献累计量常见的线性漂移
// - AR/MA 各保留一阶,短历史(常少于 12 点)下保持良态
// 输出: 非负整数点预测(四舍五入后在 0 处截断)
// 红线: 退化输入失败关闭(全零预测 + degenerate 标记),
//       绝不因数据稀疏让上层崩溃;无任何随机源,结果可复现
// ==========================================

use crate::domain::series::ForecastOutcome;
use crate::engine::error::{EngineError, EngineResult};
use tracing::{debug, instrument};

/// 拟合所需的最少历史点数
pub const MIN_HISTORY_POINTS: usize = 3;

/// 系数估计的方差下限,低于该值视为数值不可用
const VAR_EPSILON: f64 = 1e-10;

// ==========================================
// Forecaster - ARIMA(1,1,1) 预测器
// ==========================================
pub struct Forecaster;

impl Forecaster {
    pub fn new() -> Self {
        Self
    }

    /// 对月度计数历史做 horizon 步点预测
    ///
    /// # 退化输入(失败关闭)
    /// - 历史少于 MIN_HISTORY_POINTS 点
    /// - 历史为常数序列(含全零)
    /// 返回全零预测并置 degenerate = true,趋势层据此输出 NoData
    ///
    /// # 错误
    /// - 其余数值失败(系数/预测值非有限)→ EngineError::ForecastFit
    #[instrument(skip(self, history), fields(history_len = history.len(), horizon))]
    pub fn forecast(&self, history: &[i64], horizon: usize) -> EngineResult<ForecastOutcome> {
        if horizon == 0 {
            return Ok(ForecastOutcome {
                points: Vec::new(),
                degenerate: false,
            });
        }

        let constant_series = history.windows(2).all(|w| w[0] == w[1]);
        if history.len() < MIN_HISTORY_POINTS || constant_series {
            debug!(
                history_len = history.len(),
                constant = constant_series,
                "历史退化,返回全零预测"
            );
            return Ok(ForecastOutcome::degenerate(horizon));
        }

        let data: Vec<f64> = history.iter().map(|&v| v as f64).collect();
        let raw = fit_and_predict(&data, horizon)?;

        let points = raw
            .into_iter()
            .map(|v| {
                if v.is_finite() {
                    Ok(v.round().max(0.0) as i64)
                } else {
                    Err(EngineError::ForecastFit("预测值非有限数".to_string()))
                }
            })
            .collect::<EngineResult<Vec<i64>>>()?;

        Ok(ForecastOutcome {
            points,
            degenerate: false,
        })
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 拟合与递推(差分尺度)
// ==========================================

/// 一阶差分
fn difference(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// 反差分: 从原序列末值起累加
fn undifference(last_value: f64, forecasts: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(forecasts.len());
    let mut acc = last_value;
    for f in forecasts {
        acc += f;
        result.push(acc);
    }
    result
}

/// Yule-Walker 估计 AR(1) 系数: 滞后 1 自协方差 / 方差
fn estimate_ar1(centered: &[f64]) -> f64 {
    let n = centered.len();
    let var: f64 = centered.iter().map(|x| x * x).sum::<f64>() / n as f64;
    if var.abs() <= VAR_EPSILON {
        return 0.0;
    }
    let cov1: f64 = (1..n).map(|i| centered[i] * centered[i - 1]).sum::<f64>() / n as f64;
    cov1 / var
}

/// 从残差的滞后 1 自相关估计 MA(1) 系数,截断保证稳定
fn estimate_ma1(residuals: &[f64]) -> f64 {
    let n = residuals.len();
    if n == 0 {
        return 0.0;
    }
    let mean: f64 = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|x| x - mean).collect();
    let var: f64 = centered.iter().map(|x| x * x).sum::<f64>() / n as f64;
    if var.abs() <= VAR_EPSILON {
        return 0.0;
    }
    let cov1: f64 = (1..n).map(|i| centered[i] * centered[i - 1]).sum::<f64>() / n as f64;
    (cov1 / var).clamp(-0.99, 0.99)
}

/// ARIMA(1,1,1) 拟合 + horizon 步递推预测(原始尺度)
fn fit_and_predict(data: &[f64], horizon: usize) -> EngineResult<Vec<f64>> {
    let diffed = difference(data);
    let n = diffed.len();
    let mean: f64 = diffed.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = diffed.iter().map(|x| x - mean).collect();

    let phi = estimate_ar1(&centered);

    // 单步样本内预测的残差,供 MA 项使用
    let mut residuals = vec![0.0; n];
    for i in 1..n {
        let predicted = mean + phi * (diffed[i - 1] - mean);
        residuals[i] = diffed[i] - predicted;
    }
    let theta = estimate_ma1(&residuals);

    if !phi.is_finite() || !theta.is_finite() {
        return Err(EngineError::ForecastFit(format!(
            "系数非有限数: phi={}, theta={}",
            phi, theta
        )));
    }

    // 差分尺度递推,未来残差取 0
    let mut extended = diffed;
    let mut last_residual = *residuals.last().unwrap_or(&0.0);
    let mut forecasts = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let last = *extended.last().unwrap_or(&mean);
        let step = mean + phi * (last - mean) + theta * last_residual;
        extended.push(step);
        forecasts.push(step);
        last_residual = 0.0;
    }

    let last_value = *data.last().unwrap_or(&0.0);
    Ok(undifference(last_value, &forecasts))
}
