//! # 衍射图样预处理
//!
//! 对单幅衍射图样依次执行：
//! 1. 线性缩放到固定的正动态范围 `[1, 1 + LOG_DYNAMIC_RANGE]`
//! 2. 取自然对数
//! 3. 高斯模糊
//! 4. Sobel 梯度幅值
//! 5. 以中值为基准钳制离群像素（热像素 / 坏像素）
//!
//! ## 依赖关系
//! - 被 `nbed/strain_map.rs` 使用
//! - 使用 `imaging/filters.rs`

use crate::error::{NbedError, Result};
use crate::imaging::filters;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// 对数前的动态范围（16 位探测器满量程）
const LOG_DYNAMIC_RANGE: f64 = 65535.0;

/// 预处理参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreconditionParams {
    /// 高斯模糊标准差（像素）
    pub gaussian_sigma: f64,
    /// 离群钳制倍数，必须 ≥ 1
    pub outlier_factor: f64,
}

impl Default for PreconditionParams {
    fn default() -> Self {
        Self {
            gaussian_sigma: 3.0,
            outlier_factor: 10.0,
        }
    }
}

impl PreconditionParams {
    pub fn validate(&self) -> Result<()> {
        if !self.gaussian_sigma.is_finite() || self.gaussian_sigma < 0.0 {
            return Err(NbedError::InvalidArgument(format!(
                "gaussian sigma must be non-negative, got {}",
                self.gaussian_sigma
            )));
        }
        if !self.outlier_factor.is_finite() || self.outlier_factor < 1.0 {
            return Err(NbedError::InvalidArgument(format!(
                "outlier factor must be at least 1, got {}",
                self.outlier_factor
            )));
        }
        Ok(())
    }
}

/// 检查图样非空且全部为有限值
pub fn check_finite(pattern: &ArrayView2<f64>) -> Result<()> {
    if pattern.is_empty() {
        return Err(NbedError::InvalidInput(
            "diffraction pattern is empty".to_string(),
        ));
    }
    if let Some(((i, j), v)) = pattern.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(NbedError::InvalidInput(format!(
            "diffraction pattern has non-finite value {} at ({}, {})",
            v, i, j
        )));
    }
    Ok(())
}

/// 对数缩放：`ln(1 + LOG_DYNAMIC_RANGE · normalize(pattern))`
pub fn log_scale(pattern: &ArrayView2<f64>) -> Array2<f64> {
    filters::normalize(pattern).mapv(|v| (1.0 + LOG_DYNAMIC_RANGE * v).ln())
}

/// 以中值为基准钳制到 `[median / factor, median · factor]`
///
/// 中值不为正时（例如平坦背景的 Sobel 图）不做钳制。
pub fn clamp_outliers(image: &mut Array2<f64>, factor: f64) {
    let Some(median) = filters::median(image.iter()) else {
        return;
    };
    if median <= 0.0 {
        return;
    }
    let upper = median * factor;
    let lower = median / factor;
    image.mapv_inplace(|v| v.clamp(lower, upper));
}

/// 完整预处理流程
pub fn precondition(pattern: &ArrayView2<f64>, params: &PreconditionParams) -> Result<Array2<f64>> {
    params.validate()?;
    check_finite(pattern)?;

    let logged = log_scale(pattern);
    let blurred = filters::gaussian_filter(&logged.view(), params.gaussian_sigma);
    let mut edges = filters::sobel_magnitude(&blurred.view());
    clamp_outliers(&mut edges, params.outlier_factor);
    Ok(edges)
}
