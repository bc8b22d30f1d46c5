//! # 掩模内的二维高斯拟合
//!
//! 在圆形掩模内用 Levenberg–Marquardt 拟合各向同性二维高斯：
//!
//! ```text
//! f(y, x) = A · exp(-((y - cy)² + (x - cx)²) / (2σ²)) + B
//! ```
//!
//! 初值取强度加权质心与二阶矩。拟合发散或参数非物理时返回 `None`。
//!
//! ## 依赖关系
//! - 被 `nbed/disks.rs` 使用
//! - 使用 `nalgebra` 求解 5×5 正规方程

use crate::models::DiskPosition;

use nalgebra::{Matrix5, Vector5};
use ndarray::ArrayView2;

const MAX_ITERATIONS: usize = 200;
const INITIAL_LAMBDA: f64 = 1e-3;
const CONVERGENCE_TOL: f64 = 1e-10;
/// 拟合所需的最少像素数
const MIN_SAMPLES: usize = 6;

/// 掩模内的一个像素样本
#[derive(Debug, Clone, Copy)]
struct PixelSample {
    y: f64,
    x: f64,
    value: f64,
}

/// 高斯拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub center: DiskPosition,
    pub sigma: f64,
    pub offset: f64,
}

impl GaussianFit {
    fn from_params(p: &Vector5<f64>) -> Self {
        Self {
            amplitude: p[0],
            center: DiskPosition::new(p[1], p[2]),
            sigma: p[3],
            offset: p[4],
        }
    }

    fn params(&self) -> Vector5<f64> {
        Vector5::new(
            self.amplitude,
            self.center.y,
            self.center.x,
            self.sigma,
            self.offset,
        )
    }

    /// 在 `(y, x)` 处的模型值
    pub fn evaluate(&self, y: f64, x: f64) -> f64 {
        let dy = y - self.center.y;
        let dx = x - self.center.x;
        let s2 = self.sigma * self.sigma;
        self.amplitude * (-(dy * dy + dx * dx) / (2.0 * s2)).exp() + self.offset
    }
}

/// 收集以 `center` 为圆心、`radius` 为半径的圆内像素（裁剪到图像边界）
fn collect_samples(image: &ArrayView2<f64>, center: DiskPosition, radius: f64) -> Vec<PixelSample> {
    let (nr, nc) = image.dim();
    let r2 = radius * radius;
    let y_lo = (center.y - radius).floor().max(0.0) as usize;
    let x_lo = (center.x - radius).floor().max(0.0) as usize;
    let y_hi = ((center.y + radius).ceil().max(-1.0) + 1.0).min(nr as f64) as usize;
    let x_hi = ((center.x + radius).ceil().max(-1.0) + 1.0).min(nc as f64) as usize;

    let mut samples = Vec::new();
    for i in y_lo..y_hi {
        for j in x_lo..x_hi {
            let dy = i as f64 - center.y;
            let dx = j as f64 - center.x;
            if dy * dy + dx * dx <= r2 {
                samples.push(PixelSample {
                    y: i as f64,
                    x: j as f64,
                    value: image[[i, j]],
                });
            }
        }
    }
    samples
}

/// 质心与二阶矩初值
fn initial_guess(samples: &[PixelSample], radius: f64) -> Option<GaussianFit> {
    let min = samples.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
    let max = samples.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
    let amplitude = max - min;
    if !amplitude.is_finite() || amplitude <= 0.0 {
        return None;
    }

    let (mut w_sum, mut y_sum, mut x_sum) = (0.0, 0.0, 0.0);
    for s in samples {
        let w = s.value - min;
        w_sum += w;
        y_sum += w * s.y;
        x_sum += w * s.x;
    }
    let cy = y_sum / w_sum;
    let cx = x_sum / w_sum;

    let moment: f64 = samples
        .iter()
        .map(|s| (s.value - min) * ((s.y - cy).powi(2) + (s.x - cx).powi(2)))
        .sum::<f64>()
        / w_sum;
    let sigma = (moment / 2.0).sqrt().clamp(0.5, radius.max(0.5));

    Some(GaussianFit {
        amplitude,
        center: DiskPosition::new(cy, cx),
        sigma,
        offset: min,
    })
}

/// 残差平方和
fn cost(samples: &[PixelSample], fit: &GaussianFit) -> f64 {
    samples
        .iter()
        .map(|s| (s.value - fit.evaluate(s.y, s.x)).powi(2))
        .sum()
}

/// 正规方程 `JᵀJ` 与 `Jᵀr`
fn normal_equations(samples: &[PixelSample], fit: &GaussianFit) -> (Matrix5<f64>, Vector5<f64>) {
    let mut jtj = Matrix5::<f64>::zeros();
    let mut jtr = Vector5::<f64>::zeros();
    let s2 = fit.sigma * fit.sigma;
    let s3 = s2 * fit.sigma;

    for s in samples {
        let dy = s.y - fit.center.y;
        let dx = s.x - fit.center.x;
        let r2 = dy * dy + dx * dx;
        let e = (-r2 / (2.0 * s2)).exp();
        let ae = fit.amplitude * e;
        let grad = Vector5::new(e, ae * dy / s2, ae * dx / s2, ae * r2 / s3, 1.0);
        let residual = s.value - (ae + fit.offset);
        jtj += grad * grad.transpose();
        jtr += grad * residual;
    }
    (jtj, jtr)
}

/// 在 `image` 中以 `center` 为圆心、`radius` 为半径的掩模内拟合二维高斯
pub fn fit_gaussian_masked(
    image: &ArrayView2<f64>,
    center: DiskPosition,
    radius: f64,
) -> Option<GaussianFit> {
    let samples = collect_samples(image, center, radius);
    if samples.len() < MIN_SAMPLES {
        return None;
    }

    let mut fit = initial_guess(&samples, radius)?;
    let mut current = cost(&samples, &fit);
    let mut lambda = INITIAL_LAMBDA;

    for _ in 0..MAX_ITERATIONS {
        let (jtj, jtr) = normal_equations(&samples, &fit);
        let mut damped = jtj;
        for k in 0..5 {
            damped[(k, k)] += lambda * jtj[(k, k)].max(f64::EPSILON);
        }
        let Some(step) = damped.lu().solve(&jtr) else {
            lambda *= 10.0;
            continue;
        };

        let candidate = GaussianFit::from_params(&(fit.params() + step));
        let candidate_cost = cost(&samples, &candidate);
        if candidate.sigma > 0.0 && candidate_cost.is_finite() && candidate_cost <= current {
            let improvement = current - candidate_cost;
            fit = candidate;
            current = candidate_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= CONVERGENCE_TOL * current.max(f64::MIN_POSITIVE)
                || step.norm() <= CONVERGENCE_TOL
            {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    let valid = fit.params().iter().all(|v| v.is_finite())
        && fit.sigma > 0.0
        && fit.amplitude > 0.0;
    valid.then_some(fit)
}
