//! # 图像滤波原语
//!
//! 预处理流程与应变图平滑共用的基础滤波器：
//! - 归一化到 [0, 1]
//! - 中值
//! - 各向同性高斯模糊（可分离卷积，`reflect` 边界，截断 4σ）
//! - 3×3 Sobel 梯度幅值
//! - 圆盘掩模生成
//!
//! ## 依赖关系
//! - 被 `nbed/` 与 `models/disk.rs` 使用
//! - 使用 `ndarray`

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// 高斯核截断半径（以 σ 为单位）
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// 将图像线性映射到 [0, 1]；常数图像返回全零
pub fn normalize(image: &ArrayView2<f64>) -> Array2<f64> {
    let min = image.iter().copied().fold(f64::INFINITY, f64::min);
    let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Array2::zeros(image.raw_dim());
    }
    image.mapv(|v| (v - min) / range)
}

/// 计算中值（偶数长度取中间两数的平均），空输入返回 `None`
pub fn median<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `reflect` 边界下的索引映射（`d c b a | a b c d | d c b a`）
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    let period = 2 * n;
    let mut m = i.rem_euclid(period);
    if m >= n {
        m = period - m - 1;
    }
    m as usize
}

/// 一维归一化高斯核
fn gaussian_kernel_1d(sigma: f64) -> Array1<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel = Array1::from_shape_fn((2 * radius + 1) as usize, |k| {
        let x = k as isize - radius;
        (-((x * x) as f64) / (2.0 * sigma * sigma)).exp()
    });
    let sum = kernel.sum();
    kernel.mapv_inplace(|w| w / sum);
    kernel
}

/// 沿指定轴做一维相关（`reflect` 边界）
fn correlate_axis(image: &ArrayView2<f64>, kernel: &Array1<f64>, axis: Axis) -> Array2<f64> {
    let (nr, nc) = image.dim();
    let radius = (kernel.len() / 2) as isize;
    Array2::from_shape_fn((nr, nc), |(i, j)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let offset = k as isize - radius;
                let value = if axis == Axis(0) {
                    image[[reflect_index(i as isize + offset, nr), j]]
                } else {
                    image[[i, reflect_index(j as isize + offset, nc)]]
                };
                w * value
            })
            .sum()
    })
}

/// 各向同性高斯模糊；`sigma <= 0` 时原样返回
pub fn gaussian_filter(image: &ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if sigma.is_nan() || sigma <= 0.0 || image.is_empty() {
        return image.to_owned();
    }
    let kernel = gaussian_kernel_1d(sigma);
    let rows = correlate_axis(image, &kernel, Axis(0));
    correlate_axis(&rows.view(), &kernel, Axis(1))
}

/// 3×3 Sobel 梯度幅值 `sqrt(gx² + gy²)`（`reflect` 边界）
pub fn sobel_magnitude(image: &ArrayView2<f64>) -> Array2<f64> {
    let (nr, nc) = image.dim();
    let at = |i: usize, j: usize, di: isize, dj: isize| {
        image[[
            reflect_index(i as isize + di, nr),
            reflect_index(j as isize + dj, nc),
        ]]
    };
    Array2::from_shape_fn((nr, nc), |(i, j)| {
        let gx = (at(i, j, -1, 1) + 2.0 * at(i, j, 0, 1) + at(i, j, 1, 1))
            - (at(i, j, -1, -1) + 2.0 * at(i, j, 0, -1) + at(i, j, 1, -1));
        let gy = (at(i, j, 1, -1) + 2.0 * at(i, j, 1, 0) + at(i, j, 1, 1))
            - (at(i, j, -1, -1) + 2.0 * at(i, j, -1, 0) + at(i, j, -1, 1));
        (gx * gx + gy * gy).sqrt()
    })
}

/// 生成二值圆盘：到 `(center_y, center_x)` 距离不超过 `radius` 的像素为 1
pub fn disk_mask(shape: (usize, usize), center_y: f64, center_x: f64, radius: f64) -> Array2<f64> {
    let r2 = radius * radius;
    Array2::from_shape_fn(shape, |(i, j)| {
        let dy = i as f64 - center_y;
        let dx = j as f64 - center_x;
        if dy * dy + dx * dx <= r2 {
            1.0
        } else {
            0.0
        }
    })
}
