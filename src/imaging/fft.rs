//! # 二维 FFT 原语
//!
//! 基于 `rustfft` 的二维正/逆变换、fftshift 以及相位斜坡平移。
//!
//! ## 约定
//! - 频谱不做 shift，直流分量位于 `[0, 0]`
//! - `ifft2` 带 `1/(nr·nc)` 归一化，与 numpy 一致
//! - 有符号频率索引：`i < ceil(n/2)` 时为 `i`，否则为 `i - n`
//!
//! ## 依赖关系
//! - 被 `nbed/correlate.rs` 与 `registration/` 使用
//! - 使用 `rustfft`、`ndarray`

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// 复数图像
pub type ComplexImage = Array2<Complex64>;

/// 二维正向 FFT（复数输入）
pub fn fft2(data: &ArrayView2<Complex64>) -> ComplexImage {
    let mut out = data.to_owned();
    transform_in_place(&mut out, false);
    out
}

/// 二维正向 FFT（实数输入）
pub fn fft2_real(data: &ArrayView2<f64>) -> ComplexImage {
    let mut out = data.mapv(|v| Complex64::new(v, 0.0));
    transform_in_place(&mut out, false);
    out
}

/// 二维逆 FFT，带 `1/(nr·nc)` 归一化
pub fn ifft2(data: &ArrayView2<Complex64>) -> ComplexImage {
    let mut out = data.to_owned();
    transform_in_place(&mut out, true);
    let n = out.len();
    if n > 0 {
        let scale = 1.0 / n as f64;
        out.mapv_inplace(|v| v * scale);
    }
    out
}

/// 按行、按列依次做一维变换
fn transform_in_place(data: &mut ComplexImage, inverse: bool) {
    let (nr, nc) = data.dim();
    if nr == 0 || nc == 0 {
        return;
    }

    let mut planner = FftPlanner::<f64>::new();
    let (row_fft, col_fft) = if inverse {
        (planner.plan_fft_inverse(nc), planner.plan_fft_inverse(nr))
    } else {
        (planner.plan_fft_forward(nc), planner.plan_fft_forward(nr))
    };

    let mut row_buf = vec![Complex64::default(); nc];
    for mut row in data.rows_mut() {
        for (b, v) in row_buf.iter_mut().zip(row.iter()) {
            *b = *v;
        }
        row_fft.process(&mut row_buf);
        for (v, b) in row.iter_mut().zip(row_buf.iter()) {
            *v = *b;
        }
    }

    let mut col_buf = vec![Complex64::default(); nr];
    for mut col in data.columns_mut() {
        for (b, v) in col_buf.iter_mut().zip(col.iter()) {
            *b = *v;
        }
        col_fft.process(&mut col_buf);
        for (v, b) in col.iter_mut().zip(col_buf.iter()) {
            *v = *b;
        }
    }
}

/// 将零频移到中心（numpy `fftshift`）
pub fn fftshift<T: Clone>(data: &ArrayView2<T>) -> Array2<T> {
    let (nr, nc) = data.dim();
    roll(data, nr / 2, nc / 2)
}

/// `fftshift` 的逆操作（numpy `ifftshift`）
pub fn ifftshift<T: Clone>(data: &ArrayView2<T>) -> Array2<T> {
    let (nr, nc) = data.dim();
    roll(data, nr - nr / 2, nc - nc / 2)
}

/// 循环平移：`out[(i + dr) % nr, (j + dc) % nc] = in[i, j]`
fn roll<T: Clone>(data: &ArrayView2<T>, dr: usize, dc: usize) -> Array2<T> {
    let (nr, nc) = data.dim();
    if nr == 0 || nc == 0 {
        return data.to_owned();
    }
    Array2::from_shape_fn((nr, nc), |(i, j)| {
        let src_i = (i + nr - dr % nr) % nr;
        let src_j = (j + nc - dc % nc) % nc;
        data[[src_i, src_j]].clone()
    })
}

/// 有符号频率索引（即 `ifftshift(arange(-floor(n/2), ceil(n/2)))[i]`）
pub fn signed_frequency(i: usize, n: usize) -> f64 {
    if i < n.div_ceil(2) {
        i as f64
    } else {
        i as f64 - n as f64
    }
}

/// 对频谱乘以相位斜坡，使图像内容平移 `(row_shift, col_shift)` 像素
///
/// 正的平移量把内容移向更大的索引。
pub fn apply_phase_ramp(
    spectrum: &ArrayView2<Complex64>,
    row_shift: f64,
    col_shift: f64,
) -> ComplexImage {
    let (nr, nc) = spectrum.dim();
    Array2::from_shape_fn((nr, nc), |(i, j)| {
        let fr = signed_frequency(i, nr) / nr as f64;
        let fc = signed_frequency(j, nc) / nc as f64;
        let phase = -2.0 * PI * (fr * row_shift + fc * col_shift);
        spectrum[[i, j]] * Complex64::from_polar(1.0, phase)
    })
}

/// 用傅里叶相位斜坡对实数图像做亚像素平移，返回复数结果
pub fn shift_by_phase(image: &ArrayView2<f64>, row_shift: f64, col_shift: f64) -> ComplexImage {
    let spectrum = fft2_real(image);
    let moved = apply_phase_ramp(&spectrum.view(), row_shift, col_shift);
    ifft2(&moved.view())
}
