//! # 上采样 DFT 原语
//!
//! - `first_max_index`：按行优先顺序的第一个最大值
//! - `fourier_pad`：未 shift 频谱的居中补零 / 裁剪
//! - `dftups`：只在需要的输出窗口上计算的矩阵乘法 DFT
//!
//! ## 依赖关系
//! - 被 `registration/register.rs` 使用
//! - 使用 `imaging/fft.rs`, `ndarray`

use crate::error::{NbedError, Result};
use crate::imaging::fft::{self, signed_frequency, ComplexImage};

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// 行优先顺序下第一个最大值的位置；空图像或全 NaN 返回 `None`
pub fn first_max_index(image: &ArrayView2<f64>) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (idx, &v) in image.indexed_iter() {
        match best {
            Some((_, max)) if v <= max => {}
            _ if v.is_nan() => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// 将未 shift 的频谱补零或裁剪到 `out_shape`，直流保持在 `[0, 0]`
///
/// 输入与输出的零频分别位于 shift 后的 `floor(n/2)`，结果乘以尺寸比
/// `(out_r·out_c) / (nr·nc)`，使逆变换后的幅值保持不变。
pub fn fourier_pad(
    spectrum: &ArrayView2<Complex64>,
    out_shape: (usize, usize),
) -> Result<ComplexImage> {
    let (nr, nc) = spectrum.dim();
    let (mr, mc) = out_shape;
    if nr == 0 || nc == 0 || mr == 0 || mc == 0 {
        return Err(NbedError::InvalidInput(format!(
            "cannot pad spectrum of shape {:?} to {:?}",
            (nr, nc),
            out_shape
        )));
    }

    let shifted = fft::fftshift(spectrum);
    let row_offset = (mr / 2) as isize - (nr / 2) as isize;
    let col_offset = (mc / 2) as isize - (nc / 2) as isize;
    let scale = (mr * mc) as f64 / (nr * nc) as f64;

    let mut out = Array2::<Complex64>::zeros((mr, mc));
    for ((i, j), &v) in shifted.indexed_iter() {
        let oi = i as isize + row_offset;
        let oj = j as isize + col_offset;
        if (0..mr as isize).contains(&oi) && (0..mc as isize).contains(&oj) {
            out[[oi as usize, oj as usize]] = v * scale;
        }
    }
    Ok(fft::ifftshift(&out.view()))
}

/// 上采样 DFT
///
/// 等价于把 `input` 嵌入 `usfac` 倍大的数组后做 FFT，再取从
/// `(roff, coff)` 起的 `out_shape` 窗口，但不需要补零。
/// 输入直流位于 `[0, 0]`。
pub fn dftups(
    input: &ArrayView2<Complex64>,
    out_shape: (usize, usize),
    usfac: f64,
    roff: f64,
    coff: f64,
) -> ComplexImage {
    let (nr, nc) = input.dim();
    let (nor, noc) = out_shape;

    let kernc = Array2::from_shape_fn((nc, noc), |(k, m)| {
        let phase = -2.0 * PI / (nc as f64 * usfac) * signed_frequency(k, nc) * (m as f64 - coff);
        Complex64::from_polar(1.0, phase)
    });
    let kernr = Array2::from_shape_fn((nor, nr), |(m, k)| {
        let phase = -2.0 * PI / (nr as f64 * usfac) * (m as f64 - roff) * signed_frequency(k, nr);
        Complex64::from_polar(1.0, phase)
    });
    kernr.dot(input).dot(&kernc)
}
