//! # 亚像素傅里叶配准
//!
//! Guizar-Sicairos 高效亚像素配准：
//! - `usfac = 0`：只计算误差与全局相位差
//! - `usfac = 1`：逆 FFT 互相关的整像素峰值
//! - `usfac > 1`：先在 2 倍补零的互相关上定位（半像素精度），
//!   `usfac > 2` 时再在 `ceil(1.5·usfac)` 的窗口上用矩阵乘法 DFT 细化
//!
//! 返回的位移满足：`fft_a` 对应的图像等于 `fft_b` 对应的图像平移
//! `(row_shift, col_shift)`，正值指向更大的索引。
//!
//! ## 依赖关系
//! - 被 `registration/stack.rs` 使用
//! - 使用 `registration/dft.rs`, `imaging/fft.rs`

use super::dft::{self, first_max_index};
use crate::error::{NbedError, Result};
use crate::imaging::fft::{self, signed_frequency, ComplexImage};

use ndarray::{ArrayView2, Zip};
use rustfft::num_complex::Complex64;

/// 配准结果
#[derive(Debug, Clone)]
pub struct Registration {
    pub row_shift: f64,
    pub col_shift: f64,
    /// 全局相位差（弧度）
    pub phase_diff: f64,
    /// 平移不变的归一化 RMS 误差
    pub error: f64,
    /// 平移并补偿相位后的 `fft_b`
    pub registered: ComplexImage,
}

/// 互功率谱 `A·conj(B)`
fn cross_power(fft_a: &ArrayView2<Complex64>, fft_b: &ArrayView2<Complex64>) -> ComplexImage {
    let mut out = fft_a.to_owned();
    Zip::from(&mut out).and(fft_b).for_each(|a, &b| *a *= b.conj());
    out
}

fn peak(cc: &ComplexImage) -> Result<(usize, usize)> {
    first_max_index(&cc.mapv(|c| c.norm()).view()).ok_or_else(|| {
        NbedError::InvalidInput("cross-correlation has no finite maximum".to_string())
    })
}

/// 对两幅图像的 FFT（直流在 `[0, 0]`，不做 shift）做亚像素配准
pub fn dft_registration(
    fft_a: &ArrayView2<Complex64>,
    fft_b: &ArrayView2<Complex64>,
    usfac: usize,
) -> Result<Registration> {
    if fft_a.dim() != fft_b.dim() {
        return Err(NbedError::shape_mismatch(
            "registration",
            fft_a.shape(),
            fft_b.shape(),
        ));
    }
    let (nr, nc) = fft_a.dim();
    if nr == 0 || nc == 0 {
        return Err(NbedError::InvalidInput("cannot register empty images".to_string()));
    }
    let n = (nr * nc) as f64;
    let product = cross_power(fft_a, fft_b);

    let (mut row_shift, mut col_shift, cc_max) = match usfac {
        0 => (0.0, 0.0, product.sum()),
        1 => {
            let cc = fft::ifft2(&product.view());
            let (r, c) = peak(&cc)?;
            (signed_frequency(r, nr), signed_frequency(c, nc), cc[[r, c]] * n)
        }
        _ => {
            let padded = dft::fourier_pad(&product.view(), (2 * nr, 2 * nc))?;
            let cc = fft::ifft2(&padded.view());
            let (r, c) = peak(&cc)?;
            let mut cc_max = cc[[r, c]] * n;
            let mut row = signed_frequency(r, 2 * nr) / 2.0;
            let mut col = signed_frequency(c, 2 * nc) / 2.0;

            if usfac > 2 {
                let u = usfac as f64;
                row = (row * u).round_ties_even() / u;
                col = (col * u).round_ties_even() / u;
                let window = (1.5 * u).ceil();
                let dftshift = (window / 2.0).trunc();
                let side = window as usize;

                let conj_product = product.mapv(|c| c.conj());
                let cc = dft::dftups(
                    &conj_product.view(),
                    (side, side),
                    u,
                    dftshift - row * u,
                    dftshift - col * u,
                )
                .mapv(|c| c.conj());
                let (rloc, cloc) = peak(&cc)?;
                cc_max = cc[[rloc, cloc]];
                row += (rloc as f64 - dftshift) / u;
                col += (cloc as f64 - dftshift) / u;
            }
            (row, col, cc_max)
        }
    };

    if nr == 1 {
        row_shift = 0.0;
    }
    if nc == 1 {
        col_shift = 0.0;
    }

    let energy_a: f64 = fft_a.iter().map(|c| c.norm_sqr()).sum();
    let energy_b: f64 = fft_b.iter().map(|c| c.norm_sqr()).sum();
    let error = (1.0 - cc_max.norm_sqr() / (energy_a * energy_b)).abs().sqrt();
    let phase_diff = cc_max.arg();

    let global_phase = Complex64::from_polar(1.0, phase_diff);
    let registered = if usfac == 0 {
        fft_b.mapv(|c| c * global_phase)
    } else {
        fft::apply_phase_ramp(fft_b, row_shift, col_shift).mapv(|c| c * global_phase)
    };

    Ok(Registration {
        row_shift,
        col_shift,
        phase_diff,
        error,
        registered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn blob_image(shape: (usize, usize)) -> Array2<f64> {
        let (nr, nc) = shape;
        Array2::from_shape_fn(shape, |(i, j)| {
            let dy = i as f64 - nr as f64 / 2.0 + 3.0;
            let dx = j as f64 - nc as f64 / 2.0 - 2.0;
            let dy2 = i as f64 - nr as f64 / 3.0;
            let dx2 = j as f64 - 2.0 * nc as f64 / 3.0;
            5.0 * (-(dy * dy + dx * dx) / 18.0).exp()
                + 3.0 * (-(dy2 * dy2 + 0.5 * dx2 * dx2) / 8.0).exp()
        })
    }

    fn shifted_pair(shape: (usize, usize), row: f64, col: f64) -> (ComplexImage, ComplexImage) {
        let original = fft::fft2_real(&blob_image(shape).view());
        let moved = fft::apply_phase_ramp(&original.view(), row, col);
        (moved, original)
    }

    #[test]
    fn test_integer_shift_recovered() {
        for &(shape, row, col) in &[((64, 64), 3.0, -5.0), ((48, 57), -7.0, 4.0)] {
            let (a, b) = shifted_pair(shape, row, col);
            let reg = dft_registration(&a.view(), &b.view(), 1).unwrap();
            assert_abs_diff_eq!(reg.row_shift, row, epsilon = 1e-9);
            assert_abs_diff_eq!(reg.col_shift, col, epsilon = 1e-9);
            assert!(reg.error < 1e-6);
            assert_abs_diff_eq!(reg.phase_diff, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fractional_shift_recovered_to_hundredth() {
        let (a, b) = shifted_pair((64, 64), 2.37, -1.12);
        let reg = dft_registration(&a.view(), &b.view(), 100).unwrap();
        assert_abs_diff_eq!(reg.row_shift, 2.37, epsilon = 0.01);
        assert_abs_diff_eq!(reg.col_shift, -1.12, epsilon = 0.01);
        assert!(reg.error < 1e-3);
    }

    #[test]
    fn test_half_pixel_stage() {
        let (a, b) = shifted_pair((32, 40), 1.5, -2.5);
        let reg = dft_registration(&a.view(), &b.view(), 2).unwrap();
        assert_abs_diff_eq!(reg.row_shift, 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(reg.col_shift, -2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_registered_fft_matches_reference() {
        let (a, b) = shifted_pair((32, 32), 4.0, 2.0);
        let reg = dft_registration(&a.view(), &b.view(), 10).unwrap();
        for (x, y) in reg.registered.iter().zip(a.iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-6);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_error_and_phase_only() {
        let (_, b) = shifted_pair((16, 16), 0.0, 0.0);
        let rotated = b.mapv(|c| c * Complex64::from_polar(1.0, 0.3));
        let reg = dft_registration(&rotated.view(), &b.view(), 0).unwrap();
        assert_eq!((reg.row_shift, reg.col_shift), (0.0, 0.0));
        assert_abs_diff_eq!(reg.phase_diff, 0.3, epsilon = 1e-10);
        assert!(reg.error < 1e-6);
        for (x, y) in reg.registered.iter().zip(rotated.iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_row_forces_zero_row_shift() {
        let row =
            Array2::from_shape_fn((1, 32), |(_, j)| (-((j as f64 - 12.0).powi(2)) / 6.0).exp());
        let original = fft::fft2_real(&row.view());
        let moved = fft::apply_phase_ramp(&original.view(), 0.0, 3.25);
        let reg = dft_registration(&moved.view(), &original.view(), 20).unwrap();
        assert_eq!(reg.row_shift, 0.0);
        assert_abs_diff_eq!(reg.col_shift, 3.25, epsilon = 0.05);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Array2::<Complex64>::zeros((4, 4));
        let b = Array2::<Complex64>::zeros((4, 5));
        assert!(matches!(
            dft_registration(&a.view(), &b.view(), 10),
            Err(NbedError::ShapeMismatch { .. })
        ));
    }
}
