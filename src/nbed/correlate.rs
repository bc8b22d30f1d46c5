//! # 混合互相关
//!
//! 在频域中混合归一化互相关（权重 0）与纯相位相关（权重 1）：
//!
//! ```text
//! X = F(A)·conj(F(B))
//! C = |ifft2(X / |X|^w)|
//! ```
//!
//! 输出经 fftshift，零位移位于 `(nr/2, nc/2)`。
//!
//! ## 依赖关系
//! - 被 `nbed/strain_map.rs` 使用
//! - 使用 `imaging/fft.rs`

use crate::error::{NbedError, Result};
use crate::imaging::fft;

use ndarray::{Array2, ArrayView2, Zip};
use rustfft::num_complex::Complex64;

/// 互相关图中零位移所在的像素
pub fn zero_shift_index(shape: (usize, usize)) -> (usize, usize) {
    (shape.0 / 2, shape.1 / 2)
}

/// 以 L2 范数归一化；全零图像原样返回
fn l2_normalized(image: &ArrayView2<f64>) -> Array2<f64> {
    let norm = image.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        image.mapv(|v| v / norm)
    } else {
        image.to_owned()
    }
}

/// 计算 `image_a` 与 `image_b` 的混合互相关图
///
/// `hybrid_weight` 取 0 为归一化互相关，取 1 为相位相关。
pub fn correlate(
    image_a: &ArrayView2<f64>,
    image_b: &ArrayView2<f64>,
    hybrid_weight: f64,
) -> Result<Array2<f64>> {
    if image_a.dim() != image_b.dim() {
        return Err(NbedError::shape_mismatch(
            "cross-correlation",
            image_a.shape(),
            image_b.shape(),
        ));
    }
    if !(0.0..=1.0).contains(&hybrid_weight) {
        return Err(NbedError::InvalidArgument(format!(
            "hybrid weight must lie in [0, 1], got {}",
            hybrid_weight
        )));
    }
    if image_a.is_empty() {
        return Err(NbedError::InvalidInput(
            "cannot correlate empty images".to_string(),
        ));
    }

    let fa = fft::fft2_real(&l2_normalized(image_a).view());
    let fb = fft::fft2_real(&l2_normalized(image_b).view());

    let mut cross = Array2::<Complex64>::zeros(fa.raw_dim());
    Zip::from(&mut cross)
        .and(&fa)
        .and(&fb)
        .for_each(|x, &a, &b| {
            let product = a * b.conj();
            let magnitude = product.norm();
            *x = if magnitude > 0.0 {
                product / magnitude.powf(hybrid_weight)
            } else {
                Complex64::default()
            };
        });

    let map = fft::ifft2(&cross.view()).mapv(|c| c.norm());
    Ok(fft::fftshift(&map.view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::filters;

    fn argmax(map: &Array2<f64>) -> (usize, usize) {
        let mut best = ((0, 0), f64::NEG_INFINITY);
        for (idx, &v) in map.indexed_iter() {
            if v > best.1 {
                best = (idx, v);
            }
        }
        best.0
    }

    fn textured(shape: (usize, usize)) -> Array2<f64> {
        Array2::from_shape_fn(shape, |(i, j)| {
            ((i * 7 + j * 13) % 11) as f64 + (i as f64 * 0.3).sin() * 4.0 + (j * j % 5) as f64
        })
    }

    #[test]
    fn test_self_correlation_peaks_at_zero_shift() {
        for &shape in &[(32, 32), (17, 24)] {
            let image = textured(shape);
            for &w in &[0.0, 0.1, 0.5, 1.0] {
                let map = correlate(&image.view(), &image.view(), w).unwrap();
                assert_eq!(map.dim(), shape);
                assert_eq!(argmax(&map), zero_shift_index(shape));
            }
        }
    }

    #[test]
    fn test_peak_tracks_disk_position() {
        let template = filters::disk_mask((64, 64), 32.0, 32.0, 5.0);
        let pattern = filters::disk_mask((64, 64), 20.0, 41.0, 5.0);
        let map = correlate(&pattern.view(), &template.view(), 0.0).unwrap();
        assert_eq!(argmax(&map), (20, 41));
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let a = Array2::<f64>::zeros((8, 8));
        let b = Array2::<f64>::zeros((8, 9));
        assert!(matches!(
            correlate(&a.view(), &b.view(), 0.1),
            Err(NbedError::ShapeMismatch { .. })
        ));
        assert!(correlate(&a.view(), &a.view(), 1.5).is_err());
    }

    #[test]
    fn test_zero_images_give_zero_map() {
        let a = Array2::<f64>::zeros((6, 6));
        let map = correlate(&a.view(), &a.view(), 0.5).unwrap();
        assert!(map.iter().all(|&v| v == 0.0));
    }
}
