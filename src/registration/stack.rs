//! # 图像栈对齐
//!
//! 对快速连续采集的图像栈做两两配准，得到 N×N 的行 / 列位移矩阵，
//! 再按位移矩阵的列均值把每幅图像移到平均位置并求和。
//!
//! `rows[i, j]` 是图像 `i` 相对图像 `j` 的行位移，对角线为 0。
//!
//! ## 依赖关系
//! - 被 `commands/register.rs` 调用
//! - 使用 `registration/register.rs`, `batch/runner.rs`

use super::register::dft_registration;
use crate::batch::BatchRunner;
use crate::error::{NbedError, Result};
use crate::imaging::fft::{self, ComplexImage};

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use tracing::info;

/// 默认上采样倍数
pub const DEFAULT_SAMPLING: usize = 500;

/// 两两配准得到的位移矩阵
#[derive(Debug, Clone)]
pub struct ShiftMatrices {
    pub rows: Array2<f64>,
    pub cols: Array2<f64>,
}

impl ShiftMatrices {
    /// 每幅图像需要移动的量：位移矩阵第 `i` 列的均值
    pub fn mean_shifts(&self) -> (Vec<f64>, Vec<f64>) {
        let column_mean = |m: &Array2<f64>| -> Vec<f64> {
            m.mean_axis(Axis(0))
                .map(|v| v.to_vec())
                .unwrap_or_default()
        };
        (column_mean(&self.rows), column_mean(&self.cols))
    }
}

fn check_stack(stack: &ArrayView3<f64>) -> Result<()> {
    if stack.shape().iter().any(|&n| n == 0) {
        return Err(NbedError::InvalidInput(format!(
            "image stack has an empty axis: {:?}",
            stack.shape()
        )));
    }
    if stack.iter().any(|v| !v.is_finite()) {
        return Err(NbedError::InvalidInput(
            "image stack contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// 全部图像两两配准
pub fn pairwise_register(
    stack: &ArrayView3<f64>,
    sampling: usize,
    runner: &BatchRunner,
) -> Result<ShiftMatrices> {
    check_stack(stack)?;
    let count = stack.len_of(Axis(0));
    let indices: Vec<usize> = (0..count).collect();

    let spectra: Vec<ComplexImage> = runner.map(&indices, "Transforming frames", |&i| {
        fft::fft2_real(&stack.index_axis(Axis(0), i))
    })?;

    let rows_of_shifts = runner.try_map(&indices, "Registering frames", |&i| {
        let mut row = vec![(0.0, 0.0); count];
        for (j, shift) in row.iter_mut().enumerate() {
            if i != j {
                let reg = dft_registration(&spectra[i].view(), &spectra[j].view(), sampling)?;
                *shift = (reg.row_shift, reg.col_shift);
            }
        }
        Ok(row)
    })?;

    let mut rows = Array2::<f64>::zeros((count, count));
    let mut cols = Array2::<f64>::zeros((count, count));
    for (i, shifts) in rows_of_shifts.iter().enumerate() {
        for (j, &(r, c)) in shifts.iter().enumerate() {
            rows[[i, j]] = r;
            cols[[i, j]] = c;
        }
    }
    info!(frames = count, sampling, "pairwise registration finished");
    Ok(ShiftMatrices { rows, cols })
}

/// 按位移矩阵列均值平移每幅图像，取模后求和
pub fn corrected_stack(
    stack: &ArrayView3<f64>,
    shifts: &ShiftMatrices,
    runner: &BatchRunner,
) -> Result<Array2<f64>> {
    check_stack(stack)?;
    let count = stack.len_of(Axis(0));
    for (name, m) in [("row shift matrix", &shifts.rows), ("column shift matrix", &shifts.cols)] {
        if m.dim() != (count, count) {
            return Err(NbedError::shape_mismatch(name, &[count, count], m.shape()));
        }
    }

    let (row_mean, col_mean) = shifts.mean_shifts();
    let indices: Vec<usize> = (0..count).collect();
    let moved = runner.map(&indices, "Shifting frames", |&i| {
        fft::shift_by_phase(&stack.slice(s![i, .., ..]), row_mean[i], col_mean[i])
            .mapv(|c| c.norm())
    })?;

    let (_, ny, nx) = stack.dim();
    Ok(moved
        .iter()
        .fold(Array2::<f64>::zeros((ny, nx)), |acc, image| acc + image))
}

/// 把若干同形状图像堆成 `[n, ny, nx]`
pub fn stack_frames(frames: &[Array2<f64>]) -> Result<Array3<f64>> {
    let Some(first) = frames.first() else {
        return Err(NbedError::InvalidInput("no frames to stack".to_string()));
    };
    let (ny, nx) = first.dim();
    let mut stack = Array3::<f64>::zeros((frames.len(), ny, nx));
    for (i, frame) in frames.iter().enumerate() {
        if frame.dim() != (ny, nx) {
            return Err(NbedError::shape_mismatch(
                &format!("frame {}", i),
                &[ny, nx],
                frame.shape(),
            ));
        }
        stack.slice_mut(s![i, .., ..]).assign(frame);
    }
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spot(shape: (usize, usize), cy: f64, cx: f64) -> Array2<f64> {
        Array2::from_shape_fn(shape, |(i, j)| {
            let r2 = (i as f64 - cy).powi(2) + (j as f64 - cx).powi(2);
            (-r2 / 8.0).exp()
        })
    }

    fn drifting_stack(offsets: &[(f64, f64)]) -> Array3<f64> {
        let frames: Vec<Array2<f64>> = offsets
            .iter()
            .map(|&(dy, dx)| spot((32, 32), 16.0 + dy, 16.0 + dx))
            .collect();
        stack_frames(&frames).unwrap()
    }

    #[test]
    fn test_pairwise_matrix_is_antisymmetric() {
        let offsets = [(0.0, 0.0), (1.0, -2.0), (-3.0, 1.0)];
        let stack = drifting_stack(&offsets);
        let shifts = pairwise_register(&stack.view(), 10, &BatchRunner::new(2)).unwrap();

        for i in 0..3 {
            assert_eq!(shifts.rows[[i, i]], 0.0);
            assert_eq!(shifts.cols[[i, i]], 0.0);
            for j in 0..3 {
                let expected_row = offsets[i].0 - offsets[j].0;
                let expected_col = offsets[i].1 - offsets[j].1;
                assert_abs_diff_eq!(shifts.rows[[i, j]], expected_row, epsilon = 0.1);
                assert_abs_diff_eq!(shifts.cols[[i, j]], expected_col, epsilon = 0.1);
            }
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let stack = drifting_stack(&[(0.0, 0.0), (0.5, 0.25), (-1.0, 2.0), (2.0, -1.5)]);
        let serial = pairwise_register(&stack.view(), 20, &BatchRunner::new(1)).unwrap();
        let parallel = pairwise_register(&stack.view(), 20, &BatchRunner::new(4)).unwrap();
        assert_eq!(serial.rows, parallel.rows);
        assert_eq!(serial.cols, parallel.cols);
    }

    #[test]
    fn test_corrected_stack_aligns_frames() {
        let offsets = [(0.0, 0.0), (2.0, 0.0), (-2.0, 3.0)];
        let stack = drifting_stack(&offsets);
        let runner = BatchRunner::new(2);
        let shifts = pairwise_register(&stack.view(), 10, &runner).unwrap();
        let summed = corrected_stack(&stack.view(), &shifts, &runner).unwrap();

        // 平均位置为 (16, 17)，三帧叠加后峰值接近 3
        let aligned = spot((32, 32), 16.0, 17.0) * 3.0;
        assert_abs_diff_eq!(summed[[16, 17]], aligned[[16, 17]], epsilon = 0.05);
        assert!(summed[[16, 17]] > summed[[18, 16]]);
    }

    #[test]
    fn test_mean_shifts_use_columns() {
        let shifts = ShiftMatrices {
            rows: ndarray::array![[0.0, 1.0], [-1.0, 0.0]],
            cols: ndarray::array![[0.0, 4.0], [-4.0, 0.0]],
        };
        let (rows, cols) = shifts.mean_shifts();
        assert_eq!(rows, vec![-0.5, 0.5]);
        assert_eq!(cols, vec![-2.0, 2.0]);
    }

    #[test]
    fn test_bad_inputs() {
        let runner = BatchRunner::new(1);
        let empty = Array3::<f64>::zeros((0, 4, 4));
        assert!(pairwise_register(&empty.view(), 10, &runner).is_err());

        let stack = drifting_stack(&[(0.0, 0.0), (1.0, 1.0)]);
        let wrong = ShiftMatrices {
            rows: Array2::zeros((3, 3)),
            cols: Array2::zeros((3, 3)),
        };
        assert!(matches!(
            corrected_stack(&stack.view(), &wrong, &runner),
            Err(NbedError::ShapeMismatch { .. })
        ));
        assert!(stack_frames(&[Array2::zeros((2, 2)), Array2::zeros((3, 2))]).is_err());
    }
}
