//! # 4D 数据集模型
//!
//! `ScanGrid` 存放一个二维扫描网格上的全部衍射图样，内部统一按
//! `[sy, sx, ky, kx]` 存储（扫描轴在前），构造时按 `AxisOrder` 转置。
//!
//! ## 不变量
//! - 所有衍射图样共享同一个倒空间形状
//! - 四个维度都不为零
//!
//! ## 依赖关系
//! - 被 `nbed/` 与 `commands/strain.rs` 使用
//! - 使用 `ndarray`

use crate::error::{NbedError, Result};

use ndarray::{s, Array2, Array4, ArrayView2};
use serde::{Deserialize, Serialize};

/// 感兴趣区域：与扫描轴同形状的布尔掩模
pub type Roi = Array2<bool>;

/// 输入数组的轴顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisOrder {
    /// `[ky, kx, sy, sx]`
    #[default]
    DiffractionFirst,
    /// `[sy, sx, ky, kx]`
    ScanFirst,
}

/// 扫描网格（4D-STEM 数据集）
#[derive(Debug, Clone)]
pub struct ScanGrid {
    data: Array4<f64>,
}

impl ScanGrid {
    /// 从 4D 数组创建，按 `order` 解释轴顺序
    pub fn new(data: Array4<f64>, order: AxisOrder) -> Result<Self> {
        if data.shape().iter().any(|&n| n == 0) {
            return Err(NbedError::InvalidInput(format!(
                "4D dataset has an empty axis: {:?}",
                data.shape()
            )));
        }
        let data = match order {
            AxisOrder::ScanFirst => data,
            AxisOrder::DiffractionFirst => data
                .permuted_axes([2, 3, 0, 1])
                .as_standard_layout()
                .into_owned(),
        };
        Ok(Self { data })
    }

    /// 从按行优先展开的数值创建，`shape` 按 `order` 给出
    pub fn from_flat(values: Vec<f64>, shape: [usize; 4], order: AxisOrder) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(NbedError::shape_mismatch(
                "flat 4D dataset",
                &[expected],
                &[values.len()],
            ));
        }
        let data = Array4::from_shape_vec(shape, values)
            .map_err(|e| NbedError::InvalidInput(e.to_string()))?;
        Self::new(data, order)
    }

    /// 扫描轴形状 `(sy, sx)`
    pub fn scan_shape(&self) -> (usize, usize) {
        let s = self.data.shape();
        (s[0], s[1])
    }

    /// 衍射图样形状 `(ky, kx)`
    pub fn pattern_shape(&self) -> (usize, usize) {
        let s = self.data.shape();
        (s[2], s[3])
    }

    /// 扫描点 `(sy, sx)` 处的衍射图样
    pub fn pattern(&self, sy: usize, sx: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![sy, sx, .., ..])
    }

    /// 覆盖全部扫描点的 ROI
    pub fn full_roi(&self) -> Roi {
        Array2::from_elem(self.scan_shape(), true)
    }

    /// 检查 ROI 形状与扫描轴一致
    pub fn check_roi(&self, roi: &Roi) -> Result<()> {
        let (sy, sx) = self.scan_shape();
        if roi.dim() != (sy, sx) {
            return Err(NbedError::shape_mismatch(
                "ROI mask",
                &[sy, sx],
                roi.shape(),
            ));
        }
        Ok(())
    }

    /// ROI 内所有扫描点，按行优先顺序
    pub fn roi_points(&self, roi: &Roi) -> Vec<(usize, usize)> {
        roi.indexed_iter()
            .filter(|&(_, &inside)| inside)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// ROI 内的平均衍射图样；ROI 为空时返回 `None`
    pub fn mean_pattern(&self, roi: &Roi) -> Option<Array2<f64>> {
        let points = self.roi_points(roi);
        if points.is_empty() {
            return None;
        }
        let mut sum = Array2::<f64>::zeros(self.pattern_shape());
        for &(sy, sx) in &points {
            sum += &self.pattern(sy, sx);
        }
        let count = points.len() as f64;
        Some(sum.mapv(|v| v / count))
    }

    /// 按 `by × bx` 块平均扫描轴；不整除的边缘补零后参与平均
    pub fn bin_scan(&self, by: usize, bx: usize) -> Result<ScanGrid> {
        if by == 0 || bx == 0 {
            return Err(NbedError::InvalidArgument(
                "bin factors must be positive".to_string(),
            ));
        }
        let (sy, sx) = self.scan_shape();
        let (ky, kx) = self.pattern_shape();
        let out_y = sy.div_ceil(by);
        let out_x = sx.div_ceil(bx);
        let block = (by * bx) as f64;

        let mut binned = Array4::<f64>::zeros((out_y, out_x, ky, kx));
        for y in 0..sy {
            for x in 0..sx {
                let mut target = binned.slice_mut(s![y / by, x / bx, .., ..]);
                target += &self.pattern(y, x);
            }
        }
        binned.mapv_inplace(|v| v / block);
        ScanGrid::new(binned, AxisOrder::ScanFirst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_grid() -> ScanGrid {
        // 图样值 = 10·sy + sx，便于检查轴顺序
        let data = Array4::from_shape_fn((3, 2, 4, 5), |(_, _, sy, sx)| (10 * sy + sx) as f64);
        ScanGrid::new(data, AxisOrder::DiffractionFirst).unwrap()
    }

    #[test]
    fn test_axis_order_is_normalised() {
        let grid = ramp_grid();
        assert_eq!(grid.scan_shape(), (4, 5));
        assert_eq!(grid.pattern_shape(), (3, 2));
        assert!(grid.pattern(2, 3).iter().all(|&v| v == 23.0));
    }

    #[test]
    fn test_from_flat_checks_length() {
        let err = ScanGrid::from_flat(vec![0.0; 10], [2, 2, 2, 2], AxisOrder::ScanFirst);
        assert!(matches!(err, Err(NbedError::ShapeMismatch { .. })));
        let ok = ScanGrid::from_flat(vec![1.0; 16], [2, 2, 2, 2], AxisOrder::ScanFirst);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_empty_axis_rejected() {
        let data = Array4::<f64>::zeros((0, 2, 2, 2));
        assert!(matches!(
            ScanGrid::new(data, AxisOrder::ScanFirst),
            Err(NbedError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mean_pattern_over_roi() {
        let grid = ramp_grid();
        let mut roi = Array2::from_elem((4, 5), false);
        roi[[0, 0]] = true;
        roi[[1, 2]] = true;
        let mean = grid.mean_pattern(&roi).unwrap();
        assert!(mean.iter().all(|&v| (v - 6.0).abs() < 1e-12));

        let empty = Array2::from_elem((4, 5), false);
        assert!(grid.mean_pattern(&empty).is_none());
    }

    #[test]
    fn test_check_roi_shape() {
        let grid = ramp_grid();
        assert!(grid.check_roi(&grid.full_roi()).is_ok());
        let wrong = Array2::from_elem((5, 4), true);
        assert!(grid.check_roi(&wrong).is_err());
    }

    #[test]
    fn test_bin_scan_pads_ragged_edge() {
        let grid = ramp_grid();
        let binned = grid.bin_scan(2, 2).unwrap();
        assert_eq!(binned.scan_shape(), (2, 3));
        // (0,0) 块: 0, 1, 10, 11
        assert!(binned.pattern(0, 0).iter().all(|&v| (v - 5.5).abs() < 1e-12));
        // (0,2) 块只有 sx = 4 一列: 4, 14, 另两格补零
        assert!(binned.pattern(0, 2).iter().all(|&v| (v - 4.5).abs() < 1e-12));
        assert!(grid.bin_scan(0, 1).is_err());
    }
}
