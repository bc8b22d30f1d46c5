//! # 衍射盘数据模型
//!
//! 定义 Miller 指数、像素坐标、初始种子点以及互相关模板。
//!
//! ## 坐标约定
//! - `DiskPosition` 为像素坐标：`y` 为行（向下），`x` 为列
//! - 晶格基矢量使用笛卡尔坐标（y 向上），转换在 `nbed/disks.rs` 完成
//!
//! ## 依赖关系
//! - 被 `nbed/` 与 `parsers/seeds.rs` 使用
//! - 使用 `imaging/filters.rs` 生成圆盘与 Sobel 边缘

use crate::error::{NbedError, Result};
use crate::imaging::filters;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Miller 指数对 `(a, b)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MillerIndex {
    pub a: i32,
    pub b: i32,
}

impl MillerIndex {
    /// 中心透射盘 `(0, 0)`
    pub const ORIGIN: MillerIndex = MillerIndex { a: 0, b: 0 };

    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    pub fn is_origin(&self) -> bool {
        *self == Self::ORIGIN
    }
}

impl std::fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {})", self.a, self.b)
    }
}

/// 亚像素盘位置（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiskPosition {
    /// 行坐标
    pub y: f64,
    /// 列坐标
    pub x: f64,
}

impl DiskPosition {
    pub fn new(y: f64, x: f64) -> Self {
        Self { y, x }
    }

    pub fn is_finite(&self) -> bool {
        self.y.is_finite() && self.x.is_finite()
    }
}

/// 初始猜测位置与其 Miller 指数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskSeed {
    pub position: DiskPosition,
    pub index: MillerIndex,
}

impl DiskSeed {
    pub fn new(y: f64, x: f64, a: i32, b: i32) -> Self {
        Self {
            position: DiskPosition::new(y, x),
            index: MillerIndex::new(a, b),
        }
    }
}

/// 互相关参考模板：二值圆盘及其 Sobel 边缘，构造后不可变
#[derive(Debug, Clone)]
pub struct DiskTemplate {
    disk: Array2<f64>,
    edge: Array2<f64>,
    center: DiskPosition,
    radius: f64,
}

impl DiskTemplate {
    /// 在 `shape` 图像中以 `center` 为圆心、`radius` 为半径生成模板
    pub fn new(shape: (usize, usize), center: DiskPosition, radius: f64) -> Result<Self> {
        if shape.0 == 0 || shape.1 == 0 {
            return Err(NbedError::InvalidInput(
                "disk template shape must be non-empty".to_string(),
            ));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(NbedError::InvalidArgument(format!(
                "disk radius must be positive, got {}",
                radius
            )));
        }
        let disk = filters::disk_mask(shape, center.y, center.x, radius);
        Self::from_disk(disk, center, radius)
    }

    /// 圆心位于图像中心 `(nr/2, nc/2)`，与互相关图的零位移位置重合
    pub fn centered(shape: (usize, usize), radius: f64) -> Result<Self> {
        let center = DiskPosition::new((shape.0 / 2) as f64, (shape.1 / 2) as f64);
        Self::new(shape, center, radius)
    }

    fn from_disk(disk: Array2<f64>, center: DiskPosition, radius: f64) -> Result<Self> {
        if disk.sum() <= 0.0 {
            return Err(NbedError::InvalidInput(
                "disk template contains no pixels".to_string(),
            ));
        }
        let edge = filters::sobel_magnitude(&disk.view());
        Ok(Self {
            disk,
            edge,
            center,
            radius,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.disk.dim()
    }

    pub fn disk(&self) -> ArrayView2<'_, f64> {
        self.disk.view()
    }

    /// Sobel 边缘，作为互相关参考
    pub fn edge(&self) -> ArrayView2<'_, f64> {
        self.edge.view()
    }

    pub fn center(&self) -> DiskPosition {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// 由圆盘面积反推的等效半径 `sqrt(Σdisk / π)`，盘拟合使用此半径
    pub fn effective_radius(&self) -> f64 {
        (self.disk.sum() / PI).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_template() {
        let template = DiskTemplate::centered((64, 64), 6.0).unwrap();
        assert_eq!(template.center(), DiskPosition::new(32.0, 32.0));
        assert_eq!(template.disk()[[32, 32]], 1.0);
        assert!((template.effective_radius() - 6.0).abs() < 0.3);
        // 边缘在圆周附近最亮，圆心处为零
        assert!(template.edge()[[32, 32]].abs() < 1e-12);
        assert!(template.edge()[[32, 38]] > 0.0);
    }

    #[test]
    fn test_template_rejects_bad_radius() {
        assert!(DiskTemplate::centered((16, 16), 0.0).is_err());
        assert!(DiskTemplate::centered((16, 16), f64::NAN).is_err());
        assert!(DiskTemplate::centered((0, 16), 3.0).is_err());
    }

    #[test]
    fn test_template_outside_image_is_rejected() {
        let far = DiskPosition::new(-100.0, -100.0);
        assert!(DiskTemplate::new((16, 16), far, 2.0).is_err());
    }

    #[test]
    fn test_miller_origin() {
        assert!(MillerIndex::new(0, 0).is_origin());
        assert!(!MillerIndex::new(1, 0).is_origin());
        assert_eq!(MillerIndex::new(-1, 2).to_string(), "(-1 2)");
    }
}
