//! # 虚拟探测器与 ROI
//!
//! - 环形虚拟探测器：对每个扫描点的衍射图样在环带内求和，得到实空间图像
//! - 由图像生成 ROI：以 `factor × median` 为阈值
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 使用
//! - 使用 `models/dataset.rs`, `imaging/filters.rs`

use crate::error::{NbedError, Result};
use crate::imaging::filters;
use crate::models::{DiskPosition, Roi, ScanGrid};

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 阈值方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Threshold {
    /// 保留高于阈值的像素
    #[default]
    Above,
    /// 保留低于阈值的像素
    Below,
}

/// 环形掩模：`inner <= r <= outer`
pub fn annular_mask(
    shape: (usize, usize),
    center: DiskPosition,
    inner: f64,
    outer: f64,
) -> Array2<bool> {
    let (r_in, r_out) = (inner * inner, outer * outer);
    Array2::from_shape_fn(shape, |(i, j)| {
        let r2 = (i as f64 - center.y).powi(2) + (j as f64 - center.x).powi(2);
        r2 >= r_in && r2 <= r_out
    })
}

/// 环形虚拟探测器图像，形状与扫描轴相同
pub fn virtual_detector(
    grid: &ScanGrid,
    center: DiskPosition,
    inner: f64,
    outer: f64,
) -> Result<Array2<f64>> {
    if inner.is_nan() || outer.is_nan() || inner < 0.0 || outer < inner {
        return Err(NbedError::InvalidArgument(format!(
            "detector radii must satisfy 0 <= inner <= outer, got {} and {}",
            inner, outer
        )));
    }
    let mask = annular_mask(grid.pattern_shape(), center, inner, outer);
    let pixels = mask.iter().filter(|&&m| m).count();
    debug!(pixels, inner, outer, "virtual detector");

    Ok(Array2::from_shape_fn(grid.scan_shape(), |(sy, sx)| {
        let mut total = 0.0;
        Zip::from(&grid.pattern(sy, sx))
            .and(&mask)
            .for_each(|&v, &inside| {
                if inside {
                    total += v;
                }
            });
        total
    }))
}

/// 以 `factor × median(image)` 为阈值生成 ROI
pub fn roi_from_image(image: &ArrayView2<f64>, factor: f64, threshold: Threshold) -> Result<Roi> {
    if image.iter().any(|v| !v.is_finite()) {
        return Err(NbedError::InvalidInput(
            "ROI source image contains non-finite values".to_string(),
        ));
    }
    let median = filters::median(image.iter())
        .ok_or_else(|| NbedError::InvalidInput("ROI source image is empty".to_string()))?;
    let cut = factor * median;
    Ok(match threshold {
        Threshold::Above => image.mapv(|v| v > cut),
        Threshold::Below => image.mapv(|v| v < cut),
    })
}
