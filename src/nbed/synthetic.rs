//! 测试用合成 NBED 数据

use crate::models::{DiskPosition, DiskSeed, LatticeBasis};

use nalgebra::Vector2;
use ndarray::{Array2, Array4};

/// 六角晶格：a* = (20, 0), b* = (-10, 17.32)
pub fn hex_basis() -> LatticeBasis {
    LatticeBasis::new(20.0, 0.0, -10.0, 17.32)
}

pub fn hex_indices() -> Vec<(i32, i32)> {
    vec![(0, 0), (1, 0), (0, 1), (-1, -1)]
}

/// 由晶格基求 `(a, b)` 盘的像素位置（y 轴翻转）
pub fn disk_pixel(center: DiskPosition, basis: &LatticeBasis, a: i32, b: i32) -> DiskPosition {
    let v = basis.transpose() * Vector2::new(a as f64, b as f64);
    DiskPosition::new(center.y - v.y, center.x + v.x)
}

/// 常数背景 1 上叠加若干高斯峰
pub fn gaussian_spots(
    shape: (usize, usize),
    positions: &[DiskPosition],
    sigma: f64,
) -> Array2<f64> {
    Array2::from_shape_fn(shape, |(i, j)| {
        1.0 + positions
            .iter()
            .map(|p| {
                let r2 = (i as f64 - p.y).powi(2) + (j as f64 - p.x).powi(2);
                10.0 * (-r2 / (2.0 * sigma * sigma)).exp()
            })
            .sum::<f64>()
    })
}

/// 弱背景上的均匀亮盘，边缘做一个像素宽的线性抗锯齿
pub fn nbed_pattern(
    shape: (usize, usize),
    center: DiskPosition,
    basis: &LatticeBasis,
    radius: f64,
) -> Array2<f64> {
    let disks: Vec<DiskPosition> = hex_indices()
        .into_iter()
        .map(|(a, b)| disk_pixel(center, basis, a, b))
        .collect();
    Array2::from_shape_fn(shape, |(i, j)| {
        5.0 + disks
            .iter()
            .map(|p| {
                let r = ((i as f64 - p.y).powi(2) + (j as f64 - p.x).powi(2)).sqrt();
                1000.0 * (radius + 0.5 - r).clamp(0.0, 1.0)
            })
            .sum::<f64>()
    })
}

/// 与 `nbed_pattern` 同形状的平坦图样
pub fn blank_pattern(shape: (usize, usize)) -> Array2<f64> {
    Array2::from_elem(shape, 5.0)
}

/// 精确位置处的种子
pub fn hex_seeds(center: DiskPosition) -> Vec<DiskSeed> {
    let basis = hex_basis();
    hex_indices()
        .into_iter()
        .map(|(a, b)| {
            let p = disk_pixel(center, &basis, a, b);
            DiskSeed::new(p.y, p.x, a, b)
        })
        .collect()
}

/// 扫描轴在前的 4D 数据：`basis_at(sy, sx)` 给出每个扫描点的晶格基
pub fn hex_scan<F>(
    scan: (usize, usize),
    shape: (usize, usize),
    radius: f64,
    basis_at: F,
) -> Array4<f64>
where
    F: Fn(usize, usize) -> LatticeBasis,
{
    let center = DiskPosition::new((shape.0 / 2) as f64, (shape.1 / 2) as f64);
    let mut data = Array4::zeros((scan.0, scan.1, shape.0, shape.1));
    for y in 0..scan.0 {
        for x in 0..scan.1 {
            let pattern = nbed_pattern(shape, center, &basis_at(y, x), radius);
            data.slice_mut(ndarray::s![y, x, .., ..]).assign(&pattern);
        }
    }
    data
}
