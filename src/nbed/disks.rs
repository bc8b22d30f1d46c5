//! # 衍射盘定位与晶格基拟合
//!
//! 对每个种子点：
//! - 取半径为盘半径的圆形邻域，计算 `max / median`
//! - 比值低于 `1 + nan_cutoff` 的盘视为未拟合
//! - 否则在掩模内拟合二维高斯，取中心为亚像素盘位置
//!
//! 随后以 (0,0) 盘为原点，用最小二乘求解 `M · L = P`
//! （M 为 Miller 指数，P 为相对位移，L 为晶格基）。
//!
//! ## 坐标约定
//! 像素行向下，晶格基的 y 向上：相对位移取 `(x - cx, -(y - cy))`。
//!
//! ## 依赖关系
//! - 被 `nbed/strain_map.rs` 使用
//! - 使用 `nbed/fitting.rs`, `nbed/lattice.rs`, `nalgebra`

use super::fitting;
use super::lattice;
use crate::imaging::filters;
use crate::models::{DiskPosition, DiskSeed, FitDeviation, FitStatus, LatticeBasis};

use nalgebra::{Matrix2, Vector2};
use ndarray::ArrayView2;
use tracing::debug;

/// 未拟合盘比例上限，达到即不求晶格基
const MAX_UNFIT_FRACTION: f64 = 0.5;

/// 单幅互相关图的盘拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct DiskFit {
    /// 与种子一一对应，未拟合为 `None`
    pub positions: Vec<Option<DiskPosition>>,
    /// (0,0) 盘的像素位置
    pub center: Option<DiskPosition>,
    pub basis: Option<LatticeBasis>,
    pub deviation: Option<FitDeviation>,
    pub status: FitStatus,
}

impl DiskFit {
    fn failed(positions: Vec<Option<DiskPosition>>, status: FitStatus) -> Self {
        Self {
            positions,
            center: None,
            basis: None,
            deviation: None,
            status,
        }
    }

    pub fn fitted_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_some()).count()
    }
}

/// 以 `max / median` 判断邻域是否有足够对比度
fn has_contrast(map: &ArrayView2<f64>, seed: DiskPosition, radius: f64, nan_cutoff: f64) -> bool {
    let (nr, nc) = map.dim();
    let r2 = radius * radius;
    let values: Vec<f64> = (0..nr)
        .flat_map(|i| (0..nc).map(move |j| (i, j)))
        .filter(|&(i, j)| {
            let dy = i as f64 - seed.y;
            let dx = j as f64 - seed.x;
            dy * dy + dx * dx <= r2
        })
        .map(|(i, j)| map[[i, j]])
        .collect();

    let Some(median) = filters::median(values.iter()) else {
        return false;
    };
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if median <= 0.0 {
        return max > 0.0;
    }
    max / median >= 1.0 + nan_cutoff
}

/// 拟合单个盘；结果偏离种子超过半径视为失败
///
/// 第一次拟合后把掩模移到拟合中心再拟合一次，消除掩模偏心带来的偏差。
fn fit_one(
    map: &ArrayView2<f64>,
    seed: DiskPosition,
    radius: f64,
    nan_cutoff: f64,
) -> Option<DiskPosition> {
    if !has_contrast(map, seed, radius, nan_cutoff) {
        return None;
    }
    let first = fitting::fit_gaussian_masked(map, seed, radius)?.center;
    let center = fitting::fit_gaussian_masked(map, first, radius)
        .map(|fit| fit.center)
        .unwrap_or(first);
    let dy = center.y - seed.y;
    let dx = center.x - seed.x;
    (dy * dy + dx * dx <= radius * radius).then_some(center)
}

/// 最小二乘 `L = (MᵀM)⁻¹ MᵀP`
fn solve_basis(indices: &[Vector2<f64>], locations: &[Vector2<f64>]) -> Option<LatticeBasis> {
    let mut mtm = Matrix2::<f64>::zeros();
    let mut mtp = Matrix2::<f64>::zeros();
    for (m, p) in indices.iter().zip(locations) {
        mtm += m * m.transpose();
        mtp += m * p.transpose();
    }
    let inverse = lattice::invert_basis(&mtm).ok()?;
    Some(inverse * mtp)
}

/// 拟合位移与模型位移之比的总体标准差；无样本时为 `None`
fn ratio_std(pairs: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let ratios: Vec<f64> = pairs
        .filter(|&(_, calc)| calc != 0.0)
        .map(|(loc, calc)| loc / calc)
        .collect();
    if ratios.is_empty() {
        return None;
    }
    let n = ratios.len() as f64;
    let mean = ratios.iter().sum::<f64>() / n;
    let var = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

/// 在互相关图上拟合所有种子对应的盘并求晶格基
pub fn fit_disks(
    map: &ArrayView2<f64>,
    disk_radius: f64,
    seeds: &[DiskSeed],
    nan_cutoff: f64,
) -> DiskFit {
    let positions: Vec<Option<DiskPosition>> = seeds
        .iter()
        .map(|seed| fit_one(map, seed.position, disk_radius, nan_cutoff))
        .collect();

    let fitted = positions.iter().filter(|p| p.is_some()).count();
    if fitted == 0 {
        return DiskFit::failed(positions, FitStatus::NoDisks);
    }

    let center = seeds
        .iter()
        .zip(&positions)
        .find(|(seed, _)| seed.index.is_origin())
        .and_then(|(_, position)| *position);
    let Some(center) = center else {
        return DiskFit::failed(positions, FitStatus::CenterMissing);
    };

    let unfit_fraction = (seeds.len() - fitted) as f64 / seeds.len() as f64;
    if unfit_fraction >= MAX_UNFIT_FRACTION {
        debug!(fitted, total = seeds.len(), "too few disks for a lattice fit");
        return DiskFit {
            center: Some(center),
            ..DiskFit::failed(positions, FitStatus::UnderDetermined)
        };
    }

    let (indices, locations): (Vec<Vector2<f64>>, Vec<Vector2<f64>>) = seeds
        .iter()
        .zip(&positions)
        .filter_map(|(seed, position)| {
            position.map(|p| {
                (
                    Vector2::new(seed.index.a as f64, seed.index.b as f64),
                    Vector2::new(p.x - center.x, -(p.y - center.y)),
                )
            })
        })
        .unzip();

    let Some(basis) = solve_basis(&indices, &locations) else {
        return DiskFit {
            center: Some(center),
            ..DiskFit::failed(positions, FitStatus::UnderDetermined)
        };
    };

    let predicted: Vec<Vector2<f64>> = indices.iter().map(|m| basis.transpose() * m).collect();
    let std_x = ratio_std(locations.iter().zip(&predicted).map(|(l, c)| (l.x, c.x)));
    let std_y = ratio_std(locations.iter().zip(&predicted).map(|(l, c)| (l.y, c.y)));
    let deviation = std_x.zip(std_y).map(|(x, y)| FitDeviation { x, y });

    DiskFit {
        positions,
        center: Some(center),
        basis: Some(basis),
        deviation,
        status: FitStatus::Fitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbed::synthetic;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn spot_map() -> (Array2<f64>, Vec<DiskSeed>, Vec<DiskPosition>) {
        let center = DiskPosition::new(32.0, 32.0);
        let basis = synthetic::hex_basis();
        let indices = synthetic::hex_indices();
        let truth: Vec<DiskPosition> = indices
            .iter()
            .map(|&(a, b)| synthetic::disk_pixel(center, &basis, a, b))
            .collect();
        let map = synthetic::gaussian_spots((64, 64), &truth, 2.0);
        // 种子故意偏离真值
        let seeds = truth
            .iter()
            .zip(&indices)
            .map(|(p, &(a, b))| DiskSeed::new(p.y.round() + 0.6, p.x.round() - 0.4, a, b))
            .collect();
        (map, seeds, truth)
    }

    #[test]
    fn test_recovers_known_positions_and_basis() {
        let (map, seeds, truth) = spot_map();
        let fit = fit_disks(&map.view(), 6.0, &seeds, 0.0);
        assert_eq!(fit.status, FitStatus::Fitted);
        for (found, expected) in fit.positions.iter().zip(&truth) {
            let found = found.unwrap();
            assert!((found.y - expected.y).abs() < 0.1);
            assert!((found.x - expected.x).abs() < 0.1);
        }
        let center = fit.center.unwrap();
        assert_abs_diff_eq!(center.y, 32.0, epsilon = 0.05);

        let basis = fit.basis.unwrap();
        let expected = synthetic::hex_basis();
        for k in 0..4 {
            assert_abs_diff_eq!(basis[k], expected[k], epsilon = 0.05);
        }
        let deviation = fit.deviation.unwrap();
        assert!(deviation.x < 0.01 && deviation.y < 0.01);
    }

    #[test]
    fn test_missing_center_disk() {
        let (map, mut seeds, _) = spot_map();
        // 将 (0,0) 种子移到空白区域
        seeds[0].position = DiskPosition::new(58.0, 58.0);
        let fit = fit_disks(&map.view(), 4.0, &seeds, 0.5);
        assert_eq!(fit.status, FitStatus::CenterMissing);
        assert!(fit.positions[0].is_none());
        assert!(fit.center.is_none() && fit.basis.is_none() && fit.deviation.is_none());
    }

    #[test]
    fn test_flat_map_has_no_disks() {
        let flat = Array2::from_elem((64, 64), 1.0);
        let (_, seeds, _) = spot_map();
        let fit = fit_disks(&flat.view(), 5.0, &seeds, 0.5);
        assert_eq!(fit.status, FitStatus::NoDisks);
        assert_eq!(fit.fitted_count(), 0);
        assert!(fit.center.is_none());
    }

    #[test]
    fn test_half_unfit_is_under_determined() {
        let (map, mut seeds, _) = spot_map();
        seeds[1].position = DiskPosition::new(60.0, 3.0);
        seeds[2].position = DiskPosition::new(3.0, 60.0);
        let fit = fit_disks(&map.view(), 4.0, &seeds, 0.5);
        assert_eq!(fit.status, FitStatus::UnderDetermined);
        assert!(fit.center.is_some());
        assert!(fit.basis.is_none() && fit.deviation.is_none());
    }

    #[test]
    fn test_collinear_indices_are_under_determined() {
        let center = DiskPosition::new(32.0, 32.0);
        let basis = synthetic::hex_basis();
        let indices = [(0, 0), (1, 0), (-1, 0)];
        let truth: Vec<DiskPosition> = indices
            .iter()
            .map(|&(a, b)| synthetic::disk_pixel(center, &basis, a, b))
            .collect();
        let map = synthetic::gaussian_spots((64, 64), &truth, 2.0);
        let seeds: Vec<DiskSeed> = truth
            .iter()
            .zip(&indices)
            .map(|(p, &(a, b))| DiskSeed::new(p.y, p.x, a, b))
            .collect();
        let fit = fit_disks(&map.view(), 6.0, &seeds, 0.0);
        assert_eq!(fit.status, FitStatus::UnderDetermined);
        assert_eq!(fit.fitted_count(), 3);
    }
}
