//! # 应变图组装
//!
//! 对 ROI 内的每个扫描点执行：
//! 预处理 → 与模板边缘互相关 → 盘拟合 → 晶格基 → 应变张量。
//!
//! 参考晶格未给出时由 ROI 平均图样求得，并在所有扫描点间共享。
//! ROI 外与拟合失败的点在图中填 0，状态记录在 `StrainMaps::status`，
//! 最后对每个分量做高斯平滑。
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 调用
//! - 使用 `nbed/` 各子模块, `batch/runner.rs`

use super::correlate;
use super::disks::{self, DiskFit};
use super::lattice::ReferenceLattice;
use super::precondition::{self, PreconditionParams};
use crate::batch::BatchRunner;
use crate::error::{NbedError, Result};
use crate::imaging::filters;
use crate::models::{
    DiskSeed, DiskTemplate, FitDeviation, FitStatus, LatticeBasis, Roi, ScanGrid, StrainMaps,
    StrainTensor,
};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 应变图参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainParams {
    /// 预处理高斯模糊 σ
    pub gaussian_sigma: f64,
    /// 离群钳制倍数
    pub outlier_factor: f64,
    /// 互相关混合权重，0 为互相关，1 为相位相关
    pub hybrid_weight: f64,
    /// 盘对比度阈值
    pub nan_cutoff: f64,
    /// 应变图平滑 σ，0 表示不平滑
    pub smoothing_sigma: f64,
}

impl Default for StrainParams {
    fn default() -> Self {
        Self {
            gaussian_sigma: 3.0,
            outlier_factor: 10.0,
            hybrid_weight: 0.1,
            nan_cutoff: 0.5,
            smoothing_sigma: 1.0,
        }
    }
}

impl StrainParams {
    pub fn precondition_params(&self) -> PreconditionParams {
        PreconditionParams {
            gaussian_sigma: self.gaussian_sigma,
            outlier_factor: self.outlier_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.precondition_params().validate()?;
        if !(0.0..=1.0).contains(&self.hybrid_weight) {
            return Err(NbedError::InvalidArgument(format!(
                "hybrid weight must lie in [0, 1], got {}",
                self.hybrid_weight
            )));
        }
        if !self.nan_cutoff.is_finite() || self.nan_cutoff < 0.0 {
            return Err(NbedError::InvalidArgument(format!(
                "nan cutoff must be non-negative, got {}",
                self.nan_cutoff
            )));
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return Err(NbedError::InvalidArgument(format!(
                "smoothing sigma must be non-negative, got {}",
                self.smoothing_sigma
            )));
        }
        Ok(())
    }
}

/// 单个扫描点的结果
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointOutcome {
    strain: Option<StrainTensor>,
    deviation: Option<FitDeviation>,
    status: FitStatus,
}

/// 单幅图样：预处理、互相关、盘拟合
pub fn analyze_pattern(
    pattern: &ArrayView2<f64>,
    template: &DiskTemplate,
    seeds: &[DiskSeed],
    params: &StrainParams,
    nan_cutoff: f64,
) -> Result<DiskFit> {
    let filtered = precondition::precondition(pattern, &params.precondition_params())?;
    let map = correlate::correlate(&filtered.view(), &template.edge(), params.hybrid_weight)?;
    Ok(disks::fit_disks(
        &map.view(),
        template.effective_radius(),
        seeds,
        nan_cutoff,
    ))
}

fn check_inputs(
    grid: &ScanGrid,
    roi: &Roi,
    template: &DiskTemplate,
    seeds: &[DiskSeed],
) -> Result<()> {
    grid.check_roi(roi)?;
    let (ky, kx) = grid.pattern_shape();
    if template.shape() != (ky, kx) {
        let (ty, tx) = template.shape();
        return Err(NbedError::shape_mismatch("disk template", &[ky, kx], &[ty, tx]));
    }
    if !seeds.iter().any(|s| s.index.is_origin()) {
        return Err(NbedError::InvalidArgument(
            "seed list must contain the (0 0) disk".to_string(),
        ));
    }
    Ok(())
}

/// 由 ROI 平均图样求参考晶格基
pub fn reference_basis(
    grid: &ScanGrid,
    roi: &Roi,
    template: &DiskTemplate,
    seeds: &[DiskSeed],
    params: &StrainParams,
) -> Result<LatticeBasis> {
    params.validate()?;
    check_inputs(grid, roi, template, seeds)?;

    let mean = grid.mean_pattern(roi).ok_or_else(|| {
        NbedError::ReferenceUnavailable("ROI selects no scan points".to_string())
    })?;
    let fit = analyze_pattern(&mean.view(), template, seeds, params, 0.0)?;
    fit.basis.ok_or_else(|| {
        NbedError::ReferenceUnavailable(format!(
            "mean pattern fit ended with status {}",
            fit.status
        ))
    })
}

fn point_outcome(fit: DiskFit, reference: &ReferenceLattice) -> PointOutcome {
    PointOutcome {
        strain: fit.basis.map(|basis| reference.strain_of(&basis)),
        deviation: fit.deviation,
        status: fit.status,
    }
}

/// 组装整个 ROI 的应变图
pub fn build_strain_maps(
    grid: &ScanGrid,
    roi: &Roi,
    template: &DiskTemplate,
    seeds: &[DiskSeed],
    reference: Option<LatticeBasis>,
    params: &StrainParams,
    runner: &BatchRunner,
) -> Result<StrainMaps> {
    params.validate()?;
    check_inputs(grid, roi, template, seeds)?;

    let reference = match reference {
        Some(basis) => basis,
        None => reference_basis(grid, roi, template, seeds, params)?,
    };
    let lattice = ReferenceLattice::new(reference)?;
    info!(
        a_x = reference[(0, 0)],
        a_y = reference[(0, 1)],
        b_x = reference[(1, 0)],
        b_y = reference[(1, 1)],
        "reference lattice"
    );

    let points = grid.roi_points(roi);
    let outcomes = runner.try_map(&points, "Fitting scan points", |&(sy, sx)| {
        let pattern = grid.pattern(sy, sx);
        let fit = analyze_pattern(&pattern, template, seeds, params, params.nan_cutoff)?;
        Ok(point_outcome(fit, &lattice))
    })?;

    let shape = grid.scan_shape();
    let mut e_xx = Array2::<f64>::zeros(shape);
    let mut e_xy = Array2::<f64>::zeros(shape);
    let mut e_theta = Array2::<f64>::zeros(shape);
    let mut e_yy = Array2::<f64>::zeros(shape);
    let mut fit_deviation = Array2::from_elem(shape, None);
    let mut status = Array2::from_elem(shape, FitStatus::OutsideRoi);

    for (&(sy, sx), outcome) in points.iter().zip(&outcomes) {
        if let Some(strain) = outcome.strain {
            e_xx[[sy, sx]] = strain.e_xx;
            e_xy[[sy, sx]] = strain.e_xy;
            e_theta[[sy, sx]] = strain.e_theta;
            e_yy[[sy, sx]] = strain.e_yy;
        }
        fit_deviation[[sy, sx]] = outcome.deviation;
        status[[sy, sx]] = outcome.status;
    }

    let sigma = params.smoothing_sigma;
    let maps = StrainMaps {
        e_xx: filters::gaussian_filter(&e_xx.view(), sigma),
        e_xy: filters::gaussian_filter(&e_xy.view(), sigma),
        e_theta: filters::gaussian_filter(&e_theta.view(), sigma),
        e_yy: filters::gaussian_filter(&e_yy.view(), sigma),
        fit_deviation,
        status,
        reference,
    };

    let fitted = maps.fitted_count();
    info!(fitted, roi_points = points.len(), "strain maps assembled");
    if fitted == 0 && !points.is_empty() {
        warn!("no scan point in the ROI produced a lattice fit");
    }
    Ok(maps)
}
