//! # 应变数据模型
//!
//! 晶格基、应变张量、单点拟合状态以及最终的应变图。
//!
//! ## 约定
//! - `LatticeBasis` 为 2×2 矩阵，第 0 行为 a* 方向位移，第 1 行为 b*，
//!   列为笛卡尔 (x, y)，y 向上
//! - `StrainMaps` 中拟合失败或 ROI 外的点填 0，状态另存于 `status`
//!
//! ## 依赖关系
//! - 被 `nbed/lattice.rs`, `nbed/strain_map.rs`, `export.rs` 使用
//! - 使用 `nalgebra`, `ndarray`

use nalgebra::Matrix2;
use ndarray::Array2;
use serde::Serialize;

/// 晶格基矩阵：Miller 指数 → 盘位移
pub type LatticeBasis = Matrix2<f64>;

/// 单个扫描点的二维应变张量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StrainTensor {
    pub e_xx: f64,
    pub e_yy: f64,
    /// 剪切分量
    pub e_xy: f64,
    /// 反对称（转动）分量
    pub e_theta: f64,
}

impl StrainTensor {
    pub fn component(&self, component: StrainComponent) -> f64 {
        match component {
            StrainComponent::Exx => self.e_xx,
            StrainComponent::Exy => self.e_xy,
            StrainComponent::Etheta => self.e_theta,
            StrainComponent::Eyy => self.e_yy,
        }
    }
}

/// 应变分量标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrainComponent {
    Exx,
    Exy,
    Etheta,
    Eyy,
}

impl StrainComponent {
    pub const ALL: [StrainComponent; 4] = [
        StrainComponent::Exx,
        StrainComponent::Exy,
        StrainComponent::Etheta,
        StrainComponent::Eyy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrainComponent::Exx => "e_xx",
            StrainComponent::Exy => "e_xy",
            StrainComponent::Etheta => "e_theta",
            StrainComponent::Eyy => "e_yy",
        }
    }
}

/// 晶格拟合质量：拟合位移与模型位移之比的逐轴标准差
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitDeviation {
    pub x: f64,
    pub y: f64,
}

/// 单个扫描点的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FitStatus {
    /// 不在 ROI 内，未处理
    #[default]
    OutsideRoi,
    /// 晶格基与应变均已得到
    Fitted,
    /// 没有任何盘通过对比度阈值
    NoDisks,
    /// 中心 (0,0) 盘拟合失败
    CenterMissing,
    /// 有效盘不足（失败比例 ≥ 50% 或指数线性相关）
    UnderDetermined,
}

impl FitStatus {
    pub const ALL: [FitStatus; 5] = [
        FitStatus::Fitted,
        FitStatus::NoDisks,
        FitStatus::CenterMissing,
        FitStatus::UnderDetermined,
        FitStatus::OutsideRoi,
    ];

    pub fn is_fitted(&self) -> bool {
        *self == FitStatus::Fitted
    }
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::OutsideRoi => write!(f, "outside-roi"),
            FitStatus::Fitted => write!(f, "fitted"),
            FitStatus::NoDisks => write!(f, "no-disks"),
            FitStatus::CenterMissing => write!(f, "center-missing"),
            FitStatus::UnderDetermined => write!(f, "under-determined"),
        }
    }
}

/// 扫描区域上的应变图
#[derive(Debug, Clone)]
pub struct StrainMaps {
    pub e_xx: Array2<f64>,
    pub e_xy: Array2<f64>,
    pub e_theta: Array2<f64>,
    pub e_yy: Array2<f64>,
    /// 每个扫描点的拟合偏差，未拟合处为 `None`
    pub fit_deviation: Array2<Option<FitDeviation>>,
    pub status: Array2<FitStatus>,
    /// 实际使用的参考晶格基
    pub reference: LatticeBasis,
}

impl StrainMaps {
    pub fn component(&self, component: StrainComponent) -> &Array2<f64> {
        match component {
            StrainComponent::Exx => &self.e_xx,
            StrainComponent::Exy => &self.e_xy,
            StrainComponent::Etheta => &self.e_theta,
            StrainComponent::Eyy => &self.e_yy,
        }
    }

    /// 成功拟合的扫描点数
    pub fn fitted_count(&self) -> usize {
        self.status.iter().filter(|s| s.is_fitted()).count()
    }

    /// 按状态统计扫描点数
    pub fn count_status(&self, status: FitStatus) -> usize {
        self.status.iter().filter(|&&s| s == status).count()
    }
}
