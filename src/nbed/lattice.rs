//! # 晶格基与应变张量
//!
//! 比较单点晶格基与参考晶格基：
//!
//! ```text
//! T = observed · reference⁻¹
//! S = T - I
//! e_xx = -S00    e_yy = -S11
//! e_xy = -(S01 + S10)
//! e_theta = S01 - S10
//! ```
//!
//! ## 依赖关系
//! - 被 `nbed/disks.rs`, `nbed/strain_map.rs` 使用
//! - 使用 `nalgebra`

use crate::error::{NbedError, Result};
use crate::models::{LatticeBasis, StrainTensor};

/// 相对行列式阈值：`|det| <= ε·‖M‖²` 视为奇异
const DETERMINANT_EPSILON: f64 = 1e-10;

/// 求 2×2 矩阵的逆，奇异时返回 `SingularBasis`
pub fn invert_basis(matrix: &LatticeBasis) -> Result<LatticeBasis> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() <= DETERMINANT_EPSILON * matrix.norm_squared() {
        return Err(NbedError::SingularBasis { determinant: det });
    }
    matrix
        .try_inverse()
        .ok_or(NbedError::SingularBasis { determinant: det })
}

/// 由已求逆的参考晶格基计算应变
fn strain_with_inverse(observed: &LatticeBasis, reference_inv: &LatticeBasis) -> StrainTensor {
    let s = observed * reference_inv - LatticeBasis::identity();
    StrainTensor {
        e_xx: -s[(0, 0)],
        e_yy: -s[(1, 1)],
        e_xy: -(s[(0, 1)] + s[(1, 0)]),
        e_theta: s[(0, 1)] - s[(1, 0)],
    }
}

/// 由观测晶格基与参考晶格基计算应变张量
pub fn strain_from(observed: &LatticeBasis, reference: &LatticeBasis) -> Result<StrainTensor> {
    let reference_inv = invert_basis(reference)?;
    Ok(strain_with_inverse(observed, &reference_inv))
}

/// 预先求逆的参考晶格，供整个 ROI 共享
#[derive(Debug, Clone, Copy)]
pub struct ReferenceLattice {
    basis: LatticeBasis,
    inverse: LatticeBasis,
}

impl ReferenceLattice {
    pub fn new(basis: LatticeBasis) -> Result<Self> {
        let inverse = invert_basis(&basis)?;
        Ok(Self { basis, inverse })
    }

    pub fn basis(&self) -> &LatticeBasis {
        &self.basis
    }

    pub fn strain_of(&self, observed: &LatticeBasis) -> StrainTensor {
        strain_with_inverse(observed, &self.inverse)
    }
}
