//! # NBED 应变分析模块
//!
//! 从 4D-STEM / NBED 数据计算局部应变图。
//!
//! ## 流程
//! ```text
//! precondition → correlate → disks (fitting) → lattice → strain_map
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 使用
//! - 使用 `imaging/`, `models/`, `batch/`
//! - 子模块: precondition, correlate, fitting, disks, lattice, strain_map, detector

pub mod correlate;
pub mod detector;
pub mod disks;
pub mod fitting;
pub mod lattice;
pub mod precondition;
pub mod strain_map;

#[cfg(test)]
pub(crate) mod synthetic;

pub use correlate::correlate;
pub use detector::{roi_from_image, virtual_detector, Threshold};
pub use disks::{fit_disks, DiskFit};
pub use lattice::{strain_from, ReferenceLattice};
pub use precondition::{precondition, PreconditionParams};
pub use strain_map::{build_strain_maps, reference_basis, StrainParams};
