//! # 数据模型模块
//!
//! 定义 4D 数据集、衍射盘与应变结果的统一数据模型。
//!
//! ## 依赖关系
//! - 被 `nbed/`, `parsers/`, `commands/` 使用
//! - 子模块: dataset, disk, strain

pub mod dataset;
pub mod disk;
pub mod strain;

pub use dataset::{AxisOrder, Roi, ScanGrid};
pub use disk::{DiskPosition, DiskSeed, DiskTemplate, MillerIndex};
pub use strain::{
    FitDeviation, FitStatus, LatticeBasis, StrainComponent, StrainMaps, StrainTensor,
};
