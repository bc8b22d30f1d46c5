//! # 傅里叶亚像素配准模块
//!
//! 矩阵乘法 DFT 上采样的亚像素配准，以及图像栈的两两配准与对齐叠加。
//!
//! ## 依赖关系
//! - 被 `commands/register.rs` 使用
//! - 使用 `imaging/fft.rs`, `batch/`
//! - 子模块: dft, register, stack

pub mod dft;
pub mod register;
pub mod stack;

pub use dft::{dftups, first_max_index, fourier_pad};
pub use register::{dft_registration, Registration};
pub use stack::{corrected_stack, pairwise_register, stack_frames, ShiftMatrices, DEFAULT_SAMPLING};
