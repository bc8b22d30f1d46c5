//! # 图像处理原语模块
//!
//! 应变分析与图像配准共用的底层数值原语。
//!
//! ## 子模块
//! - `fft`: 二维 FFT、fftshift、相位斜坡平移
//! - `filters`: 归一化、中值、高斯模糊、Sobel、圆盘掩模
//!
//! ## 依赖关系
//! - 被 `nbed/` 与 `registration/` 使用
//! - 无内部模块依赖

pub mod fft;
pub mod filters;

pub use fft::{fft2, fft2_real, fftshift, ifft2, ifftshift, shift_by_phase, ComplexImage};
pub use filters::{disk_mask, gaussian_filter, median, normalize, sobel_magnitude};
