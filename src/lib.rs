//! # nbedkit
//!
//! 4D-STEM / NBED 应变分析与傅里叶亚像素配准。
//!
//! ## 模块
//! - `nbed` - 预处理、混合互相关、盘拟合、晶格应变、应变图组装
//! - `registration` - 矩阵乘法 DFT 上采样配准与图像栈对齐
//! - `imaging` - FFT、高斯模糊、Sobel 等图像原语
//! - `models` - 扫描网格、盘、应变等数据模型
//! - `batch` - 并行执行器与帧文件收集
//! - `parsers` / `export` - raw 数组、种子表读取与 CSV 写出
//!
//! ## 依赖关系
//! ```text
//! commands/ ──> nbed/ ──────────> imaging/
//!    │            │                  ▲
//!    │            └──> models/       │
//!    ├──> registration/ ─────────────┘
//!    ├──> parsers/, export.rs
//!    └──> batch/ ──> utils/
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod export;
pub mod imaging;
pub mod models;
pub mod nbed;
pub mod parsers;
pub mod registration;
pub mod utils;

pub use error::{NbedError, Result};
