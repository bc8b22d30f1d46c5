//! # 批量处理模块
//!
//! 提供显式线程池上的并行执行与帧文件收集。
//!
//! ## 功能
//! - 扫描点 / 图像对的数据并行
//! - 收集匹配的帧文件
//! - 进度反馈
//!
//! ## 依赖关系
//! - 被 `nbed/`, `registration/`, `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FrameCollector;
pub use runner::BatchRunner;
