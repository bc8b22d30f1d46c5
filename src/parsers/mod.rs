//! # 解析器模块
//!
//! 读取原始稠密数组与种子表。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: raw, seeds

pub mod raw;
pub mod seeds;

pub use raw::{read_raw, RawDtype};
pub use seeds::read_seeds;
