//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `nbed/`, `registration/`, `export.rs`, `utils/`
//! - 子模块: strain, register

pub mod register;
pub mod strain;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Strain(args) => strain::execute(args),
        Commands::Register(args) => register::execute(args),
    }
}
