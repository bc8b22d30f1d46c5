//! # nbedkit - 4D-STEM 应变与亚像素配准工具
//!
//! ## 子命令
//! - `strain`   - 由 4D-STEM / NBED 数据生成应变图
//! - `register` - 图像栈两两亚像素配准并对齐叠加
//!
//! ## 日志
//! 通过 `RUST_LOG` 控制（默认 `warn`），输出到 stderr。

use clap::Parser;
use nbedkit::cli::Cli;
use nbedkit::{commands, utils};
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
