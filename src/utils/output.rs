//! # 美化输出工具
//!
//! 提供统一的终端输出样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块和 `main.rs` 使用
//! - 使用 `colored` crate

use crate::models::LatticeBasis;

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印带标签的键值对
pub fn print_field(label: &str, value: &str) {
    println!("    {:<18} {}", label.dimmed(), value);
}

/// 打印晶格基（行向量 a、b）
pub fn print_basis(label: &str, basis: &LatticeBasis) {
    println!("{} {}", "[*]".blue().bold(), label);
    print_field(
        "a (x, y)",
        &format!("({:>10.4}, {:>10.4})", basis[(0, 0)], basis[(0, 1)]),
    );
    print_field(
        "b (x, y)",
        &format!("({:>10.4}, {:>10.4})", basis[(1, 0)], basis[(1, 1)]),
    );
}
