//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `strain`: 4D-STEM / NBED 应变图
//! - `register`: 图像栈亚像素配准与对齐叠加
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: strain, register

pub mod register;
pub mod strain;

use clap::{Parser, Subcommand, ValueEnum};
use std::str::FromStr;

use crate::models::AxisOrder;
use crate::parsers::RawDtype;

/// nbedkit - 4D-STEM 应变与亚像素配准工具
#[derive(Parser)]
#[command(name = "nbedkit")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Strain mapping for 4D-STEM/NBED data and sub-pixel image registration",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Build strain maps from a 4D-STEM / NBED dataset
    Strain(strain::StrainArgs),

    /// Register an image stack with sub-pixel precision and sum the aligned frames
    Register(register::RegisterArgs),
}

// ─────────────────────────────────────────────────────────────
// 共享参数类型
// ─────────────────────────────────────────────────────────────

/// 原始数据类型（小端）
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DtypeArg {
    U8,
    U16,
    U32,
    I16,
    I32,
    F32,
    F64,
}

impl From<DtypeArg> for RawDtype {
    fn from(arg: DtypeArg) -> Self {
        match arg {
            DtypeArg::U8 => RawDtype::U8,
            DtypeArg::U16 => RawDtype::U16,
            DtypeArg::U32 => RawDtype::U32,
            DtypeArg::I16 => RawDtype::I16,
            DtypeArg::I32 => RawDtype::I32,
            DtypeArg::F32 => RawDtype::F32,
            DtypeArg::F64 => RawDtype::F64,
        }
    }
}

/// 输入数组的轴顺序
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AxisOrderArg {
    /// [ky, kx, sy, sx]
    DiffractionFirst,
    /// [sy, sx, ky, kx]
    ScanFirst,
}

impl From<AxisOrderArg> for AxisOrder {
    fn from(arg: AxisOrderArg) -> Self {
        match arg {
            AxisOrderArg::DiffractionFirst => AxisOrder::DiffractionFirst,
            AxisOrderArg::ScanFirst => AxisOrder::ScanFirst,
        }
    }
}

/// 解析逗号分隔的定长列表（如 `64,64,32,32`）
pub fn parse_list<T: FromStr, const N: usize>(input: &str) -> Result<[T; N], String> {
    let values: Vec<T> = input
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<T>()
                .map_err(|_| format!("Invalid value '{}' in '{}'", s.trim(), input))
        })
        .collect::<Result<_, _>>()?;
    let found = values.len();
    values
        .try_into()
        .map_err(|_| format!("Expected {} comma-separated values, found {}", N, found))
}

/// 解析维度列表，要求每一维为正
pub fn parse_dims<const N: usize>(input: &str) -> Result<[usize; N], String> {
    let dims = parse_list::<usize, N>(input)?;
    if dims.contains(&0) {
        return Err(format!("Dimensions must be positive: '{}'", input));
    }
    Ok(dims)
}
