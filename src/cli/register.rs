//! # register 子命令 CLI 定义
//!
//! 输入可以是单个 `[n, ny, nx]` 原始文件（`--shape`），
//! 也可以是帧文件目录（`--frame-shape` + `--pattern`）。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/register.rs`

use super::{parse_dims, DtypeArg};
use crate::registration::DEFAULT_SAMPLING;

use clap::Args;
use std::path::PathBuf;

/// register 子命令参数
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Raw image stack file, or a directory of raw frames
    pub input: PathBuf,

    /// Stack shape 'n,ny,nx' for a single stack file
    #[arg(long, value_parser = parse_dims::<3>, conflicts_with = "frame_shape")]
    pub shape: Option<[usize; 3]>,

    /// Frame shape 'ny,nx' for a directory of frames
    #[arg(long, value_parser = parse_dims::<2>)]
    pub frame_shape: Option<[usize; 2]>,

    /// Frame file pattern (comma-separated for multiple)
    #[arg(short, long, default_value = "*.raw")]
    pub pattern: String,

    /// Search frame directories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Element type of the raw files
    #[arg(long, value_enum, default_value = "f32")]
    pub dtype: DtypeArg,

    /// Upsampling factor: register to within 1/sampling of a pixel
    #[arg(long, default_value_t = DEFAULT_SAMPLING)]
    pub sampling: usize,

    /// Output directory
    #[arg(short, long, default_value = "registration")]
    pub output: PathBuf,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
