//! # strain 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/strain.rs`

use super::{parse_dims, parse_list, AxisOrderArg, DtypeArg};

use clap::Args;
use std::path::PathBuf;

/// strain 子命令参数
#[derive(Args, Debug)]
pub struct StrainArgs {
    /// Raw little-endian 4D dataset
    pub input: PathBuf,

    /// Array shape in file order, e.g. 'ky,kx,sy,sx'
    #[arg(long, value_parser = parse_dims::<4>)]
    pub shape: [usize; 4],

    /// Element type of the raw file
    #[arg(long, value_enum, default_value = "f32")]
    pub dtype: DtypeArg,

    /// Axis order of the raw file
    #[arg(long, value_enum, default_value = "diffraction-first")]
    pub axis_order: AxisOrderArg,

    /// CSV of seed disks with columns x,y,a,b
    #[arg(long)]
    pub seeds: PathBuf,

    /// Disk radius in pixels
    #[arg(long)]
    pub disk_radius: f64,

    /// Template disk center 'x,y' in pattern pixels (default: pattern center);
    /// seed positions stay in pattern pixels and are shifted to match
    #[arg(long, value_parser = parse_list::<f64, 2>)]
    pub disk_center: Option<[f64; 2]>,

    /// Average the scan in 'by,bx' blocks before fitting
    #[arg(long, value_parser = parse_dims::<2>)]
    pub bin: Option<[usize; 2]>,

    /// Keep scan points whose bright-field intensity exceeds this multiple of the median
    #[arg(long)]
    pub roi_threshold: Option<f64>,

    /// Keep points below the ROI threshold instead of above
    #[arg(long, default_value_t = false)]
    pub roi_below: bool,

    /// Reference lattice 'a_x,a_y,b_x,b_y' (default: fit of the ROI mean pattern)
    #[arg(long, value_parser = parse_list::<f64, 4>, allow_hyphen_values = true)]
    pub reference: Option<[f64; 4]>,

    /// Gaussian blur sigma applied to the log pattern
    #[arg(long, default_value_t = 3.0)]
    pub gaussian_sigma: f64,

    /// Outlier clamp factor relative to the median
    #[arg(long, default_value_t = 10.0)]
    pub outlier_factor: f64,

    /// Hybrid correlation weight (0 = cross, 1 = phase correlation)
    #[arg(long, default_value_t = 0.1)]
    pub hybrid_weight: f64,

    /// Disk contrast cutoff: fit only where max/median >= 1 + cutoff
    #[arg(long, default_value_t = 0.5)]
    pub nan_cutoff: f64,

    /// Gaussian smoothing sigma of the output maps (0 disables)
    #[arg(long, default_value_t = 1.0)]
    pub smoothing_sigma: f64,

    /// Output directory
    #[arg(short, long, default_value = "strain_maps")]
    pub output: PathBuf,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
