//! # strain 命令实现
//!
//! 读取原始 4D 数据与种子表，生成应变图并写出 CSV。
//!
//! ## 流程
//! 1. 读取 raw 文件，按轴顺序构造扫描网格（可选分箱）
//! 2. 读取种子表，构造盘模板
//! 3. 可选：以明场虚拟探测器图像阈值化得到 ROI
//! 4. 组装应变图，写出 CSV，打印统计表
//!
//! ## 依赖关系
//! - 使用 `cli/strain.rs` 定义的参数
//! - 使用 `parsers/`, `nbed/`, `export.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::BatchRunner;
use crate::cli::strain::StrainArgs;
use crate::error::Result;
use crate::export;
use crate::models::{
    DiskPosition, DiskSeed, DiskTemplate, FitStatus, LatticeBasis, Roi, ScanGrid, StrainComponent,
    StrainMaps,
};
use crate::nbed::{self, StrainParams, Threshold};
use crate::parsers::{self, RawDtype};
use crate::utils::{output, progress};

use tabled::{Table, Tabled};

/// 状态统计行
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Points")]
    points: usize,
}

/// 应变分量统计行
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: &'static str,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

/// 执行 strain 命令
pub fn execute(args: StrainArgs) -> Result<()> {
    output::print_header("4D-STEM Strain Mapping");

    let grid = load_grid(&args)?;
    let (sy, sx) = grid.scan_shape();
    let (ky, kx) = grid.pattern_shape();
    output::print_field("Scan", &format!("{} x {}", sy, sx));
    output::print_field("Pattern", &format!("{} x {}", ky, kx));

    let seeds = parsers::read_seeds(&args.seeds)?;
    output::print_info(&format!(
        "Loaded {} seed disks from '{}'",
        seeds.len(),
        args.seeds.display()
    ));

    let template = match args.disk_center {
        Some([x, y]) => DiskTemplate::new((ky, kx), DiskPosition::new(y, x), args.disk_radius)?,
        None => DiskTemplate::centered((ky, kx), args.disk_radius)?,
    };
    let seeds = seeds_in_map_frame(&seeds, &template);

    let roi = select_roi(&grid, &template, &args)?;
    let roi_points = roi.iter().filter(|&&inside| inside).count();
    output::print_info(&format!("ROI covers {} of {} scan points", roi_points, sy * sx));

    let reference = args
        .reference
        .map(|[a_x, a_y, b_x, b_y]| LatticeBasis::new(a_x, a_y, b_x, b_y));
    if reference.is_none() {
        output::print_info("No reference given, fitting the ROI mean pattern");
    }

    let params = StrainParams {
        gaussian_sigma: args.gaussian_sigma,
        outlier_factor: args.outlier_factor,
        hybrid_weight: args.hybrid_weight,
        nan_cutoff: args.nan_cutoff,
        smoothing_sigma: args.smoothing_sigma,
    };
    let runner = BatchRunner::new(args.jobs).with_progress(true);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));

    let maps =
        nbed::build_strain_maps(&grid, &roi, &template, &seeds, reference, &params, &runner)?;

    output::print_basis("Reference lattice", &maps.reference);
    let written = export::write_strain_maps(&maps, &args.output)?;
    print_summary(&maps);

    if maps.fitted_count() == 0 {
        output::print_warning("No scan point produced a lattice fit; maps are all zero.");
    }
    output::print_done(&format!(
        "Wrote {} files to '{}'",
        written.len(),
        args.output.display()
    ));
    Ok(())
}

/// 读取 raw 文件并构造扫描网格
fn load_grid(args: &StrainArgs) -> Result<ScanGrid> {
    let dtype = RawDtype::from(args.dtype);
    let expected: usize = args.shape.iter().product();

    let spinner =
        progress::create_spinner(&format!("Reading {} ({})", args.input.display(), dtype));
    let values = parsers::read_raw(&args.input, dtype, expected);
    spinner.finish_and_clear();

    let grid = ScanGrid::from_flat(values?, args.shape, args.axis_order.into())?;
    match args.bin {
        Some([by, bx]) => {
            let binned = grid.bin_scan(by, bx)?;
            output::print_info(&format!("Binned scan by {} x {}", by, bx));
            Ok(binned)
        }
        None => Ok(grid),
    }
}

/// 将衍射图坐标下的种子平移到互相关图坐标
///
/// 模板盘心 `c` 偏离零位移像素 `z` 时，图中位于 `p` 的盘在互相关图中出现在
/// `p - (c - z)`。居中模板的偏移为零，种子保持不变。
fn seeds_in_map_frame(seeds: &[DiskSeed], template: &DiskTemplate) -> Vec<DiskSeed> {
    let center = template.center();
    let (zy, zx) = nbed::correlate::zero_shift_index(template.shape());
    let (dy, dx) = (center.y - zy as f64, center.x - zx as f64);
    seeds
        .iter()
        .map(|s| DiskSeed {
            position: DiskPosition::new(s.position.y - dy, s.position.x - dx),
            index: s.index,
        })
        .collect()
}

/// 由明场虚拟探测器图像生成 ROI，未给阈值时覆盖全部扫描点
fn select_roi(grid: &ScanGrid, template: &DiskTemplate, args: &StrainArgs) -> Result<Roi> {
    let Some(factor) = args.roi_threshold else {
        return Ok(grid.full_roi());
    };
    let bright_field = nbed::virtual_detector(grid, template.center(), 0.0, template.radius())?;
    let threshold = if args.roi_below {
        Threshold::Below
    } else {
        Threshold::Above
    };
    nbed::roi_from_image(&bright_field.view(), factor, threshold)
}

fn print_summary(maps: &StrainMaps) {
    let status_rows: Vec<StatusRow> = FitStatus::ALL
        .iter()
        .map(|&status| StatusRow {
            status: status.to_string(),
            points: maps.count_status(status),
        })
        .filter(|row| row.points > 0)
        .collect();

    output::print_header("Fit Status");
    println!("{}", Table::new(&status_rows));

    let component_rows: Vec<ComponentRow> = StrainComponent::ALL
        .iter()
        .filter_map(|&component| {
            let (mean, min, max) = fitted_stats(maps, component)?;
            Some(ComponentRow {
                component: component.name(),
                mean: format!("{:.5}", mean),
                min: format!("{:.5}", min),
                max: format!("{:.5}", max),
            })
        })
        .collect();

    if !component_rows.is_empty() {
        output::print_header("Strain Over Fitted Points");
        println!("{}", Table::new(&component_rows));
    }
}

/// 成功拟合点上的均值、最小值、最大值
fn fitted_stats(maps: &StrainMaps, component: StrainComponent) -> Option<(f64, f64, f64)> {
    let values: Vec<f64> = maps
        .component(component)
        .iter()
        .zip(maps.status.iter())
        .filter(|(_, status)| status.is_fitted())
        .map(|(&v, _)| v)
        .collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((mean, min, max))
}
