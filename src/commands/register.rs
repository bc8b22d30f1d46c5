//! # register 命令实现
//!
//! 对图像栈做两两亚像素配准，按平均位移对齐后叠加。
//!
//! ## 输入
//! - 单个 `[n, ny, nx]` raw 文件（`--shape`）
//! - 或帧文件目录（`--frame-shape`，按文件名排序）
//!
//! ## 输出
//! - `row_shifts.csv`, `col_shifts.csv`: 位移矩阵
//! - `corrected.csv`: 对齐叠加后的图像
//!
//! ## 依赖关系
//! - 使用 `cli/register.rs` 定义的参数
//! - 使用 `batch/`, `parsers/raw.rs`, `registration/`, `export.rs`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FrameCollector};
use crate::cli::register::RegisterArgs;
use crate::error::{NbedError, Result};
use crate::export;
use crate::parsers::{self, RawDtype};
use crate::registration;
use crate::utils::output;

use ndarray::{Array2, Array3};
use std::path::Path;
use tabled::{Table, Tabled};

/// 每帧平均位移
#[derive(Tabled)]
struct ShiftRow {
    #[tabled(rename = "Frame")]
    frame: usize,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Row shift (px)")]
    row_shift: String,
    #[tabled(rename = "Col shift (px)")]
    col_shift: String,
}

/// 执行 register 命令
pub fn execute(args: RegisterArgs) -> Result<()> {
    output::print_header("Sub-pixel Image Registration");

    let runner = BatchRunner::new(args.jobs).with_progress(true);
    let (stack, sources) = load_stack(&args, &runner)?;
    let (count, ny, nx) = stack.dim();
    output::print_info(&format!(
        "Registering {} frames of {} x {} (1/{} px) with {} jobs",
        count,
        ny,
        nx,
        args.sampling,
        runner.jobs()
    ));

    let shifts = registration::pairwise_register(&stack.view(), args.sampling, &runner)?;
    let corrected = registration::corrected_stack(&stack.view(), &shifts, &runner)?;

    export::ensure_dir(&args.output)?;
    let outputs = [
        ("row_shifts.csv", &shifts.rows),
        ("col_shifts.csv", &shifts.cols),
        ("corrected.csv", &corrected),
    ];
    for (name, data) in outputs {
        let path = args.output.join(name);
        export::write_map(data, &path)?;
        output::print_success(&format!("Saved '{}'", path.display()));
    }

    let (row_mean, col_mean) = shifts.mean_shifts();
    let rows: Vec<ShiftRow> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| ShiftRow {
            frame: i,
            source: source.clone(),
            row_shift: format!("{:+.4}", row_mean[i]),
            col_shift: format!("{:+.4}", col_mean[i]),
        })
        .collect();

    output::print_header("Mean Shift Per Frame");
    println!("{}", Table::new(&rows));

    output::print_done(&format!(
        "Wrote shift matrices and corrected image to '{}'",
        args.output.display()
    ));
    Ok(())
}

/// 读取图像栈，同时返回每帧的来源描述
fn load_stack(args: &RegisterArgs, runner: &BatchRunner) -> Result<(Array3<f64>, Vec<String>)> {
    let dtype = RawDtype::from(args.dtype);

    if args.input.is_dir() {
        let [ny, nx] = args.frame_shape.ok_or_else(|| {
            NbedError::InvalidArgument(
                "--frame-shape is required for a frame directory".to_string(),
            )
        })?;
        let files = FrameCollector::new(args.input.clone())
            .with_pattern(&args.pattern)?
            .recursive(args.recursive)
            .collect()?;
        output::print_info(&format!("Found {} frame files", files.len()));

        let frames = runner.try_map(&files, "Reading frames", |path| {
            read_frame(path, dtype, (ny, nx))
        })?;
        let sources = files.iter().map(|p| display_name(p)).collect();
        return Ok((registration::stack_frames(&frames)?, sources));
    }

    let [n, ny, nx] = args.shape.ok_or_else(|| {
        NbedError::InvalidArgument("--shape is required for a single stack file".to_string())
    })?;
    let values = parsers::read_raw(&args.input, dtype, n * ny * nx)?;
    let stack = Array3::from_shape_vec((n, ny, nx), values)
        .map_err(|e| NbedError::InvalidInput(e.to_string()))?;
    let name = display_name(&args.input);
    let sources = (0..n).map(|i| format!("{}[{}]", name, i)).collect();
    Ok((stack, sources))
}

fn read_frame(path: &Path, dtype: RawDtype, shape: (usize, usize)) -> Result<Array2<f64>> {
    let values = parsers::read_raw(path, dtype, shape.0 * shape.1)?;
    Array2::from_shape_vec(shape, values).map_err(|e| NbedError::InvalidInput(e.to_string()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DtypeArg;
    use approx::assert_abs_diff_eq;
    use std::fs;

    fn spot(cy: f64, cx: f64) -> Array2<f64> {
        Array2::from_shape_fn((32, 32), |(i, j)| {
            let r2 = (i as f64 - cy).powi(2) + (j as f64 - cx).powi(2);
            (-r2 / 8.0).exp()
        })
    }

    fn to_bytes(data: &Array2<f64>) -> Vec<u8> {
        data.iter().flat_map(|v| (*v as f32).to_le_bytes()).collect()
    }

    fn args(input: &Path, output: &Path) -> RegisterArgs {
        RegisterArgs {
            input: input.to_path_buf(),
            shape: None,
            frame_shape: None,
            pattern: "*.raw".to_string(),
            recursive: false,
            dtype: DtypeArg::F32,
            sampling: 10,
            output: output.to_path_buf(),
            jobs: 2,
        }
    }

    fn read_csv(path: &Path) -> Vec<Vec<f64>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.split(',').map(|v| v.parse().unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_register_single_stack_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stack.raw");
        let bytes: Vec<u8> = [spot(16.0, 16.0), spot(18.0, 15.0)]
            .iter()
            .flat_map(to_bytes)
            .collect();
        fs::write(&input, bytes).unwrap();

        let out = dir.path().join("out");
        let mut a = args(&input, &out);
        a.shape = Some([2, 32, 32]);
        execute(a).unwrap();

        let rows = read_csv(&out.join("row_shifts.csv"));
        let cols = read_csv(&out.join("col_shifts.csv"));
        assert_eq!(rows.len(), 2);
        assert_abs_diff_eq!(rows[1][0], 2.0, epsilon = 0.1);
        assert_abs_diff_eq!(cols[1][0], -1.0, epsilon = 0.1);
        assert_eq!(read_csv(&out.join("corrected.csv")).len(), 32);
    }

    #[test]
    fn test_register_frame_directory() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        fs::create_dir(&frames).unwrap();
        fs::write(frames.join("a.raw"), to_bytes(&spot(16.0, 16.0))).unwrap();
        fs::write(frames.join("b.raw"), to_bytes(&spot(15.0, 17.0))).unwrap();
        fs::write(frames.join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("out");
        let mut a = args(&frames, &out);
        a.frame_shape = Some([32, 32]);
        execute(a).unwrap();

        let rows = read_csv(&out.join("row_shifts.csv"));
        assert_eq!(rows.len(), 2);
        assert_abs_diff_eq!(rows[1][0], -1.0, epsilon = 0.1);
    }

    #[test]
    fn test_missing_shape_is_an_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stack.raw");
        fs::write(&input, [0u8; 16]).unwrap();
        let err = execute(args(&input, &dir.path().join("out")));
        assert!(matches!(err, Err(NbedError::InvalidArgument(_))));

        let err = execute(args(dir.path(), &dir.path().join("out")));
        assert!(matches!(err, Err(NbedError::InvalidArgument(_))));
    }
}
