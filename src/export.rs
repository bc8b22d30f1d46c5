//! # CSV 导出
//!
//! 把应变图、拟合状态、拟合偏差与位移矩阵写成 CSV。
//!
//! ## 格式
//! - 二维图：每行一条扫描行，无表头
//! - 拟合偏差：`row,col,dev_x,dev_y`，只写有值的点
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{NbedError, Result};
use crate::models::{FitDeviation, FitStatus, StrainComponent, StrainMaps};

use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    Ok(csv::WriterBuilder::new().has_headers(false).from_path(path)?)
}

fn finish(mut wtr: csv::Writer<fs::File>, path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| NbedError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 写出二维数组，每行一条记录
pub fn write_map(map: &Array2<f64>, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    for row in map.rows() {
        wtr.write_record(row.iter().map(|v| format!("{:.8e}", v)))?;
    }
    finish(wtr, path)
}

/// 写出拟合状态图
pub fn write_status(status: &Array2<FitStatus>, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    for row in status.rows() {
        wtr.write_record(row.iter().map(|s| s.to_string()))?;
    }
    finish(wtr, path)
}

/// 写出拟合偏差（稀疏形式）
pub fn write_deviation(deviation: &Array2<Option<FitDeviation>>, path: &Path) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record(["row", "col", "dev_x", "dev_y"])?;
    for ((r, c), dev) in deviation.indexed_iter() {
        if let Some(d) = dev {
            wtr.write_record([
                r.to_string(),
                c.to_string(),
                format!("{:.8e}", d.x),
                format!("{:.8e}", d.y),
            ])?;
        }
    }
    finish(wtr, path)
}

/// 把全部应变结果写入目录，返回写出的文件
pub fn write_strain_maps(maps: &StrainMaps, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut written = Vec::new();
    for component in StrainComponent::ALL {
        let path = dir.join(format!("{}.csv", component.name()));
        write_map(maps.component(component), &path)?;
        written.push(path);
    }
    let path = dir.join("fit_deviation.csv");
    write_deviation(&maps.fit_deviation, &path)?;
    written.push(path);
    let path = dir.join("status.csv");
    write_status(&maps.status, &path)?;
    written.push(path);
    Ok(written)
}

/// 创建输出目录
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| NbedError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}
