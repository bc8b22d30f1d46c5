//! # 种子表解析
//!
//! 读取初始盘位置与 Miller 指数的 CSV 表：
//!
//! ```text
//! x,y,a,b
//! 32.0,32.0,0,0
//! 52.0,32.0,1,0
//! ```
//!
//! `x` 为列坐标，`y` 为行坐标（像素）。
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs` 使用
//! - 使用 `csv` + `serde`

use crate::error::{NbedError, Result};
use crate::models::DiskSeed;

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SeedRow {
    x: f64,
    y: f64,
    a: i32,
    b: i32,
}

/// 从任意读取器解析种子表
pub fn parse_seeds<R: Read>(reader: R, source: &str) -> Result<Vec<DiskSeed>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut seeds = Vec::new();
    for row in rdr.deserialize() {
        let row: SeedRow = row?;
        if !row.x.is_finite() || !row.y.is_finite() {
            return Err(NbedError::ParseError {
                format: "seeds".to_string(),
                path: source.to_string(),
                reason: format!("non-finite seed position ({}, {})", row.x, row.y),
            });
        }
        seeds.push(DiskSeed::new(row.y, row.x, row.a, row.b));
    }
    if seeds.is_empty() {
        return Err(NbedError::ParseError {
            format: "seeds".to_string(),
            path: source.to_string(),
            reason: "no seed rows".to_string(),
        });
    }
    Ok(seeds)
}

/// 读取种子表文件
pub fn read_seeds(path: &Path) -> Result<Vec<DiskSeed>> {
    let file = std::fs::File::open(path).map_err(|e| NbedError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_seeds(file, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MillerIndex;

    #[test]
    fn test_parse_seed_table() {
        let text = "x, y, a, b\n32.0, 30.5, 0, 0\n52, 32, 1, 0\n22.0,14.7,0,1\n";
        let seeds = parse_seeds(text.as_bytes(), "mem").unwrap();
        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0].position.x, 32.0);
        assert_eq!(seeds[0].position.y, 30.5);
        assert!(seeds[0].index.is_origin());
        assert_eq!(seeds[2].index, MillerIndex::new(0, 1));
    }

    #[test]
    fn test_bad_tables() {
        assert!(parse_seeds("x,y,a,b\n".as_bytes(), "mem").is_err());
        assert!(matches!(
            parse_seeds("x,y,a,b\n1.0,2.0,zero,0\n".as_bytes(), "mem"),
            Err(NbedError::CsvError(_))
        ));
        assert!(parse_seeds("x,y,a,b\nNaN,2.0,0,0\n".as_bytes(), "mem").is_err());
    }

    #[test]
    fn test_read_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.csv");
        std::fs::write(&path, "x,y,a,b\n10,12,0,0\n").unwrap();
        let seeds = read_seeds(&path).unwrap();
        assert_eq!(seeds[0].position.y, 12.0);
        assert!(read_seeds(&dir.path().join("nope.csv")).is_err());
    }
}
