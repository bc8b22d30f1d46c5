//! # 原始二进制数组读取
//!
//! 读取无文件头的小端稠密数组（探测器原始输出），统一转为 `f64`。
//!
//! ## 支持类型
//! `u8`, `u16`, `u32`, `i16`, `i32`, `f32`, `f64`
//!
//! ## 依赖关系
//! - 被 `commands/strain.rs`, `commands/register.rs` 使用

use crate::error::{NbedError, Result};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 原始数据元素类型（小端）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RawDtype {
    U8,
    U16,
    U32,
    I16,
    I32,
    #[default]
    F32,
    F64,
}

impl RawDtype {
    /// 单个元素的字节数
    pub fn size(&self) -> usize {
        match self {
            RawDtype::U8 => 1,
            RawDtype::U16 | RawDtype::I16 => 2,
            RawDtype::U32 | RawDtype::I32 | RawDtype::F32 => 4,
            RawDtype::F64 => 8,
        }
    }

    /// 解码一个元素，`chunk` 长度必须等于 `size()`
    fn decode(&self, chunk: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..chunk.len()].copy_from_slice(chunk);
        match self {
            RawDtype::U8 => buf[0] as f64,
            RawDtype::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
            RawDtype::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
            RawDtype::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            RawDtype::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            RawDtype::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            RawDtype::F64 => f64::from_le_bytes(buf),
        }
    }
}

impl std::fmt::Display for RawDtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RawDtype::U8 => "u8",
            RawDtype::U16 => "u16",
            RawDtype::U32 => "u32",
            RawDtype::I16 => "i16",
            RawDtype::I32 => "i32",
            RawDtype::F32 => "f32",
            RawDtype::F64 => "f64",
        };
        write!(f, "{}", name)
    }
}

/// 从字节解码，元素数必须等于 `expected`
pub fn decode_raw(
    bytes: &[u8],
    dtype: RawDtype,
    expected: usize,
    source: &str,
) -> Result<Vec<f64>> {
    let needed = expected * dtype.size();
    if bytes.len() != needed {
        return Err(NbedError::ParseError {
            format: format!("raw {}", dtype),
            path: source.to_string(),
            reason: format!(
                "expected {} bytes ({} elements), found {} bytes",
                needed,
                expected,
                bytes.len()
            ),
        });
    }
    Ok(bytes
        .chunks_exact(dtype.size())
        .map(|chunk| dtype.decode(chunk))
        .collect())
}

/// 读取原始数组文件
pub fn read_raw(path: &Path, dtype: RawDtype, expected: usize) -> Result<Vec<f64>> {
    if !path.exists() {
        return Err(NbedError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = fs::read(path).map_err(|e| NbedError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    decode_raw(&bytes, dtype, expected, &path.display().to_string())
}
