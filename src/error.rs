//! # 统一错误处理模块
//!
//! 定义 nbedkit 的所有错误类型，使用 `thiserror` 派生。
//!
//! 单个扫描点的拟合失败不属于错误，而是记录在 `FitStatus` 中；
//! 只有结构性问题（形状不匹配、参考晶格缺失、非法输入）才会中止整个调用。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// nbedkit 统一错误类型
#[derive(Error, Debug)]
pub enum NbedError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 数值 / 数据错误
    // ─────────────────────────────────────────────────────────────
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular lattice basis (determinant = {determinant:.3e})")]
    SingularBasis { determinant: f64 },

    #[error("Reference lattice unavailable: {0}")]
    ReferenceUnavailable(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl NbedError {
    /// 构造形状不匹配错误
    pub fn shape_mismatch(context: &str, expected: &[usize], found: &[usize]) -> Self {
        NbedError::ShapeMismatch {
            context: context.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, NbedError>;
