//! # 帧文件收集器
//!
//! 从目录中收集图像帧文件，按文件名排序作为帧序号。
//!
//! ## 功能
//! - 单文件或目录输入
//! - 逗号分隔的多个 glob 模式
//! - 可选递归搜索
//!
//! ## 依赖关系
//! - 被 `commands/register.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{NbedError, Result};

use glob::Pattern;
use std::path::PathBuf;
use walkdir::WalkDir;

/// 帧文件收集器
pub struct FrameCollector {
    input: PathBuf,
    patterns: Vec<String>,
    recursive: bool,
}

impl FrameCollector {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: vec!["*.raw".to_string()],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔），非法模式返回错误
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let patterns: Vec<String> = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !patterns.is_empty() {
            compile_patterns(&patterns)?;
            self.patterns = patterns;
        }
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的帧文件，按路径排序
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }
        if !self.input.is_dir() {
            return Err(NbedError::DirectoryNotFound {
                path: self.input.display().to_string(),
            });
        }

        let patterns = compile_patterns(&self.patterns)?;
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut frames: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| patterns.iter().any(|p| p.matches(name)))
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        if frames.is_empty() {
            return Err(NbedError::NoFilesFound {
                pattern: self.patterns.join(","),
            });
        }
        frames.sort();
        Ok(frames)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| {
                NbedError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_multiple_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_07.raw", "frame_007.raw", "frame_08.bin", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let frames = FrameCollector::new(dir.path().to_path_buf())
            .with_pattern("frame_??.raw, *.bin")
            .unwrap()
            .collect()
            .unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_07.raw", "frame_08.bin"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FrameCollector::new(dir.path().to_path_buf()).with_pattern("frame_[.raw");
        assert!(matches!(err, Err(NbedError::InvalidArgument(_))));
    }

    #[test]
    fn test_collect_sorted_frames() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["f2.raw", "f0.raw", "f1.raw", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let frames = FrameCollector::new(dir.path().to_path_buf()).collect().unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["f0.raw", "f1.raw", "f2.raw"]);
    }

    #[test]
    fn test_collect_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FrameCollector::new(dir.path().join("absent")).collect();
        assert!(matches!(missing, Err(NbedError::DirectoryNotFound { .. })));

        let none = FrameCollector::new(dir.path().to_path_buf())
            .with_pattern("*.tif")
            .unwrap()
            .collect();
        assert!(matches!(none, Err(NbedError::NoFilesFound { .. })));
    }
}
