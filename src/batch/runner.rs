//! # 并行执行器
//!
//! 在显式大小的 rayon 线程池中并行执行互相独立的任务
//! （扫描点、图像对、帧文件）。
//!
//! ## 功能
//! - 可配置线程数（0 = CPU 核数）
//! - 结果按输入顺序返回，每个任务只写自己的输出
//! - 可选进度条
//!
//! ## 依赖关系
//! - 被 `nbed/strain_map.rs`, `registration/stack.rs`, `commands/register.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{NbedError, Result};
use crate::utils::progress;

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// 并行执行器
#[derive(Debug, Clone)]
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    show_progress: bool,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BatchRunner {
    /// 创建新的执行器，`jobs = 0` 表示使用全部 CPU 核
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: false,
        }
    }

    /// 开启或关闭进度条
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    fn progress_bar(&self, len: usize, message: &str) -> ProgressBar {
        if self.show_progress {
            progress::create_progress_bar(len as u64, message)
        } else {
            ProgressBar::hidden()
        }
    }

    fn pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| NbedError::Other(format!("failed to build thread pool: {}", e)))
    }

    /// 并行映射，结果顺序与 `items` 一致
    pub fn map<T, R, F>(&self, items: &[T], message: &str, task: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.try_map(items, message, |item| Ok(task(item)))
    }

    /// 并行映射，任一任务出错则返回该错误
    pub fn try_map<T, R, F>(&self, items: &[T], message: &str, task: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        let pb = self.progress_bar(items.len(), message);
        let done = AtomicUsize::new(0);
        let pool = self.pool()?;

        let results: Result<Vec<R>> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = task(item);
                    done.fetch_add(1, Ordering::Relaxed);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();
        debug!(
            jobs = self.jobs,
            completed = done.load(Ordering::Relaxed),
            total = items.len(),
            "{}",
            message
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_order() {
        let runner = BatchRunner::new(3);
        let items: Vec<usize> = (0..100).collect();
        let squares = runner.map(&items, "square", |&i| i * i).unwrap();
        assert_eq!(squares.len(), 100);
        assert!(squares.iter().enumerate().all(|(i, &v)| v == i * i));
    }

    #[test]
    fn test_zero_jobs_uses_all_cores() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
        assert_eq!(BatchRunner::new(2).jobs(), 2);
    }

    #[test]
    fn test_try_map_propagates_error() {
        let runner = BatchRunner::new(2);
        let items = vec![1, 2, 3, 4];
        let result = runner.try_map(&items, "check", |&i| {
            if i == 3 {
                Err(NbedError::InvalidInput("three".to_string()))
            } else {
                Ok(i)
            }
        });
        assert!(matches!(result, Err(NbedError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_input() {
        let runner = BatchRunner::new(1).with_progress(true);
        let out = runner.map(&Vec::<u8>::new(), "empty", |&v| v).unwrap();
        assert!(out.is_empty());
    }
}
