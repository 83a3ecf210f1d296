//! # 批量执行器
//!
//! 并行执行批量校正任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `batch/correct.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{LabpdfprocError, Result};
use crate::utils::{output, progress};

use rayon::prelude::*;
use std::path::PathBuf;
use tabled::{Table, Tabled};

/// 单个文件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如文件已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
    /// 按输入顺序的全部结果
    pub records: Vec<ProcessResult>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match &result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path.clone(), err.clone()));
            }
        }
        self.records.push(result);
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// 打印汇总
    pub fn print_summary(&self) {
        #[derive(Tabled)]
        struct Row {
            #[tabled(rename = "Status")]
            status: &'static str,
            #[tabled(rename = "Detail")]
            detail: String,
        }

        let rows: Vec<Row> = self
            .records
            .iter()
            .map(|r| match r {
                ProcessResult::Success(msg) => Row {
                    status: "OK",
                    detail: msg.clone(),
                },
                ProcessResult::Skipped(msg) => Row {
                    status: "SKIP",
                    detail: msg.clone(),
                },
                ProcessResult::Failed(path, err) => Row {
                    status: "ERR",
                    detail: format!("{}: {}", path, err),
                },
            })
            .collect();

        if !rows.is_empty() {
            output::print_header("Absorption Correction Summary");
            println!("{}", Table::new(&rows));
        }

        output::print_separator();
        output::print_success(&format!(
            "Batch complete: {} success, {} skipped, {} failed",
            self.success, self.skipped, self.failed
        ));
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    show_progress: bool,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs` 为 0 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: true,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<F>(&self, files: Vec<PathBuf>, processor: F) -> Result<BatchResult>
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = if self.show_progress {
            progress::create_progress_bar(files.len() as u64, "Correcting")
        } else {
            indicatif::ProgressBar::hidden()
        };

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| LabpdfprocError::Other(format!("Failed to start worker pool: {}", e)))?;

        let results: Vec<ProcessResult> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        // 汇总结果
        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_counts() {
        let mut result = BatchResult::default();
        result.merge(ProcessResult::Success("a".into()));
        result.merge(ProcessResult::Skipped("b".into()));
        result.merge(ProcessResult::Failed("c".into(), "boom".into()));
        assert_eq!(result.total(), 3);
        assert_eq!(result.failures, vec![("c".to_string(), "boom".to_string())]);
        assert_eq!(result.records.len(), 3);
    }

    #[test]
    fn test_run_keeps_input_order() {
        let files: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let runner = BatchRunner::new(3).show_progress(false);
        assert_eq!(runner.jobs(), 3);
        let result = runner
            .run(files.clone(), |f| {
                if f.to_str() == Some("f7") {
                    ProcessResult::Failed(f.display().to_string(), "bad".into())
                } else {
                    ProcessResult::Success(f.display().to_string())
                }
            })
            .unwrap();
        assert_eq!(result.success, 19);
        assert_eq!(result.failed, 1);
        assert_eq!(result.records[0], ProcessResult::Success("f0".into()));
        assert_eq!(
            result.records[7],
            ProcessResult::Failed("f7".into(), "bad".into())
        );
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}
