//! # 批量处理模块
//!
//! 对多个衍射数据文件批量做吸收校正。
//!
//! ## 功能
//! - 自动检测输入类型（文件/目录）
//! - 收集匹配文件列表
//! - 并行校正并写出结果
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 使用 `correction/` 计算校正曲线
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod correct;
pub mod runner;

pub use collector::{FileCollector, DEFAULT_PATTERN};
pub use correct::{correct_files, print_summary, BatchOptions};
pub use runner::{BatchResult, BatchRunner, ProcessResult};
