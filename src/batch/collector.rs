//! # 文件收集器
//!
//! 根据输入路径和模式收集待校正的数据文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多模式）
//! - 递归目录搜索
//!
//! ## 依赖关系
//! - 被 `batch/correct.rs` 的调用方使用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{LabpdfprocError, Result};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 默认匹配的数据文件
pub const DEFAULT_PATTERN: &str = "*.xy,*.chi,*.dat,*.txt";

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<String>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            patterns: vec!["*".to_string()],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.patterns.is_empty() {
            self.patterns = vec!["*".to_string()];
        }
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件，按路径排序
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }

        if !self.input.is_dir() {
            return Err(LabpdfprocError::FileNotFound {
                path: self.input.display().to_string(),
            });
        }

        let patterns = self
            .patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    LabpdfprocError::InvalidParameter(format!("Invalid pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| matches_any(&patterns, entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        Ok(files)
    }
}

/// 检查文件名是否匹配任一模式
fn matches_any(patterns: &[glob::Pattern], path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => patterns.iter().any(|p| p.matches(name)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn user_filesystem() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let input_dir = base.join("input_dir");
        fs::create_dir_all(&input_dir).unwrap();
        for root in [base, input_dir.as_path()] {
            fs::write(root.join("good_data.chi"), "1 2\n3 4\n").unwrap();
            fs::write(root.join("good_data.xy"), "1 2\n3 4\n").unwrap();
            fs::write(root.join("good_data.txt"), "1 2\n3 4\n").unwrap();
            fs::write(root.join("binary.pkl"), b"\x00\x01").unwrap();
        }
        dir
    }

    #[test]
    fn test_single_file() {
        let dir = user_filesystem();
        let file = dir.path().join("good_data.chi");
        let files = FileCollector::new(&file).collect().unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_directory_with_patterns() {
        let dir = user_filesystem();
        let files = FileCollector::new(dir.path())
            .with_pattern(DEFAULT_PATTERN)
            .collect()
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["good_data.chi", "good_data.txt", "good_data.xy"]);
    }

    #[test]
    fn test_recursive_and_wildcards() {
        let dir = user_filesystem();
        let files = FileCollector::new(dir.path())
            .with_pattern("*.chi")
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(files.len(), 2);

        let files = FileCollector::new(dir.path())
            .with_pattern("good_data*")
            .collect()
            .unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_missing_input() {
        let dir = user_filesystem();
        let err = FileCollector::new(dir.path().join("non_existing_dir"))
            .collect()
            .unwrap_err();
        assert!(err.to_string().starts_with("Cannot find"));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = user_filesystem();
        assert!(FileCollector::new(dir.path())
            .with_pattern("[")
            .collect()
            .is_err());
    }
}
