//! # 统一错误处理模块
//!
//! 定义 labpdfproc 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// labpdfproc 统一错误类型
#[derive(Error, Debug)]
pub enum LabpdfprocError {
    // ─────────────────────────────────────────────────────────────
    // 数值参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    // ─────────────────────────────────────────────────────────────
    // 名称解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown method: {name}. Allowed methods are {allowed}.")]
    UnknownMethod { name: String, allowed: String },

    #[error("Unknown xtype: {name}. Allowed xtypes are {allowed}.")]
    UnknownXType { name: String, allowed: String },

    #[error("Anode type '{name}' not recognized. Allowed anode types are {allowed}.")]
    UnknownSource { name: String, allowed: String },

    #[error(
        "Please provide a wavelength or anode type because the independent variable axis is not on two-theta ({xtype})."
    )]
    MissingWavelength { xtype: String },

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

    #[error("Cannot find {path}. Please specify valid input file(s) or directories.")]
    FileNotFound { path: String },

    #[error("Output file {path} already exists. Enable overwrite to replace it.")]
    OutputExists { path: String },

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
    // CSV / 绘图错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, LabpdfprocError>;

/// 将名称列表格式化为 `('a', 'b')` 形式，用于错误信息
pub(crate) fn format_allowed<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let quoted: Vec<String> = names
        .into_iter()
        .map(|n| format!("'{}'", n.as_ref()))
        .collect();
    format!("({})", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_allowed() {
        assert_eq!(
            format_allowed(["brute_force", "point_wise"]),
            "('brute_force', 'point_wise')"
        );
        assert_eq!(format_allowed(Vec::<String>::new()), "()");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = LabpdfprocError::ShapeMismatch {
            expected: 50,
            actual: 49,
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected 50 values, got 49");
    }
}
