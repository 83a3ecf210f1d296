//! # 两列衍射数据解析器
//!
//! 解析 .xy / .chi / .dat 等两列文本数据。
//!
//! ## 格式说明
//! ```text
//! dataformat = twotheta      <- 数据前的 key = value 行记为元数据
//! mode = xray
//! # chi_Q chi_I              <- 注释
//! 1.0 2.0                    <- 至少两个数值列，只取前两列
//! 3.0 4.0
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `mud/fit.rs`, `batch/` 使用
//! - 使用 `regex` 识别元数据行

use crate::error::{LabpdfprocError, Result};
use crate::models::{DiffractionPattern, XType, RESERVED_METADATA_KEYS};

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][\w .\-]*?)\s*=\s*(.*?)\s*$").expect("header pattern is valid")
});

/// 两列数据
#[derive(Debug, Clone, PartialEq)]
pub struct XyData {
    /// 数据名称（文件名主干）
    pub name: String,
    /// 第一列
    pub x: Vec<f64>,
    /// 第二列
    pub y: Vec<f64>,
    /// 数据前的 key = value 元数据
    pub metadata: BTreeMap<String, String>,
}

impl XyData {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 转换为衍射图谱
    ///
    /// 头部的 `wavelength` 为正数时作为图谱波长；保留键不再留在元数据中。
    pub fn into_pattern(self, xtype: XType) -> DiffractionPattern {
        let wavelength = self
            .metadata
            .get("wavelength")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|w| w.is_finite() && *w > 0.0);
        let mut metadata = self.metadata;
        metadata.retain(|key, _| !RESERVED_METADATA_KEYS.contains(&key.as_str()));

        DiffractionPattern {
            name: self.name,
            xtype,
            x: self.x,
            y: self.y,
            wavelength,
            scat_quantity: "x-ray".to_string(),
            metadata,
        }
    }
}

/// 解析两列数据文件
pub fn parse_xy_file(path: &Path) -> Result<XyData> {
    let bytes = fs::read(path).map_err(|e| LabpdfprocError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_xy_content(&content, name).map_err(|e| match e {
        LabpdfprocError::ParseError { format, reason, .. } => LabpdfprocError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析两列数据
pub fn parse_xy_content(content: &str, name: &str) -> Result<XyData> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut metadata = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((a, b)) = parse_data_row(line) {
            x.push(a);
            y.push(b);
            continue;
        }

        // 数据开始后不再接受元数据
        if x.is_empty() {
            if let Some(caps) = HEADER_RE.captures(line) {
                metadata.insert(caps[1].trim().to_string(), caps[2].to_string());
            }
        }
    }

    if x.is_empty() {
        return Err(LabpdfprocError::ParseError {
            format: "xy".to_string(),
            path: name.to_string(),
            reason: "no numeric data rows found".to_string(),
        });
    }

    Ok(XyData {
        name: name.to_string(),
        x,
        y,
        metadata,
    })
}

/// 至少两个数值列的行视为数据
fn parse_data_row(line: &str) -> Option<(f64, f64)> {
    let mut fields = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty());
    let a: f64 = fields.next()?.parse().ok()?;
    let b: f64 = fields.next()?.parse().ok()?;
    if a.is_finite() && b.is_finite() {
        Some((a, b))
    } else {
        None
    }
}
