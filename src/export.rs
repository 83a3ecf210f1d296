//! # 图谱数据导出
//!
//! 将校正后的图谱和校正曲线写入文本文件。
//!
//! ## 支持格式
//! - chi/XY: `key = value` 头部 + 制表符分隔的两列数据，可被 `parsers/xy.rs` 读回
//! - CSV: 以自变量类型和散射量为列名
//!
//! ## 依赖关系
//! - 被 `batch/` 调用
//! - 使用 `models/pattern.rs` 的 DiffractionPattern
//! - 使用 `csv` 库写入 CSV 文件

use crate::correction::CorrectionCurve;
use crate::error::{LabpdfprocError, Result};
use crate::models::{DiffractionPattern, RESERVED_METADATA_KEYS};

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 导出为 chi/XY 格式
pub fn to_chi(pattern: &DiffractionPattern, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_chi(pattern)).map_err(|e| LabpdfprocError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 导出校正曲线为 chi/XY 格式
pub fn curve_to_chi(curve: &CorrectionCurve, output_path: &Path) -> Result<()> {
    to_chi(&curve.clone().into_pattern(), output_path)
}

/// 导出为 CSV 格式
pub fn to_csv(pattern: &DiffractionPattern, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([pattern.xtype.name(), pattern.scat_quantity.as_str()])?;
    for (x, y) in pattern.points() {
        wtr.write_record(&[x.to_string(), y.to_string()])?;
    }

    wtr.flush().map_err(|e| LabpdfprocError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 生成 chi 文本
fn render_chi(pattern: &DiffractionPattern) -> String {
    let mut out = String::new();

    // String 写入不会失败
    let _ = writeln!(out, "name = {}", pattern.name);
    if let Some(wavelength) = pattern.wavelength {
        let _ = writeln!(out, "wavelength = {}", wavelength);
    }
    let _ = writeln!(out, "xtype = {}", pattern.xtype);
    let _ = writeln!(out, "scat_quantity = {}", pattern.scat_quantity);
    for (key, value) in &pattern.metadata {
        if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let _ = writeln!(out, "{} = {}", key, value);
    }
    let _ = writeln!(out, "#### start data");
    let _ = writeln!(out, "#{} {}", pattern.xtype, pattern.scat_quantity);

    for (x, y) in pattern.points() {
        let _ = writeln!(out, "{}\t{}", x, y);
    }

    out
}
