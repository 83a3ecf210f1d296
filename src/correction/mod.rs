//! # 吸收校正模块
//!
//! 计算并应用圆柱样品的几何吸收校正。
//!
//! ## 子模块
//! - `config`: 校正配置与计算方法
//! - `cve`: 校正曲线计算与应用
//!
//! ## 依赖关系
//! - 使用 `geometry/` 和 `models/`
//! - 被 `batch/` 使用

pub mod config;
pub mod cve;

pub use config::{CorrectionConfig, CveMethod};
pub use cve::{
    apply_corr, compute_cve, compute_cve_for_mud, AbsorptionCorrector, CorrectionCurve,
};
