//! # 数据模型模块
//!
//! 定义衍射图谱、自变量轴类型与 X 射线源。
//!
//! ## 依赖关系
//! - 被 `correction/`, `parsers/`, `export.rs`, `batch/` 使用
//! - 子模块: pattern, source

pub mod pattern;
pub mod source;

pub use pattern::{
    q_to_tth, tth_to_q, DiffractionPattern, XType, RESERVED_METADATA_KEYS,
};
pub use source::{resolve_wavelength, XraySource};
