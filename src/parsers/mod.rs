//! # 解析器模块
//!
//! 衍射数据文件解析器。
//!
//! ## 依赖关系
//! - 被 `mud/` 和 `batch/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: xy

pub mod xy;

pub use xy::{parse_xy_content, parse_xy_file, XyData};
