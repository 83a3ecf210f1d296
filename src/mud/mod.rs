//! # μD 估计模块
//!
//! 由 z-scan 透射数据拟合样品的 μD。
//!
//! ## 子模块
//! - `model`: 卷积透射模型
//! - `fit`: 全局搜索与精修
//!
//! ## 依赖关系
//! - 使用 `parsers/xy.rs` 读取 z-scan 文件

pub mod fit;
pub mod model;

pub use fit::{compute_mud, compute_mud_from_file, MudFit, MudFitOptions};
pub use model::ZScanParams;
