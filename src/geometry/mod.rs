//! # 样品几何模块
//!
//! 圆柱样品截面的离散化与光程计算。
//!
//! ## 依赖关系
//! - 被 `correction/` 使用
//! - 子模块: grid

pub mod grid;

pub use grid::{GriddedCircle, PathSegments, N_POINTS_ON_DIAMETER};
