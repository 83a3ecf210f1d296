//! # labpdfproc - 实验室粉末衍射数据吸收校正
//!
//! 对圆柱形毛细管样品的实验室 X 射线衍射数据做吸收校正，
//! 以便后续计算 PDF。
//!
//! ## 功能
//! - 在样品截面上铺设规则网格，计算每个网格点的入射/出射路径长度
//! - 由 μD 计算校正曲线 cve(2θ) 并乘到强度上
//! - 由 z-scan 透射数据拟合样品的 μD
//! - 批量校正、chi/CSV 导出与对比图
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── geometry/   (网格圆与路径长度)
//!   ├── correction/ (cve 计算与应用)
//!   │     └── models/    (图谱与光源)
//!   ├── mud/        (z-scan 拟合 μD)
//!   ├── parsers/    (两列数据解析)
//!   ├── export.rs   (chi / CSV 导出)
//!   ├── plot.rs     (校正对比图)
//!   ├── batch/      (批量校正)
//!   ├── utils/      (终端输出与进度条)
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod correction;
pub mod error;
pub mod export;
pub mod geometry;
pub mod models;
pub mod mud;
pub mod parsers;
pub mod plot;
pub mod utils;

pub use correction::{
    apply_corr, compute_cve, compute_cve_for_mud, AbsorptionCorrector, CorrectionConfig,
    CorrectionCurve, CveMethod,
};
pub use error::{LabpdfprocError, Result};
pub use geometry::{GriddedCircle, PathSegments};
pub use models::{DiffractionPattern, XType, XraySource};
