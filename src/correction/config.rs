//! # 吸收校正配置
//!
//! ## 依赖关系
//! - 被 `correction/cve.rs` 和 `batch/` 使用
//! - 使用 `serde` 以便嵌入调用方的配置

use crate::error::{format_allowed, LabpdfprocError, Result};
use crate::geometry::N_POINTS_ON_DIAMETER;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// cve 计算方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CveMethod {
    /// 在参考 2θ 网格上计算，再线性插值到图谱轴
    #[default]
    BruteForce,
    /// 在图谱的每个点上直接计算
    PointWise,
}

impl CveMethod {
    pub const ALL: [CveMethod; 2] = [CveMethod::BruteForce, CveMethod::PointWise];

    pub fn name(&self) -> &'static str {
        match self {
            CveMethod::BruteForce => "brute_force",
            CveMethod::PointWise => "point_wise",
        }
    }
}

impl fmt::Display for CveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CveMethod {
    type Err = LabpdfprocError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| LabpdfprocError::UnknownMethod {
                name: s.to_string(),
                allowed: format_allowed(Self::ALL.iter().map(|m| m.name())),
            })
    }
}

/// 吸收校正配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// 每条直径上的网格点数
    pub n_points_on_diameter: usize,
    /// 参考 2θ 网格（度），严格递增
    pub tth_grid: Vec<f64>,
    /// 计算方法
    pub method: CveMethod,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        CorrectionConfig {
            n_points_on_diameter: N_POINTS_ON_DIAMETER,
            tth_grid: (1..=140).map(f64::from).collect(),
            method: CveMethod::default(),
        }
    }
}

impl CorrectionConfig {
    pub fn with_n_points(mut self, n_points_on_diameter: usize) -> Self {
        self.n_points_on_diameter = n_points_on_diameter;
        self
    }

    pub fn with_tth_grid(mut self, tth_grid: Vec<f64>) -> Self {
        self.tth_grid = tth_grid;
        self
    }

    pub fn with_method(mut self, method: CveMethod) -> Self {
        self.method = method;
        self
    }

    /// 检查参考网格
    pub fn validate(&self) -> Result<()> {
        if self.n_points_on_diameter == 0 {
            return Err(LabpdfprocError::InvalidParameter(
                "number of grid points per diameter must be positive".to_string(),
            ));
        }
        if self.method == CveMethod::BruteForce {
            if self.tth_grid.is_empty() {
                return Err(LabpdfprocError::InvalidParameter(
                    "reference two-theta grid is empty".to_string(),
                ));
            }
            if self.tth_grid.iter().any(|v| !v.is_finite())
                || self.tth_grid.windows(2).any(|w| w[1] <= w[0])
            {
                return Err(LabpdfprocError::InvalidParameter(
                    "reference two-theta grid must be finite and strictly increasing".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorrectionConfig::default();
        assert_eq!(config.n_points_on_diameter, 249);
        assert_eq!(config.tth_grid.len(), 140);
        assert_eq!(config.tth_grid[0], 1.0);
        assert_eq!(config.tth_grid[139], 140.0);
        assert_eq!(config.method, CveMethod::BruteForce);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("brute_force".parse::<CveMethod>().unwrap(), CveMethod::BruteForce);
        assert_eq!("point_wise".parse::<CveMethod>().unwrap(), CveMethod::PointWise);
        let err = "invalid_method".parse::<CveMethod>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown method: invalid_method. Allowed methods are ('brute_force', 'point_wise')."
        );
    }

    #[test]
    fn test_validate_rejects_bad_grid() {
        let config = CorrectionConfig::default().with_tth_grid(vec![1.0, 1.0, 2.0]);
        assert!(config.validate().is_err());
        let config = CorrectionConfig::default().with_tth_grid(vec![]);
        assert!(config.validate().is_err());
        // 逐点计算不使用参考网格
        let config = config.with_method(CveMethod::PointWise);
        assert!(config.validate().is_ok());
        assert!(CorrectionConfig::default().with_n_points(0).validate().is_err());
    }
}
