//! # 网格化圆形样品截面
//!
//! 将圆柱（毛细管）样品的横截面离散为规则网格上的内部点，
//! 并计算给定出射角下每个点的光程。
//!
//! ## 几何约定
//! - 圆心位于原点，入射束沿 +x 方向水平入射
//! - 主光程：从圆周上与该点等高的入射点到该点
//! - 次光程：从该点沿 (cos θ, sin θ) 方向到圆周的出射点
//! - 角度单位为度，逆时针为正，0° 表示沿入射方向继续前进
//! - 出射方向在整个圆周上都按射线前进方向求交点，结果以 360° 为周期；
//!   θ 与 360° - θ 关于入射轴镜像对称，光程集合相同
//!
//! ## 依赖关系
//! - 被 `correction/cve.rs` 调用
//! - 使用 `rayon` 并行计算各点光程

use crate::error::{LabpdfprocError, Result};

use rayon::prelude::*;
use std::sync::{Arc, Mutex};

/// 默认每条直径上的网格点数
pub const N_POINTS_ON_DIAMETER: usize = 249;

/// 单个网格点的光程分量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegments {
    /// 入射段长度
    pub primary: f64,
    /// 出射段长度
    pub secondary: f64,
}

impl PathSegments {
    /// 总光程
    pub fn total(&self) -> f64 {
        self.primary + self.secondary
    }
}

/// 最近一次计算的角度及其光程
#[derive(Debug)]
struct AngleCache {
    angle: f64,
    segments: Arc<Vec<PathSegments>>,
}

/// 网格化圆
#[derive(Debug)]
pub struct GriddedCircle {
    /// 样品直径
    diameter: f64,
    /// 每条直径上的网格点数
    n_points_on_diameter: usize,
    /// 圆内网格点 (x, y)，x 为外层循环
    points: Vec<(f64, f64)>,
    cache: Mutex<Option<AngleCache>>,
}

impl GriddedCircle {
    /// 创建网格化圆
    pub fn new(diameter: f64, n_points_on_diameter: usize) -> Result<Self> {
        if n_points_on_diameter == 0 {
            return Err(LabpdfprocError::InvalidParameter(
                "number of grid points per diameter must be positive".to_string(),
            ));
        }
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(LabpdfprocError::InvalidParameter(format!(
                "sample diameter must be a positive number, got {}",
                diameter
            )));
        }

        let radius = diameter / 2.0;
        let axis = linspace(-radius, radius, n_points_on_diameter);
        let r2 = radius * radius;

        let points: Vec<(f64, f64)> = axis
            .iter()
            .flat_map(|&x| axis.iter().map(move |&y| (x, y)))
            .filter(|(x, y)| x * x + y * y <= r2)
            .collect();

        if points.is_empty() {
            return Err(LabpdfprocError::InvalidParameter(format!(
                "a grid of {} points per diameter has no points inside the circle",
                n_points_on_diameter
            )));
        }

        Ok(GriddedCircle {
            diameter,
            n_points_on_diameter,
            points,
            cache: Mutex::new(None),
        })
    }

    /// 以半径创建
    pub fn with_radius(radius: f64, n_points_on_diameter: usize) -> Result<Self> {
        Self::new(2.0 * radius, n_points_on_diameter)
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn n_points_on_diameter(&self) -> usize {
        self.n_points_on_diameter
    }

    /// 圆内网格点
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// 圆内网格点数
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 各网格点在给定出射角下的光程分量，顺序与 `points()` 一致
    pub fn path_segments_at_angle(&self, angle: f64) -> Result<Arc<Vec<PathSegments>>> {
        if !angle.is_finite() {
            return Err(LabpdfprocError::InvalidParameter(format!(
                "angle must be finite, got {}",
                angle
            )));
        }

        if let Some(cached) = self.cached_segments(angle) {
            return Ok(cached);
        }

        // 计算期间不持有锁，其他线程可并行计算别的角度
        let radius = self.radius();
        let (sin, cos) = angle.to_radians().sin_cos();
        let segments: Vec<PathSegments> = self
            .points
            .par_iter()
            .map(|&point| segments_for_point(point, radius, cos, sin))
            .collect();
        let segments = Arc::new(segments);

        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(AngleCache {
            angle,
            segments: Arc::clone(&segments),
        });

        Ok(segments)
    }

    fn cached_segments(&self, angle: f64) -> Option<Arc<Vec<PathSegments>>> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|cached| cached.angle == angle)
            .map(|cached| Arc::clone(&cached.segments))
    }

    /// 各网格点在给定出射角下的总光程
    pub fn path_lengths_at_angle(&self, angle: f64) -> Result<Vec<f64>> {
        let segments = self.path_segments_at_angle(angle)?;
        Ok(segments.iter().map(PathSegments::total).collect())
    }

    /// 平均透射率 ⟨exp(-μ·l)⟩
    pub fn attenuation_at_angle(&self, angle: f64, mu: f64) -> Result<f64> {
        if !mu.is_finite() || mu < 0.0 {
            return Err(LabpdfprocError::DomainError(format!(
                "attenuation coefficient must be a non-negative number, got {}",
                mu
            )));
        }
        let segments = self.path_segments_at_angle(angle)?;
        let sum: f64 = segments.iter().map(|s| (-mu * s.total()).exp()).sum();
        Ok(sum / segments.len() as f64)
    }
}

impl Clone for GriddedCircle {
    fn clone(&self) -> Self {
        GriddedCircle {
            diameter: self.diameter,
            n_points_on_diameter: self.n_points_on_diameter,
            points: self.points.clone(),
            cache: Mutex::new(None),
        }
    }
}

/// 等间距采样；单点时取中点
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![(start + end) / 2.0];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            if i == n - 1 {
                end
            } else {
                start + i as f64 * step
            }
        })
        .collect()
}

/// 计算单点光程
fn segments_for_point((x, y): (f64, f64), radius: f64, cos: f64, sin: f64) -> PathSegments {
    let r2 = radius * radius;

    // 入射点 (-sqrt(r² - y²), y)
    let primary = (x + (r2 - y * y).max(0.0).sqrt()).max(0.0);

    // 射线 p + t·u 与圆的交点，取 t ≥ 0 的根
    let b = x * cos + y * sin;
    let c = x * x + y * y - r2;
    let disc = (b * b - c).max(0.0);
    let secondary = (-b + disc.sqrt()).max(0.0);

    PathSegments { primary, secondary }
}
