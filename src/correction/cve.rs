//! # 吸收校正曲线 (cve)
//!
//! 计算圆柱样品的几何吸收校正并应用到衍射图谱。
//!
//! ## 算法概述
//! 1. 将图谱自变量换算为 2θ
//! 2. 对每个角度求网格平均透射率 T(2θ) = ⟨exp(-μ·l)⟩
//! 3. 校正值 cve = 1 / T（乘性校正）
//! 4. 校正后强度 I' = I · cve
//!
//! 相同 μD 给出相同的 cve，因此只给出 μD 时使用半径为 1 的网格并取 μ = μD / 2。
//!
//! ## 依赖关系
//! - 使用 `geometry/grid.rs` 的 GriddedCircle
//! - 使用 `models/pattern.rs` 的 DiffractionPattern
//! - 被 `batch/` 调用

use crate::correction::config::{CorrectionConfig, CveMethod};
use crate::error::{LabpdfprocError, Result};
use crate::geometry::GriddedCircle;
use crate::models::{DiffractionPattern, XType};

use std::collections::BTreeMap;

/// 吸收校正曲线，与图谱自变量一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionCurve {
    /// 曲线名称
    pub name: String,
    /// 自变量轴类型（与源图谱一致）
    pub xtype: XType,
    /// 自变量（与源图谱一致）
    pub x: Vec<f64>,
    /// 校正值
    pub values: Vec<f64>,
    /// 波长（Å）
    pub wavelength: Option<f64>,
    /// 线性吸收系数（网格长度单位的倒数）
    pub mu: f64,
    /// μ·D
    pub mud: f64,
    /// 源图谱元数据
    pub metadata: BTreeMap<String, String>,
}

impl CorrectionCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 转换为散射量为 "cve" 的图谱
    pub fn into_pattern(self) -> DiffractionPattern {
        DiffractionPattern {
            name: self.name,
            xtype: self.xtype,
            x: self.x,
            y: self.values,
            wavelength: self.wavelength,
            scat_quantity: "cve".to_string(),
            metadata: self.metadata,
        }
    }
}

/// 吸收校正器
#[derive(Debug, Clone)]
pub struct AbsorptionCorrector {
    grid: GriddedCircle,
    config: CorrectionConfig,
}

impl AbsorptionCorrector {
    /// 按配置构建半径为 1 的网格
    pub fn new(config: CorrectionConfig) -> Result<Self> {
        config.validate()?;
        let grid = GriddedCircle::with_radius(1.0, config.n_points_on_diameter)?;
        Ok(Self { grid, config })
    }

    /// 使用已有网格
    pub fn with_grid(grid: GriddedCircle, config: CorrectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { grid, config })
    }

    pub fn grid(&self) -> &GriddedCircle {
        &self.grid
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// 计算 cve
    ///
    /// `mu` 以网格长度单位的倒数计；`wavelength` 优先于图谱自带波长，
    /// 仅在自变量不是 2θ 时需要。
    pub fn compute_cve(
        &self,
        pattern: &DiffractionPattern,
        mu: f64,
        wavelength: Option<f64>,
    ) -> Result<CorrectionCurve> {
        check_inputs(pattern, mu)?;
        let tth = pattern.tth_axis(wavelength)?;

        let values = match self.config.method {
            CveMethod::PointWise => cve_at_angles(&self.grid, &tth, mu)?,
            CveMethod::BruteForce => {
                let reference = cve_at_angles(&self.grid, &self.config.tth_grid, mu)?;
                tth.iter()
                    .map(|&t| interp(t, &self.config.tth_grid, &reference))
                    .collect()
            }
        };

        Ok(build_curve(
            pattern,
            values,
            mu,
            mu * self.grid.diameter(),
            wavelength,
        ))
    }

    /// 由 μD 计算 cve
    pub fn compute_cve_for_mud(
        &self,
        pattern: &DiffractionPattern,
        mud: f64,
        wavelength: Option<f64>,
    ) -> Result<CorrectionCurve> {
        if !mud.is_finite() || mud < 0.0 {
            return Err(LabpdfprocError::DomainError(format!(
                "mu*D must be a non-negative number, got {}",
                mud
            )));
        }
        self.compute_cve(pattern, mud / self.grid.diameter(), wavelength)
    }
}

/// 在给定网格上逐点计算 cve
pub fn compute_cve(
    pattern: &DiffractionPattern,
    grid: &GriddedCircle,
    mu: f64,
    wavelength: Option<f64>,
) -> Result<CorrectionCurve> {
    check_inputs(pattern, mu)?;
    let tth = pattern.tth_axis(wavelength)?;
    let values = cve_at_angles(grid, &tth, mu)?;
    Ok(build_curve(
        pattern,
        values,
        mu,
        mu * grid.diameter(),
        wavelength,
    ))
}

/// 按配置由 μD 计算 cve
pub fn compute_cve_for_mud(
    pattern: &DiffractionPattern,
    mud: f64,
    config: &CorrectionConfig,
) -> Result<CorrectionCurve> {
    AbsorptionCorrector::new(config.clone())?.compute_cve_for_mud(pattern, mud, None)
}

/// 将 cve 乘到图谱强度上，返回新图谱
pub fn apply_corr(
    pattern: &DiffractionPattern,
    curve: &CorrectionCurve,
) -> Result<DiffractionPattern> {
    if pattern.len() != curve.len() {
        return Err(LabpdfprocError::ShapeMismatch {
            expected: pattern.len(),
            actual: curve.len(),
        });
    }

    let mut corrected = pattern.clone();
    for (y, c) in corrected.y.iter_mut().zip(&curve.values) {
        *y *= c;
    }
    Ok(corrected)
}

fn check_inputs(pattern: &DiffractionPattern, mu: f64) -> Result<()> {
    if pattern.is_empty() {
        return Err(LabpdfprocError::DomainError(format!(
            "diffraction pattern '{}' has no data points",
            pattern.name
        )));
    }
    if let Some(v) = pattern.x.iter().find(|v| !v.is_finite()) {
        return Err(LabpdfprocError::DomainError(format!(
            "diffraction pattern '{}' has a non-finite axis value {}",
            pattern.name, v
        )));
    }
    if !mu.is_finite() || mu < 0.0 {
        return Err(LabpdfprocError::DomainError(format!(
            "attenuation coefficient must be a non-negative number, got {}",
            mu
        )));
    }
    Ok(())
}

fn cve_at_angles(grid: &GriddedCircle, angles: &[f64], mu: f64) -> Result<Vec<f64>> {
    angles
        .iter()
        .map(|&angle| {
            let transmission = grid.attenuation_at_angle(angle, mu)?;
            if transmission <= 0.0 {
                return Err(LabpdfprocError::DomainError(format!(
                    "sample is opaque at 2θ = {}° (mu = {}), correction diverges",
                    angle, mu
                )));
            }
            Ok(1.0 / transmission)
        })
        .collect()
}

fn build_curve(
    pattern: &DiffractionPattern,
    values: Vec<f64>,
    mu: f64,
    mud: f64,
    wavelength: Option<f64>,
) -> CorrectionCurve {
    CorrectionCurve {
        name: format!("absorption correction, cve, for {}", pattern.name),
        xtype: pattern.xtype,
        x: pattern.x.clone(),
        values,
        wavelength: wavelength.or(pattern.wavelength),
        mu,
        mud,
        metadata: pattern.metadata.clone(),
    }
}

/// 分段线性插值，超出范围时取端点值
///
/// `xp` 必须严格递增且非空。
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // xp[i-1] < x <= xp[i]
    let i = xp.partition_point(|&v| v < x).clamp(1, last);
    let (x0, x1) = (xp[i - 1], xp[i]);
    let (y0, y1) = (fp[i - 1], fp[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pattern(x: Vec<f64>) -> DiffractionPattern {
        let y = vec![2.0; x.len()];
        DiffractionPattern::new("test", XType::Tth, x, y)
            .unwrap()
            .with_wavelength(1.54)
            .with_metadata("thing1", "1")
            .with_metadata("thing2", "thing2")
    }

    fn small_config() -> CorrectionConfig {
        CorrectionConfig::default().with_n_points(25)
    }

    #[test]
    fn test_interp() {
        let xp = [1.0, 2.0, 4.0];
        let fp = [10.0, 20.0, 0.0];
        assert_eq!(interp(0.0, &xp, &fp), 10.0);
        assert_eq!(interp(1.0, &xp, &fp), 10.0);
        assert_eq!(interp(1.5, &xp, &fp), 15.0);
        assert_eq!(interp(2.0, &xp, &fp), 20.0);
        assert_eq!(interp(3.0, &xp, &fp), 10.0);
        assert_eq!(interp(9.0, &xp, &fp), 0.0);
        // NaN 不会越界
        assert!(interp(f64::NAN, &xp, &fp).is_nan());
    }

    #[test]
    fn test_non_finite_axis_rejected_by_both_methods() {
        let pattern = test_pattern(vec![10.0, f64::NAN]);
        for method in CveMethod::ALL {
            let corrector = AbsorptionCorrector::new(small_config().with_method(method)).unwrap();
            assert!(matches!(
                corrector.compute_cve_for_mud(&pattern, 1.0, None),
                Err(LabpdfprocError::DomainError(_))
            ));
        }
        let pattern = test_pattern(vec![10.0, f64::INFINITY]);
        assert!(matches!(
            compute_cve_for_mud(&pattern, 1.0, &small_config()),
            Err(LabpdfprocError::DomainError(_))
        ));
    }

    #[test]
    fn test_cve_carries_pattern_info() {
        let pattern = test_pattern(vec![90.0, 90.1, 90.2]);
        let curve = compute_cve_for_mud(&pattern, 1.0, &small_config()).unwrap();
        assert_eq!(curve.len(), 3);
        assert_eq!(curve.x, pattern.x);
        assert_eq!(curve.xtype, XType::Tth);
        assert_eq!(curve.wavelength, Some(1.54));
        assert_eq!(curve.name, "absorption correction, cve, for test");
        assert_eq!(curve.metadata, pattern.metadata);
        assert!((curve.mud - 1.0).abs() < 1e-12);
        assert!((curve.mu - 0.5).abs() < 1e-12);

        let as_pattern = curve.into_pattern();
        assert_eq!(as_pattern.scat_quantity, "cve");
    }

    #[test]
    fn test_cve_is_at_least_one() {
        let pattern = test_pattern((1..=140).map(|v| v as f64 + 0.5).collect());
        let curve = compute_cve_for_mud(&pattern, 2.0, &small_config()).unwrap();
        assert!(curve.values.iter().all(|&c| c >= 1.0));
    }

    #[test]
    fn test_zero_mu_gives_unit_correction() {
        let grid = GriddedCircle::new(2.0, 15).unwrap();
        let pattern = test_pattern(vec![10.0, 45.0, 100.0]);
        let curve = compute_cve(&pattern, &grid, 0.0, None).unwrap();
        for c in curve.values {
            assert!((c - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_brute_force_matches_point_wise_on_grid_nodes() {
        let pattern = test_pattern(vec![5.0, 30.0, 60.0, 120.0]);
        let brute = AbsorptionCorrector::new(small_config()).unwrap();
        let point = AbsorptionCorrector::new(small_config().with_method(CveMethod::PointWise)).unwrap();
        let a = brute.compute_cve_for_mud(&pattern, 1.5, None).unwrap();
        let b = point.compute_cve_for_mud(&pattern, 1.5, None).unwrap();
        for (x, y) in a.values.iter().zip(&b.values) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_brute_force_clamps_outside_reference_grid() {
        let corrector = AbsorptionCorrector::new(small_config()).unwrap();
        let pattern = test_pattern(vec![0.5, 1.0, 140.0, 170.0]);
        let curve = corrector.compute_cve_for_mud(&pattern, 1.0, None).unwrap();
        assert_eq!(curve.values[0], curve.values[1]);
        assert_eq!(curve.values[2], curve.values[3]);
    }

    #[test]
    fn test_same_mud_gives_same_curve() {
        let pattern = test_pattern(vec![15.0, 75.0, 135.0]);
        let small = GriddedCircle::new(2.0, 15).unwrap();
        let large = GriddedCircle::new(4.0, 15).unwrap();
        let a = compute_cve(&pattern, &small, 1.2 / 2.0, None).unwrap();
        let b = compute_cve(&pattern, &large, 1.2 / 4.0, None).unwrap();
        assert!((a.mud - b.mud).abs() < 1e-12);
        for (x, y) in a.values.iter().zip(&b.values) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_q_axis_uses_wavelength() {
        let wavelength = 0.71073;
        let tth = vec![20.0, 40.0, 60.0];
        let q: Vec<f64> = tth
            .iter()
            .map(|&t| crate::models::tth_to_q(t, wavelength))
            .collect();
        let grid = GriddedCircle::new(2.0, 15).unwrap();

        let on_tth = compute_cve(&test_pattern(tth), &grid, 0.8, None).unwrap();
        let q_pattern = DiffractionPattern::new("q", XType::Q, q, vec![1.0; 3]).unwrap();
        assert!(matches!(
            compute_cve(&q_pattern, &grid, 0.8, None),
            Err(LabpdfprocError::MissingWavelength { .. })
        ));
        let on_q = compute_cve(&q_pattern, &grid, 0.8, Some(wavelength)).unwrap();
        assert_eq!(on_q.xtype, XType::Q);
        assert_eq!(on_q.wavelength, Some(wavelength));
        for (x, y) in on_tth.values.iter().zip(&on_q.values) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_compute_cve_rejects_bad_inputs() {
        let grid = GriddedCircle::new(2.0, 9).unwrap();
        let empty = DiffractionPattern::new("empty", XType::Tth, vec![], vec![]).unwrap();
        assert!(matches!(
            compute_cve(&empty, &grid, 1.0, None),
            Err(LabpdfprocError::DomainError(_))
        ));
        let pattern = test_pattern(vec![10.0]);
        assert!(matches!(
            compute_cve(&pattern, &grid, -1.0, None),
            Err(LabpdfprocError::DomainError(_))
        ));
        let corrector = AbsorptionCorrector::new(small_config()).unwrap();
        assert!(corrector.compute_cve_for_mud(&pattern, -2.0, None).is_err());
    }

    #[test]
    fn test_apply_corr() {
        let pattern = test_pattern(vec![90.0, 90.1, 90.2]);
        let mut curve = compute_cve_for_mud(&pattern, 1.0, &small_config()).unwrap();
        curve.values = vec![0.5, 0.5, 0.5];
        let corrected = apply_corr(&pattern, &curve).unwrap();
        assert_eq!(corrected.y, vec![1.0, 1.0, 1.0]);
        assert_eq!(corrected.x, pattern.x);
        assert_eq!(corrected.name, "test");
        assert_eq!(corrected.scat_quantity, "x-ray");
        assert_eq!(corrected.metadata, pattern.metadata);
        // 输入不变
        assert_eq!(pattern.y, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_apply_corr_shape_mismatch() {
        let pattern = test_pattern((0..50).map(|i| 10.0 + i as f64).collect());
        let grid = GriddedCircle::new(2.0, 9).unwrap();
        let short = test_pattern((0..49).map(|i| 10.0 + i as f64).collect());
        let curve = compute_cve(&short, &grid, 1.0, None).unwrap();
        let err = apply_corr(&pattern, &curve).unwrap_err();
        assert!(matches!(
            err,
            LabpdfprocError::ShapeMismatch {
                expected: 50,
                actual: 49
            }
        ));
    }

    #[test]
    fn test_round_trip() {
        let x: Vec<f64> = (0..60).map(|i| 5.0 + 2.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 100.0 + (v / 7.0).sin() * 40.0).collect();
        let pattern = DiffractionPattern::new("rt", XType::Tth, x, y).unwrap();
        let curve = compute_cve_for_mud(&pattern, 2.5, &small_config()).unwrap();
        let corrected = apply_corr(&pattern, &curve).unwrap();
        for ((orig, corr), c) in pattern.y.iter().zip(&corrected.y).zip(&curve.values) {
            assert!((corr / c - orig).abs() < 1e-9 * orig.abs());
        }
    }
}
