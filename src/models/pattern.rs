//! # 衍射图谱数据模型
//!
//! 一维衍射数据：自变量轴（2θ、Q 或 d）与强度一一对应，附带波长和元数据。
//!
//! ## 单位
//! - 2θ: 度
//! - Q: Å⁻¹
//! - d: Å
//!
//! ## 依赖关系
//! - 被 `correction/`, `parsers/`, `export.rs`, `batch/` 使用
//! - 无外部模块依赖

use crate::error::{format_allowed, LabpdfprocError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// 自变量轴类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum XType {
    /// 衍射角 2θ（度）
    #[default]
    Tth,
    /// 散射矢量 Q（Å⁻¹）
    Q,
    /// 面间距 d（Å）
    D,
}

impl XType {
    pub const ALL: [XType; 3] = [XType::Tth, XType::Q, XType::D];

    pub fn name(&self) -> &'static str {
        match self {
            XType::Tth => "tth",
            XType::Q => "q",
            XType::D => "d",
        }
    }

    /// 将该轴上的一个值转换为 2θ（度）
    pub fn to_tth(&self, value: f64, wavelength: Option<f64>) -> Result<f64> {
        match self {
            XType::Tth => Ok(value),
            XType::Q => {
                let wavelength = require_wavelength(*self, wavelength)?;
                q_to_tth(value, wavelength)
            }
            XType::D => {
                let wavelength = require_wavelength(*self, wavelength)?;
                if value <= 0.0 {
                    return Err(LabpdfprocError::DomainError(format!(
                        "d-spacing must be positive, got {}",
                        value
                    )));
                }
                q_to_tth(2.0 * PI / value, wavelength)
            }
        }
    }
}

impl fmt::Display for XType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for XType {
    type Err = LabpdfprocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tth" | "2theta" | "twotheta" => Ok(XType::Tth),
            "q" => Ok(XType::Q),
            "d" => Ok(XType::D),
            _ => Err(LabpdfprocError::UnknownXType {
                name: s.to_string(),
                allowed: format_allowed(XType::ALL.iter().map(|x| x.name())),
            }),
        }
    }
}

fn require_wavelength(xtype: XType, wavelength: Option<f64>) -> Result<f64> {
    match wavelength {
        Some(w) if w.is_finite() && w > 0.0 => Ok(w),
        Some(w) => Err(LabpdfprocError::InvalidParameter(format!(
            "Wavelength = {} is not valid. Please specify a known anode type or a positive wavelength.",
            w
        ))),
        None => Err(LabpdfprocError::MissingWavelength {
            xtype: xtype.to_string(),
        }),
    }
}

/// 由图谱字段写出的头部键，不作为元数据重复保存
pub const RESERVED_METADATA_KEYS: [&str; 4] = ["name", "wavelength", "xtype", "scat_quantity"];

/// Q → 2θ：2θ = 2·asin(Qλ/4π)
pub fn q_to_tth(q: f64, wavelength: f64) -> Result<f64> {
    let sin_theta = q * wavelength / (4.0 * PI);
    if !(-1.0..=1.0).contains(&sin_theta) {
        return Err(LabpdfprocError::DomainError(format!(
            "Q = {} is beyond the reach of wavelength {} Å",
            q, wavelength
        )));
    }
    Ok(2.0 * sin_theta.asin().to_degrees())
}

/// 2θ → Q：Q = 4π·sin(θ)/λ
pub fn tth_to_q(tth: f64, wavelength: f64) -> f64 {
    4.0 * PI * (tth.to_radians() / 2.0).sin() / wavelength
}

/// 衍射图谱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffractionPattern {
    /// 图谱名称（通常为文件名主干）
    pub name: String,

    /// 自变量轴类型
    pub xtype: XType,

    /// 自变量
    pub x: Vec<f64>,

    /// 强度
    pub y: Vec<f64>,

    /// 波长（Å）
    pub wavelength: Option<f64>,

    /// 散射量标签，如 "x-ray" 或 "cve"
    pub scat_quantity: String,

    /// 元数据
    pub metadata: BTreeMap<String, String>,
}

impl DiffractionPattern {
    /// 创建图谱，要求 x 与 y 等长
    pub fn new(name: impl Into<String>, xtype: XType, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LabpdfprocError::ShapeMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        Ok(DiffractionPattern {
            name: name.into(),
            xtype,
            x,
            y,
            wavelength: None,
            scat_quantity: "x-ray".to_string(),
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_wavelength(mut self, wavelength: f64) -> Self {
        self.wavelength = Some(wavelength);
        self
    }

    pub fn with_scat_quantity(mut self, scat_quantity: impl Into<String>) -> Self {
        self.scat_quantity = scat_quantity.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 数据点数
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// (x, y) 数据点迭代器
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// 以 2θ（度）表示的自变量轴
    ///
    /// `wavelength` 优先于图谱自带的波长。
    pub fn tth_axis(&self, wavelength: Option<f64>) -> Result<Vec<f64>> {
        let wavelength = wavelength.or(self.wavelength);
        self.x
            .iter()
            .map(|&v| self.xtype.to_tth(v, wavelength))
            .collect()
    }
}
