//! # X 射线源
//!
//! 实验室衍射仪常用阳极靶及其波长。
//!
//! ## 数据来源
//! Kα1 与 Kα1/Kα2 加权平均波长，单位 Å。
//!
//! ## 依赖关系
//! - 被 `models/pattern.rs` 和 `correction/` 使用

use crate::error::{format_allowed, LabpdfprocError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 已知的 X 射线阳极类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XraySource {
    Mo,
    MoKa1,
    MoKa1Ka2,
    Ag,
    AgKa1,
    AgKa1Ka2,
    Cu,
    CuKa1,
    CuKa1Ka2,
}

impl XraySource {
    /// 全部已知阳极
    pub const ALL: [XraySource; 9] = [
        XraySource::Mo,
        XraySource::MoKa1,
        XraySource::MoKa1Ka2,
        XraySource::Ag,
        XraySource::AgKa1,
        XraySource::AgKa1Ka2,
        XraySource::Cu,
        XraySource::CuKa1,
        XraySource::CuKa1Ka2,
    ];

    /// 波长（Å）
    pub fn wavelength(&self) -> f64 {
        match self {
            XraySource::Mo | XraySource::MoKa1Ka2 => 0.71073,
            XraySource::MoKa1 => 0.70930,
            XraySource::Ag | XraySource::AgKa1Ka2 => 0.56087,
            XraySource::AgKa1 => 0.55941,
            XraySource::Cu | XraySource::CuKa1Ka2 => 1.54184,
            XraySource::CuKa1 => 1.54056,
        }
    }

    /// 规范名称
    pub fn name(&self) -> &'static str {
        match self {
            XraySource::Mo => "Mo",
            XraySource::MoKa1 => "MoKa1",
            XraySource::MoKa1Ka2 => "MoKa1Ka2",
            XraySource::Ag => "Ag",
            XraySource::AgKa1 => "AgKa1",
            XraySource::AgKa1Ka2 => "AgKa1Ka2",
            XraySource::Cu => "Cu",
            XraySource::CuKa1 => "CuKa1",
            XraySource::CuKa1Ka2 => "CuKa1Ka2",
        }
    }

    fn allowed() -> String {
        format_allowed(Self::ALL.iter().map(|s| s.name()))
    }
}

impl fmt::Display for XraySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for XraySource {
    type Err = LabpdfprocError;

    /// 大小写不敏感
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|src| src.name().to_lowercase() == wanted)
            .ok_or_else(|| LabpdfprocError::UnknownSource {
                name: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

/// 由显式波长或阳极类型确定波长
///
/// 二者只能给出其一；都未给出时返回 `None`，由调用方决定是否需要波长。
pub fn resolve_wavelength(
    wavelength: Option<f64>,
    source: Option<XraySource>,
) -> Result<Option<f64>> {
    match (wavelength, source) {
        (Some(_), Some(_)) => Err(LabpdfprocError::InvalidParameter(format!(
            "Please provide either a wavelength or an anode type, not both. Allowed anode types are {}.",
            XraySource::allowed()
        ))),
        (Some(w), None) => {
            if w.is_finite() && w > 0.0 {
                Ok(Some(w))
            } else {
                Err(LabpdfprocError::InvalidParameter(format!(
                    "Wavelength = {} is not valid. Please specify a known anode type or a positive wavelength.",
                    w
                )))
            }
        }
        (None, Some(src)) => Ok(Some(src.wavelength())),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wavelength_table() {
        assert_eq!(XraySource::Mo.wavelength(), 0.71073);
        assert_eq!(XraySource::MoKa1.wavelength(), 0.70930);
        assert_eq!(XraySource::AgKa1.wavelength(), 0.55941);
        assert_eq!(XraySource::Cu.wavelength(), 1.54184);
        assert_eq!(XraySource::CuKa1.wavelength(), 1.54056);
        assert_eq!(XraySource::CuKa1Ka2.wavelength(), XraySource::Cu.wavelength());
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("moKa1Ka2".parse::<XraySource>().unwrap(), XraySource::MoKa1Ka2);
        assert_eq!("ag".parse::<XraySource>().unwrap(), XraySource::Ag);
        assert_eq!("cuka1".parse::<XraySource>().unwrap().to_string(), "CuKa1");
    }

    #[test]
    fn test_parse_unknown() {
        let err = "invalid".parse::<XraySource>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Anode type 'invalid' not recognized."));
        assert!(msg.contains("'CuKa1Ka2'"));
    }

    #[test]
    fn test_resolve_wavelength() {
        assert_eq!(resolve_wavelength(Some(0.25), None).unwrap(), Some(0.25));
        assert_eq!(
            resolve_wavelength(None, Some(XraySource::Ag)).unwrap(),
            Some(0.56087)
        );
        assert_eq!(resolve_wavelength(None, None).unwrap(), None);
        assert!(resolve_wavelength(Some(0.7), Some(XraySource::Mo)).is_err());
        assert!(resolve_wavelength(Some(-0.2), None).is_err());
    }
}
