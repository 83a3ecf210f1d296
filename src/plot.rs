//! # 校正结果图表
//!
//! 使用 `plotters` 绘制吸收校正前后的图谱与校正曲线。
//!
//! ## 布局
//! - 上图：原始强度与校正后强度
//! - 下图：校正曲线 cve
//!
//! ## 依赖关系
//! - 使用 `models/pattern.rs` 的 DiffractionPattern
//! - 使用 `correction/cve.rs` 的 CorrectionCurve
//! - 使用 `plotters` 渲染 PNG / SVG

use crate::correction::CorrectionCurve;
use crate::error::{LabpdfprocError, Result};
use crate::models::{DiffractionPattern, XType};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 图表选项
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// 输出 SVG 而不是 PNG
    pub svg: bool,
    /// 标题，为空时使用图谱名称
    pub title: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
            svg: false,
            title: None,
        }
    }
}

impl PlotOptions {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_svg(mut self, svg: bool) -> Self {
        self.svg = svg;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// 绘制校正前后对比图
pub fn plot_correction(
    raw: &DiffractionPattern,
    corrected: &DiffractionPattern,
    curve: &CorrectionCurve,
    output_path: &Path,
    options: &PlotOptions,
) -> Result<()> {
    if raw.is_empty() {
        return Err(LabpdfprocError::PlotError(format!(
            "pattern '{}' has no data points to plot",
            raw.name
        )));
    }
    for len in [corrected.len(), curve.len()] {
        if len != raw.len() {
            return Err(LabpdfprocError::ShapeMismatch {
                expected: raw.len(),
                actual: len,
            });
        }
    }

    let title = options.title.clone().unwrap_or_else(|| raw.name.clone());

    if options.svg {
        let root = SVGBackend::new(output_path, (options.width, options.height)).into_drawing_area();
        draw_correction_chart(&root, raw, corrected, curve, &title)?;
        root.present()
            .map_err(|e| LabpdfprocError::PlotError(e.to_string()))?;
    } else {
        let root =
            BitMapBackend::new(output_path, (options.width, options.height)).into_drawing_area();
        draw_correction_chart(&root, raw, corrected, curve, &title)?;
        root.present()
            .map_err(|e| LabpdfprocError::PlotError(e.to_string()))?;
    }
    Ok(())
}

fn axis_label(xtype: XType) -> &'static str {
    match xtype {
        XType::Tth => "2θ (°)",
        XType::Q => "Q (Å⁻¹)",
        XType::D => "d (Å)",
    }
}

/// 数据范围，两端各留 5% 余量
fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - pad, hi + pad)
}

fn plot_err<E: std::fmt::Debug>(e: E) -> LabpdfprocError {
    LabpdfprocError::PlotError(format!("{:?}", e))
}

/// 绘制上下两栏图表
fn draw_correction_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    raw: &DiffractionPattern,
    corrected: &DiffractionPattern,
    curve: &CorrectionCurve,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let root = root
        .titled(title, ("sans-serif", 28).into_font())
        .map_err(plot_err)?;
    let (upper, lower) = root.split_vertically(root.dim_in_pixel().1 * 3 / 5);

    let (x_min, x_max) = padded_range(raw.x.iter());
    let (y_min, y_max) = padded_range(raw.y.iter().chain(corrected.y.iter()));
    let (c_min, c_max) = padded_range(curve.values.iter());

    let raw_color = RGBColor(150, 150, 150);
    let corrected_color = RGBColor(0, 102, 204);
    let cve_color = RGBColor(204, 51, 0);

    let mut chart = ChartBuilder::on(&upper)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(axis_label(raw.xtype))
        .y_desc("Intensity")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(raw.points(), raw_color.stroke_width(2)))
        .map_err(plot_err)?
        .label("raw")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &raw_color));

    chart
        .draw_series(LineSeries::new(
            corrected.points(),
            corrected_color.stroke_width(2),
        ))
        .map_err(plot_err)?
        .label(format!("corrected (muD = {:.3})", curve.mud))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &corrected_color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(plot_err)?;

    let mut cve_chart = ChartBuilder::on(&lower)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, c_min..c_max)
        .map_err(plot_err)?;

    cve_chart
        .configure_mesh()
        .x_desc(axis_label(curve.xtype))
        .y_desc("cve")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    cve_chart
        .draw_series(LineSeries::new(
            curve.x.iter().copied().zip(curve.values.iter().copied()),
            cve_color.stroke_width(2),
        ))
        .map_err(plot_err)?;

    Ok(())
}
