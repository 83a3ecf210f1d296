//! # z-scan 透射模型
//!
//! 平移毛细管穿过直射束时的透射强度模型。
//!
//! ## 公式
//! I(x) = (I0 - slope·x) · exp(-μD/D · l(x - x0))
//! 其中 l(h) = 2·sqrt((D/2)² - h²)（|h| ≤ D/2），否则为 0
//!
//! 有限狭缝宽度通过与归一化矩形函数卷积描述。
//!
//! ## 依赖关系
//! - 被 `mud/fit.rs` 调用
//! - 无外部依赖

/// z-scan 模型参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScanParams {
    /// 样品直径
    pub diameter: f64,
    /// 狭缝半宽
    pub slit_width: f64,
    /// 样品中心位置
    pub x0: f64,
    /// 入射强度
    pub i0: f64,
    /// μ·D
    pub mud: f64,
    /// 入射强度线性漂移
    pub slope: f64,
}

impl ZScanParams {
    pub(crate) fn to_array(self) -> [f64; 6] {
        [
            self.diameter,
            self.slit_width,
            self.x0,
            self.i0,
            self.mud,
            self.slope,
        ]
    }

    pub(crate) fn from_array(v: [f64; 6]) -> Self {
        ZScanParams {
            diameter: v[0],
            slit_width: v[1],
            x0: v[2],
            i0: v[3],
            mud: v[4],
            slope: v[5],
        }
    }
}

/// 未卷积的模型强度
pub fn model_intensity(x: f64, p: &ZScanParams) -> f64 {
    let radius = p.diameter / 2.0;
    let h = x - p.x0;
    let length = if h.abs() <= radius {
        2.0 * (radius * radius - h * h).sqrt()
    } else {
        0.0
    };
    (p.i0 - p.slope * x) * (-p.mud / p.diameter * length).exp()
}

/// 在数据两侧各延拓一个数据长度后与狭缝函数卷积，返回原始点上的强度
///
/// `x` 至少两个点且等间距递增。狭缝内没有采样点时不做卷积。
pub fn convolved_model(x: &[f64], p: &ZScanParams) -> Vec<f64> {
    let n = x.len();
    if n < 2 {
        return x.iter().map(|&v| model_intensity(v, p)).collect();
    }

    let dx = x[1] - x[0];
    let x_min = x[0];
    let x_max = x[n - 1];
    let left = linspace(x_min - n as f64 * dx, x_min, n);
    let right = linspace(x_max, x_max + n as f64 * dx, n);

    let extended: Vec<f64> = left
        .iter()
        .chain(x.iter())
        .chain(right.iter())
        .copied()
        .collect();
    let intensity: Vec<f64> = extended.iter().map(|&v| model_intensity(v, p)).collect();

    let m = extended.len();
    let mean = extended.iter().sum::<f64>() / m as f64;
    let kernel: Vec<usize> = extended
        .iter()
        .enumerate()
        .filter(|&(_, &v)| (v - mean).abs() <= p.slit_width)
        .map(|(j, _)| j)
        .collect();

    if kernel.is_empty() {
        return intensity[n..2 * n].to_vec();
    }

    let weight = 1.0 / kernel.len() as f64;
    let offset = (m - 1) / 2;

    // 与 "same" 模式卷积一致：out[i] = Σ_j I[i + offset - j]·K[j]
    (n..2 * n)
        .map(|i| {
            kernel
                .iter()
                .filter_map(|&j| {
                    let k = (i + offset).checked_sub(j)?;
                    intensity.get(k).map(|v| v * weight)
                })
                .sum()
        })
        .collect()
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}
