//! # z-scan 拟合求 μD
//!
//! 用卷积透射模型拟合 z-scan 数据，得到样品的 μD。
//!
//! ## 算法概述
//! 1. 由数据估计初值（入射强度、吸收谷位置、深度与宽度）
//! 2. 在参数边界内做模拟退火全局搜索
//! 3. 从退火最优点出发做 Nelder-Mead 精修
//! 4. 多个独立随机种子并行重启，取 RMSE 最小者
//!
//! 所有参数在 [0, 1]⁶ 归一化空间内搜索，越界即截断。
//!
//! ## 依赖关系
//! - 使用 `mud/model.rs` 的卷积模型
//! - 使用 `rand` 生成可复现的随机序列
//! - 使用 `rayon` 并行重启
//! - 使用 `utils/progress.rs` 在读取文件拟合时显示 spinner

use crate::error::{LabpdfprocError, Result};
use crate::mud::model::{convolved_model, ZScanParams};
use crate::parsers;
use crate::utils::progress;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::path::Path;

const DIM: usize = 6;

/// 拟合选项
#[derive(Debug, Clone)]
pub struct MudFitOptions {
    /// 独立重启次数
    pub restarts: usize,
    /// 每次重启的退火步数
    pub anneal_steps: usize,
    /// Nelder-Mead 最大迭代次数
    pub polish_iterations: usize,
    /// 随机种子
    pub seed: u64,
}

impl Default for MudFitOptions {
    fn default() -> Self {
        MudFitOptions {
            restarts: 10,
            anneal_steps: 3000,
            polish_iterations: 4000,
            seed: 0,
        }
    }
}

impl MudFitOptions {
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn with_anneal_steps(mut self, anneal_steps: usize) -> Self {
        self.anneal_steps = anneal_steps;
        self
    }

    pub fn with_polish_iterations(mut self, polish_iterations: usize) -> Self {
        self.polish_iterations = polish_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// 拟合结果
#[derive(Debug, Clone, Copy)]
pub struct MudFit {
    /// 最优参数
    pub params: ZScanParams,
    /// 残差均方根
    pub rmse: f64,
}

impl MudFit {
    pub fn mud(&self) -> f64 {
        self.params.mud
    }
}

/// 参数边界
#[derive(Debug, Clone, Copy)]
struct Bounds {
    lo: [f64; DIM],
    hi: [f64; DIM],
}

impl Bounds {
    fn from_data(x: &[f64], intensity: &[f64]) -> Self {
        let span = x[x.len() - 1] - x[0];
        let x_min = x[0];
        let x_max = x[x.len() - 1];
        let i_max = intensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Bounds {
            lo: [1e-5, 0.0, x_min, 1e-5, 1e-5, -10000.0],
            hi: [span, span / 2.0, x_max, i_max.max(1e-5), 20.0, 10000.0],
        }
    }

    fn to_params(&self, u: &[f64; DIM]) -> ZScanParams {
        let mut v = [0.0; DIM];
        for k in 0..DIM {
            v[k] = self.lo[k] + u[k].clamp(0.0, 1.0) * (self.hi[k] - self.lo[k]);
        }
        ZScanParams::from_array(v)
    }

    fn to_unit(&self, p: &ZScanParams) -> [f64; DIM] {
        let v = p.to_array();
        let mut u = [0.0; DIM];
        for k in 0..DIM {
            let width = self.hi[k] - self.lo[k];
            u[k] = if width > 0.0 {
                ((v[k] - self.lo[k]) / width).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        u
    }
}

/// 目标函数：归一化残差平方和
struct Objective<'a> {
    x: &'a [f64],
    intensity: &'a [f64],
    bounds: Bounds,
    norm: f64,
}

impl<'a> Objective<'a> {
    fn new(x: &'a [f64], intensity: &'a [f64]) -> Self {
        let norm = intensity.iter().map(|v| v * v).sum::<f64>().max(f64::MIN_POSITIVE);
        Objective {
            x,
            intensity,
            bounds: Bounds::from_data(x, intensity),
            norm,
        }
    }

    fn sse(&self, p: &ZScanParams) -> f64 {
        convolved_model(self.x, p)
            .iter()
            .zip(self.intensity)
            .map(|(m, o)| (o - m) * (o - m))
            .sum()
    }

    fn cost(&self, u: &[f64; DIM]) -> f64 {
        let value = self.sse(&self.bounds.to_params(u)) / self.norm;
        if value.is_finite() {
            value
        } else {
            f64::MAX
        }
    }
}

/// 由 z-scan 数据拟合 μD
pub fn compute_mud(x: &[f64], intensity: &[f64], options: &MudFitOptions) -> Result<MudFit> {
    validate_data(x, intensity)?;
    if options.restarts == 0 {
        return Err(LabpdfprocError::InvalidParameter(
            "at least one fit restart is required".to_string(),
        ));
    }

    let objective = Objective::new(x, intensity);
    let guess = objective.bounds.to_unit(&initial_guess(x, intensity));

    let fits: Vec<MudFit> = (0..options.restarts)
        .into_par_iter()
        .map(|k| {
            let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(k as u64));
            let start = if k == 0 {
                guess
            } else {
                let mut u = [0.0; DIM];
                for v in u.iter_mut() {
                    *v = rng.gen_range(0.0..1.0);
                }
                u
            };
            let annealed = anneal(&objective, start, options.anneal_steps, &mut rng);
            let mut best = nelder_mead(&objective, annealed, options.polish_iterations);
            // 第二轮以新单纯形重新收敛，避免单纯形退化
            best = nelder_mead(&objective, best, options.polish_iterations);

            let params = objective.bounds.to_params(&best);
            let rmse = (objective.sse(&params) / x.len() as f64).sqrt();
            MudFit { params, rmse }
        })
        .collect();

    fits.into_iter()
        .min_by(|a, b| a.rmse.total_cmp(&b.rmse))
        .ok_or_else(|| LabpdfprocError::Other("z-scan fit produced no result".to_string()))
}

/// 读取 z-scan 文件并拟合 μD
pub fn compute_mud_from_file(path: &Path, options: &MudFitOptions) -> Result<MudFit> {
    if !path.is_file() {
        return Err(LabpdfprocError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let data = parsers::xy::parse_xy_file(path)?;

    let spinner = progress::create_spinner(&format!("Fitting z-scan {}", data.name));
    let fit = compute_mud(&data.x, &data.y, options);
    spinner.finish_and_clear();
    fit
}

fn validate_data(x: &[f64], intensity: &[f64]) -> Result<()> {
    if x.len() != intensity.len() {
        return Err(LabpdfprocError::ShapeMismatch {
            expected: x.len(),
            actual: intensity.len(),
        });
    }
    if x.len() < 3 {
        return Err(LabpdfprocError::InvalidParameter(format!(
            "z-scan needs at least 3 points, got {}",
            x.len()
        )));
    }
    if x.iter().chain(intensity).any(|v| !v.is_finite()) {
        return Err(LabpdfprocError::InvalidParameter(
            "z-scan data contains non-finite values".to_string(),
        ));
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(LabpdfprocError::InvalidParameter(
            "z-scan positions must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// 由吸收谷估计初值
fn initial_guess(x: &[f64], intensity: &[f64]) -> ZScanParams {
    let i0 = intensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let i_min = intensity.iter().copied().fold(f64::INFINITY, f64::min);
    let dx = x[1] - x[0];
    let depth = i0 - i_min;

    let weights: Vec<f64> = intensity.iter().map(|v| i0 - v).collect();
    let total: f64 = weights.iter().sum();
    let x0 = if total > 0.0 {
        x.iter().zip(&weights).map(|(xi, w)| xi * w).sum::<f64>() / total
    } else {
        (x[0] + x[x.len() - 1]) / 2.0
    };

    let threshold = i0 - 0.05 * depth;
    let inside: Vec<f64> = x
        .iter()
        .zip(intensity)
        .filter(|&(_, &v)| v < threshold)
        .map(|(&xi, _)| xi)
        .collect();
    let diameter = match (inside.first(), inside.last()) {
        (Some(first), Some(last)) => last - first + dx,
        _ => (x[x.len() - 1] - x[0]) / 2.0,
    };

    let mud = if i_min > 0.0 && i0 > 0.0 {
        (i0 / i_min).ln()
    } else {
        1.0
    };

    ZScanParams {
        diameter,
        slit_width: dx / 2.0,
        x0,
        i0,
        mud,
        slope: 0.0,
    }
}

/// 有界模拟退火，返回遇到的最优点
fn anneal(objective: &Objective, start: [f64; DIM], steps: usize, rng: &mut StdRng) -> [f64; DIM] {
    const T_START: f64 = 0.05;
    const T_END: f64 = 1e-7;

    let mut current = start;
    let mut current_cost = objective.cost(&current);
    let mut best = current;
    let mut best_cost = current_cost;

    if steps == 0 {
        return best;
    }

    let ratio = (T_END / T_START).powf(1.0 / steps as f64);
    let mut temperature = T_START;

    for _ in 0..steps {
        let scale = 0.002 + 0.2 * (temperature / T_START).sqrt();
        let mut candidate = current;
        for v in candidate.iter_mut() {
            *v = (*v + scale * rng.gen_range(-1.0..1.0)).clamp(0.0, 1.0);
        }

        let cost = objective.cost(&candidate);
        let accept = cost < current_cost
            || rng.gen_range(0.0..1.0) < (-(cost - current_cost) / temperature).exp();
        if accept {
            current = candidate;
            current_cost = cost;
            if cost < best_cost {
                best = candidate;
                best_cost = cost;
            }
        }

        temperature *= ratio;
    }

    best
}

/// 在单位立方体内的 Nelder-Mead 单纯形法
fn nelder_mead(objective: &Objective, start: [f64; DIM], max_iter: usize) -> [f64; DIM] {
    const ALPHA: f64 = 1.0;
    const GAMMA: f64 = 2.0;
    const RHO: f64 = 0.5;
    const SIGMA: f64 = 0.5;
    const STEP: f64 = 0.05;
    const FTOL: f64 = 1e-16;

    let clamp = |mut v: [f64; DIM]| {
        for c in v.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
        v
    };

    let mut simplex: Vec<([f64; DIM], f64)> = Vec::with_capacity(DIM + 1);
    simplex.push((start, objective.cost(&start)));
    for k in 0..DIM {
        let mut vertex = start;
        vertex[k] = if vertex[k] + STEP <= 1.0 {
            vertex[k] + STEP
        } else {
            vertex[k] - STEP
        };
        simplex.push((vertex, objective.cost(&vertex)));
    }

    for _ in 0..max_iter {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best_cost = simplex[0].1;
        let worst_cost = simplex[DIM].1;
        if (worst_cost - best_cost).abs() <= FTOL * (1.0 + best_cost.abs()) {
            break;
        }

        let mut centroid = [0.0; DIM];
        for (vertex, _) in simplex.iter().take(DIM) {
            for k in 0..DIM {
                centroid[k] += vertex[k] / DIM as f64;
            }
        }

        let worst = simplex[DIM].0;
        let along = |t: f64| {
            let mut v = [0.0; DIM];
            for k in 0..DIM {
                v[k] = centroid[k] + t * (worst[k] - centroid[k]);
            }
            clamp(v)
        };

        let reflected = along(-ALPHA);
        let reflected_cost = objective.cost(&reflected);

        if reflected_cost < best_cost {
            let expanded = along(-GAMMA);
            let expanded_cost = objective.cost(&expanded);
            simplex[DIM] = if expanded_cost < reflected_cost {
                (expanded, expanded_cost)
            } else {
                (reflected, reflected_cost)
            };
            continue;
        }

        if reflected_cost < simplex[DIM - 1].1 {
            simplex[DIM] = (reflected, reflected_cost);
            continue;
        }

        let contracted = along(RHO);
        let contracted_cost = objective.cost(&contracted);
        if contracted_cost < worst_cost {
            simplex[DIM] = (contracted, contracted_cost);
            continue;
        }

        // 收缩整个单纯形
        let best = simplex[0].0;
        for entry in simplex.iter_mut().skip(1) {
            let mut v = [0.0; DIM];
            for k in 0..DIM {
                v[k] = best[k] + SIGMA * (entry.0[k] - best[k]);
            }
            entry.0 = v;
            entry.1 = objective.cost(&v);
        }
    }

    simplex
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(v, _)| v)
        .unwrap_or(start)
}
