//! # 批量吸收校正
//!
//! 对一组两列数据文件按同一 μD 做吸收校正并写出 `.chi` 文件。
//!
//! ## 输出文件
//! - `<stem>_corrected.chi`: 校正后的图谱
//! - `<stem>_cve.chi`: 校正曲线（可选）
//!
//! ## 依赖关系
//! - 使用 `batch/runner.rs` 并行处理
//! - 使用 `parsers/xy.rs` 读取数据，`correction/` 计算 cve，`export.rs` 写出
//! - 校正器以 `Arc` 在工作线程间共享，路径长度缓存只计算一次

use crate::batch::runner::{BatchResult, BatchRunner, ProcessResult};
use crate::correction::{apply_corr, AbsorptionCorrector, CorrectionConfig};
use crate::error::{LabpdfprocError, Result};
use crate::export;
use crate::models::XType;
use crate::parsers;
use crate::utils::output;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 批量校正选项
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 样品 μD
    pub mud: f64,
    /// 波长（Å），自变量不是 2θ 时必需
    pub wavelength: Option<f64>,
    /// 输入文件的自变量类型
    pub xtype: XType,
    /// 输出目录
    pub output_dir: PathBuf,
    /// 是否同时写出校正曲线
    pub output_correction: bool,
    /// 是否覆盖已有输出
    pub force_overwrite: bool,
    /// 并行作业数（0 = 全部 CPU）
    pub jobs: usize,
    /// 是否显示进度条
    pub show_progress: bool,
    /// 校正配置
    pub correction: CorrectionConfig,
}

impl BatchOptions {
    pub fn new(mud: f64, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mud,
            wavelength: None,
            xtype: XType::Tth,
            output_dir: output_dir.into(),
            output_correction: false,
            force_overwrite: false,
            jobs: 0,
            show_progress: true,
            correction: CorrectionConfig::default(),
        }
    }

    pub fn with_wavelength(mut self, wavelength: Option<f64>) -> Self {
        self.wavelength = wavelength;
        self
    }

    pub fn with_xtype(mut self, xtype: XType) -> Self {
        self.xtype = xtype;
        self
    }

    pub fn with_output_correction(mut self, output_correction: bool) -> Self {
        self.output_correction = output_correction;
        self
    }

    pub fn with_force_overwrite(mut self, force_overwrite: bool) -> Self {
        self.force_overwrite = force_overwrite;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_correction(mut self, correction: CorrectionConfig) -> Self {
        self.correction = correction;
        self
    }
}

/// 校正输出文件路径 `<output_dir>/<stem>_corrected.chi`
pub fn corrected_path(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}_corrected.chi", file_stem(input)))
}

/// 校正曲线输出路径 `<output_dir>/<stem>_cve.chi`
pub fn cve_path(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}_cve.chi", file_stem(input)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// 批量校正文件
///
/// 单个文件的失败记录在结果中，不中断其余文件；
/// 参数非法或输出目录无法创建时直接返回错误。
pub fn correct_files(files: &[PathBuf], options: &BatchOptions) -> Result<BatchResult> {
    if !options.mud.is_finite() || options.mud < 0.0 {
        return Err(LabpdfprocError::DomainError(format!(
            "mu*D must be a non-negative number, got {}",
            options.mud
        )));
    }

    fs::create_dir_all(&options.output_dir).map_err(|e| LabpdfprocError::FileWriteError {
        path: options.output_dir.display().to_string(),
        source: e,
    })?;

    let corrector = Arc::new(AbsorptionCorrector::new(options.correction.clone())?);

    let runner = BatchRunner::new(options.jobs).show_progress(options.show_progress);
    runner.run(files.to_vec(), |file| {
        process_file(file, &corrector, options)
    })
}

fn process_file(
    file: &Path,
    corrector: &AbsorptionCorrector,
    options: &BatchOptions,
) -> ProcessResult {
    let output = corrected_path(file, &options.output_dir);
    if !options.force_overwrite {
        let cve_output = cve_path(file, &options.output_dir);
        let existing = std::iter::once(&output)
            .chain(options.output_correction.then_some(&cve_output))
            .find(|path| path.exists());
        if let Some(path) = existing {
            let reason = LabpdfprocError::OutputExists {
                path: path.display().to_string(),
            };
            return ProcessResult::Skipped(reason.to_string());
        }
    }

    match correct_one(file, &output, corrector, options) {
        Ok(()) => ProcessResult::Success(format!("{} -> {}", file.display(), output.display())),
        Err(e) => ProcessResult::Failed(file.display().to_string(), e.to_string()),
    }
}

fn correct_one(
    file: &Path,
    output: &Path,
    corrector: &AbsorptionCorrector,
    options: &BatchOptions,
) -> Result<()> {
    let data = parsers::xy::parse_xy_file(file)?;
    let mut pattern = data.into_pattern(options.xtype);
    if let Some(w) = options.wavelength {
        pattern = pattern.with_wavelength(w);
    }

    let curve = corrector.compute_cve_for_mud(&pattern, options.mud, None)?;
    let mut corrected = apply_corr(&pattern, &curve)?;
    corrected.name = format!("Absorption corrected input_data: {}", pattern.name);
    corrected
        .metadata
        .insert("mud".to_string(), options.mud.to_string());

    export::to_chi(&corrected, output)?;
    if options.output_correction {
        export::curve_to_chi(&curve, &cve_path(file, &options.output_dir))?;
    }
    Ok(())
}

/// 打印批量校正结果
pub fn print_summary(result: &BatchResult, options: &BatchOptions) {
    output::print_info(&format!(
        "muD = {:.4}, output directory: {}",
        options.mud,
        options.output_dir.display()
    ));
    for (path, err) in &result.failures {
        output::print_error(&format!("{}: {}", path, err));
    }
    if result.skipped > 0 {
        output::print_skip(&format!(
            "{} file(s) skipped because the output already exists",
            result.skipped
        ));
    }
    if result.failed > 0 {
        output::print_warning(&format!("{} file(s) could not be corrected", result.failed));
    }
    result.print_summary();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::CveMethod;

    fn write_pattern(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut content = String::from("# synthetic pattern\nwavelength = 0.71\n");
        for i in 0..30 {
            let tth = 5.0 + i as f64 * 4.0;
            content.push_str(&format!("{} {}\n", tth, 100.0 + i as f64));
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn quick_options(output_dir: &Path) -> BatchOptions {
        BatchOptions::new(2.0, output_dir)
            .with_jobs(2)
            .with_progress(false)
            .with_correction(CorrectionConfig::default().with_n_points(41))
    }

    #[test]
    fn test_output_paths() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            corrected_path(Path::new("data/sample.xy"), out),
            PathBuf::from("/tmp/out/sample_corrected.chi")
        );
        assert_eq!(
            cve_path(Path::new("data/sample.xy"), out),
            PathBuf::from("/tmp/out/sample_cve.chi")
        );
    }

    #[test]
    fn test_correct_files_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pattern(dir.path(), "a.xy");
        let b = write_pattern(dir.path(), "b.xy");
        let out = dir.path().join("corrected");

        let options = quick_options(&out).with_output_correction(true);
        let result = correct_files(&[a.clone(), b], &options).unwrap();
        assert_eq!(result.success, 2);
        assert_eq!(result.failed, 0);

        let corrected = parsers::xy::parse_xy_file(&corrected_path(&a, &out)).unwrap();
        let cve = parsers::xy::parse_xy_file(&cve_path(&a, &out)).unwrap();
        let raw = parsers::xy::parse_xy_file(&a).unwrap();
        assert_eq!(corrected.len(), raw.len());
        for i in 0..raw.len() {
            assert!(cve.y[i] >= 1.0);
            let expected = raw.y[i] * cve.y[i];
            assert!((corrected.y[i] - expected).abs() < 1e-3 * expected);
        }
        assert_eq!(
            corrected.metadata.get("name").map(String::as_str),
            Some("Absorption corrected input_data: a")
        );
    }

    #[test]
    fn test_existing_output_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pattern(dir.path(), "a.xy");
        let out = dir.path().to_path_buf();
        fs::write(corrected_path(&a, &out), "old").unwrap();

        let result = correct_files(&[a.clone()], &quick_options(&out)).unwrap();
        assert_eq!(result.skipped, 1);
        match &result.records[0] {
            ProcessResult::Skipped(msg) => assert!(msg.contains("already exists")),
            other => panic!("unexpected record {:?}", other),
        }
        assert_eq!(fs::read_to_string(corrected_path(&a, &out)).unwrap(), "old");

        let options = quick_options(&out).with_force_overwrite(true);
        let result = correct_files(&[a.clone()], &options).unwrap();
        assert_eq!(result.success, 1);
        assert_ne!(fs::read_to_string(corrected_path(&a, &out)).unwrap(), "old");
    }

    #[test]
    fn test_existing_cve_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pattern(dir.path(), "a.xy");
        let out = dir.path().to_path_buf();
        fs::write(cve_path(&a, &out), "precious").unwrap();

        let options = quick_options(&out).with_output_correction(true);
        let result = correct_files(&[a.clone()], &options).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.success, 0);
        assert_eq!(fs::read_to_string(cve_path(&a, &out)).unwrap(), "precious");
        assert!(!corrected_path(&a, &out).exists());

        // 不输出校正曲线时不受影响
        let result = correct_files(&[a.clone()], &quick_options(&out)).unwrap();
        assert_eq!(result.success, 1);
        assert_eq!(fs::read_to_string(cve_path(&a, &out)).unwrap(), "precious");

        let options = options.with_force_overwrite(true);
        let result = correct_files(&[a.clone()], &options).unwrap();
        assert_eq!(result.success, 1);
        assert_ne!(fs::read_to_string(cve_path(&a, &out)).unwrap(), "precious");
    }

    #[test]
    fn test_wavelength_header_is_used_for_q_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_with_header.xy");
        fs::write(&path, "wavelength = 0.71\n1.0 10\n2.0 20\n3.0 30\n").unwrap();
        let out = dir.path().join("out");

        let options = quick_options(&out).with_xtype(XType::Q);
        let result = correct_files(&[path.clone()], &options).unwrap();
        assert_eq!(result.success, 1);

        let corrected = parsers::xy::parse_xy_file(&corrected_path(&path, &out)).unwrap();
        assert_eq!(corrected.metadata.get("wavelength").map(String::as_str), Some("0.71"));
        assert_eq!(corrected.metadata.get("xtype").map(String::as_str), Some("q"));
    }

    #[test]
    fn test_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_pattern(dir.path(), "good.xy");
        let bad = dir.path().join("bad.xy");
        fs::write(&bad, "not numbers at all\n").unwrap();
        let missing = dir.path().join("missing.xy");

        let out = dir.path().join("out");
        let options = quick_options(&out);
        let result = correct_files(&[good, bad, missing], &options).unwrap();
        assert_eq!(result.success, 1);
        assert_eq!(result.failed, 2);
        print_summary(&result, &options);
    }

    #[test]
    fn test_q_input_requires_wavelength() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.xy");
        fs::write(&path, "1.0 10\n2.0 20\n3.0 30\n").unwrap();
        let out = dir.path().join("out");

        let options = quick_options(&out).with_xtype(XType::Q);
        let result = correct_files(&[path.clone()], &options).unwrap();
        assert_eq!(result.failed, 1);

        let options = options
            .with_wavelength(Some(0.71))
            .with_correction(
                CorrectionConfig::default()
                    .with_n_points(41)
                    .with_method(CveMethod::PointWise),
            );
        let result = correct_files(&[path], &options).unwrap();
        assert_eq!(result.success, 1);
    }

    #[test]
    fn test_invalid_mud_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = quick_options(dir.path());
        let options = BatchOptions { mud: -1.0, ..options };
        assert!(correct_files(&[], &options).is_err());
    }
}
