//! 処理パイプライン
//!
//! 写真モード: スキャン → EXIF抽出 → サムネイル → 出力
//! Excelモード: Excel読み込み → 元画像解決 → サムネイル → 出力

use crate::batch::{self, CancelFlag, ForwardRun, Progress};
use crate::config::Config;
use crate::error::Result;
use crate::export::{
    self, GenerationReport, OutputSelection, FORWARD_BASE_NAME, REVERSE_BASE_NAME,
};
use crate::importer;
use crate::thumbnail::{ThumbnailOptions, ThumbnailSet};
use geosnap_common::{Dataset, ItemFailure, RunSummary};
use std::path::{Path, PathBuf};
use tracing::info;

/// 写真モードの入力
#[derive(Debug, Clone)]
pub struct PhotosRequest {
    pub folder: PathBuf,
    /// 未指定なら設定値、それもなければ写真フォルダ
    pub output_dir: Option<PathBuf>,
    pub project_name: Option<String>,
    pub outputs: OutputSelection,
}

impl PhotosRequest {
    /// 設定値に従う既定リクエスト
    pub fn new(folder: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            folder: folder.into(),
            output_dir: None,
            project_name: None,
            outputs: OutputSelection::forward(config.generate_word),
        }
    }
}

/// Excelモードの入力
#[derive(Debug, Clone)]
pub struct ExcelRequest {
    pub spreadsheet: PathBuf,
    /// 未指定ならExcelと同じフォルダから探す
    pub photos_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub project_name: Option<String>,
    pub outputs: OutputSelection,
}

impl ExcelRequest {
    pub fn new(spreadsheet: impl Into<PathBuf>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            photos_dir: None,
            output_dir: None,
            project_name: None,
            outputs: OutputSelection::reverse(false),
        }
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub summary: RunSummary,
    pub outputs: GenerationReport,
    /// Excelモードで元画像が見つからなかったファイル名
    pub missing_photos: Vec<String>,
    /// サムネイルを作れず画像なしで出力した写真
    pub thumbnail_failures: Vec<ItemFailure>,
    pub records: usize,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(PipelineReport),
    /// 出力は生成しない
    Cancelled(RunSummary),
}

impl PipelineOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            PipelineOutcome::Completed(report) => &report.summary,
            PipelineOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineOutcome::Cancelled(_))
    }
}

fn resolve_output_dir(requested: Option<&Path>, config: &Config, fallback: &Path) -> PathBuf {
    requested
        .map(Path::to_path_buf)
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| fallback.to_path_buf())
}

fn render_outputs(
    dataset: &Dataset,
    selection: OutputSelection,
    config: &Config,
    output_dir: &Path,
    base: &str,
) -> (GenerationReport, Vec<ItemFailure>) {
    let thumbnails = selection.needs_thumbnails().then(|| {
        ThumbnailSet::build(
            dataset,
            &ThumbnailOptions::from_config(config),
            config.effective_concurrency(),
        )
    });
    let report =
        export::generate_outputs(dataset, thumbnails.as_ref(), selection, output_dir, base);
    let failures = thumbnails
        .map(|set| set.failures().to_vec())
        .unwrap_or_default();
    (report, failures)
}

/// 写真フォルダから出力を生成
pub fn process_photos<P>(
    request: &PhotosRequest,
    config: &Config,
    cancel: &CancelFlag,
    progress: P,
) -> Result<PipelineOutcome>
where
    P: FnMut(&Progress<'_>),
{
    info!("写真モード: {}", request.folder.display());

    let report = match batch::run_forward(&request.folder, config, cancel, progress)? {
        ForwardRun::Completed(report) => report,
        ForwardRun::Cancelled(summary) => return Ok(PipelineOutcome::Cancelled(summary)),
    };

    let output_dir = resolve_output_dir(request.output_dir.as_deref(), config, &request.folder);
    let project = request.project_name.as_deref().unwrap_or(&config.project_name);
    let base = export::base_name(project, FORWARD_BASE_NAME);

    let (outputs, thumbnail_failures) =
        render_outputs(&report.dataset, request.outputs, config, &output_dir, &base);

    Ok(PipelineOutcome::Completed(PipelineReport {
        records: report.dataset.len(),
        summary: report.summary,
        outputs,
        missing_photos: Vec::new(),
        thumbnail_failures,
    }))
}

/// Excelから出力を再生成
///
/// 行の読み込みは逐次処理のためキャンセルは出力生成の直前でのみ確認する。
pub fn process_spreadsheet(
    request: &ExcelRequest,
    config: &Config,
    cancel: &CancelFlag,
) -> Result<PipelineOutcome> {
    let imported = importer::run_reverse(
        &request.spreadsheet,
        request.photos_dir.as_deref(),
        config,
    )?;

    if cancel.is_cancelled() {
        let mut summary = imported.summary;
        summary.cancelled = true;
        return Ok(PipelineOutcome::Cancelled(summary));
    }

    let sheet_dir = request
        .spreadsheet
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let output_dir = resolve_output_dir(request.output_dir.as_deref(), config, sheet_dir);
    let base = export::base_name(
        request.project_name.as_deref().unwrap_or_default(),
        REVERSE_BASE_NAME,
    );

    let (outputs, thumbnail_failures) =
        render_outputs(&imported.dataset, request.outputs, config, &output_dir, &base);

    Ok(PipelineOutcome::Completed(PipelineReport {
        records: imported.dataset.len(),
        summary: imported.summary,
        outputs,
        missing_photos: imported.missing_photos,
        thumbnail_failures,
    }))
}
