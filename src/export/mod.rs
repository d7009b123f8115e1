pub mod docx;
pub mod excel;
pub mod kmz;

use crate::error::ExportError;
use crate::thumbnail::ThumbnailSet;
use geosnap_common::Dataset;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 順方向の既定ファイル名
pub const FORWARD_BASE_NAME: &str = "reporte_completo";
/// 逆方向の既定ファイル名
pub const REVERSE_BASE_NAME: &str = "reporte_desde_excel";

/// 生成する出力の選択
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSelection {
    pub kmz: bool,
    pub excel: bool,
    pub word: bool,
}

impl OutputSelection {
    /// 写真モード: KMZ + Excel（+ Word）
    pub fn forward(word: bool) -> Self {
        Self {
            kmz: true,
            excel: true,
            word,
        }
    }

    /// Excelモード: KMZ（+ Word）
    pub fn reverse(word: bool) -> Self {
        Self {
            kmz: true,
            excel: false,
            word,
        }
    }

    /// サムネイルが必要か
    pub fn needs_thumbnails(&self) -> bool {
        self.kmz || self.word
    }
}

/// 出力ごとの結果（未選択は None）
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub kmz: Option<Result<PathBuf, ExportError>>,
    pub excel: Option<Result<PathBuf, ExportError>>,
    pub word: Option<Result<PathBuf, ExportError>>,
}

impl GenerationReport {
    /// (種類, 結果) の一覧
    pub fn entries(&self) -> Vec<(&'static str, &Result<PathBuf, ExportError>)> {
        [("KMZ", &self.kmz), ("Excel", &self.excel), ("Word", &self.word)]
            .into_iter()
            .filter_map(|(label, result)| result.as_ref().map(|r| (label, r)))
            .collect()
    }

    pub fn outputs(&self) -> Vec<&Path> {
        self.entries()
            .into_iter()
            .filter_map(|(_, r)| r.as_ref().ok().map(|p| p.as_path()))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries().iter().any(|(_, r)| r.is_err())
    }
}

/// XML用エスケープ
pub(crate) fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// プロジェクト名から出力ファイルのベース名を決める
pub fn base_name(project_name: &str, fallback: &str) -> String {
    let mut name = project_name.trim();
    for ext in [".kmz", ".xlsx", ".docx"] {
        if let Some(idx) = name.len().checked_sub(ext.len()) {
            if name.is_char_boundary(idx) && name[idx..].eq_ignore_ascii_case(ext) {
                name = &name[..idx];
            }
        }
    }
    let name = name.trim();
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

/// 既存ファイルを上書きしないパス（name.ext, name_1.ext, ...）
pub fn unique_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", base, extension));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|i| dir.join(format!("{}_{}.{}", base, i, extension)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn log_result(label: &str, result: &Result<PathBuf, ExportError>) {
    match result {
        Ok(path) => info!("{}出力: {}", label, path.display()),
        Err(e) => error!("{}出力に失敗: {}", label, e),
    }
}

/// 選択された出力を順に生成する
///
/// 各出力は独立しており、1つの失敗で他の出力は止まらない。
pub fn generate_outputs(
    dataset: &Dataset,
    thumbnails: Option<&ThumbnailSet>,
    selection: OutputSelection,
    output_dir: &Path,
    base: &str,
) -> GenerationReport {
    let mut report = GenerationReport::default();

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        let failure = || Err(ExportError::write(output_dir, &e));
        report.kmz = selection.kmz.then(failure);
        report.excel = selection.excel.then(failure);
        report.word = selection.word.then(failure);
        return report;
    }

    let empty = ThumbnailSet::default();

    if selection.excel {
        let path = unique_path(output_dir, base, "xlsx");
        let result = excel::build_excel(dataset, &path).map(|_| path);
        log_result("Excel", &result);
        report.excel = Some(result);
    }

    if selection.kmz {
        let path = unique_path(output_dir, base, "kmz");
        let result =
            kmz::build_kmz(dataset, thumbnails.unwrap_or(&empty), &path).map(|_| path);
        log_result("KMZ", &result);
        report.kmz = Some(result);
    }

    if selection.word {
        let path = unique_path(output_dir, base, "docx");
        let result = docx::build_docx(dataset, thumbnails, &path).map(|_| path);
        log_result("Word", &result);
        report.word = Some(result);
    }

    report
}
