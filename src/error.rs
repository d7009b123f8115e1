use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoSnapError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("Excelに必須列がありません: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Excel読み込みエラー: {0}")]
    Spreadsheet(String),

    #[error("処理がキャンセルされました")]
    Cancelled,

    #[error("ワーカープール作成エラー: {0}")]
    WorkerPool(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] geosnap_common::Error),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// 出力ごとのエラー（1つの出力の失敗は他の出力を止めない）
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("出力対象がありません: {0}")]
    NothingToExport(String),

    #[error("書き込みエラー ({path}): {message}")]
    WriteError { path: String, message: String },
}

impl ExportError {
    pub fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        ExportError::WriteError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoSnapError>;
