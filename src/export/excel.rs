//! Excel生成（CLI版）
//!
//! 共通ライブラリの excel_core でバッファを作り、ファイルに書き出す

use crate::error::ExportError;
use geosnap_common::export::excel_core::generate_excel_buffer;
use geosnap_common::Dataset;
use std::path::Path;
use tracing::debug;

/// 写真一覧Excelを出力
///
/// 空のDatasetでもヘッダー行のみのファイルを作る。
pub fn build_excel(dataset: &Dataset, output_path: &Path) -> Result<(), ExportError> {
    let buffer = generate_excel_buffer(dataset).map_err(|e| ExportError::write(output_path, e))?;
    std::fs::write(output_path, &buffer).map_err(|e| ExportError::write(output_path, e))?;

    debug!("Excel: {}行, {} bytes", dataset.len(), buffer.len());
    Ok(())
}
