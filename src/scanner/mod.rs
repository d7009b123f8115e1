pub mod exif;

use crate::error::{GeoSnapError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

/// 拡張子が対象か（大文字小文字を区別しない）
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// フォルダ直下の画像を列挙する（ファイル名順）
pub fn scan_folder(folder: &Path, extensions: &[String]) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(GeoSnapError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        images.push(ImageInfo {
            path: path.to_path_buf(),
            file_name,
        });
    }

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

/// 写真フォルダ以下（再帰）の画像をファイル名（小文字）で索引化する
///
/// 同名ファイルが複数ある場合は最初に見つかったものを使う。
pub fn index_photos(dir: &Path, extensions: &[String]) -> HashMap<String, PathBuf> {
    let mut index = HashMap::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }
        if let Some(name) = path.file_name() {
            index
                .entry(name.to_string_lossy().to_lowercase())
                .or_insert_with(|| path.to_path_buf());
        }
    }

    index
}
