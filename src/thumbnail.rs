//! サムネイル生成
//!
//! 画像をデコードしEXIFの向きを補正、長辺を上限以下に縮小してJPEGにする。
//! KMZの吹き出しとWord写真帳の両方で同じサムネイルを使う。

use crate::batch::worker_pool;
use crate::config::Config;
use geosnap_common::{Dataset, ItemFailure, Orientation};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("画像を開けません: {0}")]
    Unreadable(String),

    #[error("画像デコードエラー: {0}")]
    Decode(String),

    #[error("JPEGエンコードエラー: {0}")]
    Encode(String),
}

/// JPEGサムネイル
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailOptions {
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 75,
        }
    }
}

impl ThumbnailOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_dimension: config.thumbnail_max_dimension,
            quality: config.thumbnail_quality,
        }
    }
}

/// EXIFの向きを補正して正立させる
pub fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Rotate90FlipH => img.rotate90().fliph(),
        Orientation::Rotate90 => img.rotate90(),
        Orientation::Rotate270FlipH => img.rotate270().fliph(),
        Orientation::Rotate270 => img.rotate270(),
    }
}

/// 1枚分のサムネイルを生成
pub fn build_thumbnail(
    path: &Path,
    orientation: Orientation,
    options: &ThumbnailOptions,
) -> Result<Thumbnail, ThumbnailError> {
    let img = ImageReader::open(path)
        .map_err(|e| ThumbnailError::Unreadable(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ThumbnailError::Unreadable(e.to_string()))?
        .decode()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    let img = apply_orientation(img, orientation);

    // 縮小のみ（拡大しない）
    let max = options.max_dimension;
    let img = if img.width() > max || img.height() > max {
        img.thumbnail(max, max)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, options.quality)
        .encode_image(&rgb)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;

    Ok(Thumbnail {
        data,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Nº ごとのサムネイル集合
#[derive(Debug, Default)]
pub struct ThumbnailSet {
    entries: BTreeMap<u32, Thumbnail>,
    failures: Vec<ItemFailure>,
}

impl ThumbnailSet {
    /// 元画像が見つかる全レコードのサムネイルを並列生成
    ///
    /// 失敗したレコードはサムネイルなしで続行する。
    pub fn build(dataset: &Dataset, options: &ThumbnailOptions, concurrency: usize) -> Self {
        let targets: Vec<_> = dataset
            .iter()
            .filter_map(|r| {
                r.source_path
                    .as_ref()
                    .map(|p| (r.sequence_number, r.file_name.as_str(), p.as_path(), r.orientation))
            })
            .collect();

        info!("サムネイル生成: {}件 (並列数 {})", targets.len(), concurrency);

        let render = || -> Vec<_> {
            targets
                .par_iter()
                .map(|&(seq, name, path, orientation)| {
                    (seq, name, build_thumbnail(path, orientation, options))
                })
                .collect()
        };
        let results = match worker_pool(concurrency) {
            Ok(pool) => pool.install(render),
            Err(e) => {
                warn!("{}。グローバルプールで続行します", e);
                render()
            }
        };

        let mut set = Self::default();
        for (seq, name, result) in results {
            match result {
                Ok(thumb) => {
                    debug!("サムネイル生成 Nº{} {}x{}", seq, thumb.width, thumb.height);
                    set.entries.insert(seq, thumb);
                }
                Err(e) => {
                    warn!("サムネイル生成失敗 {}: {}", name, e);
                    set.failures.push(ItemFailure {
                        source: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        set
    }

    pub fn insert(&mut self, sequence_number: u32, thumbnail: Thumbnail) {
        self.entries.insert(sequence_number, thumbnail);
    }

    pub fn get(&self, sequence_number: u32) -> Option<&Thumbnail> {
        self.entries.get(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }
}
