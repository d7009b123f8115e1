//! GeoSnap Common Library
//!
//! 写真抽出・Excel逆インポート・各レポート出力で共有される型とユーティリティ

pub mod types;
pub mod layout;
pub mod error;
#[cfg(feature = "excel")]
pub mod export;

pub use types::{
    Coordinates, Dataset, ExtractionOutcome, FailureReason, ItemFailure, Orientation,
    PhotoRecord, RunSummary,
};
pub use layout::{DocumentLayout, SheetColumn, SHEET_COLUMNS, SHEET_NAME};
pub use types::TIMESTAMP_FORMAT;
pub use error::{Error, Result};
