//! GeoSnap ライブラリ
//!
//! ジオタグ付き写真フォルダ（またはそこから生成したExcel）から
//! KMZ・Excel・Word写真帳を生成するパイプライン。

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod importer;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod scanner;
pub mod thumbnail;
