//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid sequence number: {0}")]
    InvalidSequence(u32),

    #[error("Duplicate sequence number: {0}")]
    DuplicateSequence(u32),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
