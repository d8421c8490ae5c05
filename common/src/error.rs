//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid video size: {0}")]
    InvalidVideoSize(String),

    #[error("Invalid chunk list: {0}")]
    InvalidChunks(String),

    #[error("No active job")]
    NoJob,

    #[error("Unknown scene: {0}")]
    UnknownScene(usize),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
