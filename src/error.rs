use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryboardError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("入力エラー: {0}")]
    Validation(String),

    #[error("バックエンドエラー: {0}")]
    Backend(String),

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("キャンセルされました")]
    Canceled,

    #[error("{attempts}回試行しましたが失敗しました: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("状態エラー: {0}")]
    State(#[from] storyboard_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("画像読み込みエラー: {0}")]
    Image(#[from] image::ImageError),
}

impl From<reqwest::Error> for StoryboardError {
    fn from(e: reqwest::Error) -> Self {
        StoryboardError::Transport(e.to_string())
    }
}

impl StoryboardError {
    /// バックエンドが返したエラーメッセージ（通信失敗なら None）
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            StoryboardError::Backend(msg) => Some(msg),
            _ => None,
        }
    }

    /// 再試行の対象になるか
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoryboardError::Backend(_)
                | StoryboardError::Transport(_)
                | StoryboardError::JsonParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
