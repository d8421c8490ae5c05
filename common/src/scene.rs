//! シーンカードとリファレンスカードの状態

use crate::defaults;
use crate::format::format_range;
use crate::types::SceneChunk;

/// シーン画像のプレースホルダー
pub const SCENE_PLACEHOLDER: &str = "/static/assets/img/placeholder-scene.png";

/// リファレンスカード画像のプレースホルダー
pub const REFERENCE_PLACEHOLDER: &str = "/static/assets/img/placeholder-reference.png";

/// プロンプト生成前の表示
pub const NO_PROMPT_YET: &str = "No prompt yet.";

/// ボタンが起動した操作の進行状況
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpPhase {
    #[default]
    Idle,
    /// 実行中（試行回数は1始まり）
    Running { attempt: u32 },
    /// 少なくとも1回成功した
    Succeeded,
}

/// 表示中の画像
#[derive(Debug, Clone, PartialEq, Eq)]
struct ShownImage {
    url: String,
    /// キャッシュ回避用の版数
    version: u32,
}

/// 1シーン分のUI状態
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUIState {
    pub index: usize,
    pub chunk: SceneChunk,
    pub prompt_text: String,
    /// プロンプト生成フェーズでプロンプトが入ったか
    pub prompt_ready: bool,
    /// クロップ確定済みの画像があるか（false→trueは1回だけ）
    pub has_image: bool,
    pub generate_phase: OpPhase,
    pub edit_phase: OpPhase,
    image: Option<ShownImage>,
}

impl SceneUIState {
    pub fn new(chunk: SceneChunk) -> Self {
        Self {
            index: chunk.index,
            chunk,
            prompt_text: NO_PROMPT_YET.to_string(),
            prompt_ready: false,
            has_image: false,
            generate_phase: OpPhase::Idle,
            edit_phase: OpPhase::Idle,
            image: None,
        }
    }

    /// プロンプト作成フェーズの結果を設定（空白のみなら未準備扱い）
    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt_text = text.into();
        self.prompt_ready = !self.prompt_text.trim().is_empty();
    }

    /// ユーザーによる編集。作成フェーズで埋まる前は受け付けない
    pub fn edit_prompt(&mut self, text: impl Into<String>) -> bool {
        if !self.prompt_ready {
            return false;
        }
        self.prompt_text = text.into();
        true
    }

    /// 新しい画像を表示
    pub fn apply_image(&mut self, url: impl Into<String>) {
        let version = self.image.as_ref().map(|i| i.version + 1).unwrap_or(1);
        self.image = Some(ShownImage { url: url.into(), version });
    }

    /// プレースホルダーでない画像を表示しているか
    pub fn is_editable_image(&self) -> bool {
        self.image.is_some()
    }

    /// 表示中の画像URL（キャッシュ回避の版数なし）
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.url.as_str())
    }

    /// img要素に設定するURL
    pub fn image_src(&self) -> String {
        match &self.image {
            Some(image) => format!("{}?t={}", image.url, image.version),
            None => SCENE_PLACEHOLDER.to_string(),
        }
    }

    /// 「Scene Text」タブの本文
    pub fn transcript_text(&self) -> String {
        format!(
            "\"{}\"\nDuration: {}",
            self.chunk.raw_text,
            format_range(self.chunk.start_sec, self.chunk.end_sec)
        )
    }

    /// プロンプトタブの見出し
    pub fn prompt_tab_title(&self) -> String {
        format!("Scene {} prompt", self.index + 1)
    }
}

/// リファレンス生成用の疑似シーンカード
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCardState {
    pub prompt_text: String,
    pub generate_phase: OpPhase,
    pub edit_phase: OpPhase,
    image_url: Option<String>,
}

impl Default for ReferenceCardState {
    fn default() -> Self {
        Self {
            prompt_text: defaults::REFERENCE_CARD_PROMPT.to_string(),
            generate_phase: OpPhase::Idle,
            edit_phase: OpPhase::Idle,
            image_url: None,
        }
    }
}

impl ReferenceCardState {
    pub fn apply_image(&mut self, url: impl Into<String>) {
        self.image_url = Some(url.into());
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn image_src(&self) -> &str {
        self.image_url.as_deref().unwrap_or(REFERENCE_PLACEHOLDER)
    }

    /// プロンプトが空でなければ生成可能
    pub fn prompt_ready(&self) -> bool {
        !self.prompt_text.trim().is_empty()
    }
}
