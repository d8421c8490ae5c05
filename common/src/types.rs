//! ウィザードの型定義
//!
//! CLIとバックエンドクライアントで共有される型:
//! - SceneChunk / JobDetails: 文字起こし結果
//! - GenerationSettings: upload-audio に送る生成設定
//! - ImageMode / CardId: 画像操作の対象と種別

use crate::defaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ナレーションの1区間（1シーン）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneChunk {
    pub index: usize,
    #[serde(default)]
    pub raw_text: String,
    #[serde(rename = "start", default)]
    pub start_sec: f64,
    #[serde(rename = "end", default)]
    pub end_sec: f64,
}

/// 文字起こしから派生したジョブ内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDetails {
    #[serde(rename = "full_text")]
    pub transcript: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "story_ingredients")]
    pub ingredients_text: String,
    pub chunks: Vec<SceneChunk>,
}

/// ジョブ
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub total_scenes: usize,
    pub prompts_finalized: bool,
}

/// generate-image のモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// プロンプト＋選択中リファレンスから新規生成
    Normal,
    /// 既存シーン画像を指示で修正
    EditSingle,
    /// リファレンス画像を新規生成
    ReferenceCard,
    /// 既存リファレンス画像を修正
    EditReferenceCard,
}

impl ImageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMode::Normal => "normal",
            ImageMode::EditSingle => "edit_single",
            ImageMode::ReferenceCard => "reference_card",
            ImageMode::EditReferenceCard => "edit_reference_card",
        }
    }
}

impl fmt::Display for ImageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 画面上のカード（リファレンスカードは先頭に1枚）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardId {
    ReferenceCard,
    Scene(usize),
}

impl CardId {
    pub fn scene_index(&self) -> Option<usize> {
        match self {
            CardId::Scene(index) => Some(*index),
            CardId::ReferenceCard => None,
        }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardId::ReferenceCard => write!(f, "reference card"),
            CardId::Scene(index) => write!(f, "scene {}", index),
        }
    }
}

/// 差し替えで不要になった旧画像をリファレンスに回すかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacedImagePolicy {
    /// リファレンスには一切追加しない
    Discard,
    /// 「リファレンスに追加」を明示したときだけ追加（デフォルト）
    #[default]
    Explicit,
    /// 明示指定に加え、差し替えられた旧画像も自動で追加
    Always,
}

impl FromStr for ReplacedImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discard" | "never" => Ok(ReplacedImagePolicy::Discard),
            "explicit" => Ok(ReplacedImagePolicy::Explicit),
            "always" => Ok(ReplacedImagePolicy::Always),
            _ => Err(format!("Unknown policy: {}. Use discard, explicit, or always", s)),
        }
    }
}

/// 出力動画サイズ（"1920x1080" 形式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub const DEFAULT: VideoSize = VideoSize { width: 1920, height: 1080 };

    /// 寛容なパース: 読めない辺だけデフォルト（1920x1080）で補う
    pub fn parse_lenient(s: &str) -> Self {
        let mut parts = s.trim().splitn(2, ['x', 'X']);
        let width = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|&w| w > 0)
            .unwrap_or(Self::DEFAULT.width);
        let height = parts
            .next()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|&h| h > 0)
            .unwrap_or(Self::DEFAULT.height);
        Self { width, height }
    }

    /// 幅 / 高さ
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl FromStr for VideoSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::InvalidVideoSize(s.to_string()))?;
        let width: u32 = w.trim().parse().map_err(|_| Error::InvalidVideoSize(s.to_string()))?;
        let height: u32 = h.trim().parse().map_err(|_| Error::InvalidVideoSize(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidVideoSize(s.to_string()));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for VideoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// アップロードするファイル（音声・画像）
#[derive(Clone, PartialEq, Eq)]
pub struct FileData {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileData {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileData")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// upload-audio に送る生成設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub words_per_scene: u32,
    pub text_model: String,
    pub images_ai_requested_size: String,
    pub video_size: String,
    pub image_prompt_style: String,
    pub characters_prompt_style: String,
    pub image_preprocessing_prompt: String,
    pub fade_in: f64,
    pub fade_out: f64,
    pub crossfade_dur: f64,
    pub transition_displacement: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            words_per_scene: defaults::WORDS_PER_SCENE,
            text_model: defaults::TEXT_MODEL.into(),
            images_ai_requested_size: defaults::IMAGES_AI_REQUESTED_SIZE.into(),
            video_size: defaults::VIDEO_SIZE.into(),
            image_prompt_style: defaults::IMAGE_PROMPT_STYLE.into(),
            characters_prompt_style: defaults::CHARACTERS_PROMPT_STYLE.into(),
            image_preprocessing_prompt: defaults::IMAGE_PREPROCESSING_PROMPT.into(),
            fade_in: defaults::FADE_IN,
            fade_out: defaults::FADE_OUT,
            crossfade_dur: defaults::CROSSFADE_DUR,
            transition_displacement: defaults::TRANSITION_DISPLACEMENT,
        }
    }
}

impl GenerationSettings {
    /// フォームフィールド（名前, 値）の一覧
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("words_per_scene", self.words_per_scene.to_string()),
            ("text_model", self.text_model.trim().to_string()),
            ("images_ai_requested_size", self.images_ai_requested_size.trim().to_string()),
            ("video_size", self.video_size.trim().to_string()),
            ("image_prompt_style", self.image_prompt_style.clone()),
            ("characters_prompt_style", self.characters_prompt_style.clone()),
            ("image_preprocessing_prompt", self.image_preprocessing_prompt.clone()),
            ("fade_in", self.fade_in.to_string()),
            ("fade_out", self.fade_out.to_string()),
            ("crossfade_dur", self.crossfade_dur.to_string()),
            ("transition_displacement", self.transition_displacement.to_string()),
        ]
    }

    /// クロップ時に使う目標アスペクト比
    pub fn target_aspect_ratio(&self) -> f64 {
        VideoSize::parse_lenient(&self.video_size).aspect_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_chunk_deserialize() {
        let json = r#"{"index": 2, "raw_text": "hola", "start": 1.5, "end": 4.25}"#;
        let chunk: SceneChunk = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(chunk.index, 2);
        assert_eq!(chunk.raw_text, "hola");
        assert_eq!(chunk.start_sec, 1.5);
        assert_eq!(chunk.end_sec, 4.25);
    }

    #[test]
    fn test_job_details_wire_names() {
        let json = r#"{
            "full_text": "once upon a time",
            "title": "T",
            "description": "D",
            "story_ingredients": "a fox",
            "chunks": [{"index": 0, "raw_text": "once", "start": 0, "end": 2}]
        }"#;
        let details: JobDetails = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(details.transcript, "once upon a time");
        assert_eq!(details.ingredients_text, "a fox");
        assert_eq!(details.chunks.len(), 1);
    }

    #[test]
    fn test_job_details_missing_fields() {
        let details: JobDetails = serde_json::from_str("{}").expect("デシリアライズ失敗");
        assert!(details.chunks.is_empty());
        assert_eq!(details.title, "");
    }

    #[test]
    fn test_image_mode_wire_names() {
        assert_eq!(ImageMode::Normal.as_str(), "normal");
        assert_eq!(ImageMode::EditSingle.as_str(), "edit_single");
        assert_eq!(ImageMode::ReferenceCard.as_str(), "reference_card");
        assert_eq!(ImageMode::EditReferenceCard.as_str(), "edit_reference_card");
        let json = serde_json::to_string(&ImageMode::EditReferenceCard).unwrap();
        assert_eq!(json, "\"edit_reference_card\"");
    }

    #[test]
    fn test_video_size_parse() {
        let size: VideoSize = "1280x720".parse().unwrap();
        assert_eq!(size, VideoSize { width: 1280, height: 720 });
        assert!("1280".parse::<VideoSize>().is_err());
        assert!("0x720".parse::<VideoSize>().is_err());
        assert_eq!(size.to_string(), "1280x720");
    }

    #[test]
    fn test_video_size_parse_lenient() {
        assert_eq!(VideoSize::parse_lenient("1080x1920"), VideoSize { width: 1080, height: 1920 });
        assert_eq!(VideoSize::parse_lenient("abcx720"), VideoSize { width: 1920, height: 720 });
        assert_eq!(VideoSize::parse_lenient(""), VideoSize::DEFAULT);
        assert_eq!(VideoSize::parse_lenient("0x0"), VideoSize::DEFAULT);
    }

    #[test]
    fn test_target_aspect_ratio() {
        let settings = GenerationSettings {
            video_size: "1000x500".into(),
            ..Default::default()
        };
        assert_eq!(settings.target_aspect_ratio(), 2.0);
    }

    #[test]
    fn test_form_fields_contains_all_settings() {
        let fields = GenerationSettings::default().form_fields();
        let names: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert!(names.contains(&"words_per_scene"));
        assert!(names.contains(&"video_size"));
        assert!(names.contains(&"crossfade_dur"));
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn test_replaced_image_policy_from_str() {
        assert_eq!("always".parse::<ReplacedImagePolicy>(), Ok(ReplacedImagePolicy::Always));
        assert_eq!("Discard".parse::<ReplacedImagePolicy>(), Ok(ReplacedImagePolicy::Discard));
        assert!("sometimes".parse::<ReplacedImagePolicy>().is_err());
        assert_eq!(ReplacedImagePolicy::default(), ReplacedImagePolicy::Explicit);
    }

    #[test]
    fn test_card_id_scene_index() {
        assert_eq!(CardId::Scene(3).scene_index(), Some(3));
        assert_eq!(CardId::ReferenceCard.scene_index(), None);
    }
}
