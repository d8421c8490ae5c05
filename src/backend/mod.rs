//! バックエンドAPI
//!
//! 文字起こし・プロンプト生成・画像生成・合成・動画生成はすべてサーバー側で行う。
//! ここではエンドポイントごとの入出力だけを定義する。

mod http;

pub use http::HttpBackend;

use crate::error::{Result, StoryboardError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storyboard_common::{CropRect, FileData, GenerationSettings, ImageMode, JobDetails, SceneChunk};

/// upload-audio のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub job_id: String,
    #[serde(rename = "full_text")]
    pub transcript: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "story_ingredients")]
    pub ingredients_text: String,
    pub chunks: Vec<SceneChunk>,
}

impl UploadResponse {
    /// extract-details を呼ばずに済むか
    pub fn has_details(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn into_details(self) -> JobDetails {
        JobDetails {
            transcript: self.transcript,
            title: self.title,
            description: self.description,
            ingredients_text: self.ingredients_text,
            chunks: self.chunks,
        }
    }
}

/// adjust-prompts の1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPrompt {
    pub scene_index: usize,
    pub prompt: String,
}

/// generate-image のリクエスト
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateImageRequest {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<usize>,
    #[serde(rename = "new_prompt")]
    pub prompt: String,
    pub mode: ImageMode,
    pub references: Vec<String>,
}

/// upload-local-image のリクエスト
#[derive(Debug, Clone)]
pub struct LocalImageUpload {
    pub job_id: String,
    pub scene_index: Option<usize>,
    pub mode: &'static str,
    pub file: FileData,
    pub rect: CropRect,
    pub add_as_reference: bool,
}

/// upload-local-image のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocalImageResponse {
    pub image_url: String,
    /// 差し替えで使われなくなった旧画像
    pub unused_old_image: Option<String>,
    /// サーバー側でリファレンスに登録したファイル名
    pub added_ref_filename: Option<String>,
}

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// 音声と生成設定を送り、ジョブを作る
    async fn upload_audio(
        &self,
        audio: &FileData,
        settings: &GenerationSettings,
    ) -> Result<UploadResponse>;

    async fn extract_details(&self, job_id: &str) -> Result<JobDetails>;

    /// シーン1件分の画像プロンプトを作る
    async fn preprocess_chunk(
        &self,
        job_id: &str,
        chunk_index: usize,
        ingredients: &str,
    ) -> Result<String>;

    /// シーン間の整合性を取ったプロンプト一覧
    async fn adjust_prompts(&self, job_id: &str) -> Result<Vec<AdjustedPrompt>>;

    /// 画像URLを返す
    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<String>;

    /// 生成済み画像をダウンロード
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;

    /// クロップ枠付きでローカル画像を送る
    async fn upload_local_image(&self, upload: &LocalImageUpload) -> Result<LocalImageResponse>;

    /// リファレンス画像を送り、サーバー上のパスを返す
    async fn upload_reference_image(&self, job_id: &str, file: &FileData) -> Result<String>;

    async fn add_reference(&self, job_id: &str, ref_path: &str) -> Result<()>;

    /// 既存シーン画像に重ねて合成し、新しい画像URLを返す
    async fn overlay_scene_image(
        &self,
        job_id: &str,
        scene_index: usize,
        overlay_filename: &str,
        opacity: u8,
    ) -> Result<String>;

    /// 動画URLを返す
    async fn create_video(&self, job_id: &str) -> Result<String>;

    async fn list_default_references(&self) -> Result<Vec<String>>;

    async fn cancel_job(&self, job_id: &str) -> Result<()>;
}

/// レスポンスJSONを型に変換する
///
/// `error` フィールドがあれば `StoryboardError::Backend`。
pub fn decode_reply<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let msg = match err.as_str() {
            Some(s) => s.to_string(),
            None => err.to_string(),
        };
        return Err(StoryboardError::Backend(msg));
    }
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageUrlReply {
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoUrlReply {
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptReply {
    pub preprocessed_prompt: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdjustReply {
    #[serde(default)]
    pub adjusted_prompts: Vec<AdjustedPrompt>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferencePathReply {
    #[serde(alias = "filename", alias = "path")]
    pub ref_path: String,
}
