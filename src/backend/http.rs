//! reqwestによるHTTP実装

use super::{
    decode_reply, AdjustReply, AdjustedPrompt, Backend, GenerateImageRequest, ImageUrlReply,
    LocalImageResponse, LocalImageUpload, PromptReply, ReferencePathReply, UploadResponse,
    VideoUrlReply,
};
use crate::error::{Result, StoryboardError};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use storyboard_common::{FileData, GenerationSettings, JobDetails};

/// 応答待ちの上限の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// 文字起こし・生成・レンダリングなどサーバー側の処理を待つ（上限なし）
    Backend,
    /// 付帯的な呼び出し
    Short,
}

fn wait_for(endpoint: &str) -> Wait {
    match endpoint {
        "add-reference" | "list-default-references" | "cancel-job" => Wait::Short,
        _ => Wait::Backend,
    }
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpBackend {
    /// 接続の上限はクライアント全体に、応答の上限は短い呼び出しだけに掛ける
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            request_timeout,
        })
    }

    fn deadline(&self, wait: Wait) -> Option<Duration> {
        match wait {
            Wait::Backend => None,
            Wait::Short => Some(self.request_timeout),
        }
    }

    fn with_deadline(&self, request: RequestBuilder, wait: Wait) -> RequestBuilder {
        match self.deadline(wait) {
            Some(limit) => request.timeout(limit),
            None => request,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/static/...` のような相対URLを絶対URLにする
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// ステータスに関係なく本文のJSONを読む（エラー時も `{error}` が返る）
    async fn read_reply<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => decode_reply(value),
            Err(_) if !status.is_success() => Err(StoryboardError::Backend(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        log::debug!("POST /{} {}", name, body);
        let request = self.client.post(self.endpoint(name)).json(body);
        let response = self.with_deadline(request, wait_for(name)).send().await?;
        Self::read_reply(response).await
    }

    async fn post_form<T: DeserializeOwned>(&self, name: &str, form: Form) -> Result<T> {
        log::debug!("POST /{} (multipart)", name);
        let request = self.client.post(self.endpoint(name)).multipart(form);
        let response = self.with_deadline(request, wait_for(name)).send().await?;
        Self::read_reply(response).await
    }
}

fn file_part(file: &FileData) -> Part {
    Part::bytes(file.bytes.clone()).file_name(file.name.clone())
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn upload_audio(
        &self,
        audio: &FileData,
        settings: &GenerationSettings,
    ) -> Result<UploadResponse> {
        let mut form = Form::new().part("audio", file_part(audio));
        for (name, value) in settings.form_fields() {
            form = form.text(name, value);
        }
        self.post_form("upload-audio", form).await
    }

    async fn extract_details(&self, job_id: &str) -> Result<JobDetails> {
        self.post_json("extract-details", &json!({ "job_id": job_id })).await
    }

    async fn preprocess_chunk(
        &self,
        job_id: &str,
        chunk_index: usize,
        ingredients: &str,
    ) -> Result<String> {
        let reply: PromptReply = self
            .post_json(
                "preprocess-chunk",
                &json!({
                    "job_id": job_id,
                    "chunk_index": chunk_index,
                    "story_ingredients": ingredients,
                }),
            )
            .await?;
        Ok(reply.preprocessed_prompt)
    }

    async fn adjust_prompts(&self, job_id: &str) -> Result<Vec<AdjustedPrompt>> {
        let reply: AdjustReply = self
            .post_json("adjust-prompts", &json!({ "job_id": job_id }))
            .await?;
        Ok(reply.adjusted_prompts)
    }

    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<String> {
        let body = serde_json::to_value(request)?;
        let reply: ImageUrlReply = self.post_json("generate-image", &body).await?;
        Ok(reply.image_url)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let request = self.client.get(self.resolve_url(url));
        let response = self.with_deadline(request, Wait::Short).send().await?;
        if !response.status().is_success() {
            return Err(StoryboardError::Backend(format!(
                "画像の取得に失敗: {} ({})",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_local_image(&self, upload: &LocalImageUpload) -> Result<LocalImageResponse> {
        let rect = &upload.rect;
        let mut form = Form::new()
            .text("job_id", upload.job_id.clone())
            .text("mode", upload.mode)
            .part("image_file", file_part(&upload.file))
            .text("box_x", rect.x.to_string())
            .text("box_y", rect.y.to_string())
            .text("box_w", rect.w.to_string())
            .text("box_h", rect.h.to_string())
            .text("displayed_w", rect.displayed_w.to_string())
            .text("displayed_h", rect.displayed_h.to_string())
            .text("add_as_reference", upload.add_as_reference.to_string());
        if let Some(index) = upload.scene_index {
            form = form.text("scene_index", index.to_string());
        }
        self.post_form("upload-local-image", form).await
    }

    async fn upload_reference_image(&self, job_id: &str, file: &FileData) -> Result<String> {
        let form = Form::new()
            .text("job_id", job_id.to_string())
            .part("file", file_part(file));
        let reply: ReferencePathReply = self.post_form("upload-reference-image", form).await?;
        Ok(reply.ref_path)
    }

    async fn add_reference(&self, job_id: &str, ref_path: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post_json("add-reference", &json!({ "job_id": job_id, "ref_path": ref_path }))
            .await?;
        Ok(())
    }

    async fn overlay_scene_image(
        &self,
        job_id: &str,
        scene_index: usize,
        overlay_filename: &str,
        opacity: u8,
    ) -> Result<String> {
        let reply: ImageUrlReply = self
            .post_json(
                "overlay-scene-image",
                &json!({
                    "job_id": job_id,
                    "scene_index": scene_index,
                    "overlay_filename": overlay_filename,
                    "opacity": opacity,
                }),
            )
            .await?;
        Ok(reply.image_url)
    }

    async fn create_video(&self, job_id: &str) -> Result<String> {
        let reply: VideoUrlReply = self
            .post_json("create-video", &json!({ "job_id": job_id }))
            .await?;
        Ok(reply.video_url)
    }

    async fn list_default_references(&self) -> Result<Vec<String>> {
        let name = "list-default-references";
        let request = self.client.get(self.endpoint(name));
        let response = self.with_deadline(request, wait_for(name)).send().await?;
        Self::read_reply(response).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post_json("cancel-job", &json!({ "job_id": job_id }))
            .await?;
        Ok(())
    }
}
