//! 結合テスト用のモックバックエンドと記録ビュー

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyboard_common::{
    CardButtons, CardId, CropRect, FileData, GenerationSettings, JobDetails, ReferenceEntry,
    SceneChunk,
};
use storyboard_rust::backend::{
    AdjustedPrompt, Backend, GenerateImageRequest, LocalImageResponse, LocalImageUpload,
    UploadResponse,
};
use storyboard_rust::error::{Result, StoryboardError};
use storyboard_rust::view::StoryboardView;
use storyboard_rust::wizard::{Wizard, WizardOptions};
use tokio::sync::Notify;

/// 台本どおりに返す応答
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    /// `{error: ...}` 応答
    Error(String),
    /// 通信失敗
    Transport,
}

impl Reply {
    fn into_result(self) -> Result<String> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Error(msg) => Err(StoryboardError::Backend(msg)),
            Reply::Transport => Err(StoryboardError::Transport("connection refused".into())),
        }
    }
}

/// アップロードを途中で止めるためのゲート
#[derive(Debug, Clone, Default)]
pub struct UploadGate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub fn chunks(n: usize) -> Vec<SceneChunk> {
    (0..n)
        .map(|i| SceneChunk {
            index: i,
            raw_text: format!("Scene text {}", i),
            start_sec: i as f64 * 12.5,
            end_sec: (i + 1) as f64 * 12.5,
        })
        .collect()
}

pub fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::new(w, h);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn audio() -> FileData {
    FileData::new("narration.mp3", b"ID3fake".to_vec())
}

pub fn local_image(name: &str) -> FileData {
    FileData::new(name, png_bytes(400, 300))
}

#[derive(Default)]
struct Script {
    upload: VecDeque<Reply>,
    extract: VecDeque<Reply>,
    preprocess: VecDeque<Reply>,
    adjust: Option<Reply>,
    generate: VecDeque<Reply>,
    fetch: VecDeque<Reply>,
    local: VecDeque<Reply>,
    reference: VecDeque<Reply>,
    overlay: VecDeque<Reply>,
    video: VecDeque<Reply>,
    defaults: Option<Reply>,
}

pub struct MockBackend {
    scenes: usize,
    single_step: bool,
    gate: Option<UploadGate>,
    extract_gate: Option<UploadGate>,
    unused_old_image: Option<String>,
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    generate_requests: Mutex<Vec<GenerateImageRequest>>,
    local_uploads: Mutex<Vec<LocalImageUpload>>,
    counter: Mutex<usize>,
}

impl MockBackend {
    pub fn new(scenes: usize) -> Self {
        Self {
            scenes,
            single_step: true,
            gate: None,
            extract_gate: None,
            unused_old_image: None,
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            generate_requests: Mutex::new(Vec::new()),
            local_uploads: Mutex::new(Vec::new()),
            counter: Mutex::new(0),
        }
    }

    /// upload-audio はジョブIDだけ返し、詳細は extract-details で返す
    pub fn two_step(mut self) -> Self {
        self.single_step = false;
        self
    }

    pub fn with_gate(mut self, gate: UploadGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// extract-details の応答をゲートで止める
    pub fn with_extract_gate(mut self, gate: UploadGate) -> Self {
        self.extract_gate = Some(gate);
        self
    }

    pub fn with_unused_old_image(mut self, path: &str) -> Self {
        self.unused_old_image = Some(path.to_string());
        self
    }

    pub fn script_upload(&self, reply: Reply) {
        self.script.lock().unwrap().upload.push_back(reply);
    }

    pub fn script_extract(&self, reply: Reply) {
        self.script.lock().unwrap().extract.push_back(reply);
    }

    pub fn script_preprocess(&self, reply: Reply) {
        self.script.lock().unwrap().preprocess.push_back(reply);
    }

    pub fn script_adjust(&self, reply: Reply) {
        self.script.lock().unwrap().adjust = Some(reply);
    }

    pub fn script_generate(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().unwrap().generate.extend(replies);
    }

    pub fn script_fetch(&self, reply: Reply) {
        self.script.lock().unwrap().fetch.push_back(reply);
    }

    pub fn script_local(&self, reply: Reply) {
        self.script.lock().unwrap().local.push_back(reply);
    }

    pub fn script_reference(&self, reply: Reply) {
        self.script.lock().unwrap().reference.push_back(reply);
    }

    pub fn script_overlay(&self, reply: Reply) {
        self.script.lock().unwrap().overlay.push_back(reply);
    }

    pub fn script_video(&self, reply: Reply) {
        self.script.lock().unwrap().video.push_back(reply);
    }

    pub fn script_defaults(&self, reply: Reply) {
        self.script.lock().unwrap().defaults = Some(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn generate_requests(&self) -> Vec<GenerateImageRequest> {
        self.generate_requests.lock().unwrap().clone()
    }

    pub fn local_uploads(&self) -> Vec<LocalImageUpload> {
        self.local_uploads.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn next(&self, pick: impl FnOnce(&mut Script) -> Option<Reply>) -> Option<Reply> {
        pick(&mut self.script.lock().unwrap())
    }

    fn serial(&self) -> usize {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        *counter
    }

    fn details(&self) -> JobDetails {
        JobDetails {
            transcript: "Once upon a time".into(),
            title: "The Lantern".into(),
            description: "A short tale".into(),
            ingredients_text: "Characters: a girl with a lantern".into(),
            chunks: chunks(self.scenes),
        }
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn upload_audio(
        &self,
        audio: &FileData,
        _settings: &GenerationSettings,
    ) -> Result<UploadResponse> {
        self.record(format!("upload_audio:{}", audio.name));
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if let Some(reply) = self.next(|s| s.upload.pop_front()) {
            reply.into_result()?;
        }
        let details = self.details();
        let mut reply = UploadResponse {
            job_id: "job-123".into(),
            transcript: details.transcript.clone(),
            ..Default::default()
        };
        if self.single_step {
            reply.title = details.title;
            reply.description = details.description;
            reply.ingredients_text = details.ingredients_text;
            reply.chunks = details.chunks;
        }
        Ok(reply)
    }

    async fn extract_details(&self, job_id: &str) -> Result<JobDetails> {
        self.record(format!("extract_details:{}", job_id));
        if let Some(gate) = &self.extract_gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if let Some(reply) = self.next(|s| s.extract.pop_front()) {
            reply.into_result()?;
        }
        let mut details = self.details();
        details.transcript.clear();
        Ok(details)
    }

    async fn preprocess_chunk(
        &self,
        job_id: &str,
        chunk_index: usize,
        _ingredients: &str,
    ) -> Result<String> {
        self.record(format!("preprocess_chunk:{}:{}", job_id, chunk_index));
        match self.next(|s| s.preprocess.pop_front()) {
            Some(reply) => reply.into_result(),
            None => Ok(format!("A watercolor of scene {}", chunk_index)),
        }
    }

    async fn adjust_prompts(&self, job_id: &str) -> Result<Vec<AdjustedPrompt>> {
        self.record(format!("adjust_prompts:{}", job_id));
        match self.next(|s| s.adjust.take()) {
            Some(reply) => {
                reply.into_result()?;
                Ok((0..self.scenes)
                    .map(|i| AdjustedPrompt {
                        scene_index: i,
                        prompt: format!("Consistent watercolor of scene {}", i),
                    })
                    .collect())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<String> {
        self.record(format!("generate_image:{}", request.mode));
        self.generate_requests.lock().unwrap().push(request.clone());
        match self.next(|s| s.generate.pop_front()) {
            Some(reply) => reply.into_result(),
            None => Ok(format!("/static/tmp/job-123/images/gen_{}.png", self.serial())),
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.record(format!("fetch_image:{}", url));
        if let Some(reply) = self.next(|s| s.fetch.pop_front()) {
            reply.into_result()?;
        }
        Ok(png_bytes(1024, 1024))
    }

    async fn upload_local_image(&self, upload: &LocalImageUpload) -> Result<LocalImageResponse> {
        self.record(format!("upload_local_image:{}", upload.mode));
        self.local_uploads.lock().unwrap().push(upload.clone());
        if let Some(reply) = self.next(|s| s.local.pop_front()) {
            reply.into_result()?;
        }
        let n = self.serial();
        let image_url = match upload.scene_index {
            Some(i) => format!("/static/tmp/job-123/images/scene_{}_v{}.png", i, n),
            None => format!("/static/tmp/job-123/refs/reference_v{}.png", n),
        };
        Ok(LocalImageResponse {
            added_ref_filename: upload
                .add_as_reference
                .then(|| format!("ref_from_{}", storyboard_common::resolve_filename(&image_url))),
            unused_old_image: self.unused_old_image.clone(),
            image_url,
        })
    }

    async fn upload_reference_image(&self, job_id: &str, file: &FileData) -> Result<String> {
        self.record(format!("upload_reference_image:{}:{}", job_id, file.name));
        match self.next(|s| s.reference.pop_front()) {
            Some(reply) => reply.into_result(),
            None => Ok(format!("/static/tmp/{}/refs/{}", job_id, file.name)),
        }
    }

    async fn add_reference(&self, job_id: &str, ref_path: &str) -> Result<()> {
        self.record(format!("add_reference:{}:{}", job_id, ref_path));
        Ok(())
    }

    async fn overlay_scene_image(
        &self,
        job_id: &str,
        scene_index: usize,
        overlay_filename: &str,
        opacity: u8,
    ) -> Result<String> {
        self.record(format!(
            "overlay_scene_image:{}:{}:{}:{}",
            job_id, scene_index, overlay_filename, opacity
        ));
        match self.next(|s| s.overlay.pop_front()) {
            Some(reply) => reply.into_result(),
            None => Ok(format!("/static/tmp/{}/images/scene_{}_overlay.png", job_id, scene_index)),
        }
    }

    async fn create_video(&self, job_id: &str) -> Result<String> {
        self.record(format!("create_video:{}", job_id));
        match self.next(|s| s.video.pop_front()) {
            Some(reply) => reply.into_result(),
            None => Ok(format!("/static/tmp/{}/{}.mp4", job_id, job_id)),
        }
    }

    async fn list_default_references(&self) -> Result<Vec<String>> {
        self.record("list_default_references");
        match self.next(|s| s.defaults.take()) {
            Some(reply) => reply.into_result().map(|url| vec![url]),
            None => Ok(Vec::new()),
        }
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.record(format!("cancel_job:{}", job_id));
        Ok(())
    }
}

/// 画面への出力をすべて記録するビュー
#[derive(Debug, Default)]
pub struct RecordingView {
    pub alerts: Vec<String>,
    pub statuses: Vec<String>,
    pub images: HashMap<CardId, String>,
    pub prompts: HashMap<CardId, (String, bool)>,
    pub buttons: HashMap<CardId, CardButtons>,
    /// Generate ボタンのラベルの移り変わり
    pub generate_labels: Vec<(CardId, String)>,
    pub references: Vec<ReferenceEntry>,
    pub preview: Option<ReferenceEntry>,
    pub crop_open: Option<CardId>,
    pub crop_rect: Option<CropRect>,
    pub fades: Vec<(CardId, Duration)>,
    pub cleared: usize,
    pub trigger: (bool, bool),
    pub video: Option<String>,
}

impl StoryboardView for RecordingView {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn set_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn set_image(&mut self, card: CardId, src: &str) {
        self.images.insert(card, src.to_string());
    }

    fn set_prompt(&mut self, card: CardId, text: &str, editable: bool) {
        self.prompts.insert(card, (text.to_string(), editable));
    }

    fn set_buttons(&mut self, card: CardId, buttons: &CardButtons) {
        let label = &buttons.generate.label;
        let last = self.generate_labels.iter().rev().find(|(c, _)| *c == card);
        if last.map(|(_, l)| l != label).unwrap_or(true) {
            self.generate_labels.push((card, label.clone()));
        }
        self.buttons.insert(card, buttons.clone());
    }

    fn references_changed(&mut self, entries: &[ReferenceEntry]) {
        self.references = entries.to_vec();
    }

    fn show_preview(&mut self, entry: Option<&ReferenceEntry>) {
        self.preview = entry.cloned();
    }

    fn crop_opened(&mut self, card: CardId, _file: &FileData) {
        self.crop_open = Some(card);
    }

    fn crop_changed(&mut self, rect: Option<&CropRect>) {
        self.crop_rect = rect.copied();
        if rect.is_none() {
            self.crop_open = None;
        }
    }

    fn fade_out_card(&mut self, card: CardId, delay: Duration) {
        self.fades.push((card, delay));
    }

    fn clear_cards(&mut self) {
        self.cleared += 1;
        self.images.clear();
        self.buttons.clear();
        self.prompts.clear();
    }

    fn set_video_trigger(&mut self, visible: bool, enabled: bool) {
        self.trigger = (visible, enabled);
    }

    fn show_video(&mut self, video_url: &str) {
        self.video = Some(video_url.to_string());
    }
}

pub type TestWizard = Wizard<MockBackend, RecordingView>;

pub fn options() -> WizardOptions {
    WizardOptions {
        fade_stagger: Duration::ZERO,
        ..WizardOptions::default()
    }
}

pub fn wizard(backend: MockBackend) -> TestWizard {
    Wizard::new(backend, RecordingView::default(), options())
}

/// アップロードとプロンプト作成まで済ませたウィザード
pub async fn ready_wizard(scenes: usize) -> TestWizard {
    let mut wizard = wizard(MockBackend::new(scenes));
    wizard.upload(Some(audio())).await.unwrap();
    wizard.generate_prompts(None).await.unwrap();
    wizard
}

/// 生成 → 枠合わせ → 確定 を1シーン分
pub async fn generate_and_confirm(wizard: &mut TestWizard, index: usize) {
    use storyboard_rust::wizard::OperationOutcome;
    assert_eq!(
        wizard.generate_scene_image(index).await.unwrap(),
        OperationOutcome::AwaitingCrop
    );
    wizard.crop_preview_loaded(800, 800, 1024, 1024).unwrap();
    assert_eq!(wizard.confirm_crop().await.unwrap(), OperationOutcome::Applied);
}
