//! 画像操作エンジン
//!
//! AI生成・編集は最大 `max_attempts` 回まで順番に再試行する。成功した画像は
//! そのまま確定せず、ダウンロードしてクロップに回す（確定はクロップ時）。

use super::{Control, OperationOutcome, Wizard};
use crate::backend::{Backend, GenerateImageRequest};
use crate::error::{Result, StoryboardError};
use crate::view::StoryboardView;
use storyboard_common::{
    resolve_filename, CardId, CropPurpose, CropSession, FileData, ImageMode, LockGuard, OpPhase,
};

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// シーン画像をプロンプトと選択中リファレンスから生成
    pub async fn generate_scene_image(&mut self, index: usize) -> Result<OperationOutcome> {
        let scene = self
            .session
            .scene(index)
            .ok_or(storyboard_common::Error::UnknownScene(index))?;
        if !scene.prompt_ready {
            return Ok(OperationOutcome::Refused);
        }
        let prompt = scene.prompt_text.clone();
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        let request = GenerateImageRequest {
            job_id: self.session.job_id()?.to_string(),
            scene_index: Some(index),
            prompt,
            mode: ImageMode::Normal,
            references: self.session.references.selected_filenames(),
        };
        self.run_generation(CardId::Scene(index), Control::Generate, request, guard)
            .await
    }

    /// 既存のシーン画像を指示文で修正
    pub async fn edit_scene_image(
        &mut self,
        index: usize,
        instruction: &str,
    ) -> Result<OperationOutcome> {
        let scene = self
            .session
            .scene(index)
            .ok_or(storyboard_common::Error::UnknownScene(index))?;
        let Some(current) = scene.image_url().map(resolve_filename) else {
            return Ok(OperationOutcome::Refused);
        };
        if instruction.trim().is_empty() {
            return Ok(OperationOutcome::Refused);
        }
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        let request = GenerateImageRequest {
            job_id: self.session.job_id()?.to_string(),
            scene_index: Some(index),
            prompt: instruction.to_string(),
            mode: ImageMode::EditSingle,
            references: vec![current],
        };
        self.run_generation(CardId::Scene(index), Control::Edit, request, guard)
            .await
    }

    /// リファレンスカードで新しいリファレンス画像を生成
    pub async fn generate_reference_card(&mut self) -> Result<OperationOutcome> {
        let card = &self.session.reference_card;
        if !card.prompt_ready() {
            return Ok(OperationOutcome::Refused);
        }
        let prompt = card.prompt_text.clone();
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        let request = GenerateImageRequest {
            job_id: self.session.job_id()?.to_string(),
            scene_index: None,
            prompt,
            mode: ImageMode::ReferenceCard,
            references: self.session.references.selected_filenames(),
        };
        self.run_generation(CardId::ReferenceCard, Control::Generate, request, guard)
            .await
    }

    /// リファレンスカードの画像をその場で修正
    pub async fn edit_reference_card(&mut self, instruction: &str) -> Result<OperationOutcome> {
        let Some(current) = self.session.reference_card.image_url().map(resolve_filename) else {
            return Ok(OperationOutcome::Refused);
        };
        if instruction.trim().is_empty() {
            return Ok(OperationOutcome::Refused);
        }
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        let request = GenerateImageRequest {
            job_id: self.session.job_id()?.to_string(),
            scene_index: None,
            prompt: instruction.to_string(),
            mode: ImageMode::EditReferenceCard,
            references: vec![current],
        };
        self.run_generation(CardId::ReferenceCard, Control::Edit, request, guard)
            .await
    }

    /// ローカル画像を選んでクロップを開く
    pub fn select_local_image(&mut self, card: CardId, file: FileData) -> Result<OperationOutcome> {
        if let CardId::Scene(index) = card {
            self.session
                .scene(index)
                .ok_or(storyboard_common::Error::UnknownScene(index))?;
        }
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        self.open_crop(card, CropPurpose::Replace, file, guard);
        Ok(OperationOutcome::AwaitingCrop)
    }

    /// シーン画像に別画像を重ねる（画像がまだなければ何もしない）
    pub fn overlay_scene_image(
        &mut self,
        index: usize,
        file: FileData,
        opacity: Option<u8>,
    ) -> Result<OperationOutcome> {
        let scene = self
            .session
            .scene(index)
            .ok_or(storyboard_common::Error::UnknownScene(index))?;
        if !scene.is_editable_image() {
            log::debug!("overlay refused: scene {} has no image", index);
            return Ok(OperationOutcome::Refused);
        }
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        let opacity = opacity.unwrap_or(self.options.overlay_opacity).min(100);
        self.open_crop(CardId::Scene(index), CropPurpose::Overlay { opacity }, file, guard);
        Ok(OperationOutcome::AwaitingCrop)
    }

    async fn run_generation(
        &mut self,
        card: CardId,
        control: Control,
        request: GenerateImageRequest,
        guard: LockGuard,
    ) -> Result<OperationOutcome> {
        // ロック取得で他カードのボタンも無効になる
        self.refresh_buttons();

        let image_url = match self.generate_with_retry(card, control, &request).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("{} {} gave up: {}", card, request.mode, e);
                self.set_phase(card, control, OpPhase::Idle);
                drop(guard);
                self.refresh_buttons();
                return Ok(OperationOutcome::Failed);
            }
        };
        log::info!("{} {} => {}", card, request.mode, image_url);
        self.set_phase(card, control, OpPhase::Succeeded);

        let bytes = match self.backend.fetch_image(&image_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("failed to download {}: {}", image_url, e);
                self.set_phase(card, control, OpPhase::Idle);
                drop(guard);
                self.refresh_buttons();
                return Ok(OperationOutcome::Failed);
            }
        };
        let name = match card {
            CardId::Scene(index) => format!("scene_{}_ai.png", index),
            CardId::ReferenceCard => "reference_ai.png".to_string(),
        };
        self.open_crop(card, CropPurpose::Replace, FileData::new(name, bytes), guard);
        Ok(OperationOutcome::AwaitingCrop)
    }

    /// 同じリクエストを順番に再試行（ラベルに試行回数を出す）
    async fn generate_with_retry(
        &mut self,
        card: CardId,
        control: Control,
        request: &GenerateImageRequest,
    ) -> Result<String> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            self.set_phase(card, control, OpPhase::Running { attempt });
            match self.backend.generate_image(request).await {
                Ok(url) => return Ok(url),
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "generate-image {} attempt {}/{} failed: {}",
                        card,
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoryboardError::RetriesExhausted {
            attempts: max_attempts,
            last: last_error,
        })
    }

    fn open_crop(&mut self, card: CardId, purpose: CropPurpose, file: FileData, guard: LockGuard) {
        let ratio = self.options.settings.target_aspect_ratio();
        log::debug!("crop session for {} ({:?}), ratio {:.4}", card, purpose, ratio);
        self.view.crop_opened(card, &file);
        self.session.crop = Some(CropSession::new(card, purpose, file, ratio, guard));
        self.refresh_buttons();
    }
}
