//! クロップの操作と確定

use super::{OperationOutcome, Wizard};
use crate::backend::{Backend, LocalImageUpload};
use crate::error::Result;
use crate::media::image_dimensions;
use crate::view::StoryboardView;
use storyboard_common::{
    resolve_filename, CardId, CropPhase, CropPurpose, CropRect, CropSession, ReplacedImagePolicy,
};

const CROP_ERROR: &str = "Error uploading/cropping image";

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// プレビュー画像の読み込み完了: 枠を自動で合わせる
    pub fn crop_preview_loaded(
        &mut self,
        client_w: u32,
        client_h: u32,
        natural_w: u32,
        natural_h: u32,
    ) -> Option<CropRect> {
        let crop = self.session.crop.as_mut()?;
        let rect = crop
            .editor
            .preview_loaded(client_w, client_h, natural_w, natural_h);
        self.view.crop_changed(Some(&rect));
        Some(rect)
    }

    /// 実寸をデコードして枠を合わせる（表示サイズを持たないCLI用）
    pub fn crop_fit_natural(&mut self) -> Result<Option<CropRect>> {
        let Some(crop) = self.session.crop.as_ref() else {
            return Ok(None);
        };
        let (w, h) = image_dimensions(&crop.file.bytes)?;
        Ok(self.crop_preview_loaded(0, 0, w, h))
    }

    pub fn crop_phase(&self) -> Option<CropPhase> {
        self.session.crop.as_ref().map(|c| c.editor.phase())
    }

    /// 枠の上で押下（枠内オフセット）
    pub fn crop_begin_drag(&mut self, offset_x: i64, offset_y: i64) -> bool {
        match self.session.crop.as_mut() {
            Some(crop) => crop.editor.begin_drag(offset_x, offset_y),
            None => false,
        }
    }

    pub fn crop_drag_to(&mut self, pointer_x: i64, pointer_y: i64) -> Option<CropRect> {
        let rect = self
            .session
            .crop
            .as_mut()?
            .editor
            .drag_to(pointer_x, pointer_y)?;
        self.view.crop_changed(Some(&rect));
        Some(rect)
    }

    pub fn crop_end_drag(&mut self) {
        if let Some(crop) = self.session.crop.as_mut() {
            crop.editor.end_drag();
        }
    }

    /// 「リファレンスに追加」チェックボックス
    pub fn set_crop_add_as_reference(&mut self, checked: bool) {
        if let Some(crop) = self.session.crop.as_mut() {
            crop.add_as_reference = checked;
        }
    }

    /// クロップを破棄（元の画像はそのまま）
    pub fn cancel_crop(&mut self) -> bool {
        let Some(crop) = self.session.crop.take() else {
            return false;
        };
        log::debug!("crop canceled for {}", crop.target);
        drop(crop);
        self.view.crop_changed(None);
        self.refresh_buttons();
        true
    }

    /// クロップを確定してサーバーに送り、結果をカードに反映
    pub async fn confirm_crop(&mut self) -> Result<OperationOutcome> {
        let Some(crop) = self.session.crop.take() else {
            return Ok(OperationOutcome::Refused);
        };
        let outcome = self.submit_crop(&crop).await;
        // ここでロックが解放される
        drop(crop);
        self.view.crop_changed(None);
        self.refresh_buttons();
        outcome
    }

    async fn submit_crop(&mut self, crop: &CropSession) -> Result<OperationOutcome> {
        let rect = match crop.editor.rect() {
            Some(rect) => rect,
            None => match image_dimensions(&crop.file.bytes) {
                Ok((w, h)) => CropRect::fit(w, h, crop.editor.ratio()),
                Err(e) => {
                    log::error!("cannot read {}: {}", crop.file.name, e);
                    self.view.alert(CROP_ERROR);
                    return Ok(OperationOutcome::Failed);
                }
            },
        };
        let job_id = self.session.job_id()?.to_string();
        let add_as_reference = match self.options.replaced_image_policy {
            ReplacedImagePolicy::Discard => false,
            _ => crop.add_as_reference,
        };
        let upload = LocalImageUpload {
            job_id: job_id.clone(),
            scene_index: crop.target.scene_index(),
            mode: crop.upload_mode(),
            file: crop.file.clone(),
            rect,
            add_as_reference,
        };
        log::debug!(
            "upload-local-image {} box=({}, {}, {}, {}) displayed={}x{}",
            crop.target, rect.x, rect.y, rect.w, rect.h, rect.displayed_w, rect.displayed_h
        );

        let reply = match self.backend.upload_local_image(&upload).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Crop upload error: {}", e);
                self.alert_error(&e, CROP_ERROR);
                return Ok(OperationOutcome::Failed);
            }
        };

        let image_url = match (crop.target, crop.purpose) {
            (CardId::Scene(index), CropPurpose::Overlay { opacity }) => {
                let overlay = resolve_filename(&reply.image_url);
                match self
                    .backend
                    .overlay_scene_image(&job_id, index, &overlay, opacity)
                    .await
                {
                    Ok(url) => url,
                    Err(e) => {
                        log::error!("overlay failed for scene {}: {}", index, e);
                        self.alert_error(&e, "Error overlaying image");
                        return Ok(OperationOutcome::Failed);
                    }
                }
            }
            _ => reply.image_url.clone(),
        };
        self.apply_confirmed_image(crop.target, &image_url)?;

        if let Some(filename) = reply.added_ref_filename.as_deref() {
            if self
                .session
                .references
                .insert(filename, reply.image_url.as_str(), true)
            {
                log::info!("added reference {}", filename);
            }
        }
        if self.options.replaced_image_policy == ReplacedImagePolicy::Always {
            if let Some(old) = reply.unused_old_image.as_deref() {
                if let Err(e) = self.register_reference(&job_id, old).await {
                    log::warn!("could not keep replaced image {}: {}", old, e);
                }
            }
        }
        self.view.references_changed(self.session.references.entries());
        Ok(OperationOutcome::Applied)
    }

    fn apply_confirmed_image(&mut self, card: CardId, image_url: &str) -> Result<()> {
        match card {
            CardId::Scene(index) => {
                let scene = self
                    .session
                    .scene_mut(index)
                    .ok_or(storyboard_common::Error::UnknownScene(index))?;
                scene.apply_image(image_url);
                let src = scene.image_src();
                if self.session.mark_scene_generated(index)? {
                    log::info!(
                        "scene {} ready ({}/{})",
                        index + 1,
                        self.session.generated_count(),
                        self.session.total_scenes()
                    );
                }
                self.view.set_image(card, &src);
            }
            CardId::ReferenceCard => {
                self.session.reference_card.apply_image(image_url);
                self.session.references.add_from_path(image_url);
                let src = self.session.reference_card.image_src().to_string();
                self.view.set_image(card, &src);
            }
        }
        Ok(())
    }
}
