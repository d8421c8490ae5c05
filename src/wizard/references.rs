//! リファレンスプールの操作

use super::{OperationOutcome, Wizard};
use crate::backend::Backend;
use crate::error::Result;
use crate::view::StoryboardView;
use std::time::Instant;
use storyboard_common::{resolve_filename, FileData, ReferenceEntry};

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// リファレンス画像をまとめてアップロード（選択状態で追加）
    pub async fn upload_references(&mut self, files: Vec<FileData>) -> Result<OperationOutcome> {
        if files.is_empty() {
            return Ok(OperationOutcome::Refused);
        }
        let job_id = match self.session.job_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                self.view.alert("Please upload audio first.");
                return Err(e.into());
            }
        };
        let Some(guard) = self.session.lock().try_acquire() else {
            return Ok(OperationOutcome::Busy);
        };
        self.refresh_buttons();

        let mut outcome = OperationOutcome::Applied;
        for file in &files {
            match self.backend.upload_reference_image(&job_id, file).await {
                Ok(path) => {
                    let filename = resolve_filename(&path);
                    self.session.references.insert(filename, path, true);
                    self.view.references_changed(self.session.references.entries());
                }
                Err(e) => {
                    log::error!("upload-reference-image failed for {}: {}", file.name, e);
                    self.alert_error(&e, "Error uploading reference image");
                    outcome = OperationOutcome::Failed;
                    break;
                }
            }
        }

        drop(guard);
        self.refresh_buttons();
        Ok(outcome)
    }

    /// 生成済み・差し替え済みの画像をリファレンスとして登録
    ///
    /// 同じファイル名が既にあれば何もせず false。
    pub async fn add_reference_from_path(&mut self, path: &str) -> Result<bool> {
        let job_id = self.session.job_id()?.to_string();
        match self.register_reference(&job_id, path).await {
            Ok(added) => Ok(added),
            Err(e) => {
                self.alert_error(&e, "Error adding reference");
                Err(e)
            }
        }
    }

    pub(super) async fn register_reference(&mut self, job_id: &str, path: &str) -> Result<bool> {
        let filename = resolve_filename(path);
        if filename.is_empty() || self.session.references.contains(&filename) {
            return Ok(false);
        }
        self.backend.add_reference(job_id, path).await?;
        let added = self.session.references.add_from_path(path);
        self.view.references_changed(self.session.references.entries());
        Ok(added)
    }

    /// 選択を反転し、新しい状態を返す
    pub fn toggle_reference(&mut self, index: usize) -> Option<bool> {
        let selected = self.session.references.toggle(index)?;
        self.view.references_changed(self.session.references.entries());
        Some(selected)
    }

    /// プールから外す（サーバー側のファイルは消さない）
    pub fn remove_reference(&mut self, index: usize) -> Option<ReferenceEntry> {
        let removed = self.session.references.remove(index)?;
        self.session.hover.clear();
        self.view.show_preview(None);
        self.view.references_changed(self.session.references.entries());
        Some(removed)
    }

    pub fn hover_reference(&mut self, index: usize, now: Instant) {
        if index < self.session.references.len() {
            self.session.hover.enter(index, now);
            self.view.show_preview(None);
        }
    }

    pub fn leave_reference(&mut self) {
        self.session.hover.leave();
        self.view.show_preview(None);
    }

    /// 待ち時間を過ぎていればプレビューを出す
    pub fn tick_hover(&mut self, now: Instant) -> Option<usize> {
        let was_shown = self.session.hover.shown();
        let shown = self.session.hover.tick(now)?;
        if was_shown != Some(shown) {
            self.view.show_preview(self.session.references.get(shown));
        }
        Some(shown)
    }

    /// サーバー既定のリファレンスを読み込む（失敗しても続行）
    pub(super) async fn preload_default_references(&mut self) {
        match self.backend.list_default_references().await {
            Ok(urls) => {
                for url in urls {
                    // 既定分はファイル名にURLをそのまま使う
                    self.session.references.insert(url.clone(), url, true);
                }
                self.view.references_changed(self.session.references.entries());
            }
            Err(e) => log::warn!("Could not preload default references: {}", e),
        }
    }
}
