//! 音声アップロードと文字起こし結果の取り込み

use super::Wizard;
use crate::backend::Backend;
use crate::error::{Result, StoryboardError};
use crate::view::StoryboardView;
use std::future::Future;
use storyboard_common::FileData;
use tokio_util::sync::CancellationToken;

/// トークンが先に発火したら None
async fn cancelable<T>(token: &CancellationToken, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        value = fut => Some(value),
    }
}

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// 音声をアップロードしてジョブを開始し、ジョブIDを返す
    ///
    /// 中断された場合は初期状態に戻して `StoryboardError::Canceled`（アラートなし）。
    pub async fn upload(&mut self, audio: Option<FileData>) -> Result<String> {
        let Some(audio) = audio else {
            self.view.alert("Please select an audio file first.");
            return Err(StoryboardError::Validation("音声ファイルが選択されていません".into()));
        };

        self.reset().await;
        let token = self.upload_cancel.begin();
        self.view.set_status("Uploading audio...");
        log::info!("uploading {} ({} bytes)", audio.name, audio.bytes.len());

        let upload = self.backend.upload_audio(&audio, &self.options.settings);
        let reply = cancelable(&token, upload).await;
        let reply = match reply {
            Some(reply) if !self.upload_cancel.is_requested() => reply,
            Some(Ok(late)) if !late.job_id.is_empty() => {
                return Err(self.abandon_job(&late.job_id).await)
            }
            _ => return Err(self.abandon_upload()),
        };
        let reply = match reply {
            Ok(reply) if !reply.job_id.is_empty() => reply,
            Ok(_) => {
                let e = StoryboardError::Backend("job_id がありません".into());
                return Err(self.fail_upload(e, "Error uploading audio"));
            }
            Err(e) => return Err(self.fail_upload(e, "Error uploading audio")),
        };

        let job_id = reply.job_id.clone();
        let transcript = reply.transcript.clone();
        let mut details = if reply.has_details() {
            reply.into_details()
        } else {
            self.view.set_status("Extracting story details...");
            let extracted = cancelable(&token, self.backend.extract_details(&job_id)).await;
            match extracted {
                Some(result) if !self.upload_cancel.is_requested() => match result {
                    Ok(details) => details,
                    Err(e) => return Err(self.fail_upload(e, "Could not extract details")),
                },
                _ => return Err(self.abandon_job(&job_id).await),
            }
        };
        if details.transcript.is_empty() {
            details.transcript = transcript;
        }

        if let Err(e) = self.session.start_job(job_id.clone(), details) {
            return Err(self.fail_upload(e.into(), "Could not extract details"));
        }
        self.upload_cancel.finish();
        log::info!("job {} started with {} scenes", job_id, self.session.total_scenes());

        self.view.set_status(&self.session.story.title);
        self.render_all();
        self.preload_default_references().await;
        Ok(job_id)
    }

    /// ユーザー中断: 初期状態に戻す（アラートは出さない）
    fn abandon_upload(&mut self) -> StoryboardError {
        log::info!("upload aborted by user");
        self.clear_session();
        StoryboardError::Canceled
    }

    /// サーバー側にジョブができた後の中断: 破棄を依頼してから初期状態に戻す
    async fn abandon_job(&mut self, job_id: &str) -> StoryboardError {
        if let Err(e) = self.backend.cancel_job(job_id).await {
            log::warn!("cancel-job failed for {}: {}", job_id, e);
        }
        self.abandon_upload()
    }

    fn fail_upload(&mut self, error: StoryboardError, fallback: &str) -> StoryboardError {
        log::error!("upload failed: {}", error);
        self.alert_error(&error, fallback);
        self.clear_session();
        error
    }
}
