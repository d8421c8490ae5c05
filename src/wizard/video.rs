//! 動画生成トリガー

use super::Wizard;
use crate::backend::Backend;
use crate::error::{Result, StoryboardError};
use crate::view::StoryboardView;
use storyboard_common::{fade_out_schedule, VideoPhase};

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// 全シーンの画像がそろったら動画を作る（再試行はしない）
    pub async fn create_video(&mut self) -> Result<String> {
        if !self.session.video_trigger_enabled() {
            return Err(StoryboardError::Validation(format!(
                "画像が未生成のシーンがあります（残り{}件）",
                self.session.pending_scenes()
            )));
        }
        let job_id = self.session.job_id()?.to_string();

        self.view.set_video_trigger(false, false);
        let plan = fade_out_schedule(&self.session.card_ids(), self.options.fade_stagger);
        for step in &plan.steps {
            self.view.fade_out_card(step.card, step.delay);
        }
        tokio::time::sleep(plan.clear_after).await;
        self.view.clear_cards();

        self.session.video = VideoPhase::Rendering;
        self.view.set_status("Generating video...");

        match self.backend.create_video(&job_id).await {
            Ok(video_url) => {
                log::info!("video ready: {}", video_url);
                self.view.set_status(&format!("Saved at: {}", video_url));
                self.view.show_video(&video_url);
                self.session.video = VideoPhase::Finished {
                    video_url: video_url.clone(),
                };
                Ok(video_url)
            }
            Err(e) => {
                log::error!("Error creating video: {}", e);
                self.session.video = VideoPhase::Idle;
                self.view.set_status("");
                self.view.set_video_trigger(true, true);
                Err(e)
            }
        }
    }
}
