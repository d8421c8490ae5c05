//! シーンごとの画像プロンプト作成

use super::Wizard;
use crate::backend::Backend;
use crate::error::Result;
use crate::view::StoryboardView;
use storyboard_common::{CardId, VideoPhase};

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    /// 全シーンのプロンプトを順に作り、最後にシーン間の整合を取る
    ///
    /// `ingredients` を省略するとアップロード時の材料テキストを使う。
    pub async fn generate_prompts(&mut self, ingredients: Option<String>) -> Result<()> {
        let job_id = match self.session.job_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                self.view.alert("No job to process. Please upload audio first.");
                return Err(e.into());
            }
        };
        if let Some(text) = ingredients {
            self.session.story.ingredients_text = text;
        }
        let ingredients = self.session.story.ingredients_text.clone();
        let total = self.session.total_scenes();

        self.view.set_status("Generating image prompts...");
        for index in 0..total {
            let prompt = match self.backend.preprocess_chunk(&job_id, index, &ingredients).await {
                Ok(prompt) => prompt,
                Err(e) => {
                    log::error!("preprocess-chunk failed for scene {}: {}", index, e);
                    self.alert_error(&e, "Error generating prompts");
                    self.view.set_status("");
                    return Err(e);
                }
            };
            self.apply_prompt(index, &prompt);
            self.view
                .set_status(&format!("Generated prompt for scene {} of {}", index + 1, total));
        }

        self.view.set_status("Finalizing prompts consistency...");
        match self.backend.adjust_prompts(&job_id).await {
            Ok(adjusted) if adjusted.is_empty() => log::warn!("No adjusted_prompts in response"),
            Ok(adjusted) => {
                for item in adjusted {
                    if !self.apply_prompt(item.scene_index, &item.prompt) {
                        log::warn!("adjusted prompt for unknown scene {}", item.scene_index);
                    }
                }
            }
            // 失敗しても個別プロンプトはそのまま使える
            Err(e) => log::warn!("Prompt adjustment error: {}", e),
        }

        if let Some(job) = self.session.job.as_mut() {
            job.prompts_finalized = true;
        }
        if self.session.video == VideoPhase::Hidden {
            self.session.video = VideoPhase::Idle;
        }
        self.view.set_status("");
        self.refresh_buttons();
        Ok(())
    }

    fn apply_prompt(&mut self, index: usize, prompt: &str) -> bool {
        let Some(scene) = self.session.scene_mut(index) else {
            return false;
        };
        scene.set_prompt(prompt);
        let ready = scene.prompt_ready;
        self.view.set_prompt(CardId::Scene(index), prompt, ready);
        self.push_buttons(CardId::Scene(index));
        true
    }
}
