//! セッション状態ストア
//!
//! ジョブID・シーン一覧・生成済みフラグ・リファレンスプール・クロップ枠・
//! 画像操作ロックを1つのオブジェクトにまとめる。永続化はしない
//! （リロードで消える。素材の正はサーバー側）。

use crate::buttons::{reference_card_buttons, scene_buttons, CardButtons};
use crate::crop::CropSession;
use crate::error::{Error, Result};
use crate::lock::GenerationLock;
use crate::reference::{HoverPreview, ReferencePool};
use crate::scene::{ReferenceCardState, SceneUIState};
use crate::types::{CardId, Job, JobDetails};
use crate::video::VideoPhase;

/// 物語の概要（アップロード結果）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryInfo {
    pub title: String,
    pub description: String,
    pub transcript: String,
    pub ingredients_text: String,
}

/// ウィザード全体の状態
#[derive(Debug, Default)]
pub struct SessionState {
    pub job: Option<Job>,
    pub story: StoryInfo,
    pub scenes: Vec<SceneUIState>,
    pub references: ReferencePool,
    pub hover: HoverPreview,
    pub reference_card: ReferenceCardState,
    pub crop: Option<CropSession>,
    pub video: VideoPhase,
    generated: Vec<bool>,
    generated_count: usize,
    lock: GenerationLock,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> &GenerationLock {
        &self.lock
    }

    pub fn is_busy(&self) -> bool {
        self.lock.is_busy()
    }

    /// 全フィールドを初期状態に戻す（ロックも解放）
    pub fn reset(&mut self) {
        let lock = self.lock.clone();
        // クロップセッションのガードもここで落ちる
        *self = Self {
            lock,
            ..Self::default()
        };
        self.lock.force_release();
    }

    /// アップロード結果からジョブとシーンを作る
    pub fn start_job(&mut self, job_id: impl Into<String>, details: JobDetails) -> Result<()> {
        let mut chunks = details.chunks;
        chunks.sort_by_key(|c| c.index);
        if let Some((pos, chunk)) = chunks.iter().enumerate().find(|(pos, c)| c.index != *pos) {
            return Err(Error::InvalidChunks(format!(
                "expected index {} but got {}",
                pos, chunk.index
            )));
        }

        let total = chunks.len();
        self.job = Some(Job {
            id: job_id.into(),
            total_scenes: total,
            prompts_finalized: false,
        });
        self.story = StoryInfo {
            title: details.title,
            description: details.description,
            transcript: details.transcript,
            ingredients_text: details.ingredients_text,
        };
        self.scenes = chunks.into_iter().map(SceneUIState::new).collect();
        self.generated = vec![false; total];
        self.generated_count = 0;
        self.reference_card = ReferenceCardState::default();
        self.video = VideoPhase::Hidden;
        self.references.show();
        Ok(())
    }

    pub fn job_id(&self) -> Result<&str> {
        self.job.as_ref().map(|j| j.id.as_str()).ok_or(Error::NoJob)
    }

    pub fn total_scenes(&self) -> usize {
        self.job.as_ref().map(|j| j.total_scenes).unwrap_or(0)
    }

    /// シーンを生成済みにする（既に済みなら何もしない）
    ///
    /// 新たに生成済みになった場合 true。
    pub fn mark_scene_generated(&mut self, index: usize) -> Result<bool> {
        let flag = self.generated.get_mut(index).ok_or(Error::UnknownScene(index))?;
        if *flag {
            return Ok(false);
        }
        *flag = true;
        self.generated_count += 1;
        if let Some(scene) = self.scenes.get_mut(index) {
            scene.has_image = true;
        }
        Ok(true)
    }

    pub fn generated_count(&self) -> usize {
        self.generated_count
    }

    pub fn is_all_scenes_generated(&self) -> bool {
        self.job.is_some() && self.generated_count >= self.total_scenes()
    }

    /// 未生成のシーン数
    pub fn pending_scenes(&self) -> usize {
        self.total_scenes().saturating_sub(self.generated_count)
    }

    pub fn scene(&self, index: usize) -> Option<&SceneUIState> {
        self.scenes.get(index)
    }

    pub fn scene_mut(&mut self, index: usize) -> Option<&mut SceneUIState> {
        self.scenes.get_mut(index)
    }

    /// 表示順のカード一覧（リファレンスカードが先頭）
    pub fn card_ids(&self) -> Vec<CardId> {
        if self.job.is_none() {
            return Vec::new();
        }
        std::iter::once(CardId::ReferenceCard)
            .chain(self.scenes.iter().map(|s| CardId::Scene(s.index)))
            .collect()
    }

    /// カードのボタン状態
    pub fn buttons(&self, card: CardId) -> Option<CardButtons> {
        let busy = self.is_busy();
        match card {
            CardId::ReferenceCard => Some(reference_card_buttons(&self.reference_card, busy)),
            CardId::Scene(index) => self.scene(index).map(|s| scene_buttons(s, busy)),
        }
    }

    /// 全シーンに画像があり、まだ動画を作っていなければ押せる
    pub fn video_trigger_enabled(&self) -> bool {
        self.is_all_scenes_generated()
            && !matches!(self.video, VideoPhase::Rendering | VideoPhase::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SceneChunk;

    fn details(n: usize) -> JobDetails {
        JobDetails {
            title: "El duende".to_string(),
            chunks: (0..n)
                .map(|i| SceneChunk {
                    index: i,
                    raw_text: format!("chunk {}", i),
                    start_sec: i as f64 * 10.0,
                    end_sec: (i + 1) as f64 * 10.0,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_job_creates_scenes() {
        let mut state = SessionState::new();
        state.start_job("job-1", details(3)).unwrap();
        assert_eq!(state.scenes.len(), 3);
        assert!(state.scenes.iter().all(|s| !s.has_image));
        assert_eq!(state.total_scenes(), 3);
        assert_eq!(state.job_id().unwrap(), "job-1");
        assert!(state.references.is_visible());
        assert_eq!(state.story.title, "El duende");
    }

    #[test]
    fn test_start_job_sorts_and_validates_indices() {
        let mut state = SessionState::new();
        let mut d = details(3);
        d.chunks.reverse();
        state.start_job("job", d).unwrap();
        assert_eq!(state.scenes[0].index, 0);

        let mut gap = details(3);
        gap.chunks[2].index = 5;
        assert!(matches!(state.start_job("job", gap), Err(Error::InvalidChunks(_))));
    }

    #[test]
    fn test_mark_scene_generated_is_idempotent() {
        let mut state = SessionState::new();
        state.start_job("job", details(3)).unwrap();

        assert!(state.mark_scene_generated(1).unwrap());
        assert!(!state.mark_scene_generated(1).unwrap());
        assert!(state.mark_scene_generated(0).unwrap());
        assert_eq!(state.generated_count(), 2);
        assert!(!state.is_all_scenes_generated());
        assert_eq!(state.pending_scenes(), 1);

        assert!(state.mark_scene_generated(2).unwrap());
        assert!(state.is_all_scenes_generated());
        assert!(state.video_trigger_enabled());
    }

    #[test]
    fn test_mark_unknown_scene() {
        let mut state = SessionState::new();
        state.start_job("job", details(1)).unwrap();
        assert!(matches!(state.mark_scene_generated(4), Err(Error::UnknownScene(4))));
    }

    #[test]
    fn test_generated_count_matches_distinct_indices() {
        let mut state = SessionState::new();
        state.start_job("job", details(5)).unwrap();
        let sequence = [3, 1, 3, 3, 0, 1, 4];
        for &i in &sequence {
            state.mark_scene_generated(i).unwrap();
        }
        let mut distinct: Vec<usize> = sequence.to_vec();
        distinct.sort();
        distinct.dedup();
        assert_eq!(state.generated_count(), distinct.len());
    }

    #[test]
    fn test_no_job_is_not_all_generated() {
        let state = SessionState::new();
        assert!(!state.is_all_scenes_generated());
        assert!(!state.video_trigger_enabled());
        assert!(matches!(state.job_id(), Err(Error::NoJob)));
        assert!(state.card_ids().is_empty());
    }

    #[test]
    fn test_reset_clears_everything_and_releases_lock() {
        let mut state = SessionState::new();
        state.start_job("job", details(2)).unwrap();
        state.references.insert("a.png", "/a.png", true);
        state.mark_scene_generated(0).unwrap();
        let lock = state.lock().clone();
        let guard = lock.try_acquire().unwrap();

        state.reset();
        assert!(state.job.is_none());
        assert!(state.scenes.is_empty());
        assert!(state.references.is_empty());
        assert_eq!(state.generated_count(), 0);
        assert!(!state.is_busy());
        // 同じロックを共有し続ける
        assert!(!lock.is_busy());
        drop(guard);
        assert!(state.lock().try_acquire().is_some());
    }

    #[test]
    fn test_card_ids_order() {
        let mut state = SessionState::new();
        state.start_job("job", details(2)).unwrap();
        assert_eq!(
            state.card_ids(),
            vec![CardId::ReferenceCard, CardId::Scene(0), CardId::Scene(1)]
        );
    }

    #[test]
    fn test_video_trigger_disabled_while_rendering() {
        let mut state = SessionState::new();
        state.start_job("job", details(1)).unwrap();
        state.mark_scene_generated(0).unwrap();
        state.video = VideoPhase::Rendering;
        assert!(!state.video_trigger_enabled());
        state.video = VideoPhase::Idle;
        assert!(state.video_trigger_enabled());
    }
}
