//! ストーリーボードウィザード
//!
//! セッション状態・バックエンド・ビューを束ね、ボタン操作ごとの手順を実行する。
//! 画像操作は `GenerationLock` で直列化され、どの経路で終わってもロックは解放される
//! （ロックは `LockGuard` の所有者が持ち、ドロップで解放）。

mod crop;
mod images;
mod prompts;
mod references;
mod upload;
mod video;

use crate::backend::Backend;
use crate::view::StoryboardView;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use storyboard_common::video::FADE_STAGGER;
use storyboard_common::{
    defaults, CardId, GenerationSettings, OpPhase, ReplacedImagePolicy, SessionState, VideoPhase,
};
use tokio_util::sync::CancellationToken;

/// 画像生成・編集の最大試行回数
pub const MAX_GENERATION_ATTEMPTS: u32 = 5;

/// ウィザードの動作設定
#[derive(Debug, Clone)]
pub struct WizardOptions {
    pub settings: GenerationSettings,
    pub replaced_image_policy: ReplacedImagePolicy,
    /// オーバーレイの既定不透明度（0〜100）
    pub overlay_opacity: u8,
    pub max_attempts: u32,
    /// 動画生成時のカードごとのフェード間隔
    pub fade_stagger: Duration,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            settings: GenerationSettings::default(),
            replaced_image_policy: ReplacedImagePolicy::default(),
            overlay_opacity: defaults::OVERLAY_OPACITY,
            max_attempts: MAX_GENERATION_ATTEMPTS,
            fade_stagger: FADE_STAGGER,
        }
    }
}

/// ボタン操作の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// 別の画像操作が実行中だったので何もしなかった
    Busy,
    /// 前提条件を満たさないので何もしなかった
    Refused,
    /// 画像を取得し、クロップ確定待ち
    AwaitingCrop,
    /// 結果をカードに反映した
    Applied,
    /// 失敗した（ロックは解放済み）
    Failed,
}

#[derive(Debug, Default)]
struct CancelState {
    requested: bool,
    token: Option<CancellationToken>,
}

/// アップロード中断用ハンドル（別タスクやCtrl-Cハンドラから使う）
#[derive(Debug, Clone, Default)]
pub struct UploadCancelHandle {
    inner: Arc<Mutex<CancelState>>,
}

impl UploadCancelHandle {
    /// 中断を要求（通信を打ち切り、遅れて届いた応答も捨てる）
    pub fn cancel(&self) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.requested = true;
        if let Some(token) = &state.token {
            token.cancel();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).requested
    }

    /// アップロード開始: フラグを下ろして新しいトークンを発行
    fn begin(&self) -> CancellationToken {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let token = CancellationToken::new();
        state.requested = false;
        state.token = Some(token.clone());
        token
    }

    fn finish(&self) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.requested = false;
        state.token = None;
    }
}

/// 生成系ボタンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Generate,
    Edit,
}

pub struct Wizard<B: Backend, V: StoryboardView> {
    backend: B,
    view: V,
    session: SessionState,
    options: WizardOptions,
    upload_cancel: UploadCancelHandle,
}

impl<B: Backend, V: StoryboardView> Wizard<B, V> {
    pub fn new(backend: B, view: V, options: WizardOptions) -> Self {
        Self {
            backend,
            view,
            session: SessionState::new(),
            options,
            upload_cancel: UploadCancelHandle::default(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn options(&self) -> &WizardOptions {
        &self.options
    }

    pub fn cancel_handle(&self) -> UploadCancelHandle {
        self.upload_cancel.clone()
    }

    /// 初期状態に戻す（ジョブがあればサーバーにも破棄を依頼）
    pub async fn reset(&mut self) {
        if let Some(job) = self.session.job.take() {
            if let Err(e) = self.backend.cancel_job(&job.id).await {
                log::warn!("cancel-job failed for {}: {}", job.id, e);
            }
        }
        self.clear_session();
    }

    fn clear_session(&mut self) {
        self.session.reset();
        self.upload_cancel.finish();
        self.view.crop_changed(None);
        self.view.show_preview(None);
        self.view.clear_cards();
        self.view.references_changed(&[]);
        self.view.set_video_trigger(false, false);
        self.view.set_status("");
    }

    /// 全カードのボタンと動画トリガーを状態から描き直す
    pub fn refresh_buttons(&mut self) {
        for card in self.session.card_ids() {
            self.push_buttons(card);
        }
        let visible = self.session.video == VideoPhase::Idle;
        let enabled = self.session.video_trigger_enabled();
        self.view.set_video_trigger(visible, enabled);
    }

    fn push_buttons(&mut self, card: CardId) {
        if let Some(buttons) = self.session.buttons(card) {
            self.view.set_buttons(card, &buttons);
        }
    }

    /// カード一覧をまるごと描画
    pub fn render_all(&mut self) {
        let card = &self.session.reference_card;
        self.view
            .set_prompt(CardId::ReferenceCard, &card.prompt_text, true);
        self.view.set_image(CardId::ReferenceCard, card.image_src());
        for scene in &self.session.scenes {
            let id = CardId::Scene(scene.index);
            self.view.set_prompt(id, &scene.prompt_text, scene.prompt_ready);
            self.view.set_image(id, &scene.image_src());
        }
        self.view.references_changed(self.session.references.entries());
        self.refresh_buttons();
    }

    /// ユーザーによるシーンプロンプトの編集
    ///
    /// プロンプト作成フェーズで埋まる前のシーンは編集できない（false）。
    pub fn set_scene_prompt(&mut self, index: usize, text: &str) -> bool {
        let Some(scene) = self.session.scene_mut(index) else {
            return false;
        };
        if !scene.edit_prompt(text) {
            return false;
        }
        self.push_buttons(CardId::Scene(index));
        true
    }

    /// リファレンスカードのプロンプト編集
    pub fn set_reference_prompt(&mut self, text: &str) {
        self.session.reference_card.prompt_text = text.to_string();
        self.push_buttons(CardId::ReferenceCard);
    }

    fn set_phase(&mut self, card: CardId, control: Control, phase: OpPhase) {
        match card {
            CardId::ReferenceCard => {
                let state = &mut self.session.reference_card;
                match control {
                    Control::Generate => state.generate_phase = phase,
                    Control::Edit => state.edit_phase = phase,
                }
            }
            CardId::Scene(index) => {
                if let Some(scene) = self.session.scene_mut(index) {
                    match control {
                        Control::Generate => scene.generate_phase = phase,
                        Control::Edit => scene.edit_phase = phase,
                    }
                }
            }
        }
        self.push_buttons(card);
    }

    /// アラートを出す（バックエンドのメッセージがあればそれを優先）
    fn alert_error(&mut self, error: &crate::error::StoryboardError, fallback: &str) {
        let message = error.backend_message().unwrap_or(fallback).to_string();
        self.view.alert(&message);
    }
}
