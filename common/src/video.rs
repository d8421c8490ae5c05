//! 動画生成トリガー

use crate::types::CardId;
use std::time::Duration;

/// カードごとのフェードアウト間隔
pub const FADE_STAGGER: Duration = Duration::from_millis(300);

/// 動画セクションの状態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VideoPhase {
    /// プロンプト確定前
    #[default]
    Hidden,
    /// トリガー表示中
    Idle,
    /// サーバーで生成中
    Rendering,
    /// 生成完了
    Finished { video_url: String },
}

/// フェードアウト1件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeStep {
    pub card: CardId,
    pub delay: Duration,
}

/// カードを消す段取り
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadePlan {
    pub steps: Vec<FadeStep>,
    /// 最後のフェード後、一覧をクリアするまでの時間
    pub clear_after: Duration,
}

/// 画面下のカードから順にずらしてフェードアウトする
pub fn fade_out_schedule(cards: &[CardId], stagger: Duration) -> FadePlan {
    let steps: Vec<FadeStep> = cards
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &card)| FadeStep {
            card,
            delay: stagger * i as u32,
        })
        .collect();
    let clear_after = stagger * (steps.len() as u32 + 1);
    FadePlan { steps, clear_after }
}
