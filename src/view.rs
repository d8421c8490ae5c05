//! 画面への出力
//!
//! カードIDをキーにした操作だけを公開し、描画技術（ブラウザ・CLI・テスト）から
//! ウィザード本体を切り離す。

use std::time::Duration;
use storyboard_common::{CardButtons, CardId, CropRect, FileData, ReferenceEntry};

pub trait StoryboardView: Send {
    /// ユーザーに必ず見せるエラー（ブロッキング通知）
    fn alert(&mut self, message: &str);

    /// 進捗メッセージ
    fn set_status(&mut self, _message: &str) {}

    fn set_image(&mut self, _card: CardId, _src: &str) {}

    fn set_prompt(&mut self, _card: CardId, _text: &str, _editable: bool) {}

    fn set_buttons(&mut self, _card: CardId, _buttons: &CardButtons) {}

    fn references_changed(&mut self, _entries: &[ReferenceEntry]) {}

    /// ホバープレビューの表示/非表示
    fn show_preview(&mut self, _entry: Option<&ReferenceEntry>) {}

    /// クロップモーダルを開く
    fn crop_opened(&mut self, _card: CardId, _file: &FileData) {}

    /// クロップ枠の更新（None でモーダルを閉じる）
    fn crop_changed(&mut self, _rect: Option<&CropRect>) {}

    fn fade_out_card(&mut self, _card: CardId, _delay: Duration) {}

    fn clear_cards(&mut self) {}

    fn set_video_trigger(&mut self, _visible: bool, _enabled: bool) {}

    fn show_video(&mut self, _video_url: &str) {}
}

/// 標準出力に出すだけのビュー
#[derive(Debug, Default)]
pub struct ConsoleView {
    pub quiet: bool,
}

impl ConsoleView {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl StoryboardView for ConsoleView {
    fn alert(&mut self, message: &str) {
        eprintln!("⚠ {}", message);
    }

    fn set_status(&mut self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }

    fn set_image(&mut self, card: CardId, src: &str) {
        log::debug!("{} => {}", card, src);
    }

    fn references_changed(&mut self, entries: &[ReferenceEntry]) {
        let selected = entries.iter().filter(|e| e.selected).count();
        log::debug!("リファレンス: {}件（選択 {}件）", entries.len(), selected);
    }

    fn crop_changed(&mut self, rect: Option<&CropRect>) {
        if let Some(r) = rect {
            log::debug!(
                "クロップ枠: x={} y={} w={} h={} (表示 {}x{})",
                r.x, r.y, r.w, r.h, r.displayed_w, r.displayed_h
            );
        }
    }

    fn show_video(&mut self, video_url: &str) {
        println!("🎬 動画: {}", video_url);
    }
}
