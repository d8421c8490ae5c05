//! ボタンの表示・有効状態
//!
//! 描画結果を問い合わせず、状態から純粋に導出する。
//! - Select は常に有効
//! - Generate はプロンプトがあるときだけ有効
//! - Edit / Overlay は実画像があるときだけ表示・有効
//! - ロック中はすべて無効

use crate::scene::{OpPhase, ReferenceCardState, SceneUIState};

/// 1つのボタン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub visible: bool,
    pub enabled: bool,
    pub label: String,
}

impl ButtonState {
    fn new(visible: bool, enabled: bool, label: impl Into<String>) -> Self {
        Self {
            visible,
            enabled: visible && enabled,
            label: label.into(),
        }
    }
}

/// カード1枚分のボタン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardButtons {
    pub generate: ButtonState,
    pub select_local: ButtonState,
    pub overlay: ButtonState,
    pub edit: ButtonState,
}

/// Generate ボタンのラベル
pub fn generate_label(phase: OpPhase) -> String {
    match phase {
        OpPhase::Idle => "Generate".to_string(),
        OpPhase::Running { attempt } if attempt <= 1 => "Generating...".to_string(),
        OpPhase::Running { attempt } => format!("Generating... (attempt {})", attempt),
        OpPhase::Succeeded => "Regenerate".to_string(),
    }
}

/// Edit ボタンのラベル
pub fn edit_label(phase: OpPhase) -> String {
    match phase {
        OpPhase::Idle | OpPhase::Succeeded => "Edit".to_string(),
        OpPhase::Running { attempt } if attempt <= 1 => "Editing...".to_string(),
        OpPhase::Running { attempt } => format!("Editing... (attempt {})", attempt),
    }
}

/// シーンカードのボタン状態
pub fn scene_buttons(scene: &SceneUIState, busy: bool) -> CardButtons {
    let has_real_image = scene.is_editable_image();
    CardButtons {
        generate: ButtonState::new(
            true,
            !busy && scene.prompt_ready,
            generate_label(scene.generate_phase),
        ),
        select_local: ButtonState::new(true, !busy, "Select Image"),
        overlay: ButtonState::new(has_real_image, !busy, "Overlay"),
        edit: ButtonState::new(has_real_image, !busy, edit_label(scene.edit_phase)),
    }
}

/// リファレンスカードのボタン状態（Overlay はない）
pub fn reference_card_buttons(card: &ReferenceCardState, busy: bool) -> CardButtons {
    CardButtons {
        generate: ButtonState::new(
            true,
            !busy && card.prompt_ready(),
            generate_label(card.generate_phase),
        ),
        select_local: ButtonState::new(true, !busy, "Select Image"),
        overlay: ButtonState::new(false, false, "Overlay"),
        edit: ButtonState::new(card.has_image(), !busy, edit_label(card.edit_phase)),
    }
}
