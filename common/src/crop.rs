//! クロップエディタ
//!
//! 表示中の画像の上に、出力動画と同じアスペクト比の枠を置く。
//! 枠のサイズは固定で、ドラッグで動かせるのは位置だけ。
//! 座標はすべて表示ピクセル単位（実解像度への変換はサーバー側）。

use crate::lock::LockGuard;
use crate::types::{CardId, FileData};
use serde::Serialize;

/// 表示サイズがこれ未満なら実サイズにフォールバック
const MIN_DISPLAYED_SIZE: u32 = 2;

/// 比率計算の誤差で1px欠けないよう切り捨て前に足す
const FLOOR_EPSILON: f64 = 1e-9;

fn floor_px(value: f64) -> u32 {
    (value + FLOOR_EPSILON).floor() as u32
}

/// クロップ枠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CropRect {
    #[serde(rename = "box_x")]
    pub x: u32,
    #[serde(rename = "box_y")]
    pub y: u32,
    #[serde(rename = "box_w")]
    pub w: u32,
    #[serde(rename = "box_h")]
    pub h: u32,
    pub displayed_w: u32,
    pub displayed_h: u32,
}

impl CropRect {
    /// 表示サイズ (w, h) に収まる最大の比率 ratio の枠を中央に置く
    pub fn fit(displayed_w: u32, displayed_h: u32, ratio: f64) -> Self {
        if displayed_w == 0 || displayed_h == 0 {
            return Self {
                displayed_w,
                displayed_h,
                ..Default::default()
            };
        }

        let ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            displayed_w as f64 / displayed_h as f64
        };
        let (w, h) = (displayed_w as f64, displayed_h as f64);

        let (mut box_w, mut box_h);
        if ratio > w / h {
            // 幅いっぱい
            box_w = displayed_w;
            box_h = floor_px(w / ratio);
            if box_h > displayed_h {
                box_h = displayed_h;
                box_w = floor_px(h * ratio);
            }
        } else {
            // 高さいっぱい
            box_h = displayed_h;
            box_w = floor_px(h * ratio);
            if box_w > displayed_w {
                box_w = displayed_w;
                box_h = floor_px(w / ratio);
            }
        }
        let box_w = box_w.min(displayed_w);
        let box_h = box_h.min(displayed_h);

        Self {
            x: (displayed_w - box_w) / 2,
            y: (displayed_h - box_h) / 2,
            w: box_w,
            h: box_h,
            displayed_w,
            displayed_h,
        }
    }

    /// 左上を (left, top) に移動（画像の外には出さない）
    pub fn move_to(&mut self, left: i64, top: i64) {
        let max_x = self.displayed_w.saturating_sub(self.w) as i64;
        let max_y = self.displayed_h.saturating_sub(self.h) as i64;
        self.x = left.clamp(0, max_x) as u32;
        self.y = top.clamp(0, max_y) as u32;
    }
}

/// エディタの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPhase {
    /// プレビュー画像の読み込み待ち
    Opening,
    /// 枠を表示中
    Previewing,
    /// ドラッグ中（枠内の掴んだ位置を保持）
    Dragging { offset_x: i64, offset_y: i64 },
}

/// 1回のクロップ操作の枠ジオメトリ
#[derive(Debug, Clone, PartialEq)]
pub struct CropEditor {
    phase: CropPhase,
    ratio: f64,
    rect: Option<CropRect>,
}

impl CropEditor {
    /// セッション開始時に比率を固定する
    pub fn open(ratio: f64) -> Self {
        Self {
            phase: CropPhase::Opening,
            ratio,
            rect: None,
        }
    }

    pub fn phase(&self) -> CropPhase {
        self.phase
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn rect(&self) -> Option<CropRect> {
        self.rect
    }

    /// プレビュー読み込み完了: 枠を自動計算
    ///
    /// 表示サイズが潰れている場合（2px未満）は実サイズを使う。
    pub fn preview_loaded(
        &mut self,
        client_w: u32,
        client_h: u32,
        natural_w: u32,
        natural_h: u32,
    ) -> CropRect {
        let (w, h) = if client_w < MIN_DISPLAYED_SIZE || client_h < MIN_DISPLAYED_SIZE {
            log::debug!(
                "displayed size {}x{} too small, using natural {}x{}",
                client_w,
                client_h,
                natural_w,
                natural_h
            );
            (natural_w, natural_h)
        } else {
            (client_w, client_h)
        };

        let rect = CropRect::fit(w, h, self.ratio);
        log::debug!("crop box fitted: {:?} (ratio {:.4})", rect, self.ratio);
        self.rect = Some(rect);
        self.phase = CropPhase::Previewing;
        rect
    }

    /// 枠を掴む（プレビュー中のみ）
    pub fn begin_drag(&mut self, offset_x: i64, offset_y: i64) -> bool {
        if self.phase != CropPhase::Previewing {
            return false;
        }
        self.phase = CropPhase::Dragging { offset_x, offset_y };
        true
    }

    /// ポインタ位置に追従して枠を移動
    pub fn drag_to(&mut self, pointer_x: i64, pointer_y: i64) -> Option<CropRect> {
        let CropPhase::Dragging { offset_x, offset_y } = self.phase else {
            return None;
        };
        let rect = self.rect.as_mut()?;
        rect.move_to(pointer_x - offset_x, pointer_y - offset_y);
        Some(*rect)
    }

    /// 枠を離す
    pub fn end_drag(&mut self) {
        if matches!(self.phase, CropPhase::Dragging { .. }) {
            self.phase = CropPhase::Previewing;
        }
    }
}

/// クロップ確定後に何をするか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPurpose {
    /// カードの画像を差し替える
    Replace,
    /// 既存シーン画像に重ねて合成する
    Overlay { opacity: u8 },
}

/// 開いているクロップセッション
///
/// 画像操作ロックを保持したままユーザーの確定・キャンセルを待つ。
/// セッションを捨てるとロックも解放される。
#[derive(Debug)]
pub struct CropSession {
    pub target: CardId,
    pub purpose: CropPurpose,
    pub file: FileData,
    pub editor: CropEditor,
    /// 「リファレンスに追加」チェック
    pub add_as_reference: bool,
    _guard: LockGuard,
}

impl CropSession {
    pub fn new(
        target: CardId,
        purpose: CropPurpose,
        file: FileData,
        ratio: f64,
        guard: LockGuard,
    ) -> Self {
        Self {
            target,
            purpose,
            file,
            editor: CropEditor::open(ratio),
            add_as_reference: false,
            _guard: guard,
        }
    }

    /// upload-local-image の mode
    pub fn upload_mode(&self) -> &'static str {
        match (self.target, self.purpose) {
            (CardId::ReferenceCard, _) => "reference_card",
            (CardId::Scene(_), CropPurpose::Overlay { .. }) => "overlay",
            (CardId::Scene(_), CropPurpose::Replace) => "scene",
        }
    }
}
