//! リファレンス画像プール
//!
//! シーン画像生成の条件付けに使うキャラクター・スタイル画像。
//! ファイル名はプール内で一意。選択中のものだけが生成時に送られる。

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// ホバーしてからプレビューを出すまでの待ち時間
pub const HOVER_PREVIEW_DELAY: Duration = Duration::from_millis(300);

/// リファレンス1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub filename: String,
    pub url: String,
    pub selected: bool,
}

/// パスやURLからファイル名部分を取り出す（クエリ・フラグメントは除去）
pub fn resolve_filename(path: &str) -> String {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    without_query
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(without_query)
        .to_string()
}

/// リファレンスプール
#[derive(Debug, Clone, Default)]
pub struct ReferencePool {
    entries: Vec<ReferenceEntry>,
    visible: bool,
}

impl ReferencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加（同じファイル名があれば何もしない）
    pub fn insert(
        &mut self,
        filename: impl Into<String>,
        url: impl Into<String>,
        selected: bool,
    ) -> bool {
        let filename = filename.into();
        if self.contains(&filename) {
            log::debug!("reference {} already in pool", filename);
            return false;
        }
        self.entries.push(ReferenceEntry {
            filename,
            url: url.into(),
            selected,
        });
        true
    }

    /// 生成済み・差し替え済みの画像パスをリファレンスとして登録
    pub fn add_from_path(&mut self, path: &str) -> bool {
        let filename = resolve_filename(path);
        if filename.is_empty() {
            return false;
        }
        self.insert(filename, path, true)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.iter().any(|e| e.filename == filename)
    }

    /// 選択状態を反転し、新しい状態を返す
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let entry = self.entries.get_mut(index)?;
        entry.selected = !entry.selected;
        Some(entry.selected)
    }

    /// プールから外す（サーバー側のファイルは消さない）
    pub fn remove(&mut self, index: usize) -> Option<ReferenceEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// 生成リクエストに載せるファイル名（呼び出し時点の選択で絞る）
    pub fn selected_filenames(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.filename.clone())
            .collect()
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// リファレンスバーを表示
    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// サムネイルのホバープレビュー（表示は遅延、非表示は即時）
#[derive(Debug, Clone)]
pub struct HoverPreview {
    delay: Duration,
    pending: Option<(usize, Instant)>,
    shown: Option<usize>,
}

impl Default for HoverPreview {
    fn default() -> Self {
        Self::new(HOVER_PREVIEW_DELAY)
    }
}

impl HoverPreview {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            shown: None,
        }
    }

    /// サムネイルにポインタが乗った
    pub fn enter(&mut self, index: usize, now: Instant) {
        self.shown = None;
        self.pending = Some((index, now + self.delay));
    }

    /// ポインタが離れた: 予約も表示も消す
    pub fn leave(&mut self) {
        self.pending = None;
        self.shown = None;
    }

    /// 時間経過を反映し、表示中のインデックスを返す
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        if let Some((index, due)) = self.pending {
            if now >= due {
                self.pending = None;
                self.shown = Some(index);
            }
        }
        self.shown
    }

    pub fn shown(&self) -> Option<usize> {
        self.shown
    }

    /// 削除などでインデックスが無効になったとき
    pub fn clear(&mut self) {
        self.leave();
    }
}
