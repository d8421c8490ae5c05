//! ローカルファイルの読み込み

use crate::error::{Result, StoryboardError};
use std::io::Cursor;
use std::path::Path;
use storyboard_common::FileData;

/// ファイルを読み込んでアップロード用データにする
pub fn read_file_data(path: &Path) -> Result<FileData> {
    if !path.is_file() {
        return Err(StoryboardError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string());
    Ok(FileData::new(name, bytes))
}

/// 画像ヘッダから実寸（幅, 高さ）を取得
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
