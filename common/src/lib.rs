//! Storyboard Common Library
//!
//! 絵コンテウィザードの状態機械。DOMやHTTPに依存しない部分をまとめる。

pub mod buttons;
pub mod crop;
pub mod defaults;
pub mod error;
pub mod format;
pub mod lock;
pub mod reference;
pub mod scene;
pub mod session;
pub mod types;
pub mod video;

pub use buttons::{ButtonState, CardButtons};
pub use crop::{CropEditor, CropPhase, CropPurpose, CropRect, CropSession};
pub use error::{Error, Result};
pub use lock::{GenerationLock, LockGuard};
pub use reference::{resolve_filename, HoverPreview, ReferenceEntry, ReferencePool};
pub use scene::{OpPhase, ReferenceCardState, SceneUIState};
pub use session::{SessionState, StoryInfo};
pub use types::{
    CardId, FileData, GenerationSettings, ImageMode, Job, JobDetails, ReplacedImagePolicy,
    SceneChunk, VideoSize,
};
pub use video::{fade_out_schedule, FadePlan, FadeStep, VideoPhase};
