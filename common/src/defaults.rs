//! 生成設定のデフォルト値
//!
//! サーバー側テンプレートが埋め込んでいた初期値をクライアント側で保持する。

pub const WORDS_PER_SCENE: u32 = 75;
pub const TEXT_MODEL: &str = "o4-mini";
pub const IMAGES_AI_REQUESTED_SIZE: &str = "1536x1024";
pub const VIDEO_SIZE: &str = "1920x1080";
pub const FADE_IN: f64 = 1.5;
pub const FADE_OUT: f64 = 2.0;
pub const CROSSFADE_DUR: f64 = 4.0;
pub const TRANSITION_DISPLACEMENT: f64 = 0.0;

/// オーバーレイ合成の不透明度（0-100）
pub const OVERLAY_OPACITY: u8 = 85;

/// 画像スタイルプロンプト
pub const IMAGE_PROMPT_STYLE: &str = "A cinematic illustration with full bleed that fills the entire 16:9 frame rendered in vivid beautiful scene, where the aesthetic is whimsical and magical, evoking a deep connection with nature and the overall tone is dreamlike and nostalgic, blending serene beauty with a touch of lighthearted magic. The style emphasizes detailed environments and elements, and an atmosphere filled with quiet wonder and subtle enchantment.";

/// キャラクタースタイルプロンプト（空ならサーバー側で補完）
pub const CHARACTERS_PROMPT_STYLE: &str = "";

/// シーンごとの画像プロンプト前処理指示
pub const IMAGE_PREPROCESSING_PROMPT: &str = "You are a prompt preprocessor specialized in generating prompts for images that will be part of a sequence in a larger story. I will provide you with the style and the entire story for context, as well as the details for this specific image and its elements.

Please produce a single final prompt for the current image, capturing the style and element descriptions provided perfectly, but focusing with great detail on the [current_sequence], not mixing the whole story up in one prompt.

Avoid using character personal names, focus exclusively on the visual descriptions provided in [story_items_style]. Do not mention anything in the prompt that may lead to text generation on the image.

You must also detect and use the same language as the provided for [story] and [current_sequence], that will be your output language. Min length: 1200 characters. Max length: 1700 characters.";

/// リファレンスカードの初期プロンプト
pub const REFERENCE_CARD_PROMPT: &str = "Create a reference grid to be used as the visual style guide (no text) for the following characters: ...";
