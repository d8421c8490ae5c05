use crate::error::{Result, StoryboardError};
use crate::wizard::WizardOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storyboard_common::{defaults, GenerationSettings, ReplacedImagePolicy};

/// バックエンドURLを上書きする環境変数
pub const BACKEND_URL_ENV: &str = "STORYBOARD_BACKEND_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    /// 接続確立までの上限
    pub connect_timeout_seconds: u64,
    /// 付帯的な短い呼び出し（画像取得・リファレンス登録など）の上限
    pub request_timeout_seconds: u64,
    #[serde(flatten)]
    pub settings: GenerationSettings,
    pub replaced_image_policy: ReplacedImagePolicy,
    pub overlay_opacity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoryboardError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("storyboard").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 60,
            settings: GenerationSettings::default(),
            replaced_image_policy: ReplacedImagePolicy::default(),
            overlay_opacity: defaults::OVERLAY_OPACITY,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.overlay_opacity > 100 {
            return Err(StoryboardError::Config(format!(
                "overlay_opacity は0〜100で指定してください: {}",
                self.overlay_opacity
            )));
        }
        if self.settings.words_per_scene == 0 {
            return Err(StoryboardError::Config("words_per_scene は1以上で指定してください".into()));
        }
        Ok(())
    }

    pub fn backend_url(&self) -> String {
        // 環境変数を優先
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                return url.trim().trim_end_matches('/').to_string();
            }
        }
        self.backend_url.trim().trim_end_matches('/').to_string()
    }

    pub fn set_backend_url(&mut self, url: String) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoryboardError::Config(format!("URLが不正です: {}", url)));
        }
        self.backend_url = url;
        self.save()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn wizard_options(&self) -> WizardOptions {
        WizardOptions {
            settings: self.settings.clone(),
            replaced_image_policy: self.replaced_image_policy,
            overlay_opacity: self.overlay_opacity.min(100),
            ..WizardOptions::default()
        }
    }
}
