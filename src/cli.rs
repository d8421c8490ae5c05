use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storyboard_common::{ReplacedImagePolicy, VideoSize};

#[derive(Parser)]
#[command(name = "storyboard")]
#[command(about = "音声から絵コンテ動画を作るウィザード", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// バックエンドURL（設定ファイルより優先）
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 音声アップロードから動画生成まで一括実行
    Run {
        /// ナレーション音声ファイル
        #[arg(required = true)]
        audio: PathBuf,

        /// リファレンス画像（複数指定可）
        #[arg(short, long)]
        reference: Vec<PathBuf>,

        /// 物語の材料テキスト（省略時はサーバーの抽出結果）
        #[arg(short, long)]
        ingredients: Option<PathBuf>,

        /// 出力動画サイズ（例: 1920x1080）
        #[arg(long)]
        video_size: Option<VideoSize>,

        /// 差し替えた旧画像の扱い (discard/explicit/always)
        #[arg(long)]
        replaced_image_policy: Option<ReplacedImagePolicy>,

        /// シーンごとにクロップを確認する
        #[arg(long)]
        interactive: bool,

        /// 結果JSONの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 音声をアップロードして文字起こし・シーン分割だけ行う
    Upload {
        /// ナレーション音声ファイル
        #[arg(required = true)]
        audio: PathBuf,

        /// 結果JSONの出力先（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// バックエンドURLを設定
        #[arg(long)]
        set_backend_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
