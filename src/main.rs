use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use storyboard_common::{ReplacedImagePolicy, VideoPhase};
use storyboard_rust::backend::HttpBackend;
use storyboard_rust::cli::{Cli, Commands};
use storyboard_rust::config::Config;
use storyboard_rust::media;
use storyboard_rust::view::ConsoleView;
use storyboard_rust::wizard::{OperationOutcome, Wizard};

/// 一括実行の結果
#[derive(Debug, Serialize)]
struct RunReport {
    job_id: String,
    title: String,
    description: String,
    scenes: Vec<SceneReport>,
    video_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SceneReport {
    index: usize,
    text: String,
    prompt: String,
    image_url: Option<String>,
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn build_wizard(config: &Config) -> Result<Wizard<HttpBackend, ConsoleView>> {
    let backend = HttpBackend::new(
        config.backend_url(),
        config.connect_timeout(),
        config.request_timeout(),
    )?;
    Ok(Wizard::new(backend, ConsoleView::new(false), config.wizard_options()))
}

/// Ctrl-C でアップロードを中断
async fn upload_with_interrupt(
    wizard: &mut Wizard<HttpBackend, ConsoleView>,
    audio: &Path,
) -> Result<String> {
    let file = media::read_file_data(audio)?;
    let handle = wizard.cancel_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    let result = wizard.upload(Some(file)).await;
    watcher.abort();
    Ok(result?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let mut config = Config::load()?;
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }

    match cli.command {
        Commands::Run {
            audio,
            reference,
            ingredients,
            video_size,
            replaced_image_policy,
            interactive,
            output,
        } => {
            println!("🎞 storyboard - 一括処理\n");
            if let Some(size) = video_size {
                config.settings.video_size = size.to_string();
            }
            if let Some(policy) = replaced_image_policy {
                config.replaced_image_policy = policy;
            }
            let mut wizard = build_wizard(&config)?;

            // 1. アップロード
            println!("[1/5] 音声をアップロード中... (Ctrl-Cで中断)");
            let job_id = upload_with_interrupt(&mut wizard, &audio).await?;
            let session = wizard.session();
            println!("✔ {} ({}シーン)\n", session.story.title, session.total_scenes());

            // 2. リファレンス
            if !reference.is_empty() {
                println!("[2/5] リファレンス画像をアップロード中...");
                let files = reference
                    .iter()
                    .map(|p| media::read_file_data(p))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let outcome = wizard.upload_references(files).await?;
                if outcome != OperationOutcome::Applied {
                    println!("⚠ リファレンスの一部を登録できませんでした");
                }
            }
            let selected = wizard.session().references.selected_filenames().len();
            println!("✔ リファレンス {}件を使用\n", selected);

            // 3. プロンプト
            println!("[3/5] シーンごとのプロンプトを作成中...");
            let ingredients = match ingredients {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("材料テキストを読めません: {}", path.display()))?,
                ),
                None => None,
            };
            wizard.generate_prompts(ingredients).await?;
            println!("✔ プロンプト作成完了\n");

            // 4. 画像
            println!("[4/5] シーン画像を生成中...");
            let total = wizard.session().total_scenes();
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );
            for index in 0..total {
                pb.set_message(format!("シーン{}", index + 1));
                generate_scene(&mut wizard, index, interactive, &pb).await?;
                pb.inc(1);
            }
            pb.finish_with_message("完了");
            println!(
                "✔ {}/{}シーンの画像を確定\n",
                wizard.session().generated_count(),
                total
            );

            // 5. 動画
            let video_url = if wizard.session().is_all_scenes_generated() {
                println!("[5/5] 動画を生成中...");
                Some(wizard.create_video().await?)
            } else {
                println!(
                    "⚠ {}シーンの画像が未確定のため動画生成をスキップ",
                    wizard.session().pending_scenes()
                );
                None
            };

            let report = build_report(&wizard, job_id, video_url);
            let output = output.unwrap_or_else(|| PathBuf::from("storyboard.json"));
            std::fs::write(&output, serde_json::to_string_pretty(&report)?)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 完了");
        }

        Commands::Upload { audio, output } => {
            println!("🎙 storyboard - アップロード\n");
            let mut wizard = build_wizard(&config)?;
            let job_id = upload_with_interrupt(&mut wizard, &audio).await?;

            let report = build_report(&wizard, job_id, None);
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✔ 結果を保存: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Config { set_backend_url, show } => {
            if let Some(url) = set_backend_url {
                config.set_backend_url(url)?;
                println!("✔ バックエンドURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  パス: {}", Config::config_path()?.display());
                println!("  バックエンド: {}", config.backend_url());
                println!("  テキストモデル: {}", config.settings.text_model);
                println!("  1シーンの語数: {}", config.settings.words_per_scene);
                println!("  動画サイズ: {}", config.settings.video_size);
                println!("  オーバーレイ不透明度: {}", config.overlay_opacity);
                println!(
                    "  旧画像の扱い: {}",
                    match config.replaced_image_policy {
                        ReplacedImagePolicy::Discard => "追加しない",
                        ReplacedImagePolicy::Explicit => "明示したときだけ追加",
                        ReplacedImagePolicy::Always => "常に追加",
                    }
                );
            }
        }
    }

    Ok(())
}

/// 1シーン分: 生成してクロップを確定
async fn generate_scene(
    wizard: &mut Wizard<HttpBackend, ConsoleView>,
    index: usize,
    interactive: bool,
    pb: &ProgressBar,
) -> Result<()> {
    match wizard.generate_scene_image(index).await? {
        OperationOutcome::AwaitingCrop => {}
        other => {
            pb.println(format!("⚠ シーン{}: 画像を生成できませんでした ({:?})", index + 1, other));
            return Ok(());
        }
    }

    let rect = wizard.crop_fit_natural()?;
    if interactive {
        let prompt = match rect {
            Some(r) => format!(
                "シーン{}の画像を確定しますか？ (枠 {}x{} @ {},{})",
                index + 1,
                r.w,
                r.h,
                r.x,
                r.y
            ),
            None => format!("シーン{}の画像を確定しますか？", index + 1),
        };
        let accepted = pb.suspend(|| Confirm::new().with_prompt(prompt).default(true).interact())?;
        if !accepted {
            wizard.cancel_crop();
            pb.println(format!("- シーン{}はスキップしました", index + 1));
            return Ok(());
        }
    }

    if wizard.confirm_crop().await? != OperationOutcome::Applied {
        pb.println(format!("⚠ シーン{}: クロップを確定できませんでした", index + 1));
    }
    Ok(())
}

fn build_report(
    wizard: &Wizard<HttpBackend, ConsoleView>,
    job_id: String,
    video_url: Option<String>,
) -> RunReport {
    let session = wizard.session();
    let video_url = video_url.or_else(|| match &session.video {
        VideoPhase::Finished { video_url } => Some(video_url.clone()),
        _ => None,
    });
    RunReport {
        job_id,
        title: session.story.title.clone(),
        description: session.story.description.clone(),
        scenes: session
            .scenes
            .iter()
            .map(|s| SceneReport {
                index: s.index,
                text: s.chunk.raw_text.clone(),
                prompt: s.prompt_text.clone(),
                image_url: s.image_url().map(str::to_string),
            })
            .collect(),
        video_url,
    }
}
