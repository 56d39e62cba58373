use crate::core::config::Config;
use crate::core::state::{AssetBundle, AssetKind, MediaAsset, Script, Story, Tone};
use crate::services::auth::CredentialGate;
use crate::services::media::{MediaService, TextOutcome};
use anyhow::{Context, Result};
use futures_util::future;
use indicatif::ProgressBar;
use inquire::{Confirm, Editor, Select, Text};
use log::error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TOPIC: &str = "backup horror stories";
const FALLBACK_THUMBNAIL_TOPIC: &str = "tech disaster";

const UPLOAD_TICKS: u64 = 100;
const UPLOAD_TICK: Duration = Duration::from_millis(30);

/// Drives the four pipeline steps: find a story, write the script,
/// generate the three assets, publish.
pub struct PipelineManager {
    config: Config,
    media: MediaService,
    gate: Arc<dyn CredentialGate>,
    topic: Option<String>,
    story: Option<Story>,
    script: Option<Script>,
    bundle: AssetBundle,
}

impl PipelineManager {
    pub fn new(config: Config, media: MediaService, gate: Arc<dyn CredentialGate>) -> Self {
        Self {
            config,
            media,
            gate,
            topic: None,
            story: None,
            script: None,
            bundle: AssetBundle::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.step_find().await?;
            self.step_write().await?;
            self.step_assets().await?;

            if !Confirm::new("Create another video?")
                .with_default(false)
                .prompt()?
            {
                return Ok(());
            }
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.topic = None;
        self.story = None;
        self.script = None;
        self.bundle.clear();
    }

    async fn step_find(&mut self) -> Result<()> {
        println!("\n== Step 1: Find a story ==");
        loop {
            let topic = Text::new("Search topic:")
                .with_default(DEFAULT_TOPIC)
                .prompt()?;

            let spinner = spinner("Searching for stories...");
            let outcome = self.media.find_stories(&topic).await;
            spinner.finish_and_clear();

            match outcome {
                Ok(TextOutcome::Text(results)) => {
                    println!("\n{}\n", results);
                    if Confirm::new("Use these stories?")
                        .with_default(true)
                        .prompt()?
                    {
                        self.story = Some(Story::from_search(&topic, results));
                        self.topic = Some(topic);
                        return Ok(());
                    }
                }
                Ok(TextOutcome::Empty) => println!("No results found."),
                Err(err) => {
                    error!("Story search failed: {:#}", err);
                    println!("Error fetching stories. Please try again.");
                }
            }
        }
    }

    async fn step_write(&mut self) -> Result<()> {
        let story = self.story.clone().context("No story selected")?;
        println!("\n== Step 2: Write the script ==");
        loop {
            let tone = Select::new("Script tone:", Tone::ALL.to_vec()).prompt()?;

            let spinner = spinner("Writing script...");
            let outcome = self.media.write_script(&story.summary, tone).await;
            spinner.finish_and_clear();

            match outcome {
                Ok(TextOutcome::Text(content)) => {
                    println!("\n{}\n", content);

                    let content = if Confirm::new("Edit the narration before continuing?")
                        .with_default(false)
                        .prompt()?
                    {
                        Editor::new("Narration:")
                            .with_predefined_text(&content)
                            .prompt()?
                    } else {
                        content
                    };

                    if Confirm::new("Use this script?").with_default(true).prompt()? {
                        self.script = Some(Script {
                            title: story.title.clone(),
                            content,
                            tone,
                        });
                        return Ok(());
                    }
                }
                Ok(TextOutcome::Empty) => println!("The model returned an empty script."),
                Err(err) => {
                    error!("Script generation failed: {:#}", err);
                    println!("Script generation failed. Please try again.");
                }
            }
        }
    }

    async fn step_assets(&mut self) -> Result<()> {
        let script = self.script.clone().context("No script confirmed")?;
        println!("\n== Step 3: Generate assets ==");
        loop {
            println!(
                "Assets: voiceover [{}], background video [{}], thumbnail [{}]",
                slot_status(&self.bundle, AssetKind::Audio),
                slot_status(&self.bundle, AssetKind::Video),
                slot_status(&self.bundle, AssetKind::Thumbnail),
            );

            let mut options = vec![
                "Generate voiceover",
                "Generate background video",
                "Generate thumbnail",
            ];
            if self.bundle.is_ready() {
                options.push("Publish");
            } else {
                options.push("Generate all remaining");
            }

            match Select::new("Next action:", options).prompt()? {
                "Generate voiceover" => self.generate(AssetKind::Audio, &script).await,
                "Generate background video" => self.generate(AssetKind::Video, &script).await,
                "Generate thumbnail" => self.generate(AssetKind::Thumbnail, &script).await,
                "Generate all remaining" => self.generate_remaining(&script).await,
                "Publish" => {
                    self.publish().await?;
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    async fn generate(&mut self, kind: AssetKind, script: &Script) {
        if kind == AssetKind::Video {
            if let Err(err) = self.ensure_video_credential().await {
                println!("Video generation needs a selected API key: {}", err);
                return;
            }
        }

        let spinner = spinner(&format!("Generating {}...", kind.as_str()));
        let result = match kind {
            AssetKind::Audio => self.media.generate_voiceover(&script.content).await,
            AssetKind::Video => self.media.generate_background_video(&script.content).await,
            AssetKind::Thumbnail => self.media.generate_thumbnail(&self.thumbnail_topic()).await,
        };
        spinner.finish_and_clear();

        self.record(kind, result).await;
    }

    /// Runs the missing generations concurrently; each failure is reported
    /// on its own and leaves the other slots' progress intact.
    async fn generate_remaining(&mut self, script: &Script) {
        let need_audio = self.bundle.get(AssetKind::Audio).is_none();
        let mut need_video = self.bundle.get(AssetKind::Video).is_none();
        let need_thumb = self.bundle.get(AssetKind::Thumbnail).is_none();

        if need_video {
            if let Err(err) = self.ensure_video_credential().await {
                println!("Skipping video, no API key selected: {}", err);
                need_video = false;
            }
        }

        let topic = self.thumbnail_topic();
        let media = &self.media;
        let content = script.content.as_str();

        let spinner = spinner("Generating remaining assets...");
        let (audio, video, thumbnail) = future::join3(
            async {
                if need_audio {
                    Some(media.generate_voiceover(content).await)
                } else {
                    None
                }
            },
            async {
                if need_video {
                    Some(media.generate_background_video(content).await)
                } else {
                    None
                }
            },
            async {
                if need_thumb {
                    Some(media.generate_thumbnail(&topic).await)
                } else {
                    None
                }
            },
        )
        .await;
        spinner.finish_and_clear();

        for (kind, outcome) in [
            (AssetKind::Audio, audio),
            (AssetKind::Video, video),
            (AssetKind::Thumbnail, thumbnail),
        ] {
            if let Some(result) = outcome {
                self.record(kind, result).await;
            }
        }
    }

    async fn record(&mut self, kind: AssetKind, result: Result<MediaAsset>) {
        match result {
            Ok(asset) => match self.save_asset(&asset).await {
                Ok(path) => {
                    println!("{} ready: {}", kind.as_str(), path.display());
                    self.bundle.insert(asset);
                }
                Err(err) => {
                    error!("Failed to save {}: {:#}", kind.as_str(), err);
                    println!("Failed to save {}.", kind.as_str());
                }
            },
            Err(err) => {
                error!("{} generation failed: {:#}", kind.as_str(), err);
                println!("{} generation failed: {}", kind.as_str(), err);
            }
        }
    }

    /// Video generation sits behind a paid key; make sure one is selected
    /// before creating the job.
    async fn ensure_video_credential(&self) -> Result<()> {
        if !self.gate.is_ready() && self.gate.can_reselect() {
            println!("Video generation requires a paid project key.");
            self.gate.request_selection().await?;
        }
        Ok(())
    }

    async fn save_asset(&self, asset: &MediaAsset) -> Result<PathBuf> {
        let dir = PathBuf::from(&self.config.output_folder);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(asset.kind.file_name());
        tokio::fs::write(&path, &asset.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    fn thumbnail_topic(&self) -> String {
        self.topic
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_THUMBNAIL_TOPIC.to_string())
    }

    /// Simulated upload; the real publish integration is out of scope for
    /// this version.
    async fn publish(&self) -> Result<()> {
        println!("Compiling and uploading to the StoryStream channel...");
        let bar = ProgressBar::new(UPLOAD_TICKS);
        for _ in 0..UPLOAD_TICKS {
            tokio::time::sleep(UPLOAD_TICK).await;
            bar.inc(1);
        }
        bar.finish_and_clear();
        println!("Upload successful! Check your channel dashboard for analytics.");
        Ok(())
    }
}

fn slot_status(bundle: &AssetBundle, kind: AssetKind) -> &'static str {
    if bundle.get(kind).is_some() {
        "ready"
    } else {
        "-"
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GeminiConfig, VideoConfig};
    use crate::services::auth::EnvGate;
    use crate::services::executor::RequestExecutor;

    fn manager(output_folder: &str) -> PipelineManager {
        let config = Config {
            output_folder: output_folder.to_string(),
            ..Config::default()
        };
        let gate = Arc::new(EnvGate::new("test-key".to_string()));
        let media = MediaService::new(
            RequestExecutor::new(gate.clone()),
            GeminiConfig::default(),
            VideoConfig::default(),
        );
        PipelineManager::new(config, media, gate)
    }

    #[tokio::test]
    async fn test_save_asset_writes_into_output_folder() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out");
        let manager = manager(output.to_str().unwrap());

        let asset = MediaAsset {
            kind: AssetKind::Audio,
            mime_type: "audio/wav".to_string(),
            bytes: vec![1, 2, 3, 4],
        };
        let path = manager.save_asset(&asset).await.unwrap();

        assert_eq!(path, output.join("voiceover.wav"));
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_thumbnail_topic_falls_back() {
        let mut manager = manager("out");
        assert_eq!(manager.thumbnail_topic(), FALLBACK_THUMBNAIL_TOPIC);

        manager.topic = Some("   ".to_string());
        assert_eq!(manager.thumbnail_topic(), FALLBACK_THUMBNAIL_TOPIC);

        manager.topic = Some("server room floods".to_string());
        assert_eq!(manager.thumbnail_topic(), "server room floods");
    }

    #[test]
    fn test_reset_clears_session() {
        let mut manager = manager("out");
        manager.topic = Some("t".to_string());
        manager.story = Some(Story::from_search("t", "s".to_string()));
        manager.bundle.insert(MediaAsset {
            kind: AssetKind::Audio,
            mime_type: "audio/wav".to_string(),
            bytes: vec![0],
        });

        manager.reset();
        assert!(manager.topic.is_none());
        assert!(manager.story.is_none());
        assert!(manager.script.is_none());
        assert!(!manager.bundle.is_ready());
        assert!(manager.bundle.get(AssetKind::Audio).is_none());
    }
}
