use crate::core::config::{GeminiConfig, VideoConfig};
use crate::core::state::{AssetKind, MediaAsset, Tone};
use crate::services::executor::RequestExecutor;
use crate::services::gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerateVideosRequest,
    GenerationConfig, ImageConfig, SpeechConfig, ThinkingConfig, Tool,
};
use crate::services::poller::{self, PollSettings};
use crate::utils::audio::{self, PcmFormat};
use anyhow::{anyhow, Result};
use log::info;

/// How much of the script seeds the video mood prompt.
pub const VIDEO_PROMPT_SNIPPET_CHARS: usize = 100;

/// Thumbnails are generated at the channel's fixed frame shape.
pub const THUMBNAIL_ASPECT_RATIO: &str = "16:9";

const SCRIPT_THINKING_BUDGET: u32 = 1024;

/// PCM shape the TTS model delivers its inline payloads in.
pub const TTS_PCM_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 24_000,
    channels: 1,
    bits_per_sample: 16,
};

/// Result of a text operation that succeeded at the transport level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    Text(String),
    Empty,
}

fn text_outcome(response: &GenerateContentResponse) -> TextOutcome {
    match response.first_text() {
        Some(text) => TextOutcome::Text(text),
        None => TextOutcome::Empty,
    }
}

pub struct MediaService {
    executor: RequestExecutor,
    gemini: GeminiConfig,
    video: VideoConfig,
}

impl MediaService {
    pub fn new(executor: RequestExecutor, gemini: GeminiConfig, video: VideoConfig) -> Self {
        Self {
            executor,
            gemini,
            video,
        }
    }

    /// Grounded search for candidate stories. An empty-but-successful
    /// response is `TextOutcome::Empty`, not an error.
    pub async fn find_stories(&self, topic: &str) -> Result<TextOutcome> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(&search_prompt(topic))],
            tools: Some(vec![Tool::google_search()]),
            generation_config: None,
        };
        let model = self.gemini.search_model.as_str();

        let response = self
            .executor
            .execute(|client| {
                let request = request.clone();
                async move { client.generate_content(model, &request).await }
            })
            .await?;

        Ok(text_outcome(&response))
    }

    /// Rewrites raw story material into spoken-only narration in the
    /// requested tone.
    pub async fn write_script(&self, story_content: &str, tone: Tone) -> Result<TextOutcome> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(&script_prompt(story_content, tone))],
            tools: None,
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: SCRIPT_THINKING_BUDGET,
                }),
                ..Default::default()
            }),
        };
        let model = self.gemini.script_model.as_str();

        let response = self
            .executor
            .execute(|client| {
                let request = request.clone();
                async move { client.generate_content(model, &request).await }
            })
            .await?;

        Ok(text_outcome(&response))
    }

    /// Synthesizes a voiceover for the narration and wraps the raw PCM
    /// payload into a playable WAV asset.
    pub async fn generate_voiceover(&self, text: &str) -> Result<MediaAsset> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(text)],
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(&self.gemini.voice)),
                ..Default::default()
            }),
        };
        let model = self.gemini.tts_model.as_str();

        let response = self
            .executor
            .execute(|client| {
                let request = request.clone();
                async move { client.generate_content(model, &request).await }
            })
            .await?;

        let inline = response
            .first_inline_data()
            .ok_or_else(|| anyhow!("No audio generated"))?;
        let pcm = audio::decode_base64(&inline.data)?;
        info!("Voiceover payload: {} PCM bytes", pcm.len());

        Ok(MediaAsset {
            kind: AssetKind::Audio,
            mime_type: "audio/wav".to_string(),
            bytes: audio::pcm_to_wav(&pcm, &TTS_PCM_FORMAT),
        })
    }

    /// Generates a thumbnail image for the topic.
    pub async fn generate_thumbnail(&self, topic: &str) -> Result<MediaAsset> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(&thumbnail_prompt(topic))],
            tools: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: THUMBNAIL_ASPECT_RATIO.to_string(),
                }),
                ..Default::default()
            }),
        };
        let model = self.gemini.image_model.as_str();

        let response = self
            .executor
            .execute(|client| {
                let request = request.clone();
                async move { client.generate_content(model, &request).await }
            })
            .await?;

        let inline = response
            .first_inline_data()
            .ok_or_else(|| anyhow!("No image generated"))?;

        Ok(MediaAsset {
            kind: AssetKind::Thumbnail,
            mime_type: inline
                .mime_type
                .clone()
                .unwrap_or_else(|| "image/png".to_string()),
            bytes: audio::decode_base64(&inline.data)?,
        })
    }

    /// Starts a video job for the script's mood, polls it to completion and
    /// downloads the result. Status queries go through the exact client
    /// instance that created the job; job handles are not portable across
    /// clients.
    pub async fn generate_background_video(&self, script_snippet: &str) -> Result<MediaAsset> {
        let request = GenerateVideosRequest::single(
            video_prompt(script_snippet),
            &self.video.resolution,
            &self.video.aspect_ratio,
        );
        let model = self.gemini.video_model.as_str();

        let (client, job) = self
            .executor
            .execute(|client| {
                let request = request.clone();
                async move {
                    let job = client.start_video_job(model, &request).await?;
                    Ok((client, job))
                }
            })
            .await?;

        info!("Video job {} started", job.name);
        let settings = PollSettings::new(self.video.poll_interval_secs, self.video.max_poll_attempts);
        let completed =
            poller::poll_until_done(job, settings, |op| client.refresh_video_job(op)).await?;

        let uri = completed
            .download_uri()
            .ok_or_else(|| anyhow!("Video generation failed"))?;
        info!("Video job complete, downloading");
        let bytes = client.download(uri).await?;

        Ok(MediaAsset {
            kind: AssetKind::Video,
            mime_type: "video/mp4".to_string(),
            bytes,
        })
    }
}

fn search_prompt(topic: &str) -> String {
    format!(
        "Search reddit.com for interesting threads or stories related to: \"{}\". \
        Summarize 3 distinct potential stories found. \
        For each story, provide the Thread Title, a Summary of the plot/content, and the URL if available. \
        Format the output clearly with separators so I can parse it easily.",
        topic
    )
}

fn script_prompt(story_content: &str, tone: Tone) -> String {
    format!(
        "Act as a professional YouTube scriptwriter. \
        Take the following raw story/content and rewrite it into a short, engaging video script (approx 60-90 seconds spoken). \
        If the content contains multiple stories or summaries, pick the single most interesting one to focus on.\n\
        \n\
        Tone: {} (Make it hook the viewer immediately).\n\
        Style: Conversational, human-written, storytelling format.\n\
        \n\
        Original Content:\n{}\n\
        \n\
        Output the spoken narration text ONLY. Do not include scene descriptions, visual cues, or character names. \
        Just the raw text to be spoken.",
        tone.as_str(),
        story_content
    )
}

fn thumbnail_prompt(topic: &str) -> String {
    format!(
        "A youtube video thumbnail for a story about {}. \
        High contrast, shocking, catchy, 4k resolution, hyper realistic.",
        topic
    )
}

fn video_prompt(script_snippet: &str) -> String {
    let lead: String = script_snippet
        .chars()
        .take(VIDEO_PROMPT_SNIPPET_CHARS)
        .collect();
    format!(
        "Create a cinematic, atmospheric 5-second video loop that represents the mood of this story snippet: \"{}...\". \
        No text overlay. High quality.",
        lead
    )
}
