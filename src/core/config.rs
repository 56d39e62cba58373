use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_search_model")]
    pub search_model: String,

    #[serde(default = "default_script_model")]
    pub script_model: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_video_model")]
    pub video_model: String,

    #[serde(default = "default_voice")]
    pub voice: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    #[serde(default = "default_resolution")]
    pub resolution: String,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_output() -> String {
    "output".to_string()
}
fn default_search_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_script_model() -> String {
    "gemini-3-pro-preview".to_string()
}
fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}
fn default_voice() -> String {
    "Kore".to_string()
}
fn default_poll_interval() -> u64 {
    5
}
fn default_max_poll_attempts() -> u32 {
    120
}
fn default_resolution() -> String {
    "720p".to_string()
}
fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            search_model: default_search_model(),
            script_model: default_script_model(),
            tts_model: default_tts_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            voice: default_voice(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            resolution: default_resolution(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_folder: default_output(),
            unattended: false,
            gemini: GeminiConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.yml`, writing one with defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save()?;
            println!("Created {} with default settings.", CONFIG_FILE);
            return Ok(config);
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(CONFIG_FILE, content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}
