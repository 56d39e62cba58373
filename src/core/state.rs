use serde::{Deserialize, Serialize};
use std::fmt;

/// Derives a stable story identifier from its content. The same search
/// result always maps to the same id, so re-running a search does not
/// create a second story record.
pub fn story_id(content: &str) -> String {
    let mut hash: i32 = 0;
    for unit in content.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    format!("story-{:x}", hash.unsigned_abs())
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub selected: bool,
}

impl Story {
    pub fn from_search(topic: &str, summary: String) -> Self {
        Self {
            id: story_id(&summary),
            title: format!("Search Result for: {}", topic),
            summary,
            source: "Reddit (via Google Search)".to_string(),
            selected: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Humorous,
    Dramatic,
    Suspenseful,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Humorous, Tone::Dramatic, Tone::Suspenseful];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Humorous => "humorous",
            Tone::Dramatic => "dramatic",
            Tone::Suspenseful => "suspenseful",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Script {
    pub title: String,
    pub content: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Video,
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Audio => "voiceover",
            AssetKind::Video => "background video",
            AssetKind::Thumbnail => "thumbnail",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            AssetKind::Audio => "voiceover.wav",
            AssetKind::Video => "background.mp4",
            AssetKind::Thumbnail => "thumbnail.png",
        }
    }
}

/// One generated media artifact, already decoded into raw bytes.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub kind: AssetKind,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The three per-session artifacts. Each generation writes only its own
/// slot; readiness is recomputed from the slots on every call.
#[derive(Debug, Default)]
pub struct AssetBundle {
    audio: Option<MediaAsset>,
    video: Option<MediaAsset>,
    thumbnail: Option<MediaAsset>,
}

impl AssetBundle {
    pub fn insert(&mut self, asset: MediaAsset) {
        match asset.kind {
            AssetKind::Audio => self.audio = Some(asset),
            AssetKind::Video => self.video = Some(asset),
            AssetKind::Thumbnail => self.thumbnail = Some(asset),
        }
    }

    pub fn get(&self, kind: AssetKind) -> Option<&MediaAsset> {
        match kind {
            AssetKind::Audio => self.audio.as_ref(),
            AssetKind::Video => self.video.as_ref(),
            AssetKind::Thumbnail => self.thumbnail.as_ref(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.audio.is_some() && self.video.is_some() && self.thumbnail.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
