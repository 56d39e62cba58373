use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Failure reported by the service itself (non-2xx status).
#[derive(Debug, thiserror::Error)]
#[error("Gemini API error ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

// --- Content generation ---

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<TextPart>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "googleSearch")]
    pub google_search: GoogleSearch,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: &str) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
    #[serde(rename = "inlineData")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .as_deref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// All text parts of the first candidate joined together, or `None` if
    /// nothing textual came back.
    pub fn first_text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// The first inline binary payload of the first candidate.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

// --- Video jobs ---

#[derive(Debug, Clone, Serialize)]
pub struct GenerateVideosRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

impl GenerateVideosRequest {
    pub fn single(prompt: String, resolution: &str, aspect_ratio: &str) -> Self {
        Self {
            instances: vec![VideoInstance { prompt }],
            parameters: VideoParameters {
                number_of_videos: 1,
                resolution: resolution.to_string(),
                aspect_ratio: aspect_ratio.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

/// Handle for a long-running video job. Only `refresh_video_job` produces a
/// newer view of it, and only through the client that created the job.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoOperation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub response: Option<VideoOperationResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoOperationResponse {
    #[serde(rename = "generatedVideos", default)]
    pub generated_videos: Vec<GeneratedVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedVideo {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRef {
    pub uri: Option<String>,
}

impl VideoOperation {
    pub fn download_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generated_videos
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
    }
}

// --- Client ---

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}?key={}", BASE_URL, path, self.api_key)
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        debug!("generateContent via {}", model);
        let url = self.endpoint(&format!("models/{}:generateContent", model));
        self.post_json(&url, request).await
    }

    pub async fn start_video_job(
        &self,
        model: &str,
        request: &GenerateVideosRequest,
    ) -> Result<VideoOperation> {
        debug!("predictLongRunning via {}", model);
        let url = self.endpoint(&format!("models/{}:predictLongRunning", model));
        self.post_json(&url, request).await
    }

    pub async fn refresh_video_job(&self, operation: VideoOperation) -> Result<VideoOperation> {
        let url = self.endpoint(&operation.name);
        let resp = self.client.get(&url).send().await?;
        Self::read_json(resp).await
    }

    /// Fetches a signed media link with the active credential appended as a
    /// query parameter.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        let mut url = Url::parse(uri).context("Invalid download link")?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }
            .into());
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let resp = self.client.post(url).json(body).send().await?;
        Self::read_json(resp).await
    }

    async fn read_json<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ApiError {
                status: status.as_u16(),
                message: extract_error_message(&body),
            }
            .into());
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Gemini response. Body: {}", body))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.message)
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response_parsing() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Story one. " },
                            { "text": "Story two." }
                        ],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.first_text().as_deref(),
            Some("Story one. Story two.")
        );
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn test_inline_data_response_parsing() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAAA" } }
                        ],
                        "role": "model"
                    }
                }
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let inline = response.first_inline_data().unwrap();
        assert_eq!(inline.mime_type.as_deref(), Some("audio/L16;rate=24000"));
        assert_eq!(inline.data, "AAAA");
        assert!(response.first_text().is_none());
    }

    #[test]
    fn test_blocked_response_has_no_payload() {
        // Safety-blocked candidates come back with no content at all
        let json = r#"{
            "candidates": [
                { "finishReason": "SAFETY", "index": 0 }
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.first_text().is_none());
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn test_empty_body_parsing() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_text().is_none());
    }

    #[test]
    fn test_pending_operation_parsing() {
        let json = r#"{ "name": "models/veo/operations/abc123" }"#;
        let op: VideoOperation = serde_json::from_str(json).unwrap();

        assert!(!op.done);
        assert_eq!(op.name, "models/veo/operations/abc123");
        assert!(op.download_uri().is_none());
    }

    #[test]
    fn test_completed_operation_parsing() {
        let json = r#"{
            "name": "models/veo/operations/abc123",
            "done": true,
            "response": {
                "generatedVideos": [
                    { "video": { "uri": "https://example.com/video.mp4" } }
                ]
            }
        }"#;

        let op: VideoOperation = serde_json::from_str(json).unwrap();
        assert!(op.done);
        assert_eq!(op.download_uri(), Some("https://example.com/video.mp4"));
    }

    #[test]
    fn test_completed_operation_without_reference() {
        let json = r#"{
            "name": "models/veo/operations/abc123",
            "done": true,
            "response": { "generatedVideos": [] }
        }"#;

        let op: VideoOperation = serde_json::from_str(json).unwrap();
        assert!(op.done);
        assert!(op.download_uri().is_none());
    }

    #[test]
    fn test_request_serialization_shapes() {
        let request = GenerateContentRequest {
            contents: vec![Content::user("hello")],
            tools: Some(vec![Tool::google_search()]),
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: 1024,
                }),
                speech_config: Some(SpeechConfig::prebuilt("Kore")),
                image_config: None,
            }),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"googleSearch\":{}"));
        assert!(json.contains("\"thinkingBudget\":1024"));
        assert!(json.contains("\"voiceName\":\"Kore\""));
        assert!(json.contains("\"responseModalities\":[\"AUDIO\"]"));
        assert!(!json.contains("imageConfig"));
    }

    #[test]
    fn test_video_request_serialization() {
        let request = GenerateVideosRequest::single("a storm".to_string(), "720p", "16:9");
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains("\"numberOfVideos\":1"));
        assert!(json.contains("\"resolution\":\"720p\""));
        assert!(json.contains("\"aspectRatio\":\"16:9\""));
        assert!(json.contains("\"prompt\":\"a storm\""));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{ "error": { "code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND" } }"#;
        assert_eq!(
            extract_error_message(body),
            "Requested entity was not found."
        );

        // Unstructured bodies fall through unchanged
        assert_eq!(extract_error_message("gateway timeout"), "gateway timeout");
    }
}
