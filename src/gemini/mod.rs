//! Gemini integration for script, artwork, and narration generation.
//!
//! Calls the Gemini REST API. Each function is one request with no retries
//! and no client-side timeout; a hung provider call is resolved only by the
//! provider erroring out.

use serde::{Deserialize, Serialize};

use crate::error::StudioError;
use crate::storage::UserSettings;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Dedicated multi-speaker speech model; not user-configurable.
const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Literal line the script prompt asks the model to emit between the main
/// script and the post-credit scene.
const SCRIPT_SEPARATOR: &str = "---POST-CREDIT-SCENE---";
const POST_CREDIT_PLACEHOLDER: &str = "No post-credit scene generated.";

/// Served whenever the idea call fails, whatever the reason.
const FALLBACK_IDEAS: [&str; 3] = ["Tales of Paris", "The Lost Kwamis", "Future Imperfect"];

/// Upper bound on script characters sent for narration, to bound request
/// size for a single TTS pass.
const MAX_TTS_SCRIPT_CHARS: usize = 4000;

const MALE_VOICE: &str = "Fenrir";
const FEMALE_VOICE: &str = "Kore";

const IDEAS_PROMPT: &str = "Generate 3 creative, catchy titles for a new season or spinoff of \
     Miraculous Ladybug. Return only the titles, separated by commas.";

/// A generated episode script split into its two segments.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    pub script: String,
    pub post_credit_scene: String,
}

/// Gemini client for making generation calls.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    script_model: String,
    image_model: String,
}

impl GeminiClient {
    /// Resolve the API key and bind the models named in settings.
    ///
    /// Automatic key mode reads `GEMINI_API_KEY` from the environment;
    /// manual mode uses the key stored in settings. No resolvable key fails
    /// fast, before any network call.
    pub fn from_settings(settings: &UserSettings) -> Result<Self, StudioError> {
        let api_key = if settings.use_auto_key {
            std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
        } else {
            Some(settings.custom_api_key.clone()).filter(|k| !k.is_empty())
        };

        let api_key = api_key.ok_or_else(|| {
            StudioError::Config("API Key not found. Please configure it in Settings.".to_string())
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            script_model: settings.script_model.clone(),
            image_model: settings.image_model.clone(),
        })
    }

    /// Write a full episode script plus post-credit scene.
    pub async fn generate_script(
        &self,
        show_title: &str,
        episode_title: &str,
        premise: &str,
        context: &str,
    ) -> Result<GeneratedScript, StudioError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(script_prompt(
                show_title,
                episode_title,
                premise,
                context,
            ))],
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig { thinking_budget: 0 }),
                ..Default::default()
            }),
        };

        let response = self.generate_content(&self.script_model, &request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| StudioError::Generation("Model returned no script text".to_string()))?;

        Ok(split_script(&text))
    }

    /// Suggest three fresh season titles, falling back to a fixed list on
    /// any provider failure.
    pub async fn generate_show_ideas(&self) -> Vec<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(IDEAS_PROMPT.to_string())],
            generation_config: None,
        };

        let result = self.generate_content(&self.script_model, &request).await;
        ideas_or_fallback(result.map(|response| response.first_text()))
    }

    /// Render cover art for a scene description, returned as a data URI.
    pub async fn generate_scene_image(&self, description: &str) -> Result<String, StudioError> {
        let prompt = format!(
            "A cinematic 3D animated style screenshot from Miraculous Ladybug. {}. \
             High quality, vibrant colors, 4k.",
            description
        );
        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            generation_config: None,
        };

        let response = self.generate_content(&self.image_model, &request).await?;
        response
            .first_inline_data()
            .map(|(mime, data)| {
                let mime = mime.unwrap_or_else(|| "image/png".to_string());
                format!("data:{};base64,{}", mime, data)
            })
            .ok_or_else(|| StudioError::Generation("No image data received".to_string()))
    }

    /// Narrate a script with the two fixed character voices. Returns the
    /// provider's raw base64 PCM payload.
    pub async fn generate_script_audio(&self, script: &str) -> Result<String, StudioError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(tts_prompt(truncate_chars(
                script,
                MAX_TTS_SCRIPT_CHARS,
            )))],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::two_speakers()),
                ..Default::default()
            }),
        };

        let response = self.generate_content(TTS_MODEL, &request).await?;
        response
            .first_inline_data()
            .map(|(_, data)| data)
            .ok_or_else(|| StudioError::Generation("No audio generated".to_string()))
    }

    /// One `generateContent` round trip.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, StudioError> {
        let url = format!("{}/models/{}:generateContent", GEMINI_BASE_URL, model);

        log::info!("Calling Gemini: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::Generation(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

// ============================================================================
// Prompts and response parsing
// ============================================================================

fn script_prompt(show_title: &str, episode_title: &str, premise: &str, context: &str) -> String {
    format!(
        r#"You are a master scriptwriter for the animated series "Miraculous: Tales of Ladybug & Cat Noir".

Context: The user is creating a fan-made season called "{show_title}".
Previous Episodes Context: {context}

Task: Write a full episode script for an episode titled "{episode_title}".
Premise: {premise}

Requirements:
1. Format it as a proper script (Scene headings, Character names, Dialogue, Action).
2. Include a transformation sequence.
3. Include the villain's akumatization moment by Hawkmoth (or current villain).
4. Include the "Lucky Charm" sequence and the "Miraculous Ladybug" fix-everything ending.
5. VERY IMPORTANT: Generate a POST-CREDIT SCENE that teases the future or adds comedy.
6. SEPARATOR: You MUST output the line "{SCRIPT_SEPARATOR}" between the main script and the post-credit scene.

Tone: Exciting, heroic, romantic tension, puns from Cat Noir.
Format: Use Markdown (bold names, italic actions)."#
    )
}

fn tts_prompt(script: &str) -> String {
    format!(
        r#"Perform the dialogue from the following script.
Important Instructions:
1. ONLY read the spoken dialogue. Do NOT read scene headings, action descriptions, or character names.
2. Use the Female voice ({FEMALE_VOICE}) for Marinette, Ladybug, Tikki, Alya, and other female characters.
3. Use the Male voice ({MALE_VOICE}) for Adrien, Cat Noir, Hawkmoth, Plagg, and other male characters.

Script:
{script}"#
    )
}

/// Split a raw model response at the separator line. A response without the
/// separator keeps its full text as the script and gets the fixed
/// placeholder as the post-credit scene; nothing is discarded either way.
fn split_script(full_text: &str) -> GeneratedScript {
    match full_text.split_once(SCRIPT_SEPARATOR) {
        Some((script, post_credit)) => GeneratedScript {
            script: script.trim().to_string(),
            post_credit_scene: post_credit.trim().to_string(),
        },
        None => GeneratedScript {
            script: full_text.trim().to_string(),
            post_credit_scene: POST_CREDIT_PLACEHOLDER.to_string(),
        },
    }
}

/// Degradation policy for idea generation: a provider failure serves the
/// fixed titles, a successful response is parsed as-is.
fn ideas_or_fallback(result: Result<Option<String>, StudioError>) -> Vec<String> {
    match result {
        Ok(text) => parse_show_ideas(text.as_deref().unwrap_or_default()),
        Err(e) => {
            log::warn!("Show idea generation failed, using fallback titles: {}", e);
            fallback_ideas()
        }
    }
}

/// Parse a comma-separated list of titles, dropping empty entries.
fn parse_show_ideas(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn fallback_ideas() -> Vec<String> {
    FALLBACK_IDEAS.iter().map(|s| s.to_string()).collect()
}

/// Character-boundary-safe prefix of at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            parts: vec![Part { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    multi_speaker_voice_config: MultiSpeakerVoiceConfig,
}

impl SpeechConfig {
    /// The studio's fixed voice bindings, one per gender-coded group.
    fn two_speakers() -> Self {
        Self {
            multi_speaker_voice_config: MultiSpeakerVoiceConfig {
                speaker_voice_configs: vec![
                    SpeakerVoiceConfig::prebuilt("Male Characters", MALE_VOICE),
                    SpeakerVoiceConfig::prebuilt("Female Characters", FEMALE_VOICE),
                ],
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSpeakerVoiceConfig {
    speaker_voice_configs: Vec<SpeakerVoiceConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerVoiceConfig {
    speaker: String,
    voice_config: VoiceConfig,
}

impl SpeakerVoiceConfig {
    fn prebuilt(speaker: &str, voice_name: &str) -> Self {
        Self {
            speaker: speaker.to_string(),
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First inline binary payload of the first candidate, as (mime, data).
    fn first_inline_data(&self) -> Option<(Option<String>, String)> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| (d.mime_type.clone(), d.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_script_at_separator() {
        let raw = "**SCENE 1**\nAction.\n---POST-CREDIT-SCENE---\nPlagg eats cheese.";
        let result = split_script(raw);
        assert_eq!(result.script, "**SCENE 1**\nAction.");
        assert_eq!(result.post_credit_scene, "Plagg eats cheese.");
    }

    #[test]
    fn test_split_script_without_separator_uses_placeholder() {
        let raw = "**SCENE 1**\nNo stinger here.";
        let result = split_script(raw);
        assert_eq!(result.script, "**SCENE 1**\nNo stinger here.");
        assert_eq!(result.post_credit_scene, "No post-credit scene generated.");
    }

    #[test]
    fn test_parse_show_ideas_trims_and_drops_empty() {
        let ideas = parse_show_ideas(" Tales of Paris , The Lost Kwamis ,, Future Imperfect,");
        assert_eq!(
            ideas,
            vec!["Tales of Paris", "The Lost Kwamis", "Future Imperfect"]
        );
    }

    #[test]
    fn test_parse_show_ideas_empty_input() {
        assert!(parse_show_ideas("").is_empty());
    }

    #[test]
    fn test_provider_failure_degrades_to_fallback_titles() {
        let ideas = ideas_or_fallback(Err(StudioError::Generation("boom".to_string())));
        assert_eq!(
            ideas,
            vec!["Tales of Paris", "The Lost Kwamis", "Future Imperfect"]
        );
    }

    #[test]
    fn test_successful_response_is_parsed_not_replaced() {
        let ideas = ideas_or_fallback(Ok(Some("Heroes Day, Akuma Rising".to_string())));
        assert_eq!(ideas, vec!["Heroes Day", "Akuma Rising"]);
        // An empty but successful response stays empty.
        assert!(ideas_or_fallback(Ok(None)).is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let text = "héllo".repeat(1000);
        let truncated = truncate_chars(&text, MAX_TTS_SCRIPT_CHARS);
        assert_eq!(truncated.chars().count(), MAX_TTS_SCRIPT_CHARS);
        // Short input passes through untouched.
        assert_eq!(truncate_chars("short", MAX_TTS_SCRIPT_CHARS), "short");
    }

    #[test]
    fn test_manual_key_mode_requires_custom_key() {
        let mut settings = crate::storage::UserSettings::default();
        settings.use_auto_key = false;
        settings.custom_api_key = String::new();

        assert!(matches!(
            GeminiClient::from_settings(&settings),
            Err(StudioError::Config(_))
        ));

        settings.custom_api_key = "user-key".to_string();
        let client = GeminiClient::from_settings(&settings).unwrap();
        assert_eq!(client.api_key, "user-key");
    }

    #[test]
    fn test_script_prompt_carries_separator_and_context() {
        let prompt = script_prompt("My Season", "Opening Night", "a premise", "no prior episodes");
        assert!(prompt.contains(SCRIPT_SEPARATOR));
        assert!(prompt.contains("My Season"));
        assert!(prompt.contains("Opening Night"));
        assert!(prompt.contains("no prior episodes"));
    }

    #[test]
    fn test_response_part_scan_finds_inline_data() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your image:"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let (mime, data) = response.first_inline_data().unwrap();
        assert_eq!(mime.as_deref(), Some("image/jpeg"));
        assert_eq!(data, "QUJD");
        assert_eq!(response.first_text().as_deref(), Some("Here is your image:"));
    }

    #[test]
    fn test_empty_candidates_yield_nothing() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_text().is_none());
        assert!(response.first_inline_data().is_none());
    }
}
