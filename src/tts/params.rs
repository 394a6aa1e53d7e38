//! Narration parameters and provider resolution.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{opt_part, FingerprintParams};

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_GOOGLE_VOICE: &str = "en-US-Standard-C";
pub const DEFAULT_OPENAI_VOICE: &str = "alloy";
pub const DEFAULT_KOKORO_VOICE: &str = "af_heart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Ogg,
    Wav,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" | "opus" => Ok(AudioFormat::Ogg),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("unsupported audio format: {other}")),
        }
    }
}

/// Speech synthesis backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProviderKind {
    OpenAi,
    Google,
    Kokoro,
}

impl SpeechProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpeechProviderKind::OpenAi => "openai",
            SpeechProviderKind::Google => "google",
            SpeechProviderKind::Kokoro => "kokoro",
        }
    }

    /// Whether the backend accepts SSML input
    pub fn supports_ssml(self) -> bool {
        matches!(self, SpeechProviderKind::Google)
    }
}

impl std::fmt::Display for SpeechProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narration parameters as requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsParams {
    /// Requested provider name; resolved with [`choose_provider`]
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub sample_rate_hz: Option<u32>,
}

fn default_speed() -> f32 {
    1.0
}

impl Default for TtsParams {
    fn default() -> Self {
        Self {
            provider: None,
            voice_id: None,
            speed: default_speed(),
            format: AudioFormat::default(),
            language_code: None,
            sample_rate_hz: None,
        }
    }
}

impl TtsParams {
    /// Resolve provider, voice and language defaults.
    pub fn resolve(&self, kokoro_available: bool) -> ResolvedTts {
        let provider = choose_provider(
            self.provider.as_deref(),
            self.language_code.as_deref(),
            kokoro_available,
        );
        let language_code = self
            .language_code
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let voice_id = self
            .voice_id
            .clone()
            .unwrap_or_else(|| default_voice(provider, &language_code).to_string());
        ResolvedTts {
            provider,
            voice_id,
            speed: self.speed,
            format: self.format,
            language_code,
            sample_rate_hz: self.sample_rate_hz,
        }
    }
}

impl FingerprintParams for TtsParams {
    fn fingerprint_parts(&self) -> Vec<String> {
        // the requested provider string, not the resolved one
        vec![
            "tts".to_string(),
            opt_part(self.provider.as_deref()),
            opt_part(self.voice_id.as_deref()),
            self.speed.to_string(),
            self.format.extension().to_string(),
            opt_part(self.language_code.as_deref()),
            opt_part(self.sample_rate_hz),
        ]
    }
}

/// Parameters after defaults and provider resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTts {
    pub provider: SpeechProviderKind,
    pub voice_id: String,
    pub speed: f32,
    pub format: AudioFormat,
    pub language_code: String,
    pub sample_rate_hz: Option<u32>,
}

impl ResolvedTts {
    /// Parameter tuple mixed into every chunk hash.
    pub fn unit_hash_parts(&self) -> Vec<String> {
        vec![
            self.provider.as_str().to_string(),
            self.voice_id.clone(),
            self.speed.to_string(),
            self.language_code.clone(),
            opt_part(self.sample_rate_hz),
            self.format.extension().to_string(),
        ]
    }
}

/// Pick a backend for the request.
///
/// `apple_say` and `xtts` are legacy names served by Kokoro. Explicit names win; otherwise
/// Japanese and Swedish go to Kokoro when it is configured, other non-English languages go to
/// Google, and everything else to OpenAI.
pub fn choose_provider(
    requested: Option<&str>,
    language_code: Option<&str>,
    kokoro_available: bool,
) -> SpeechProviderKind {
    let requested = requested.map(|r| r.trim().to_ascii_lowercase());
    match requested.as_deref() {
        Some("apple_say") | Some("xtts") | Some("kokoro") => return SpeechProviderKind::Kokoro,
        Some("openai") => return SpeechProviderKind::OpenAi,
        Some("google") => return SpeechProviderKind::Google,
        _ => {}
    }

    let lang = language_code.unwrap_or_default().to_ascii_lowercase();
    if kokoro_available && (lang.starts_with("ja") || lang.starts_with("sv")) {
        return SpeechProviderKind::Kokoro;
    }
    if !lang.is_empty() && !lang.starts_with("en") {
        return SpeechProviderKind::Google;
    }
    SpeechProviderKind::OpenAi
}

pub fn default_voice(provider: SpeechProviderKind, language_code: &str) -> &'static str {
    match provider {
        SpeechProviderKind::Google => DEFAULT_GOOGLE_VOICE,
        SpeechProviderKind::OpenAi => DEFAULT_OPENAI_VOICE,
        SpeechProviderKind::Kokoro => {
            let lang = language_code.to_ascii_lowercase();
            if lang.starts_with("sv") {
                "Erik"
            } else if lang.starts_with("ja") {
                "ja_female"
            } else {
                DEFAULT_KOKORO_VOICE
            }
        }
    }
}
