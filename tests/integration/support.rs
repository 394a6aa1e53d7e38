//! Shared fixtures: fake providers, in-memory stores and sample content.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lexicast::config::LexicastConfig;
use lexicast::entity::{EntityStore, MemoryEntityStore};
use lexicast::error::PipelineError;
use lexicast::job::{JobContent, JobParams, JobStatusStore, MemoryJobStore};
use lexicast::pipeline::PipelineContext;
use lexicast::provider::{
    ProviderRegistry, RenderProvider, RenderRequest, SpeechProvider, SpeechRequest,
};
use lexicast::retry::RetryPolicy;
use lexicast::storage::{MemoryObjectStore, ObjectStore};
use lexicast::thumbnail::{Theme, ThumbnailParams};
use lexicast::tts::{SpeechProviderKind, TtsParams};
use lexicast::workflow::{MemoryStepLog, StepLog};
use lexicast::Lexicast;
use parking_lot::Mutex;

/// Speech backend that echoes its input. It rejects inputs containing a marker and can
/// simulate an outage.
pub struct FakeSpeech {
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
    fail_marker: Mutex<Option<String>>,
    reject_all: AtomicBool,
    unavailable: AtomicBool,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            fail_marker: Mutex::new(None),
            reject_all: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    pub fn fail_on(&self, marker: &str) {
        *self.fail_marker.lock() = Some(marker.to_string());
    }

    /// Reject every input with a 400.
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Answer every request with a 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    fn kind(&self) -> SpeechProviderKind {
        SpeechProviderKind::OpenAi
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(request.input.clone());
        let marked = self
            .fail_marker
            .lock()
            .as_deref()
            .is_some_and(|marker| request.input.contains(marker));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PipelineError::ProviderUnavailable {
                status: 503,
                message: "overloaded".to_string(),
            });
        }
        if marked || self.reject_all.load(Ordering::SeqCst) {
            return Err(PipelineError::ProviderRejected {
                status: 400,
                message: "refused".to_string(),
            });
        }
        Ok(request.input.as_bytes().to_vec())
    }
}

/// Renderer that returns the theme name as the image, failing for one theme when asked.
pub struct FakeRenderer {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    fail_theme: Mutex<Option<Theme>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            fail_theme: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn fail_on(&self, theme: Theme) {
        *self.fail_theme.lock() = Some(theme);
    }
}

#[async_trait]
impl RenderProvider for FakeRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(request.url.clone());
        if *self.fail_theme.lock() == Some(request.theme) {
            return Err(PipelineError::ProviderRejected {
                status: 422,
                message: "selector not found".to_string(),
            });
        }
        Ok(request.theme.as_str().as_bytes().to_vec())
    }
}

/// Retries without real waiting.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 1,
        max_delay_ms: 5,
        attempt_timeout_ms: 5_000,
    }
}

pub struct Harness {
    pub objects: Arc<MemoryObjectStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub entities: Arc<MemoryEntityStore>,
    pub steps: Arc<MemoryStepLog>,
    pub speech: Arc<FakeSpeech>,
    pub renderer: Arc<FakeRenderer>,
    pub lexicast: Lexicast,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LexicastConfig::default())
    }

    pub fn with_config(config: LexicastConfig) -> Self {
        let objects = Arc::new(MemoryObjectStore::default());
        let jobs = Arc::new(MemoryJobStore::new());
        let entities = Arc::new(MemoryEntityStore::new());
        let steps = Arc::new(MemoryStepLog::new());
        let speech = Arc::new(FakeSpeech::new());
        let renderer = Arc::new(FakeRenderer::new());

        let ctx = context(objects.clone(), jobs.clone(), entities.clone(), steps.clone());
        let lexicast = Lexicast::with_context(ctx, registry(&speech, &renderer), &config);
        Self {
            objects,
            jobs,
            entities,
            steps,
            speech,
            renderer,
            lexicast,
        }
    }
}

pub fn context(
    objects: Arc<dyn ObjectStore>,
    jobs: Arc<dyn JobStatusStore>,
    entities: Arc<dyn EntityStore>,
    steps: Arc<dyn StepLog>,
) -> PipelineContext {
    PipelineContext {
        objects,
        jobs,
        entities,
        steps,
        provider_retry: fast_retry(),
        upload_retry: fast_retry(),
    }
}

pub fn registry(speech: &Arc<FakeSpeech>, renderer: &Arc<FakeRenderer>) -> ProviderRegistry {
    ProviderRegistry::new()
        .with_speech(speech.clone())
        .with_renderer(renderer.clone())
}

/// A paragraph of exactly `len` characters that starts with `lead`.
pub fn paragraph(lead: &str, len: usize) -> String {
    let sentence = "The quick brown fox jumps over the lazy dog. ";
    let mut text = format!("{lead} {}", sentence.repeat(len / sentence.len() + 1));
    text.truncate(len - 1);
    let mut text = text.trim_end().to_string();
    while text.chars().count() < len - 1 {
        text.push('x');
    }
    text.push('.');
    text
}

/// Six 498-character paragraphs, about 3000 characters in all.
pub fn three_chunk_document(leads: [&str; 6]) -> String {
    leads
        .iter()
        .map(|lead| paragraph(lead, 498))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn markdown(text: &str) -> JobContent {
    JobContent::Markdown {
        markdown: text.to_string(),
    }
}

pub fn openai_params() -> JobParams {
    JobParams::Tts(TtsParams {
        provider: Some("openai".to_string()),
        voice_id: Some("alloy".to_string()),
        ..TtsParams::default()
    })
}

pub fn thumbnail_params() -> JobParams {
    JobParams::Thumbnail(ThumbnailParams::default())
}
