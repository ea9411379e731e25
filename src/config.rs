//! Configuration types for quiz generation.
//!
//! Two kinds of configuration live here:
//!
//! * [`QuizConfig`]: what the user asked for (difficulty, count, question
//!   type, language mode). Immutable, constructed once per request.
//! * [`GenerationConfig`]: how the pipelines run (model, API key, OCR
//!   binary, timeouts, concurrency, callbacks). Built via its
//!   [`GenerationConfigBuilder`] and cheap to clone.
//!
//! The API key and model are resolved from the process environment at call
//! time (see [`GenerationConfig::resolve_api_key`]) so a long-lived config
//! picks up a key exported after it was built.

use crate::error::Pdf2QuizError;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_MAX_PROMPT_CHARS;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Model used when neither the config nor `GEMINI_MODEL` names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Primary environment variable holding the generation API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Secondary environment variable consulted when [`API_KEY_ENV`] is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable naming the generation model.
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// Environment variable overriding the generation API host.
pub const API_BASE_ENV: &str = "GEMINI_API_BASE";

/// Default generation API host.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

// ── Quiz parameters ──────────────────────────────────────────────────────

/// Requested difficulty of the generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Which kinds of question the model should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// A mix of multiple-choice and short-answer questions. (default)
    #[default]
    Mixed,
    MultipleChoice,
    ShortAnswer,
}

/// Output language(s) of the generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    /// Everything in English. (default)
    #[default]
    English,
    /// Everything in Hindi (Devanagari).
    Hindi,
    /// Every question carries an English and a Hindi rendering.
    Bilingual,
}

impl LanguageMode {
    /// Tesseract language hint for pages that need optical recognition.
    pub fn ocr_hint(&self) -> &'static str {
        match self {
            LanguageMode::English => "eng",
            LanguageMode::Hindi => "hin",
            LanguageMode::Bilingual => "eng+hin",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageMode::English => "English",
            LanguageMode::Hindi => "Hindi",
            LanguageMode::Bilingual => "Bilingual (English + Hindi)",
        }
    }
}

/// Immutable quiz parameters for one generation request.
///
/// Deserialisation goes through [`QuizConfig::new`], so the count limits
/// hold for configs read from JSON too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizConfigFields")]
pub struct QuizConfig {
    difficulty: Difficulty,
    question_count: usize,
    question_type: QuestionType,
    language_mode: LanguageMode,
}

impl QuizConfig {
    /// Largest question count accepted for a single request.
    pub const MAX_QUESTIONS: usize = 100;

    /// Validate and construct a quiz configuration.
    pub fn new(
        difficulty: Difficulty,
        question_count: usize,
        question_type: QuestionType,
        language_mode: LanguageMode,
    ) -> Result<Self, Pdf2QuizError> {
        if question_count == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "Question count must be ≥ 1".into(),
            ));
        }
        if question_count > Self::MAX_QUESTIONS {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "Question count must be ≤ {}, got {}",
                Self::MAX_QUESTIONS,
                question_count
            )));
        }
        Ok(Self {
            difficulty,
            question_count,
            question_type,
            language_mode,
        })
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn language_mode(&self) -> LanguageMode {
        self.language_mode
    }
}

#[derive(Deserialize)]
struct QuizConfigFields {
    difficulty: Difficulty,
    question_count: usize,
    question_type: QuestionType,
    language_mode: LanguageMode,
}

impl TryFrom<QuizConfigFields> for QuizConfig {
    type Error = Pdf2QuizError;

    fn try_from(f: QuizConfigFields) -> Result<Self, Self::Error> {
        QuizConfig::new(f.difficulty, f.question_count, f.question_type, f.language_mode)
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            question_count: 10,
            question_type: QuestionType::default(),
            language_mode: LanguageMode::default(),
        }
    }
}

// ── Page range ───────────────────────────────────────────────────────────

/// An inclusive, 1-indexed page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A range covering a single page.
    pub fn single(page: usize) -> Self {
        Self::new(page, page)
    }

    /// Clamp the range into `1..=total_pages`.
    ///
    /// Stale UI state must not fail the request: a reversed range is
    /// reordered, `start` is raised to 1, `end` is lowered to the page count,
    /// and a start beyond the last page collapses onto the last page.
    /// Returns `None` only for a document without pages.
    pub fn clamp(&self, total_pages: usize) -> Option<PageRange> {
        if total_pages == 0 {
            return None;
        }
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        let end = hi.clamp(1, total_pages);
        let start = lo.clamp(1, end);
        Some(PageRange { start, end })
    }

    /// Number of pages in the range (assumes `start <= end`).
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Iterate page numbers in ascending order.
    pub fn pages(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "page {}", self.start)
        } else {
            write!(f, "pages {}-{}", self.start, self.end)
        }
    }
}

// ── Pipeline configuration ───────────────────────────────────────────────

/// Configuration for the acquisition and synthesis pipelines.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2quiz::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gemini-2.0-flash")
///     .api_timeout_secs(90)
///     .ocr_concurrency(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Generation model. If None, `GEMINI_MODEL` or [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// API key override. If None, read from `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    /// when the request is made.
    pub api_key: Option<String>,

    /// API host override. If None, `GEMINI_API_BASE` or [`DEFAULT_API_BASE`].
    pub api_base_url: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "ollama"). When set, the
    /// prompt goes through edgequake-llm instead of the Gemini REST API.
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake-llm provider. Takes precedence over everything.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Output token cap for edgequake-llm providers. Default: 8192.
    pub max_tokens: usize,

    /// Timeout for the generation call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Whether sparse pages are sent through optical recognition. Default: true.
    pub ocr_enabled: bool,

    /// Path or name of the tesseract binary. Default: "tesseract".
    pub tesseract_path: String,

    /// Upscaling factor for pages rendered for recognition. Default: 1.5.
    pub render_scale: f32,

    /// Pages whose native text has fewer non-whitespace characters than this
    /// are recognized optically. Default: 30.
    pub min_native_chars: usize,

    /// Pages in flight at once during acquisition. Default: 1 (sequential).
    ///
    /// Output order is by page number whatever the value.
    pub ocr_concurrency: usize,

    /// Character budget of the text embedded in the prompt. Default: 30 000.
    pub max_prompt_chars: usize,

    /// Progress events for the acquisition and synthesis stages.
    pub progress_callback: Option<ProgressCallback>,

    /// Cancels the request at the next suspension point when triggered.
    pub cancellation: Option<CancellationToken>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            api_key: None,
            api_base_url: None,
            provider_name: None,
            provider: None,
            temperature: None,
            max_tokens: 8192,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            ocr_enabled: true,
            tesseract_path: "tesseract".to_string(),
            render_scale: 1.5,
            min_native_chars: 30,
            ocr_concurrency: 1,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            progress_callback: None,
            cancellation: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ocr_enabled", &self.ocr_enabled)
            .field("tesseract_path", &self.tesseract_path)
            .field("render_scale", &self.render_scale)
            .field("min_native_chars", &self.min_native_chars)
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model for this request: config, then `GEMINI_MODEL`, then [`DEFAULT_MODEL`].
    pub fn resolve_model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| non_empty_env(MODEL_ENV))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// API key for this request, read from the environment at call time.
    ///
    /// Fails fast with [`Pdf2QuizError::MissingApiKey`] so no network call
    /// is attempted without credentials.
    pub fn resolve_api_key(&self) -> Result<String, Pdf2QuizError> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| non_empty_env(API_KEY_ENV))
            .or_else(|| non_empty_env(FALLBACK_API_KEY_ENV))
            .ok_or(Pdf2QuizError::MissingApiKey {
                env_var: API_KEY_ENV,
            })
    }

    /// API host for this request without a trailing slash.
    pub fn resolve_api_base(&self) -> String {
        self.api_base_url
            .clone()
            .or_else(|| non_empty_env(API_BASE_ENV))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// The cancellation token for this request (a fresh, never-cancelled one
    /// when none was configured).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone().unwrap_or_default()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = Some(url.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<String>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn min_native_chars(mut self, n: usize) -> Self {
        self.config.min_native_chars = n;
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.config.cancellation = Some(token);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Pdf2QuizError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "Render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        if c.ocr_concurrency == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "OCR concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_prompt_chars < 1_000 {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "Prompt character budget must be ≥ 1000, got {}",
                c.max_prompt_chars
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "API timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_hint_per_language_mode() {
        assert_eq!(LanguageMode::English.ocr_hint(), "eng");
        assert_eq!(LanguageMode::Hindi.ocr_hint(), "hin");
        assert_eq!(LanguageMode::Bilingual.ocr_hint(), "eng+hin");
    }

    #[test]
    fn quiz_config_rejects_zero_count() {
        let err = QuizConfig::new(
            Difficulty::Easy,
            0,
            QuestionType::Mixed,
            LanguageMode::English,
        )
        .unwrap_err();
        assert!(matches!(err, Pdf2QuizError::InvalidConfig(_)));
    }

    #[test]
    fn quiz_config_deserialises_through_validation() {
        let ok: QuizConfig = serde_json::from_str(
            r#"{"difficulty":"hard","question_count":12,"question_type":"mixed","language_mode":"hindi"}"#,
        )
        .unwrap();
        assert_eq!(ok.question_count(), 12);
        assert_eq!(ok.language_mode(), LanguageMode::Hindi);

        for count in [0, 101] {
            let json = format!(
                r#"{{"difficulty":"easy","question_count":{count},"question_type":"mixed","language_mode":"english"}}"#
            );
            assert!(serde_json::from_str::<QuizConfig>(&json).is_err(), "count {count}");
        }
    }

    #[test]
    fn quiz_config_accessors() {
        let q = QuizConfig::new(
            Difficulty::Hard,
            5,
            QuestionType::ShortAnswer,
            LanguageMode::Bilingual,
        )
        .unwrap();
        assert_eq!(q.difficulty(), Difficulty::Hard);
        assert_eq!(q.question_count(), 5);
        assert_eq!(q.question_type(), QuestionType::ShortAnswer);
        assert_eq!(q.language_mode(), LanguageMode::Bilingual);
    }

    #[test]
    fn page_range_clamps_end_and_start() {
        assert_eq!(PageRange::new(0, 50).clamp(10), Some(PageRange::new(1, 10)));
        assert_eq!(PageRange::new(3, 5).clamp(10), Some(PageRange::new(3, 5)));
        assert_eq!(PageRange::new(12, 20).clamp(10), Some(PageRange::new(10, 10)));
    }

    #[test]
    fn page_range_reversed_is_reordered() {
        assert_eq!(PageRange::new(7, 2).clamp(10), Some(PageRange::new(2, 7)));
    }

    #[test]
    fn page_range_empty_document() {
        assert_eq!(PageRange::new(1, 1).clamp(0), None);
    }

    #[test]
    fn page_range_len_and_display() {
        let r = PageRange::new(4, 8);
        assert_eq!(r.len(), 5);
        assert_eq!(r.pages().collect::<Vec<_>>(), vec![4, 5, 6, 7, 8]);
        assert_eq!(r.to_string(), "pages 4-8");
        assert_eq!(PageRange::single(2).to_string(), "page 2");
    }

    #[test]
    fn builder_defaults() {
        let c = GenerationConfig::builder().build().unwrap();
        assert_eq!(c.render_scale, 1.5);
        assert_eq!(c.min_native_chars, 30);
        assert_eq!(c.max_prompt_chars, DEFAULT_MAX_PROMPT_CHARS);
        assert_eq!(c.ocr_concurrency, 1);
        assert!(c.ocr_enabled);
    }

    #[test]
    fn builder_rejects_bad_scale() {
        let err = GenerationConfig::builder()
            .render_scale(10.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Render scale"));
    }

    #[test]
    fn explicit_model_and_key_win() {
        let c = GenerationConfig::builder()
            .model("gemini-2.5-pro")
            .api_key("k-123")
            .api_base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.resolve_model(), "gemini-2.5-pro");
        assert_eq!(c.resolve_api_key().unwrap(), "k-123");
        assert_eq!(c.resolve_api_base(), "http://localhost:8080");
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = GenerationConfig::builder()
            .api_key("super-secret")
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("hunter2"));
    }
}
