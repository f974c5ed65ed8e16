//! Configuration types for page extraction.
//!
//! Two values are resolved once at startup and passed down explicitly:
//!
//! * [`ExtractionConfig`] — rendering and request knobs, built via
//!   [`ExtractionConfigBuilder`].
//! * [`ServiceSettings`] — which extraction provider and model to use, and
//!   proof that its credentials are present. Resolution fails with
//!   [`ExtractError::Configuration`] so a binary can refuse to start instead
//!   of failing on the first page.

use crate::error::ExtractError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Environment variable naming the extraction provider.
pub const PROVIDER_ENV: &str = "PDF_EXTRACT_PROVIDER";

/// Environment variable naming the model.
pub const MODEL_ENV: &str = "PDF_EXTRACT_MODEL";

/// Known providers: `(name, credential variables, default vision model)`.
///
/// Order matters for auto-detection: the first provider with any of its
/// credential variables set wins. Variables are tried left to right.
const KNOWN_PROVIDERS: &[(&str, &[&str], &str)] = &[
    ("gemini", &["GEMINI_API_KEY", "GOOGLE_API_KEY"], "gemini-2.0-flash"),
    ("openai", &["OPENAI_API_KEY"], "gpt-4.1-nano"),
    ("anthropic", &["ANTHROPIC_API_KEY"], "claude-sonnet-4-20250514"),
    ("mistral", &["MISTRAL_API_KEY"], "pixtral-12b-2409"),
    ("ollama", &[], "llava"),
    ("lmstudio", &[], "llava"),
];

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_data_extractor::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(150)
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 36–400.
    /// Default: 72, the PDF's native resolution (one pixel per point).
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps oversized pages (posters, drawings) independently of DPI.
    pub max_rendered_pixels: u32,

    /// Pre-constructed LLM provider. Takes precedence over [`ServiceSettings`].
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the extraction call. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the service may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Per-page extraction call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom instruction. If None, uses [`crate::prompts::DEFAULT_INSTRUCTION`].
    pub instruction: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 72,
            max_rendered_pixels: 2000,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 60,
            instruction: None,
            password: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction sent with every page.
    pub fn instruction(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
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

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if let Some(ref instruction) = c.instruction {
            if instruction.trim().is_empty() {
                return Err(ExtractError::InvalidConfig(
                    "instruction must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Service settings ─────────────────────────────────────────────────────

/// Resolved extraction-service selection.
///
/// Holds the provider name and model, plus the environment variable that
/// satisfied the credential check (`None` for local providers). The key
/// itself is never stored; the provider factory reads it when the client
/// is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub provider: String,
    pub model: String,
    pub credential_var: Option<&'static str>,
}

impl ServiceSettings {
    /// Resolve settings from the process environment.
    ///
    /// Explicit arguments take precedence over [`PROVIDER_ENV`] / [`MODEL_ENV`].
    pub fn from_env(
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, ExtractError> {
        Self::resolve(provider, model, |var| std::env::var(var).ok())
    }

    /// Resolve settings with a custom variable lookup.
    ///
    /// 1. Provider: `provider` argument, then [`PROVIDER_ENV`], then the first
    ///    known provider whose credential variable is set.
    /// 2. Model: `model` argument, then [`MODEL_ENV`], then the provider's
    ///    default vision model.
    /// 3. The provider's credential variable must be set and non-empty.
    pub fn resolve<F>(
        provider: Option<&str>,
        model: Option<&str>,
        lookup: F,
    ) -> Result<Self, ExtractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let provider = match provider.map(str::to_string).or_else(|| non_empty(PROVIDER_ENV)) {
            Some(name) => name.trim().to_lowercase(),
            None => auto_detect(&non_empty).ok_or_else(|| ExtractError::Configuration {
                provider: "auto".to_string(),
                hint: "No extraction service credentials found.\n\
                       Set GEMINI_API_KEY (or GOOGLE_API_KEY), OPENAI_API_KEY, ANTHROPIC_API_KEY \
                       or MISTRAL_API_KEY, or choose a local provider with PDF_EXTRACT_PROVIDER=ollama."
                    .to_string(),
            })?,
        };

        let known = KNOWN_PROVIDERS.iter().find(|(name, _, _)| *name == provider);

        let model = model
            .map(str::to_string)
            .or_else(|| non_empty(MODEL_ENV))
            .or_else(|| known.map(|(_, _, default_model)| default_model.to_string()))
            .ok_or_else(|| ExtractError::Configuration {
                provider: provider.clone(),
                hint: format!("No default model for provider '{provider}'. Set {MODEL_ENV}."),
            })?;

        let vars: &[&'static str] = known.map(|(_, vars, _)| *vars).unwrap_or(&[]);
        let credential_var = vars.iter().copied().find(|var| non_empty(*var).is_some());
        if credential_var.is_none() && !vars.is_empty() {
            return Err(ExtractError::Configuration {
                provider,
                hint: format!(
                    "Set {} in the environment or in a .env file.",
                    vars.join(" or ")
                ),
            });
        }

        Ok(Self {
            provider,
            model,
            credential_var,
        })
    }
}

fn auto_detect<F>(non_empty: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    KNOWN_PROVIDERS
        .iter()
        .find(|(_, vars, _)| vars.iter().any(|v| non_empty(*v).is_some()))
        .map(|(name, _, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.instruction(), crate::prompts::DEFAULT_INSTRUCTION);
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 36);
        let c = ExtractionConfig::builder().dpi(9000).build().unwrap();
        assert_eq!(c.dpi, 400);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ExtractionConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_instruction() {
        let err = ExtractionConfig::builder().instruction("   ").build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn auto_detects_first_available_provider() {
        let s = ServiceSettings::resolve(
            None,
            None,
            lookup(&[("OPENAI_API_KEY", "sk-1"), ("MISTRAL_API_KEY", "m-1")]),
        )
        .unwrap();
        assert_eq!(s.provider, "openai");
        assert_eq!(s.model, "gpt-4.1-nano");
        assert_eq!(s.credential_var, Some("OPENAI_API_KEY"));
    }

    #[test]
    fn gemini_wins_when_present() {
        let s = ServiceSettings::resolve(
            None,
            None,
            lookup(&[("OPENAI_API_KEY", "sk-1"), ("GEMINI_API_KEY", "g-1")]),
        )
        .unwrap();
        assert_eq!(s.provider, "gemini");
    }

    #[test]
    fn google_api_key_selects_gemini() {
        let s = ServiceSettings::resolve(None, None, lookup(&[("GOOGLE_API_KEY", "g-1")])).unwrap();
        assert_eq!(s.provider, "gemini");
        assert_eq!(s.model, "gemini-2.0-flash");
        assert_eq!(s.credential_var, Some("GOOGLE_API_KEY"));
    }

    #[test]
    fn gemini_key_preferred_over_google_key() {
        let s = ServiceSettings::resolve(
            Some("gemini"),
            None,
            lookup(&[("GOOGLE_API_KEY", "g-1"), ("GEMINI_API_KEY", "g-2")]),
        )
        .unwrap();
        assert_eq!(s.credential_var, Some("GEMINI_API_KEY"));
    }

    #[test]
    fn explicit_gemini_without_keys_names_both_variables() {
        let err = ServiceSettings::resolve(Some("gemini"), None, lookup(&[])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("GEMINI_API_KEY or GOOGLE_API_KEY"), "got: {msg}");
    }

    #[test]
    fn missing_credentials_is_configuration_error() {
        let err = ServiceSettings::resolve(None, None, lookup(&[])).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
    }

    #[test]
    fn explicit_provider_requires_its_key() {
        let err = ServiceSettings::resolve(
            Some("anthropic"),
            None,
            lookup(&[("OPENAI_API_KEY", "sk-1")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"), "got: {err}");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err =
            ServiceSettings::resolve(Some("openai"), None, lookup(&[("OPENAI_API_KEY", "  ")]))
                .unwrap_err();
        assert!(matches!(err, ExtractError::Configuration { .. }));
    }

    #[test]
    fn env_provider_and_model() {
        let s = ServiceSettings::resolve(
            None,
            None,
            lookup(&[(PROVIDER_ENV, "Ollama"), (MODEL_ENV, "llama3.2-vision")]),
        )
        .unwrap();
        assert_eq!(s.provider, "ollama");
        assert_eq!(s.model, "llama3.2-vision");
        assert_eq!(s.credential_var, None);
    }

    #[test]
    fn unknown_provider_needs_model() {
        let err = ServiceSettings::resolve(Some("custom"), None, lookup(&[])).unwrap_err();
        assert!(err.to_string().contains(MODEL_ENV));
        let s = ServiceSettings::resolve(Some("custom"), Some("m"), lookup(&[])).unwrap();
        assert_eq!(s.model, "m");
    }
}
