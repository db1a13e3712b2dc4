//! Provider credentials and selection.
//!
//! Keys are read from the environment exactly once at startup and injected
//! wherever they are needed, so tests can construct fake credential sets
//! without touching the process environment.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use vgen_models::GenerationMode;

/// Minimum plausible key length per provider.
const KIE_MIN_KEY_LEN: usize = 20;
const REPLICATE_MIN_KEY_LEN: usize = 30;
const HF_MIN_KEY_LEN: usize = 30;

/// An external video generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Kie,
    Replicate,
    HuggingFace,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Kie => "kie",
            ProviderKind::Replicate => "replicate",
            ProviderKind::HuggingFace => "huggingface",
        }
    }

    /// Whether this provider handles the given mode. Hugging Face has no
    /// text-to-video path.
    pub fn supports(&self, mode: GenerationMode) -> bool {
        match self {
            ProviderKind::Kie | ProviderKind::Replicate => true,
            ProviderKind::HuggingFace => mode == GenerationMode::Image,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of configured API keys, validated syntactically.
///
/// A present-but-malformed key (placeholder text, too short) is treated
/// identically to an absent one. That keeps a half-filled `.env` from
/// crashing requests or sending junk credentials upstream.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    kie: Option<String>,
    replicate: Option<String>,
    hugging_face: Option<String>,
    imgbb: Option<String>,
    kie_base_url: Option<String>,
}

impl ProviderCredentials {
    /// Read all provider keys from the environment. Missing keys degrade to
    /// demo mode, never a startup failure. This is the only place provider
    /// settings touch the environment; adapters receive them by injection.
    pub fn from_env() -> Self {
        let mut credentials = Self::new(
            std::env::var("KIE_API_KEY").ok(),
            std::env::var("REPLICATE_API_TOKEN").ok(),
            std::env::var("HF_API_TOKEN").ok(),
            std::env::var("IMGBB_API_KEY").ok(),
        );
        credentials.kie_base_url = std::env::var("KIE_BASE_URL").ok();
        credentials
    }

    /// Override the Kie endpoint (staging or test servers).
    pub fn with_kie_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.kie_base_url = Some(base_url.into());
        self
    }

    /// Build a credential set from raw values, discarding invalid keys.
    pub fn new(
        kie: Option<String>,
        replicate: Option<String>,
        hugging_face: Option<String>,
        imgbb: Option<String>,
    ) -> Self {
        Self {
            kie: kie.filter(|k| is_valid_key(k, KIE_MIN_KEY_LEN)),
            replicate: replicate.filter(|k| is_valid_key(k, REPLICATE_MIN_KEY_LEN)),
            hugging_face: hugging_face.filter(|k| is_valid_key(k, HF_MIN_KEY_LEN)),
            // imgbb is a relay key, not a generation credential; any
            // non-placeholder value is accepted.
            imgbb: imgbb.filter(|k| is_valid_key(k, 1)),
            kie_base_url: None,
        }
    }

    pub fn kie(&self) -> Option<&str> {
        self.kie.as_deref()
    }

    pub fn replicate(&self) -> Option<&str> {
        self.replicate.as_deref()
    }

    pub fn hugging_face(&self) -> Option<&str> {
        self.hugging_face.as_deref()
    }

    pub fn imgbb(&self) -> Option<&str> {
        self.imgbb.as_deref()
    }

    pub fn kie_base_url(&self) -> Option<&str> {
        self.kie_base_url.as_deref()
    }

    pub fn has_any(&self) -> bool {
        self.kie.is_some() || self.replicate.is_some() || self.hugging_face.is_some()
    }

    /// Usable providers for a mode, in fixed priority order.
    ///
    /// Kie > Replicate > Hugging Face; Hugging Face only does
    /// image-to-video. The orchestrator attempts these in order and falls
    /// through to the next on adapter failure.
    pub fn candidates(&self, mode: GenerationMode) -> Vec<ProviderKind> {
        let mut out = Vec::new();
        if self.kie.is_some() {
            out.push(ProviderKind::Kie);
        }
        if self.replicate.is_some() {
            out.push(ProviderKind::Replicate);
        }
        if self.hugging_face.is_some() {
            out.push(ProviderKind::HuggingFace);
        }
        out.retain(|kind| kind.supports(mode));
        out
    }
}

/// Placeholder shapes people leave in env files: `kie_...`,
/// `your_key_here`, `placeholder`, `xxx...`.
static PLACEHOLDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(?i)(kie_|r8_|hf_|sk-)?\.{3,}$",
        r"(?i)your_.*_here",
        r"(?i)placeholder",
        r"^(?i)(xxx|aaa|test)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("placeholder pattern compiles"))
    .collect()
});

/// Syntactic validation for an API key: long enough and not a placeholder.
pub fn is_valid_key(key: &str, min_len: usize) -> bool {
    let key = key.trim();
    if key.len() < min_len {
        return false;
    }
    !PLACEHOLDER_PATTERNS.iter().any(|p| p.is_match(key))
}
