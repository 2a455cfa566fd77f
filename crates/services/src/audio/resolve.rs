//! Resolution of logical audio references to fetchable resources.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioResolverError {
    #[error("invalid base origin URL")]
    InvalidBaseOrigin,

    #[error("known prefix cannot be empty")]
    EmptyPrefix,
}

/// Configuration for audio reference resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResolverConfig {
    base_origin: Url,
    known_prefix: String,
    cache_dir: PathBuf,
}

impl AudioResolverConfig {
    /// Validated constructor.
    ///
    /// # Errors
    ///
    /// Returns `AudioResolverError` for an unparseable origin or an empty
    /// prefix.
    pub fn new(
        base_origin: &str,
        known_prefix: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self, AudioResolverError> {
        let base_origin =
            Url::parse(base_origin).map_err(|_| AudioResolverError::InvalidBaseOrigin)?;
        if !matches!(base_origin.scheme(), "http" | "https") {
            return Err(AudioResolverError::InvalidBaseOrigin);
        }
        let known_prefix = known_prefix.into();
        if known_prefix.trim().is_empty() {
            return Err(AudioResolverError::EmptyPrefix);
        }
        Ok(Self {
            base_origin,
            known_prefix,
            cache_dir: cache_dir.into(),
        })
    }
}

/// A reference resolved to something the coordinator can fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAudio {
    Remote(Url),
    Local(PathBuf),
}

impl ResolvedAudio {
    /// Stable string form, used as the autoplay de-duplication key.
    #[must_use]
    pub fn locator(&self) -> String {
        match self {
            ResolvedAudio::Remote(url) => url.to_string(),
            ResolvedAudio::Local(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Applies the fixed base/prefix resolution policy:
/// absolute URLs pass through, known-prefixed paths are rooted under the
/// configured origin, anything else is a bare filename under the cache dir.
#[derive(Debug, Clone)]
pub struct AudioResolver {
    config: AudioResolverConfig,
}

impl AudioResolver {
    #[must_use]
    pub fn new(config: AudioResolverConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn resolve(&self, reference: &str) -> ResolvedAudio {
        let reference = reference.trim();

        if let Ok(url) = Url::parse(reference) {
            if matches!(url.scheme(), "http" | "https") {
                return ResolvedAudio::Remote(url);
            }
        }

        if reference.starts_with(&self.config.known_prefix) {
            if let Ok(url) = self.config.base_origin.join(reference) {
                return ResolvedAudio::Remote(url);
            }
        }

        // Bare filename: strip any path components before rooting it.
        let file_name = Path::new(reference)
            .file_name()
            .map_or_else(|| reference.to_string(), |n| n.to_string_lossy().into_owned());
        ResolvedAudio::Local(self.config.cache_dir.join(file_name))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
