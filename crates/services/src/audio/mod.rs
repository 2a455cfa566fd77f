//! Audio playback coordination: reference resolution, de-duplicated
//! autoplay, and tone fallback.

mod resolve;
mod sink;

pub use resolve::{AudioResolver, AudioResolverConfig, AudioResolverError, ResolvedAudio};
pub use sink::{AudioSink, PlaybackSource, RodioSink, ToneSpec};

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::AudioError;

/// Owns the single active playback and the process-wide autoplay cache.
///
/// `play` never fails from the caller's point of view: fetch, decode, and
/// autoplay-block failures all degrade to the synthesized tone.
pub struct AudioCoordinator {
    sink: Box<dyn AudioSink>,
    resolver: AudioResolver,
    client: reqwest::Client,
    autoplayed: HashSet<String>,
}

impl AudioCoordinator {
    #[must_use]
    pub fn new(sink: Box<dyn AudioSink>, resolver: AudioResolver) -> Self {
        Self {
            sink,
            resolver,
            client: reqwest::Client::new(),
            autoplayed: HashSet::new(),
        }
    }

    /// Play the referenced resource, or the fallback tone when `reference`
    /// is missing or unplayable.
    ///
    /// With `auto` set, a resolved resource plays at most once until
    /// [`reset`](Self::reset) clears the cache; explicit (non-auto) playback
    /// always plays.
    pub async fn play(&mut self, reference: Option<&str>, auto: bool) {
        let Some(reference) = reference else {
            self.play_tone();
            return;
        };

        let resolved = self.resolver.resolve(reference);
        let locator = resolved.locator();

        if auto && !self.autoplayed.insert(locator.clone()) {
            debug!(%locator, "suppressing duplicate autoplay");
            return;
        }

        // Release the previous playback before fetching the next one.
        self.sink.stop();

        match self.fetch(&resolved).await {
            Ok(bytes) => {
                if let Err(err) = self.sink.play(PlaybackSource::Bytes(bytes)) {
                    warn!(%locator, %err, "sink rejected playback, falling back to tone");
                    self.play_tone();
                }
            }
            Err(err) => {
                warn!(%locator, %err, "audio fetch failed, falling back to tone");
                self.play_tone();
            }
        }
    }

    /// Clear the autoplay cache and stop playback.
    ///
    /// Invoked on session teardown and pack change so a new session can
    /// legitimately replay resources.
    pub fn reset(&mut self) {
        self.autoplayed.clear();
        self.sink.stop();
    }

    fn play_tone(&mut self) {
        if let Err(err) = self.sink.play(PlaybackSource::Tone(ToneSpec::default())) {
            warn!(%err, "fallback tone playback failed");
        }
    }

    async fn fetch(&self, resolved: &ResolvedAudio) -> Result<Vec<u8>, AudioError> {
        match resolved {
            ResolvedAudio::Remote(url) => {
                let response = self.client.get(url.clone()).send().await?;
                let response = response.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            ResolvedAudio::Local(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
