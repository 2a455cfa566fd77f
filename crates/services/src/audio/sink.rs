//! Audio sink abstraction and the rodio-backed implementation.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::AudioError;

/// Fallback tone: a fixed-frequency decaying oscillator.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub sample_rate: u32,
    pub duration: Duration,
    pub amplitude: f32,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            sample_rate: 44_100,
            duration: Duration::from_millis(450),
            amplitude: 0.4,
        }
    }
}

impl ToneSpec {
    /// Render the tone into mono f32 samples with an exponential decay.
    #[must_use]
    pub fn samples(&self) -> Vec<f32> {
        let total = (self.sample_rate as f32 * self.duration.as_secs_f32()) as usize;
        let mut samples = Vec::with_capacity(total);
        for n in 0..total {
            let t = n as f32 / self.sample_rate as f32;
            let envelope = (-6.0 * t / self.duration.as_secs_f32()).exp();
            let value =
                (t * self.frequency_hz * 2.0 * std::f32::consts::PI).sin() * envelope;
            samples.push(value * self.amplitude);
        }
        samples
    }
}

/// What to feed the sink: fetched encoded bytes, or the synthesized tone.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackSource {
    Bytes(Vec<u8>),
    Tone(ToneSpec),
}

/// Owns at most one active playback; starting a new source stops the old one.
pub trait AudioSink: Send + Sync {
    /// Begin playback of `source`, replacing any current playback.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::Sink` when the underlying device is gone.
    fn play(&mut self, source: PlaybackSource) -> Result<(), AudioError>;

    /// Stop and release the current playback, if any.
    fn stop(&mut self);
}

//
// ─── RODIO BACKEND ─────────────────────────────────────────────────────────────
//

enum SinkCommand {
    Play(PlaybackSource),
    Stop,
    Shutdown,
}

/// Rodio-backed sink.
///
/// The rodio `OutputStream` is not `Send`, so a dedicated playback thread
/// owns it; this handle only sends commands. Dropping the handle shuts the
/// thread down, pausing playback and releasing the device.
pub struct RodioSink {
    tx: mpsc::Sender<SinkCommand>,
}

impl RodioSink {
    /// Open the default output device on a dedicated playback thread.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::Sink` when no output device is available.
    pub fn new() -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel::<SinkCommand>();
        let (init_tx, init_rx) = mpsc::channel::<bool>();

        thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || playback_thread(&rx, &init_tx))
            .map_err(|_| AudioError::Sink)?;

        match init_rx.recv() {
            Ok(true) => Ok(Self { tx }),
            _ => Err(AudioError::Sink),
        }
    }
}

impl AudioSink for RodioSink {
    fn play(&mut self, source: PlaybackSource) -> Result<(), AudioError> {
        self.tx
            .send(SinkCommand::Play(source))
            .map_err(|_| AudioError::Sink)
    }

    fn stop(&mut self) {
        let _ = self.tx.send(SinkCommand::Stop);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.tx.send(SinkCommand::Shutdown);
    }
}

fn playback_thread(rx: &mpsc::Receiver<SinkCommand>, init_tx: &mpsc::Sender<bool>) {
    let Ok((_stream, handle)) = rodio::OutputStream::try_default() else {
        warn!("no audio output device available");
        let _ = init_tx.send(false);
        return;
    };
    let _ = init_tx.send(true);

    let mut current: Option<rodio::Sink> = None;

    while let Ok(command) = rx.recv() {
        match command {
            SinkCommand::Play(source) => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
                let Ok(sink) = rodio::Sink::try_new(&handle) else {
                    warn!("failed to open playback sink");
                    continue;
                };
                match source {
                    PlaybackSource::Bytes(bytes) => {
                        match rodio::Decoder::new(Cursor::new(bytes)) {
                            Ok(decoded) => sink.append(decoded),
                            Err(err) => {
                                // Decode failure degrades to the tone.
                                warn!(%err, "audio decode failed, playing fallback tone");
                                append_tone(&sink, &ToneSpec::default());
                            }
                        }
                    }
                    PlaybackSource::Tone(tone) => append_tone(&sink, &tone),
                }
                current = Some(sink);
            }
            SinkCommand::Stop => {
                if let Some(sink) = current.take() {
                    sink.stop();
                }
            }
            SinkCommand::Shutdown => break,
        }
    }

    if let Some(sink) = current.take() {
        sink.pause();
        sink.stop();
    }
}

fn append_tone(sink: &rodio::Sink, tone: &ToneSpec) {
    let buffer = rodio::buffer::SamplesBuffer::new(1, tone.sample_rate, tone.samples());
    sink.append(buffer);
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_renders_expected_length() {
        let tone = ToneSpec::default();
        let samples = tone.samples();
        let expected = (tone.sample_rate as f32 * tone.duration.as_secs_f32()) as usize;
        assert_eq!(samples.len(), expected);
    }

    #[test]
    fn tone_decays_toward_silence() {
        let samples = ToneSpec::default().samples();
        let head: f32 = samples[..100].iter().map(|s| s.abs()).fold(0.0, f32::max);
        let tail: f32 = samples[samples.len() - 100..]
            .iter()
            .map(|s| s.abs())
            .fold(0.0, f32::max);
        assert!(head > tail * 4.0, "head {head} should dominate tail {tail}");
    }

    #[test]
    fn tone_stays_within_amplitude() {
        let tone = ToneSpec::default();
        assert!(tone.samples().iter().all(|s| s.abs() <= tone.amplitude));
    }
}
