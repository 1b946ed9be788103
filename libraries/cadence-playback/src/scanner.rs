//! File-backed trailing-silence scanner using Symphonia

use cadence_core::{CoreError, Locator, Result, SignalExtent, SilenceScanner};
use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Decodes a whole file and reports where its audible signal ends
///
/// Supports whatever the enabled Symphonia codecs support (MP3, FLAC, OGG,
/// WAV, AAC, ...). Only `file://` locators and bare paths can be scanned.
#[derive(Debug, Clone)]
pub struct SymphoniaScanner {
    threshold: f32,
}

impl SymphoniaScanner {
    /// Create a scanner treating |sample| <= `threshold` as silence
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.abs(),
        }
    }
}

impl Default for SymphoniaScanner {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SilenceScanner for SymphoniaScanner {
    fn scan(&self, locator: &Locator, cancelled: &AtomicBool) -> Result<Option<SignalExtent>> {
        let path = locator
            .to_path()
            .ok_or_else(|| CoreError::UnsupportedLocator(locator.to_string()))?;

        let file = File::open(&path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| CoreError::audio(format!("Failed to probe file: {e}")))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CoreError::audio("No audio tracks found"))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CoreError::audio(format!("Failed to create decoder: {e}")))?;

        let mut frames_total: u64 = 0;
        let mut last_audible_frame: Option<u64> = None;
        let mut samples: Option<SampleBuffer<f32>> = None;

        loop {
            if cancelled.load(Ordering::Acquire) {
                trace!(%locator, "Scan cancelled");
                return Ok(None);
            }

            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(CoreError::audio(format!("Error reading packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(%locator, error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(CoreError::audio(format!("Decode error: {e}"))),
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            let channels = spec.channels.count().max(1);
            let frames = decoded.frames() as u64;

            let needed = decoded.capacity() * channels;
            if samples.as_ref().map_or(true, |b| b.capacity() < needed) {
                samples = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }
            let Some(buffer) = samples.as_mut() else {
                continue;
            };
            buffer.copy_interleaved_ref(decoded);

            let threshold = self.threshold;
            if let Some(frame) = buffer
                .samples()
                .chunks(channels)
                .rposition(|frame| frame.iter().any(|s| s.abs() > threshold))
            {
                last_audible_frame = Some(frames_total + frame as u64 + 1);
            }
            frames_total += frames;
        }

        let to_time = |frames: u64| Duration::from_secs_f64(frames as f64 / f64::from(sample_rate.max(1)));
        let extent = SignalExtent {
            total: to_time(frames_total),
            last_audible: last_audible_frame.map(to_time),
        };
        debug!(
            %locator,
            total_ms = extent.total.as_millis() as u64,
            last_audible_ms = extent.last_audible.map(|d| d.as_millis() as u64),
            "Scanned signal extent"
        );
        Ok(Some(extent))
    }
}
