//! Script narration decode and playback.
//!
//! The speech provider returns headerless little-endian 16-bit PCM at a
//! fixed sample rate. This module decodes that payload into normalized
//! per-channel samples and drives a single playback session against the
//! default output device.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::StudioError;

/// Sample rate of provider speech audio.
pub const TTS_SAMPLE_RATE: u32 = 24000;
/// Provider speech audio is mono.
pub const TTS_CHANNELS: usize = 1;

const PCM_SCALE: f32 = 32768.0;

/// Decode a base64 payload into raw bytes.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, StudioError> {
    BASE64
        .decode(data)
        .map_err(|e| StudioError::Generation(format!("Invalid audio payload: {}", e)))
}

/// Decode a provider speech payload straight into a playable clip.
pub fn decode_script_audio(payload_b64: &str) -> Result<AudioClip, StudioError> {
    let bytes = decode_base64(payload_b64)?;
    Ok(pcm16_to_clip(&bytes, TTS_SAMPLE_RATE, TTS_CHANNELS))
}

/// Decoded, normalized audio ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Normalized samples of one channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Re-interleave for the output device.
    fn interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let mut samples = Vec::with_capacity(frames * self.channels.len());
        for frame in 0..frames {
            for channel in &self.channels {
                samples.push(channel[frame]);
            }
        }
        samples
    }
}

/// Interpret bytes as interleaved signed 16-bit little-endian samples and
/// normalize each to [-1.0, 1.0]. Trailing bytes that do not fill a whole
/// frame are dropped, not rounded up.
pub fn pcm16_to_clip(bytes: &[u8], sample_rate: u32, num_channels: usize) -> AudioClip {
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect();

    let num_channels = num_channels.max(1);
    let frame_count = samples.len() / num_channels;

    let mut channels = vec![Vec::with_capacity(frame_count); num_channels];
    for frame in 0..frame_count {
        for (ch, out) in channels.iter_mut().enumerate() {
            out.push(samples[frame * num_channels + ch]);
        }
    }

    AudioClip {
        channels,
        sample_rate,
    }
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Single-session narration player, owned by one episode viewer.
///
/// The device stream opens lazily on the first play (a user-initiated
/// action) and is reused for every play after that; each play connects a
/// fresh sink. Dropping the player stops playback and releases the device,
/// so switching episodes tears the session down deterministically.
pub struct ScriptPlayer {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl ScriptPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            sink: None,
        }
    }

    /// Current state. A sink that has drained naturally reads as idle.
    pub fn state(&self) -> PlaybackState {
        match &self.sink {
            Some(sink) if !sink.empty() => PlaybackState::Playing,
            _ => PlaybackState::Idle,
        }
    }

    /// Start playback. Valid only from idle: while a session is active this
    /// is a no-op and the active session keeps running. The viewer's play
    /// button goes through [`ScriptPlayer::toggle`] instead.
    pub fn play(&mut self, clip: &AudioClip) -> Result<(), StudioError> {
        if self.state() == PlaybackState::Playing {
            log::warn!("Playback already active, ignoring play request");
            return Ok(());
        }

        let stream = self.acquire_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.append(SamplesBuffer::new(
            clip.channel_count() as u16,
            clip.sample_rate(),
            clip.interleaved(),
        ));
        self.sink = Some(sink);

        log::info!(
            "Narration playback started: {} frames at {} Hz",
            clip.frame_count(),
            clip.sample_rate()
        );
        Ok(())
    }

    /// Stop the active session, if any, and release its sink.
    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            log::info!("Narration playback stopped");
        }
    }

    /// Play-button behavior: stop when playing, start when idle. Returns
    /// the state after the transition.
    pub fn toggle(&mut self, clip: &AudioClip) -> Result<PlaybackState, StudioError> {
        match self.state() {
            PlaybackState::Playing => {
                self.stop();
                Ok(PlaybackState::Idle)
            }
            PlaybackState::Idle => {
                self.play(clip)?;
                Ok(PlaybackState::Playing)
            }
        }
    }

    /// Open the device stream on first use; reuse it afterwards.
    fn acquire_stream(&mut self) -> Result<&OutputStream, StudioError> {
        if self.stream.is_none() {
            let stream = OutputStreamBuilder::from_default_device()
                .and_then(|builder| builder.open_stream())
                .map_err(|e| StudioError::Audio(format!("No audio output available: {}", e)))?;
            log::info!("Audio output stream opened");
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| StudioError::Audio("Audio output unavailable".to_string()))
    }
}

impl Default for ScriptPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScriptPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_decode_base64_round_trip() {
        // "AADAfw==" is the little-endian bytes of [0, 32704].
        let bytes = decode_base64("AADAfw==").unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0xC0, 0x7F]);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64("not base64!!!"),
            Err(StudioError::Generation(_))
        ));
    }

    #[test]
    fn test_pcm16_normalizes_known_samples() {
        // Samples [0, 16384, -32768, 32767] as little-endian pairs.
        let bytes = [
            0x00, 0x00, // 0
            0x00, 0x40, // 16384
            0x00, 0x80, // -32768
            0xFF, 0x7F, // 32767
        ];
        let clip = pcm16_to_clip(&bytes, TTS_SAMPLE_RATE, 1);

        assert_eq!(clip.frame_count(), 4);
        assert_eq!(clip.channel_count(), 1);
        let samples = clip.channel(0);
        assert!(close(samples[0], 0.0));
        assert!(close(samples[1], 0.5));
        assert!(close(samples[2], -1.0));
        assert!(close(samples[3], 32767.0 / 32768.0));
    }

    #[test]
    fn test_pcm16_odd_byte_count_truncates() {
        let bytes = [0x00, 0x40, 0x00, 0x40, 0x7F];
        let clip = pcm16_to_clip(&bytes, TTS_SAMPLE_RATE, 1);
        assert_eq!(clip.frame_count(), 2);
    }

    #[test]
    fn test_pcm16_stereo_deinterleaves() {
        // Frames: (0, 16384), (-32768, 32767).
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0xFF, 0x7F];
        let clip = pcm16_to_clip(&bytes, 44100, 2);

        assert_eq!(clip.frame_count(), 2);
        assert_eq!(clip.channel_count(), 2);
        assert!(close(clip.channel(0)[0], 0.0));
        assert!(close(clip.channel(0)[1], -1.0));
        assert!(close(clip.channel(1)[0], 0.5));
        assert!(close(clip.channel(1)[1], 32767.0 / 32768.0));
    }

    #[test]
    fn test_pcm16_incomplete_frame_dropped_in_stereo() {
        // Three samples over two channels leaves one incomplete frame.
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0x40];
        let clip = pcm16_to_clip(&bytes, 44100, 2);
        assert_eq!(clip.frame_count(), 1);
    }

    #[test]
    fn test_interleave_inverts_deinterleave() {
        let bytes = [0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0xFF, 0x7F];
        let clip = pcm16_to_clip(&bytes, 44100, 2);
        let interleaved = clip.interleaved();
        assert_eq!(interleaved.len(), 4);
        assert!(close(interleaved[0], 0.0));
        assert!(close(interleaved[1], 0.5));
        assert!(close(interleaved[2], -1.0));
        assert!(close(interleaved[3], 32767.0 / 32768.0));
    }

    #[test]
    fn test_empty_payload_decodes_to_empty_clip() {
        let clip = pcm16_to_clip(&[], TTS_SAMPLE_RATE, TTS_CHANNELS);
        assert_eq!(clip.frame_count(), 0);
    }
}
