//! Looping WAV playback on the default output device

use std::fmt::Display;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use tracing::{debug, error, info};

use super::Actuator;
use crate::error::TrainerError;

/// Decoded PCM clip, interleaved f32 samples
struct Clip {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl Clip {
    fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }
}

/// Actuator that loops a WAV file until stopped.
///
/// The output stream is built once and paused between punishments. Each start
/// rewinds to the beginning of the clip.
pub struct LoopingSound {
    stream: Stream,
    rewind: Arc<AtomicBool>,
}

impl LoopingSound {
    /// Decode `path` and prepare a paused stream on the default output device
    pub fn open(path: &Path) -> Result<Self, TrainerError> {
        let clip = decode_wav(path)?;
        info!(
            "loaded punishment sound {} ({} frames, {} ch, {} Hz)",
            path.display(),
            clip.frames(),
            clip.channels,
            clip.sample_rate
        );

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TrainerError::Audio("no default output device".to_string()))?;
        let supported = device.default_output_config().map_err(audio_err)?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(TrainerError::Audio(format!(
                "unsupported output sample format {:?}",
                supported.sample_format()
            )));
        }
        let config: StreamConfig = supported.into();
        debug!(
            "output stream: {} ch at {} Hz",
            config.channels, config.sample_rate.0
        );

        let out_channels = usize::from(config.channels);
        let last_channel = clip.channels - 1;
        let frames = clip.frames() as f64;
        let step = f64::from(clip.sample_rate) / f64::from(config.sample_rate.0);

        let rewind = Arc::new(AtomicBool::new(true));
        let rewind_flag = Arc::clone(&rewind);
        let mut position = 0.0f64;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if rewind_flag.swap(false, Ordering::AcqRel) {
                        position = 0.0;
                    }
                    for frame in data.chunks_mut(out_channels) {
                        let base = position as usize * clip.channels;
                        for (ch, out) in frame.iter_mut().enumerate() {
                            *out = clip.samples[base + ch.min(last_channel)];
                        }
                        position = advance(position, step, frames);
                    }
                },
                |err| error!("audio output stream error: {}", err),
                None,
            )
            .map_err(audio_err)?;
        stream.pause().map_err(audio_err)?;

        Ok(Self { stream, rewind })
    }
}

impl Actuator for LoopingSound {
    fn start_loop(&mut self) -> Result<(), TrainerError> {
        self.rewind.store(true, Ordering::Release);
        self.stream.play().map_err(audio_err)
    }

    fn stop_loop(&mut self) -> Result<(), TrainerError> {
        self.stream.pause().map_err(audio_err)
    }
}

fn decode_wav(path: &Path) -> Result<Clip, TrainerError> {
    let mut reader = hound::WavReader::open(path).map_err(audio_err)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
        }
    }
    .map_err(audio_err)?;

    let channels = usize::from(spec.channels);
    if channels == 0 || samples.len() < channels {
        return Err(TrainerError::Audio(format!(
            "{} contains no audio frames",
            path.display()
        )));
    }

    Ok(Clip {
        samples,
        channels,
        sample_rate: spec.sample_rate,
    })
}

/// Next read position in frames, wrapped into `[0, frames)`.
fn advance(position: f64, step: f64, frames: f64) -> f64 {
    (position + step) % frames
}

fn audio_err<E: Display>(err: E) -> TrainerError {
    TrainerError::Audio(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for sample in frames {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_int_wav_scales_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("punish.wav");
        write_wav(&path, 2, &[0, 16384, -32768, 32767]);

        let clip = decode_wav(&path).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.frames(), 2);
        assert_eq!(clip.sample_rate, 8000);
        assert!((clip.samples[1] - 0.5).abs() < 1e-6);
        assert_eq!(clip.samples[2], -1.0);
    }

    #[test]
    fn test_decode_rejects_empty_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 1, &[]);

        assert!(matches!(decode_wav(&path), Err(TrainerError::Audio(_))));
    }

    #[test]
    fn test_advance_wraps_steps_longer_than_clip() {
        // One frame at 96 kHz played back at 44.1 kHz
        let step = 96_000.0 / 44_100.0;
        let mut position = 0.0;
        for _ in 0..100 {
            position = advance(position, step, 1.0);
            assert!((0.0..1.0).contains(&position));
        }

        assert_eq!(advance(1.5, 1.0, 4.0), 2.5);
        assert_eq!(advance(3.5, 1.0, 4.0), 0.5);
    }

    #[test]
    fn test_decode_missing_file() {
        let result = decode_wav(Path::new("/nonexistent/punish.wav"));
        assert!(matches!(result, Err(TrainerError::Audio(_))));
    }
}
