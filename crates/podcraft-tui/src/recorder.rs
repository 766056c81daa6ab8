//! Microphone capture for voice cloning.
//!
//! `cpal::Stream` is not `Send`, so each recording lives on its own thread
//! which owns the stream until told to stop.  Samples are collected as
//! interleaved f32 and encoded to a 16-bit mono WAV with hound.

use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderStatus {
    #[default]
    Idle,
    Starting,
    Recording,
    Processing,
}

impl RecorderStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Starting => "Opening microphone...",
            Self::Recording => "Recording...",
            Self::Processing => "Processing recording...",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Microphone access denied.")]
    NoDevice,
    #[error("audio input: {0}")]
    Device(String),
    #[error("empty recording")]
    Empty,
}

/// Raw capture: interleaved samples in -1.0..=1.0.
#[derive(Debug, Clone)]
pub struct Captured {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Captured {
    /// Average the channels of each frame.
    pub fn downmix(&self) -> Vec<f32> {
        let ch = self.channels.max(1) as usize;
        self.samples
            .chunks(ch)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

/// A recording in progress.  `finish` stops it and hands back the samples.
pub struct Recording {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<Result<Captured, RecorderError>>,
}

impl Recording {
    /// Open the default input device and start capturing.  Fails fast when
    /// there is no device or the stream cannot be started.
    pub fn start() -> Result<Self, RecorderError> {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), RecorderError>>();

        let thread = std::thread::Builder::new()
            .name("podcraft-recorder".into())
            .spawn(move || capture(stop_rx, ready_tx))
            .map_err(|e| RecorderError::Device(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { stop_tx, thread }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(RecorderError::Device("recorder thread exited".into())),
        }
    }

    /// `start` on the blocking pool, for callers on the async runtime.
    pub async fn open() -> Result<Self, RecorderError> {
        tokio::task::spawn_blocking(Self::start)
            .await
            .map_err(|e| RecorderError::Device(format!("recorder task: {}", e)))?
    }

    /// Stop capturing.  Blocks until the capture thread has exited.
    pub fn finish(self) -> Result<Captured, RecorderError> {
        let _ = self.stop_tx.send(());
        self.thread
            .join()
            .map_err(|_| RecorderError::Device("recorder thread panicked".into()))?
    }
}

fn capture(
    stop_rx: std_mpsc::Receiver<()>,
    ready_tx: std_mpsc::Sender<Result<(), RecorderError>>,
) -> Result<Captured, RecorderError> {
    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let (stream, channels, sample_rate) = match open_stream(buffer.clone()) {
        Ok(s) => s,
        Err(e) => {
            let msg = e.to_string();
            let _ = ready_tx.send(Err(e));
            return Err(RecorderError::Device(msg));
        }
    };
    let _ = ready_tx.send(Ok(()));
    info!("recorder: capturing {} ch @ {} Hz", channels, sample_rate);

    // Either a stop signal or the handle being dropped ends the recording.
    let _ = stop_rx.recv();
    drop(stream);

    let samples = std::mem::take(&mut *buffer.lock().map_err(|_| RecorderError::Empty)?);
    debug!("recorder: captured {} samples", samples.len());
    if samples.is_empty() {
        return Err(RecorderError::Empty);
    }
    Ok(Captured {
        samples,
        channels,
        sample_rate,
    })
}

fn open_stream(buffer: Arc<Mutex<Vec<f32>>>) -> Result<(cpal::Stream, u16, u32), RecorderError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(RecorderError::NoDevice)?;
    let supported = device
        .default_input_config()
        .map_err(|e| RecorderError::Device(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels;
    let sample_rate = config.sample_rate.0;

    let err_fn = |e: cpal::StreamError| warn!("recorder: stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| push(&buffer, data.iter().copied()),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                push(&buffer, data.iter().map(|&s| s as f32 / i16::MAX as f32))
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                push(&buffer, data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0))
            },
            err_fn,
            None,
        ),
        other => {
            return Err(RecorderError::Device(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| RecorderError::Device(e.to_string()))?;

    stream
        .play()
        .map_err(|e| RecorderError::Device(e.to_string()))?;
    Ok((stream, channels, sample_rate))
}

fn push(buffer: &Mutex<Vec<f32>>, samples: impl Iterator<Item = f32>) {
    if let Ok(mut buf) = buffer.lock() {
        buf.extend(samples);
    }
}

/// Encode a capture as a 16-bit PCM mono WAV file in memory.
pub fn encode_wav(captured: &Captured) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: captured.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).context("wav header")?;
        for s in captured.downmix() {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(v)?;
        }
        writer.finalize().context("wav finalize")?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_frames() {
        let c = Captured {
            samples: vec![1.0, 0.0, -0.5, -0.5, 0.25, 0.75],
            channels: 2,
            sample_rate: 8000,
        };
        assert_eq!(c.downmix(), vec![0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_encode_wav_is_readable() {
        let c = Captured {
            samples: vec![0.0, 0.5, -0.5, 1.0, 2.0],
            channels: 1,
            sample_rate: 16000,
        };
        let bytes = encode_wav(&c).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16384, -16384, i16::MAX, i16::MAX]);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RecorderStatus::Recording.label(), "Recording...");
        assert_eq!(RecorderStatus::Processing.label(), "Processing recording...");
        assert_eq!(RecorderStatus::Starting.label(), "Opening microphone...");
    }

    #[tokio::test]
    async fn test_open_yields_to_other_tasks() {
        // Current-thread runtime: the flag is only set if `open` lets the
        // scheduler run while the device is being opened.
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        tokio::spawn(async move { flag.store(true, std::sync::atomic::Ordering::SeqCst) });

        // No input device is fine here; only the scheduling matters.
        if let Ok(rec) = Recording::open().await {
            let _ = rec.finish();
        }
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
