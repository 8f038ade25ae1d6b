use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, trace, warn};

use super::level::rms_pcm16;

/// Sample rate the voice agent expects (PCM16 mono)
pub const SAMPLE_RATE: u32 = 16000;

/// How long `stop()` waits for the capture thread to exit
const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// One fixed-duration buffer of captured audio (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (the agent protocol expects 16kHz)
    pub sample_rate: u32,
    /// Duration of each emitted frame in milliseconds
    pub frame_duration_ms: u64,
    /// Capacity of the frame channel before backpressure
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_duration_ms: 100,
            channel_capacity: 64,
        }
    }
}

impl CaptureConfig {
    pub fn samples_per_frame(&self) -> usize {
        (u64::from(self.sample_rate) * self.frame_duration_ms / 1000) as usize
    }
}

/// Audio capture source trait
///
/// Implementations deliver fixed-size PCM16 frames over a channel until
/// stopped. The session owns the source exclusively; `stop()` must not
/// return while the underlying device can still produce frames.
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. Fails
    /// without delivering any frames when the device cannot be opened
    /// (missing hardware, OS-level capture permission denied).
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    ///
    /// Idempotent and safe to call when not started.
    async fn stop(&mut self) -> Result<()>;

    /// Check if currently capturing
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Microphone capture via cpal
///
/// A dedicated thread owns the input stream (cpal streams are not `Send`),
/// converts the device format to 16kHz mono PCM16 and slices it into
/// fixed-duration frames.
pub struct MicrophoneCapture {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_flag: Arc<AtomicBool>,
    done_rx: std::sync::mpsc::Receiver<()>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        // No two concurrent captures on the same device
        if self.worker.is_some() {
            self.stop().await?;
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();
        let (done_tx, done_rx) = std::sync::mpsc::sync_channel::<()>(1);

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_flag);
        let config = self.config.clone();

        let handle = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                run_capture(config, frame_tx, thread_stop, init_tx);
                let _ = done_tx.send(());
            })
            .map_err(|e| anyhow!("failed to spawn capture thread: {e}"))?;

        // Device and stream setup happen on the capture thread; wait for the
        // outcome so a failed init reports here instead of from the loop.
        match init_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(anyhow!("capture thread exited before initializing"));
            }
        }

        info!(
            sample_rate = self.config.sample_rate,
            frame_ms = self.config.frame_duration_ms,
            "microphone capture started"
        );

        self.worker = Some(CaptureWorker {
            stop_flag,
            done_rx,
            handle: Some(handle),
        });

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };

        worker.stop_flag.store(true, Ordering::SeqCst);

        // Bounded wait for the loop to exit so the device handle is released
        // before we return; a frame must never be produced after teardown.
        tokio::task::spawn_blocking(move || {
            match worker.done_rx.recv_timeout(STOP_JOIN_TIMEOUT) {
                Ok(()) => {
                    if let Some(handle) = worker.handle.take() {
                        let _ = handle.join();
                    }
                }
                Err(_) => {
                    warn!("capture thread did not exit within {:?}", STOP_JOIN_TIMEOUT);
                }
            }
        })
        .await
        .map_err(|e| anyhow!("capture stop task failed: {e}"))?;

        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.stop_flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Capture loop body, run on the dedicated thread
///
/// Owns the cpal stream for its whole lifetime. The stream callback appends
/// raw samples to a shared buffer; the loop drains it every few milliseconds,
/// converts to the target format and emits fixed-size frames.
fn run_capture(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    stop_flag: Arc<AtomicBool>,
    init_tx: oneshot::Sender<Result<()>>,
) {
    let setup = (|| -> Result<(cpal::Stream, u32, usize, Arc<Mutex<Vec<f32>>>)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("no input device available"))?;

        let supported = device
            .default_input_config()
            .map_err(|e| anyhow!("no input config: {e}"))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow!(
                "unsupported input sample format: {:?}",
                supported.sample_format()
            ));
        }

        let source_rate = supported.sample_rate().0;
        let source_channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.into();

        let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let callback_buffer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = callback_buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    error!("audio input stream error: {err}");
                },
                None,
            )
            .map_err(|e| anyhow!("failed to build input stream: {e}"))?;

        stream
            .play()
            .map_err(|e| anyhow!("failed to start input stream: {e}"))?;

        Ok((stream, source_rate, source_channels, buffer))
    })();

    let (stream, source_rate, source_channels, buffer) = match setup {
        Ok(parts) => {
            let _ = init_tx.send(Ok(()));
            parts
        }
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    let frame_len = config.samples_per_frame();
    let mut pending: Vec<i16> = Vec::with_capacity(frame_len * 2);
    let mut emitted_samples: u64 = 0;

    while !stop_flag.load(Ordering::SeqCst) {
        let raw: Vec<f32> = {
            let mut buf = match buffer.lock() {
                Ok(buf) => buf,
                Err(_) => break,
            };
            std::mem::take(&mut *buf)
        };

        if raw.is_empty() {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }

        pending.extend(downsample_to_pcm16(
            &raw,
            source_rate,
            source_channels,
            config.sample_rate,
        ));

        while pending.len() >= frame_len {
            let samples: Vec<i16> = pending.drain(..frame_len).collect();
            let timestamp_ms = emitted_samples * 1000 / u64::from(config.sample_rate);
            emitted_samples += samples.len() as u64;

            let rms = rms_pcm16(&samples);
            trace!(samples = samples.len(), rms, "captured frame");

            let frame = AudioFrame {
                samples,
                sample_rate: config.sample_rate,
                timestamp_ms,
            };

            // Receiver dropped means the session is gone; exit quietly
            if frame_tx.blocking_send(frame).is_err() {
                drop(stream);
                return;
            }
        }
    }

    drop(stream);
}

/// Mix to mono, decimate to the target rate and convert to i16
fn downsample_to_pcm16(
    samples: &[f32],
    source_rate: u32,
    channels: usize,
    target_rate: u32,
) -> Vec<i16> {
    let ratio = (source_rate / target_rate).max(1) as usize;

    samples
        .chunks(channels.max(1))
        .step_by(ratio)
        .map(|frame| {
            let mono: f32 = frame.iter().sum::<f32>() / frame.len() as f32;
            (mono * 32767.0).clamp(-32768.0, 32767.0) as i16
        })
        .collect()
}
