use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use tracing::debug;

/// Play mono PCM16 samples to the default output device, blocking until
/// playback finishes or the interrupt flag is set
///
/// Callers run this under `spawn_blocking`; the flag is how an in-flight
/// utterance gets flushed by a newer one.
pub fn play_pcm16(samples: &[i16], sample_rate: u32, interrupted: &AtomicBool) -> Result<()> {
    if samples.is_empty() || interrupted.load(Ordering::SeqCst) {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no output device available"))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| anyhow!("no output configs: {e}"))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: stereo, same sample everywhere
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| anyhow!("no suitable output config found"))?;

    let config = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;

    let pcm: Vec<f32> = samples.iter().map(|&s| f32::from(s) / 32768.0).collect();
    let total = pcm.len();

    let pcm = Arc::new(pcm);
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_pcm = Arc::clone(&pcm);
    let cb_position = Arc::clone(&position);
    let cb_finished = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = cb_position.lock().unwrap();
                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < cb_pcm.len() {
                        let s = cb_pcm[*pos];
                        *pos += 1;
                        s
                    } else {
                        cb_finished.store(true, Ordering::SeqCst);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| anyhow!("failed to build output stream: {e}"))?;

    stream
        .play()
        .map_err(|e| anyhow!("failed to start output stream: {e}"))?;

    // Wait until played out, interrupted, or well past the expected duration
    let duration_ms = total as u64 * 1000 / u64::from(sample_rate);
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::SeqCst) {
        if interrupted.load(Ordering::SeqCst) || Instant::now() > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    debug!(
        samples = total,
        interrupted = interrupted.load(Ordering::SeqCst),
        "playback finished"
    );

    Ok(())
}
