use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::capture::AudioFrame;

/// Debug WAV dump of captured session audio
///
/// Writes everything the capture source emits to a single PCM16 mono WAV
/// file, one file per session. Opt-in via config; nothing in the session
/// depends on it.
pub struct WavTap {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    file_path: PathBuf,
    sample_count: usize,
}

impl WavTap {
    pub fn create(dir: &Path, recipe_id: &str, sample_rate: u32) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create audio dump directory")?;

        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let file_path = dir.join(format!("{}-{}.wav", recipe_id, stamp));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        info!("audio tap writing to {:?}", file_path);

        Ok(Self {
            writer: Some(writer),
            file_path,
            sample_count: 0,
        })
    }

    pub fn write(&mut self, frame: &AudioFrame) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += frame.samples.len();
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }
        info!(
            samples = self.sample_count,
            "audio tap finished: {:?}", self.file_path
        );
        Ok(self.file_path.clone())
    }
}

impl Drop for WavTap {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV tap on drop: {}", e);
            }
        }
    }
}
