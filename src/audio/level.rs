/// RMS level of a PCM16 buffer, normalised 0.0-1.0
///
/// Diagnostic only: logged per frame so a quiet or dead microphone is
/// visible in traces without affecting the pipeline.
pub fn rms_pcm16(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let f = f64::from(s) / 32768.0;
            f * f
        })
        .sum();

    (sum_sq / samples.len() as f64).sqrt() as f32
}
