pub mod capture;
pub mod level;
pub mod tap;

pub use capture::{AudioFrame, CaptureConfig, CaptureSource, MicrophoneCapture, SAMPLE_RATE};
pub use level::rms_pcm16;
pub use tap::WavTap;
