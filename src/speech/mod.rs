//! Speech synthesis pipeline
//!
//! The synthesizer serializes utterances onto a worker task: one utterance
//! at a time, newest wins, with lifecycle events the session uses to pause
//! and resume capture around speech.

pub mod engine;
pub mod playback;
pub mod synthesizer;

pub use engine::{HttpTtsEngine, SynthesisEngine, TtsConfig};
pub use synthesizer::{SpeechEvent, Synthesizer};
