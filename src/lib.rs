pub mod audio;
pub mod config;
pub mod http;
pub mod protocol;
pub mod recipes;
pub mod session;
pub mod speech;
pub mod transport;

pub use audio::{
    AudioFrame, CaptureConfig, CaptureSource, MicrophoneCapture, WavTap, SAMPLE_RATE,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use protocol::{decode_reply, frame_to_bytes, AgentReply, Intent};
pub use recipes::{HttpRecipeSource, Recipe, RecipeSource};
pub use session::{SessionConfig, SessionDeps, SessionState, VoiceSession};
pub use speech::{HttpTtsEngine, SpeechEvent, SynthesisEngine, Synthesizer, TtsConfig};
pub use transport::{
    voice_agent_url, Connector, OutboundFrame, TransportEvent, TransportHandle, WsConnector,
};
