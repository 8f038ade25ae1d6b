pub mod messages;

pub use messages::{decode_reply, frame_to_bytes, AgentReply, Intent};
