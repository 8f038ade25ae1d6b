pub mod client;

pub use client::{
    voice_agent_url, Connector, OutboundFrame, TransportEvent, TransportHandle, WsConnector,
};
