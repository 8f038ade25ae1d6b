//! Voice-cooking session management
//!
//! This module provides the `VoiceSession` actor that manages:
//! - Recipe step loading
//! - The voice-agent connection and the capture-to-transport frame pump
//! - Server-driven step navigation and spoken responses
//! - Reconciling user-driven navigation against server updates
//! - Session state snapshots for external observers

mod config;
mod controller;
mod state;

pub use config::SessionConfig;
pub use controller::{SessionDeps, VoiceSession};
pub use state::SessionState;
