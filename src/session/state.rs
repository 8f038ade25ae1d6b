use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of one voice-cooking session
///
/// The live copy is owned by the session actor and mutated only there;
/// everyone else sees clones published through a watch channel.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    /// Session key, immutable for the session lifetime
    pub recipe_id: String,

    /// Display name from the recipe source (empty until load completes)
    pub recipe_name: String,

    /// Ordered instruction list, fixed once loaded
    pub steps: Vec<String>,

    /// The single source of truth for which step is displayed and spoken.
    /// Server-driven updates and user navigation both write through this
    /// field and nothing else. The server may set it out of bounds; step
    /// lookups bounds-check before indexing.
    pub current_step: usize,

    pub listening: bool,
    pub speaking: bool,
    pub muted: bool,

    /// Latest free-text server response; display only
    pub last_reply: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(recipe_id: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            recipe_name: String::new(),
            steps: Vec::new(),
            current_step: 0,
            listening: false,
            speaking: false,
            muted: false,
            last_reply: String::new(),
            started_at: Utc::now(),
        }
    }

    /// Text of the current step, if the index is in bounds
    pub fn current_step_text(&self) -> Option<&str> {
        self.steps.get(self.current_step).map(String::as_str)
    }
}
