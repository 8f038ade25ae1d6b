use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::state::SessionState;
use crate::audio::{CaptureSource, WavTap};
use crate::protocol::{decode_reply, frame_to_bytes, AgentReply, Intent};
use crate::recipes::{Recipe, RecipeSource};
use crate::speech::{SpeechEvent, Synthesizer};
use crate::transport::{voice_agent_url, Connector, TransportEvent, TransportHandle};

/// How long to wait for the frame pump to drain after capture stops
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Collaborators injected into a session
///
/// Every seam is a trait object so the state machine can be exercised
/// without hardware or a network.
pub struct SessionDeps {
    pub capture: Box<dyn CaptureSource>,
    pub synthesizer: Synthesizer,
    pub speech_events: mpsc::Receiver<SpeechEvent>,
    pub recipes: Arc<dyn RecipeSource>,
    pub connector: Arc<dyn Connector>,
}

#[derive(Debug)]
enum Command {
    StartListening,
    StopListening,
    ToggleListening,
    ToggleMute,
    SelectStep(usize),
    Shutdown,
}

/// Everything the actor reacts to besides commands, funneled through one
/// channel so all state mutations happen at a single serialization point
enum Event {
    RecipeLoaded(Result<Recipe, String>),
    /// Transport events are tagged with the connection they came from so a
    /// stale reader (previous listen attempt) cannot disturb a new one
    Transport { epoch: u64, event: TransportEvent },
    Speech(SpeechEvent),
}

/// Handle to a running voice-cooking session
///
/// Owns nothing but channels: dropping the handle shuts the actor down.
pub struct VoiceSession {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
}

impl VoiceSession {
    /// Create the session actor and start loading the recipe
    pub fn spawn(config: SessionConfig, deps: SessionDeps) -> Self {
        let state = SessionState::new(config.recipe_id.clone());
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);

        // Recipe fetch runs apart from the actor so commands (mute, etc.)
        // are served while loading
        let recipes = Arc::clone(&deps.recipes);
        let recipe_id = config.recipe_id.clone();
        let fetch_tx = event_tx.clone();
        tokio::spawn(async move {
            let result = recipes
                .recipe_by_id(&recipe_id)
                .await
                .map_err(|e| format!("{e:#}"));
            let _ = fetch_tx.send(Event::RecipeLoaded(result)).await;
        });

        // Synthesizer lifecycle events feed the same loop
        let speech_tx = event_tx.clone();
        let mut speech_rx = deps.speech_events;
        tokio::spawn(async move {
            while let Some(event) = speech_rx.recv().await {
                if speech_tx.send(Event::Speech(event)).await.is_err() {
                    break;
                }
            }
        });

        let tap = match &config.debug_dump_dir {
            Some(dir) => match WavTap::create(dir, &config.recipe_id, config.capture.sample_rate) {
                Ok(tap) => Some(tap),
                Err(e) => {
                    warn!("audio tap disabled: {e:#}");
                    None
                }
            },
            None => None,
        };

        let actor = SessionActor {
            config,
            state,
            state_tx,
            capture: deps.capture,
            synthesizer: deps.synthesizer,
            connector: deps.connector,
            transport: None,
            pump: None,
            conn_epoch: 0,
            event_tx,
            tap: Arc::new(Mutex::new(tap)),
        };
        tokio::spawn(actor.run(command_rx, event_rx));

        Self {
            commands: command_tx,
            state_rx,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Watch receiver for state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub async fn start_listening(&self) {
        let _ = self.commands.send(Command::StartListening).await;
    }

    pub async fn stop_listening(&self) {
        let _ = self.commands.send(Command::StopListening).await;
    }

    pub async fn toggle_listening(&self) {
        let _ = self.commands.send(Command::ToggleListening).await;
    }

    pub async fn toggle_mute(&self) {
        let _ = self.commands.send(Command::ToggleMute).await;
    }

    /// User-driven step navigation (the swipe path); never triggers speech
    pub async fn select_step(&self, index: usize) {
        let _ = self.commands.send(Command::SelectStep(index)).await;
    }

    /// Tear the session down; terminal
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

struct SessionActor {
    config: SessionConfig,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    capture: Box<dyn CaptureSource>,
    synthesizer: Synthesizer,
    connector: Arc<dyn Connector>,
    transport: Option<Arc<TransportHandle>>,
    pump: Option<JoinHandle<()>>,
    /// Bumped per connection; stale transport events are discarded
    conn_epoch: u64,
    event_tx: mpsc::Sender<Event>,
    tap: Arc<Mutex<Option<WavTap>>>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::Receiver<Event>,
    ) {
        info!(recipe_id = %self.config.recipe_id, "voice session starting");

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::StartListening) => self.start_listening().await,
                    Some(Command::StopListening) => self.stop_listening().await,
                    Some(Command::ToggleListening) => {
                        if self.state.listening {
                            self.stop_listening().await;
                        } else {
                            self.start_listening().await;
                        }
                    }
                    Some(Command::ToggleMute) => self.toggle_mute(),
                    Some(Command::SelectStep(index)) => self.select_step(index),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = events.recv() => match event {
                    Event::RecipeLoaded(result) => self.on_recipe_loaded(result).await,
                    Event::Transport { epoch, event } => {
                        if epoch == self.conn_epoch {
                            self.on_transport_event(event).await;
                        }
                    }
                    Event::Speech(event) => self.on_speech_event(event).await,
                },
            }
        }

        self.shutdown().await;
    }

    // ── Commands ────────────────────────────────────────────────────────

    async fn start_listening(&mut self) {
        if self.state.listening {
            return;
        }

        let url = voice_agent_url(&self.config.api_base_url, &self.config.recipe_id);
        let mut transport = match self.connector.connect(&url).await {
            Ok(t) => t,
            Err(e) => {
                error!("voice agent connect failed: {e:#}");
                self.set_listening(false);
                return;
            }
        };

        self.conn_epoch += 1;
        let epoch = self.conn_epoch;
        if let Some(mut transport_events) = transport.take_events() {
            let event_tx = self.event_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = transport_events.recv().await {
                    if event_tx.send(Event::Transport { epoch, event }).await.is_err() {
                        break;
                    }
                }
            });
        }
        self.transport = Some(Arc::new(transport));

        if !self.start_capture().await {
            self.close_transport().await;
            self.set_listening(false);
            return;
        }

        self.set_listening(true);
    }

    /// Stop capture, close the connection, clear the listening flag.
    /// Idempotent: every part tolerates being already stopped.
    async fn stop_listening(&mut self) {
        self.stop_capture().await;
        self.close_transport().await;
        self.set_listening(false);
    }

    fn toggle_mute(&mut self) {
        let muted = !self.state.muted;
        self.state.muted = muted;
        self.synthesizer.set_muted(muted);
        self.publish();
    }

    fn select_step(&mut self, index: usize) {
        if index == self.state.current_step {
            return;
        }
        self.state.current_step = index;
        self.publish();
    }

    async fn shutdown(&mut self) {
        self.synthesizer.shutdown().await;
        self.stop_listening().await;
        self.state.speaking = false;
        self.publish();

        if let Ok(mut guard) = self.tap.lock() {
            if let Some(tap) = guard.take() {
                let _ = tap.finish();
            }
        }

        info!(recipe_id = %self.config.recipe_id, "voice session closed");
    }

    // ── Events ──────────────────────────────────────────────────────────

    async fn on_recipe_loaded(&mut self, result: Result<Recipe, String>) {
        match result {
            Ok(recipe) => {
                info!(
                    steps = recipe.steps.len(),
                    "recipe loaded: {}",
                    if recipe.name.is_empty() { "(unnamed)" } else { recipe.name.as_str() }
                );
                self.state.recipe_name = recipe.name;
                self.state.steps = recipe.steps;
                self.state.current_step = 0;
                self.publish();

                if self.config.speak_first_step {
                    if let Some(first) = self.state.steps.first() {
                        // Queued by the synthesizer until its engine is ready
                        let text = first.clone();
                        self.speak(&text).await;
                    }
                }
            }
            Err(e) => {
                // Non-fatal: the session stays usable with zero steps
                warn!("recipe fetch failed: {e}");
                self.publish();
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => {
                let reply = decode_reply(&text);
                self.on_server_message(reply).await;
            }
            TransportEvent::Failed(e) => {
                // Fatal for this session: no reconnect, user must re-listen
                error!("voice transport failed: {e}");
                self.stop_listening().await;
            }
            TransportEvent::Closed => {
                info!("voice transport closed by server");
                self.stop_listening().await;
            }
        }
    }

    async fn on_server_message(&mut self, reply: AgentReply) {
        // The server is authoritative for step position regardless of intent
        self.state.current_step = reply.current_step;
        self.state.last_reply = reply.text_response.clone();
        self.publish();

        match reply.intent {
            Intent::Question => {
                self.speak(&reply.text_response).await;
            }
            Intent::Noise => {
                // Capture continues uninterrupted
            }
            Intent::Command | Intent::Unknown => {
                match self.state.steps.get(reply.current_step) {
                    Some(step) => {
                        let text = step.clone();
                        self.speak(&text).await;
                    }
                    None => {
                        warn!(
                            index = reply.current_step,
                            steps = self.state.steps.len(),
                            "server step index out of bounds, not speaking"
                        );
                    }
                }
            }
        }
    }

    async fn on_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Ready => {
                info!("synthesizer ready");
            }
            SpeechEvent::Started { .. } => {
                self.state.speaking = true;
                self.publish();
            }
            SpeechEvent::Completed { .. } | SpeechEvent::Error { .. } => {
                if let SpeechEvent::Error { message, .. } = &event {
                    warn!("synthesis error: {message}");
                }
                self.state.speaking = false;
                self.publish();
                self.resume_capture_after_speech().await;
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Pause capture and hand the text to the synthesizer
    ///
    /// Muted or blank text short-circuits before capture is touched, so a
    /// muted session keeps listening straight through server replies.
    async fn speak(&mut self, text: &str) {
        if self.state.muted || text.trim().is_empty() {
            return;
        }

        self.stop_capture().await;

        if !self.synthesizer.speak(text) {
            // Nothing was submitted, so no completion event will arrive
            self.resume_capture_after_speech().await;
        }
    }

    async fn resume_capture_after_speech(&mut self) {
        if !self.state.listening || self.transport.is_none() || self.capture.is_capturing() {
            return;
        }
        if !self.start_capture().await {
            // Mic restart failed; reflect it rather than pretending to listen
            self.close_transport().await;
            self.set_listening(false);
        }
    }

    async fn start_capture(&mut self) -> bool {
        let Some(transport) = self.transport.clone() else {
            return false;
        };

        match self.capture.start().await {
            Ok(mut frames) => {
                let tap = Arc::clone(&self.tap);
                let pump = tokio::spawn(async move {
                    while let Some(frame) = frames.recv().await {
                        if let Ok(mut guard) = tap.lock() {
                            if let Some(tap) = guard.as_mut() {
                                if let Err(e) = tap.write(&frame) {
                                    warn!("audio tap write failed: {e:#}");
                                }
                            }
                        }
                        transport.send_binary(frame_to_bytes(&frame));
                    }
                });
                self.pump = Some(pump);
                true
            }
            Err(e) => {
                error!("listening could not begin: {e:#}");
                false
            }
        }
    }

    async fn stop_capture(&mut self) {
        if let Err(e) = self.capture.stop().await {
            warn!("capture stop failed: {e:#}");
        }
        // The pump drains on its own once the frame channel closes
        if let Some(mut pump) = self.pump.take() {
            if tokio::time::timeout(PUMP_DRAIN_TIMEOUT, &mut pump)
                .await
                .is_err()
            {
                warn!("frame pump did not drain in time");
                pump.abort();
            }
        }
    }

    async fn close_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.close().await;
            // Anything still in flight from this connection is stale now
            self.conn_epoch += 1;
        }
    }

    fn set_listening(&mut self, listening: bool) {
        self.state.listening = listening;
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
