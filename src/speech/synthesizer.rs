use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

use super::engine::SynthesisEngine;

/// Lifecycle event for one utterance
///
/// `Completed` is what the session uses to resume capture after speech.
/// An utterance flushed by a newer `speak` emits nothing; its replacement's
/// events carry the lifecycle forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Engine finished preparing; queued utterances are being flushed
    Ready,
    Started { utterance: Uuid },
    Completed { utterance: Uuid },
    Error { utterance: Uuid, message: String },
}

#[derive(Debug)]
enum Request {
    Speak { id: Uuid, text: String },
    Stop,
    Shutdown,
}

/// Text-to-speech front end
///
/// Owns a worker task that serializes utterances: one at a time, newest
/// wins. Requests arriving before the engine is ready queue FIFO and are
/// served in order once it is.
pub struct Synthesizer {
    requests: mpsc::Sender<Request>,
    muted: Arc<AtomicBool>,
}

impl Synthesizer {
    /// Start the worker and return the synthesizer plus its event stream
    pub fn spawn(engine: Box<dyn SynthesisEngine>) -> (Self, mpsc::Receiver<SpeechEvent>) {
        let (requests, request_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(32);

        tokio::spawn(run_worker(engine, request_rx, event_tx));

        (
            Self {
                requests,
                muted: Arc::new(AtomicBool::new(false)),
            },
            event_rx,
        )
    }

    /// Submit an utterance, flushing anything in flight
    ///
    /// No-op while muted or for blank text. Returns whether an utterance
    /// was actually submitted, so callers know if lifecycle events follow.
    pub fn speak(&self, text: &str) -> bool {
        if self.muted.load(Ordering::SeqCst) {
            return false;
        }
        if text.trim().is_empty() {
            return false;
        }

        let id = Uuid::new_v4();
        match self.requests.try_send(Request::Speak {
            id,
            text: text.to_string(),
        }) {
            Ok(()) => true,
            Err(e) => {
                warn!("speech request dropped: {e}");
                false
            }
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Interrupt the current utterance and clear the queue
    pub fn stop(&self) {
        let _ = self.requests.try_send(Request::Stop);
    }

    /// Stop and terminate the worker; the synthesizer is unusable after
    pub async fn shutdown(&self) {
        let _ = self.requests.send(Request::Shutdown).await;
    }
}

async fn run_worker(
    engine: Box<dyn SynthesisEngine>,
    mut requests: mpsc::Receiver<Request>,
    events: mpsc::Sender<SpeechEvent>,
) {
    let mut pending: VecDeque<(Uuid, String)> = VecDeque::new();

    // Readiness gate: buffer requests until the engine has prepared
    let prepare = engine.prepare();
    tokio::pin!(prepare);
    loop {
        tokio::select! {
            res = &mut prepare => {
                if let Err(e) = res {
                    error!("synthesis engine failed to prepare: {e}");
                    // Engine never becomes ready; drain and drop requests
                    while let Some(req) = requests.recv().await {
                        match req {
                            Request::Shutdown => return,
                            _ => warn!("speech request dropped: engine not ready"),
                        }
                    }
                    return;
                }
                break;
            }
            req = requests.recv() => match req {
                Some(Request::Speak { id, text }) => pending.push_back((id, text)),
                Some(Request::Stop) => pending.clear(),
                Some(Request::Shutdown) | None => return,
            }
        }
    }

    let _ = events.send(SpeechEvent::Ready).await;

    loop {
        // Queued utterances first (in order), then live requests
        let (id, text) = if let Some(next) = pending.pop_front() {
            next
        } else {
            match requests.recv().await {
                Some(Request::Speak { id, text }) => (id, text),
                Some(Request::Stop) => continue,
                Some(Request::Shutdown) | None => return,
            }
        };

        let _ = events.send(SpeechEvent::Started { utterance: id }).await;

        let interrupted = Arc::new(AtomicBool::new(false));
        let speak = engine.speak(&text, Arc::clone(&interrupted));
        tokio::pin!(speak);

        tokio::select! {
            res = &mut speak => {
                match res {
                    Ok(()) => {
                        let _ = events.send(SpeechEvent::Completed { utterance: id }).await;
                    }
                    Err(e) => {
                        let _ = events
                            .send(SpeechEvent::Error { utterance: id, message: e.to_string() })
                            .await;
                    }
                }
            }
            req = requests.recv() => {
                // Anything arriving mid-utterance flushes it
                interrupted.store(true, Ordering::SeqCst);
                match req {
                    Some(Request::Speak { id, text }) => {
                        pending.clear();
                        pending.push_back((id, text));
                    }
                    Some(Request::Stop) => pending.clear(),
                    Some(Request::Shutdown) | None => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Engine that records spoken texts and completes after a short delay
    struct RecordingEngine {
        spoken: Arc<Mutex<Vec<String>>>,
        prepare_delay: Duration,
        speak_delay: Duration,
    }

    #[async_trait::async_trait]
    impl SynthesisEngine for RecordingEngine {
        async fn prepare(&self) -> Result<()> {
            tokio::time::sleep(self.prepare_delay).await;
            Ok(())
        }

        async fn speak(&self, text: &str, interrupted: Arc<AtomicBool>) -> Result<()> {
            tokio::time::sleep(self.speak_delay).await;
            if !interrupted.load(Ordering::SeqCst) {
                self.spoken.lock().unwrap().push(text.to_string());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_muted_speak_is_noop() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            spoken: Arc::clone(&spoken),
            prepare_delay: Duration::ZERO,
            speak_delay: Duration::ZERO,
        };
        let (synth, mut events) = Synthesizer::spawn(Box::new(engine));

        synth.set_muted(true);
        assert!(!synth.speak("hello"));
        assert!(!synth.speak("hello again"));

        // Only the ready event ever arrives
        assert_eq!(events.recv().await, Some(SpeechEvent::Ready));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_err());
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_speak_is_noop() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            spoken: Arc::clone(&spoken),
            prepare_delay: Duration::ZERO,
            speak_delay: Duration::ZERO,
        };
        let (synth, _events) = Synthesizer::spawn(Box::new(engine));

        assert!(!synth.speak(""));
        assert!(!synth.speak("   "));
    }

    #[tokio::test]
    async fn test_queued_before_ready_flushed_in_order() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            spoken: Arc::clone(&spoken),
            prepare_delay: Duration::from_millis(50),
            speak_delay: Duration::ZERO,
        };
        let (synth, mut events) = Synthesizer::spawn(Box::new(engine));

        assert!(synth.speak("first"));
        assert!(synth.speak("second"));

        assert_eq!(events.recv().await, Some(SpeechEvent::Ready));
        // Both queued utterances run to completion, FIFO
        let mut completed = 0;
        while completed < 2 {
            match events.recv().await {
                Some(SpeechEvent::Completed { .. }) => completed += 1,
                Some(_) => {}
                None => panic!("worker exited early"),
            }
        }
        assert_eq!(*spoken.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_new_speak_flushes_in_flight() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            spoken: Arc::clone(&spoken),
            prepare_delay: Duration::ZERO,
            speak_delay: Duration::from_millis(100),
        };
        let (synth, mut events) = Synthesizer::spawn(Box::new(engine));

        assert_eq!(events.recv().await, Some(SpeechEvent::Ready));
        assert!(synth.speak("long utterance"));

        // Let it start, then flush it
        match events.recv().await {
            Some(SpeechEvent::Started { .. }) => {}
            other => panic!("expected Started, got {:?}", other),
        }
        assert!(synth.speak("replacement"));

        // The flushed utterance emits nothing; the replacement completes
        let mut saw_completed = false;
        for _ in 0..3 {
            match events.recv().await {
                Some(SpeechEvent::Completed { .. }) => {
                    saw_completed = true;
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }
        assert!(saw_completed);
        assert_eq!(*spoken.lock().unwrap(), vec!["replacement"]);
    }
}
