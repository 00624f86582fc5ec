//! Speech capture behind start/stop controls.
//!
//! A [`SpeechRecognizer`] runs one single-utterance session at a time and
//! reports back over a channel; [`VoiceCapture`] turns those events into
//! updates for the input text and keeps the Idle/Listening state.

pub mod microphone;
pub mod wav;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

pub const DEFAULT_SPEECH_LANGUAGE: &str = "id-ID";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Perangkat ini tidak mendukung pengenalan suara.")]
    Unsupported,
    #[error("Gagal mengenali suara: {0}")]
    Recognition(String),
    #[error("Perekaman suara sedang berjalan.")]
    AlreadyListening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_SPEECH_LANGUAGE.to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    NoSpeech,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result { transcript: String, is_final: bool },
    Error(RecognitionErrorKind),
    Ended,
}

pub trait SpeechRecognizer: Send {
    fn is_available(&self) -> bool;
    fn start(
        &mut self,
        config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceUpdate {
    Transcript(String),
    /// The session heard nothing. Not an error for the user.
    NoSpeech,
    Failed(VoiceError),
    Ended,
}

/// Appends a recognized utterance to the existing input, separated by a
/// single space when there is prior input.
pub fn append_transcript(input: &str, transcript: &str) -> String {
    if input.is_empty() {
        transcript.to_string()
    } else {
        format!("{} {}", input, transcript)
    }
}

pub struct VoiceCapture {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    config: RecognitionConfig,
    state: VoiceState,
    events: Option<UnboundedReceiver<RecognitionEvent>>,
}

impl VoiceCapture {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>, config: RecognitionConfig) -> Self {
        Self {
            recognizer,
            config,
            state: VoiceState::Idle,
            events: None,
        }
    }

    pub fn unsupported() -> Self {
        Self::new(None, RecognitionConfig::default())
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer
            .as_ref()
            .map(|r| r.is_available())
            .unwrap_or(false)
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == VoiceState::Listening
    }

    /// Whether the current session can still deliver events.
    pub fn has_session(&self) -> bool {
        self.events.is_some()
    }

    /// Opens a new session. Refused while the previous one can still deliver
    /// a transcript, so a stopped recording is never lost.
    pub fn start(&mut self) -> Result<(), VoiceError> {
        if self.state == VoiceState::Listening || self.has_session() {
            return Err(VoiceError::AlreadyListening);
        }
        let recognizer = match self.recognizer.as_mut() {
            Some(r) if r.is_available() => r,
            _ => return Err(VoiceError::Unsupported),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        recognizer.start(&self.config, tx)?;
        self.events = Some(rx);
        self.state = VoiceState::Listening;
        debug!("Voice capture listening ({})", self.config.language);
        Ok(())
    }

    /// Asks the recognizer to finish. A final transcript may still arrive
    /// afterwards and is delivered by [`poll`](Self::poll).
    pub fn stop(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.state = VoiceState::Idle;
    }

    /// Drains pending recognizer events without blocking.
    pub fn poll(&mut self) -> Vec<VoiceUpdate> {
        let mut updates = Vec::new();
        loop {
            let event = match self.events.as_mut() {
                Some(rx) => match rx.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => RecognitionEvent::Ended,
                },
                None => break,
            };
            if let Some(update) = self.apply(event) {
                updates.push(update);
            }
        }
        updates
    }

    /// Waits for the next update of the current session. Returns `None` when
    /// no session is open.
    pub async fn next_update(&mut self) -> Option<VoiceUpdate> {
        loop {
            let event = self.events.as_mut()?.recv().await.unwrap_or(RecognitionEvent::Ended);
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
    }

    fn apply(&mut self, event: RecognitionEvent) -> Option<VoiceUpdate> {
        match event {
            RecognitionEvent::Started => None,
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                let transcript = transcript.trim();
                if !is_final || transcript.is_empty() {
                    return None;
                }
                Some(VoiceUpdate::Transcript(transcript.to_string()))
            }
            RecognitionEvent::Error(RecognitionErrorKind::NoSpeech) => {
                debug!("No speech detected");
                self.state = VoiceState::Idle;
                Some(VoiceUpdate::NoSpeech)
            }
            RecognitionEvent::Error(RecognitionErrorKind::Other(message)) => {
                warn!("Speech recognition error: {}", message);
                self.state = VoiceState::Idle;
                Some(VoiceUpdate::Failed(VoiceError::Recognition(message)))
            }
            RecognitionEvent::Ended => {
                self.state = VoiceState::Idle;
                self.events = None;
                Some(VoiceUpdate::Ended)
            }
        }
    }
}
