//! Session state and the user actions that drive it.
//!
//! Every translate or example request carries a [`RequestToken`]. A reply is
//! applied only if its token is still the newest one issued for that kind of
//! request and no later action (such as clearing the input) has invalidated it.

use crate::clipboard::Clipboard;
use crate::situation::SituationWriter;
use crate::translation::{TranslateError, Translator};
use crate::types::{find_situation, Context, ContextSet, TranslationResult};
use crate::voice::{append_transcript, VoiceCapture, VoiceError, VoiceUpdate};
use log::{debug, info, warn};

pub const COPIED_NOTICE: &str = "Teks berhasil disalin!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub input_text: String,
    pub selected_context: Context,
    pub available_contexts: ContextSet,
    pub is_loading: bool,
    pub is_recording: bool,
    pub is_generating_situation: bool,
    pub result: Option<TranslationResult>,
    pub error: Option<String>,
    pub is_adding_context: bool,
    pub new_context_name: String,
    /// One-shot message for the view, consumed by [`Controller::take_notice`].
    pub notice: Option<String>,
}

impl SessionState {
    pub fn new(available_contexts: ContextSet) -> Self {
        Self {
            input_text: String::new(),
            selected_context: available_contexts.first().clone(),
            available_contexts,
            is_loading: false,
            is_recording: false,
            is_generating_situation: false,
            result: None,
            error: None,
            is_adding_context: false,
            new_context_name: String::new(),
            notice: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    /// A newer request of the same kind was issued.
    Superseded,
    /// Newest request, but a later action invalidated its reply.
    Discarded,
    Current,
}

#[derive(Debug, Default)]
struct RequestGate {
    latest: u64,
    invalidated_through: u64,
}

impl RequestGate {
    fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    fn invalidate(&mut self) {
        self.invalidated_through = self.latest;
    }

    fn settle(&self, token: RequestToken) -> Settlement {
        if token.0 != self.latest {
            Settlement::Superseded
        } else if token.0 <= self.invalidated_through {
            Settlement::Discarded
        } else {
            Settlement::Current
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateTicket {
    pub token: RequestToken,
    pub input_text: String,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SituationTicket {
    pub token: RequestToken,
    pub prompt: String,
    pub context: Context,
}

pub struct Controller {
    state: SessionState,
    translator: Translator,
    writer: SituationWriter,
    voice: VoiceCapture,
    clipboard: Box<dyn Clipboard>,
    translate_gate: RequestGate,
    situation_gate: RequestGate,
}

impl Controller {
    pub fn new(
        translator: Translator,
        writer: SituationWriter,
        voice: VoiceCapture,
        clipboard: Box<dyn Clipboard>,
        contexts: ContextSet,
    ) -> Self {
        Self {
            state: SessionState::new(contexts),
            translator,
            writer,
            voice,
            clipboard,
            translate_gate: RequestGate::default(),
            situation_gate: RequestGate::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn situation_writer(&self) -> &SituationWriter {
        &self.writer
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.state.notice.take()
    }

    /// Replaces the input text. A pending example sentence would overwrite
    /// what the user typed, so it is invalidated.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input_text = text.into();
        self.situation_gate.invalidate();
    }

    pub fn begin_translate(&mut self) -> Option<TranslateTicket> {
        if self.state.is_loading {
            debug!("Translate ignored: a translation is already in flight");
            return None;
        }
        if self.state.input_text.trim().is_empty() {
            self.state.error = Some(TranslateError::EmptyInput.to_string());
            return None;
        }

        self.state.error = None;
        self.state.is_loading = true;
        Some(TranslateTicket {
            token: self.translate_gate.issue(),
            input_text: self.state.input_text.clone(),
            context: self.state.selected_context.clone(),
        })
    }

    /// Applies a translation outcome. Returns whether it reached the state.
    pub fn finish_translate(
        &mut self,
        token: RequestToken,
        outcome: Result<TranslationResult, TranslateError>,
    ) -> bool {
        match self.translate_gate.settle(token) {
            Settlement::Superseded => {
                debug!("Dropping superseded translation {:?}", token);
                false
            }
            Settlement::Discarded => {
                debug!("Dropping invalidated translation {:?}", token);
                self.state.is_loading = false;
                false
            }
            Settlement::Current => {
                self.state.is_loading = false;
                match outcome {
                    Ok(result) => {
                        self.state.error = None;
                        self.state.result = Some(result);
                    }
                    Err(e) => {
                        self.state.result = None;
                        self.state.error = Some(e.to_string());
                    }
                }
                true
            }
        }
    }

    /// Runs a whole translate action. Returns whether a request was issued.
    pub async fn translate(&mut self) -> bool {
        let Some(ticket) = self.begin_translate() else {
            return false;
        };
        let outcome = self
            .translator
            .translate(&ticket.input_text, &ticket.context)
            .await;
        self.finish_translate(ticket.token, outcome);
        true
    }

    pub fn begin_situation(&mut self, situation_prompt: &str) -> Option<SituationTicket> {
        if self.state.is_generating_situation || self.state.is_loading {
            debug!("Situation ignored: another request is in flight");
            return None;
        }

        self.state.error = None;
        self.state.is_generating_situation = true;
        Some(SituationTicket {
            token: self.situation_gate.issue(),
            prompt: situation_prompt.to_string(),
            context: self.state.selected_context.clone(),
        })
    }

    pub fn finish_situation(&mut self, token: RequestToken, text: String) -> bool {
        match self.situation_gate.settle(token) {
            Settlement::Superseded => false,
            Settlement::Discarded => {
                debug!("Dropping invalidated example sentence {:?}", token);
                self.state.is_generating_situation = false;
                false
            }
            Settlement::Current => {
                self.state.is_generating_situation = false;
                self.state.input_text = text;
                true
            }
        }
    }

    /// Asks for an example sentence for `situation_prompt` and puts it in the input.
    pub async fn generate_situation(&mut self, situation_prompt: &str) -> bool {
        let Some(ticket) = self.begin_situation(situation_prompt) else {
            return false;
        };
        let text = self
            .writer
            .generate_example(&ticket.prompt, &ticket.context)
            .await;
        self.finish_situation(ticket.token, text);
        true
    }

    /// Same as [`generate_situation`](Self::generate_situation) for a catalogue entry.
    pub async fn pick_situation(&mut self, situation_id: &str) -> bool {
        match find_situation(situation_id) {
            Some(situation) => self.generate_situation(situation.prompt_seed).await,
            None => {
                warn!("Unknown situation '{}'", situation_id);
                false
            }
        }
    }

    /// Puts a catalogue entry's seed sentence straight into the input.
    pub fn fill_situation(&mut self, situation_id: &str) -> bool {
        match find_situation(situation_id) {
            Some(situation) => {
                self.set_input(situation.prompt_seed);
                self.state.error = None;
                true
            }
            None => false,
        }
    }

    pub fn select_context(&mut self, label: &str) -> bool {
        if !self.state.available_contexts.contains(label) {
            debug!("Context '{}' is not available", label);
            return false;
        }
        self.state.selected_context = Context::new(label);
        true
    }

    /// Adds `name` unless it already exists, selects it either way and closes
    /// the add-context form. Blank names change nothing.
    pub fn add_context(&mut self, name: &str) -> bool {
        let Some(context) = self.state.available_contexts.insert(name) else {
            return false;
        };
        info!("Context selected: {}", context);
        self.state.selected_context = context;
        self.state.is_adding_context = false;
        self.state.new_context_name.clear();
        true
    }

    pub fn open_add_context(&mut self) {
        self.state.is_adding_context = true;
    }

    pub fn set_new_context_name(&mut self, name: impl Into<String>) {
        self.state.new_context_name = name.into();
    }

    pub fn cancel_add_context(&mut self) {
        self.state.is_adding_context = false;
        self.state.new_context_name.clear();
    }

    pub fn submit_new_context(&mut self) -> bool {
        let name = self.state.new_context_name.clone();
        self.add_context(&name)
    }

    pub fn clear_input(&mut self) {
        self.state.input_text.clear();
        self.state.error = None;
        self.state.result = None;
        self.translate_gate.invalidate();
        self.situation_gate.invalidate();
    }

    pub fn dismiss_result(&mut self) {
        self.state.result = None;
    }

    /// Copies the translated text. Clipboard failures are only logged.
    pub fn copy_result(&mut self) -> bool {
        let Some(result) = self.state.result.as_ref() else {
            return false;
        };
        match self.clipboard.write_text(&result.translated_text) {
            Ok(()) => {
                self.state.notice = Some(COPIED_NOTICE.to_string());
                true
            }
            Err(e) => {
                warn!("Copy failed: {}", e);
                false
            }
        }
    }

    pub fn start_recording(&mut self) -> bool {
        match self.voice.start() {
            Ok(()) => {
                self.state.error = None;
                self.state.is_recording = true;
                true
            }
            Err(VoiceError::AlreadyListening) => false,
            Err(VoiceError::Unsupported) => {
                self.state.notice = Some(VoiceError::Unsupported.to_string());
                false
            }
            Err(e) => {
                self.state.error = Some(e.to_string());
                self.state.is_recording = false;
                false
            }
        }
    }

    pub fn stop_recording(&mut self) {
        self.voice.stop();
        self.state.is_recording = false;
    }

    pub fn toggle_recording(&mut self) -> bool {
        if self.state.is_recording {
            self.stop_recording();
            false
        } else {
            self.start_recording()
        }
    }

    /// Whether recognizer output may still arrive.
    pub fn voice_pending(&self) -> bool {
        self.voice.has_session()
    }

    /// Applies any recognizer output that has already arrived.
    pub fn poll_voice(&mut self) -> usize {
        let updates = self.voice.poll();
        let count = updates.len();
        for update in updates {
            self.apply_voice_update(update);
        }
        count
    }

    /// Waits for the next recognizer update and applies it. Returns `false`
    /// when no session is open.
    pub async fn wait_voice(&mut self) -> bool {
        match self.voice.next_update().await {
            Some(update) => {
                self.apply_voice_update(update);
                true
            }
            None => false,
        }
    }

    fn apply_voice_update(&mut self, update: VoiceUpdate) {
        match update {
            VoiceUpdate::Transcript(transcript) => {
                let text = append_transcript(&self.state.input_text, &transcript);
                self.set_input(text);
            }
            VoiceUpdate::Failed(e) => {
                self.state.error = Some(e.to_string());
            }
            VoiceUpdate::NoSpeech | VoiceUpdate::Ended => {}
        }
        self.state.is_recording = self.voice.is_listening();
    }
}
