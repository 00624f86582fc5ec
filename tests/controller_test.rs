use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use unggah_lib::clipboard::MemoryClipboard;
use unggah_lib::controller::{Controller, COPIED_NOTICE};
use unggah_lib::generation::{
    GenerationEndpoint, GenerationError, GenerationRequest, ResponseSchema,
};
use unggah_lib::settings::get_default_settings;
use unggah_lib::translation::TranslateError;
use unggah_lib::types::{Register, TranslationResult, CONTEXT_ELDER, CONTEXT_PEER};
use unggah_lib::voice::{
    RecognitionConfig, RecognitionErrorKind, RecognitionEvent, SpeechRecognizer, VoiceCapture,
    VoiceError,
};

/// Replies from a script and records every request it receives.
#[derive(Default)]
struct ScriptedEndpoint {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedEndpoint {
    fn replying(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].prompt.clone()
    }

    fn schema(&self, index: usize) -> Option<ResponseSchema> {
        self.requests.lock().unwrap()[index].response_schema.clone()
    }
}

#[async_trait]
impl GenerationEndpoint for ScriptedEndpoint {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

#[derive(Clone, Default)]
struct ChannelRecognizer {
    sender: Arc<Mutex<Option<UnboundedSender<RecognitionEvent>>>>,
}

impl ChannelRecognizer {
    fn send(&self, event: RecognitionEvent) {
        let sender = self.sender.lock().unwrap();
        sender.as_ref().unwrap().send(event).unwrap();
    }

    fn say(&self, transcript: &str) {
        self.send(RecognitionEvent::Result {
            transcript: transcript.to_string(),
            is_final: true,
        });
        self.send(RecognitionEvent::Ended);
    }
}

fn listening_controller() -> (Controller, ChannelRecognizer) {
    let recognizer = ChannelRecognizer::default();
    let voice = VoiceCapture::new(Some(Box::new(recognizer.clone())), RecognitionConfig::default());
    let (controller, _) = controller_with_voice(ScriptedEndpoint::replying(vec![]), voice);
    (controller, recognizer)
}

impl SpeechRecognizer for ChannelRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(
        &mut self,
        _config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError> {
        *self.sender.lock().unwrap() = Some(events);
        Ok(())
    }

    fn stop(&mut self) {}
}

fn controller(endpoint: Arc<ScriptedEndpoint>) -> (Controller, MemoryClipboard) {
    controller_with_voice(endpoint, VoiceCapture::unsupported())
}

fn controller_with_voice(
    endpoint: Arc<ScriptedEndpoint>,
    voice: VoiceCapture,
) -> (Controller, MemoryClipboard) {
    let clipboard = MemoryClipboard::default();
    let controller = unggah_lib::controller_with(
        endpoint,
        &get_default_settings(),
        voice,
        Box::new(clipboard.clone()),
    );
    (controller, clipboard)
}

const KRAMA_REPLY: &str = r#"{
  "translatedText": "Kula badhe tindak dhateng peken.",
  "level": "Krama Alus",
  "explanation": "Krama Alus dipunginakaken dhateng tiyang sepuh."
}"#;

#[tokio::test]
async fn translates_for_elder_in_krama_alus() {
    let endpoint = ScriptedEndpoint::replying(vec![Ok(KRAMA_REPLY.to_string())]);
    let (mut controller, _) = controller(endpoint.clone());
    assert_eq!(controller.state().selected_context.label(), CONTEXT_ELDER);

    controller.set_input("Saya mau pergi ke pasar.");
    assert!(controller.translate().await);

    let state = controller.state();
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(
        state.result,
        Some(TranslationResult {
            translated_text: "Kula badhe tindak dhateng peken.".to_string(),
            level: Register::KramaAlus,
            explanation: "Krama Alus dipunginakaken dhateng tiyang sepuh.".to_string(),
        })
    );
    assert_eq!(endpoint.calls(), 1);
    let prompt = endpoint.prompt(0);
    assert!(prompt.contains("Saya mau pergi ke pasar."));
    assert!(prompt.contains(CONTEXT_ELDER));
    assert!(prompt.contains("Krama Alus"));
}

#[tokio::test]
async fn translate_asks_for_three_string_fields_and_examples_for_free_text() {
    let endpoint = ScriptedEndpoint::replying(vec![
        Ok(KRAMA_REPLY.to_string()),
        Ok("Sugeng sonten, Pak.".to_string()),
    ]);
    let (mut controller, _) = controller(endpoint.clone());

    controller.set_input("Selamat sore.");
    controller.translate().await;
    controller.generate_situation("Menyapa calon mertua").await;

    assert_eq!(
        endpoint.schema(0),
        Some(ResponseSchema::object_of_strings([
            "translatedText",
            "level",
            "explanation"
        ]))
    );
    assert_eq!(endpoint.schema(1), None);
}

#[tokio::test]
async fn blank_input_never_reaches_the_endpoint() {
    let endpoint = ScriptedEndpoint::replying(vec![]);
    let (mut controller, _) = controller(endpoint.clone());

    controller.set_input("   \n");
    assert!(!controller.translate().await);

    assert_eq!(endpoint.calls(), 0);
    assert_eq!(controller.state().result, None);
    assert!(!controller.state().is_loading);
}

#[tokio::test]
async fn upstream_failure_leaves_error_and_no_result() {
    let endpoint = ScriptedEndpoint::replying(vec![
        Ok(KRAMA_REPLY.to_string()),
        Err(GenerationError::QuotaExceeded),
    ]);
    let (mut controller, _) = controller(endpoint);

    controller.set_input("Terima kasih.");
    controller.translate().await;
    assert!(controller.state().result.is_some());

    controller.translate().await;
    let state = controller.state();
    assert_eq!(state.result, None);
    assert_eq!(state.error, Some(TranslateError::Failed.to_string()));
    assert!(!state.is_loading);
}

#[tokio::test]
async fn unparseable_reply_is_a_failure() {
    let endpoint = ScriptedEndpoint::replying(vec![Ok(r#"{"translatedText":"Matur nuwun"}"#.to_string())]);
    let (mut controller, _) = controller(endpoint);

    controller.set_input("Terima kasih.");
    controller.translate().await;
    assert_eq!(controller.state().result, None);
    assert_eq!(
        controller.state().error.as_deref(),
        Some("Gagal menerjemahkan teks. Silakan coba lagi.")
    );
}

#[tokio::test]
async fn example_falls_back_to_situation_prompt_on_failure() {
    let endpoint = ScriptedEndpoint::replying(vec![Err(GenerationError::Timeout)]);
    let (mut controller, _) = controller(endpoint.clone());

    assert!(controller.generate_situation("Meminta izin pulang terlambat").await);
    assert_eq!(controller.state().input_text, "Meminta izin pulang terlambat");
    assert!(!controller.state().is_generating_situation);
    assert_eq!(controller.state().error, None);
    assert_eq!(endpoint.calls(), 1);
}

#[tokio::test]
async fn example_replaces_input_with_cleaned_text() {
    let endpoint = ScriptedEndpoint::replying(vec![Ok(
        "  \"Bapak, saya pamit dulu.\"\n".to_string()
    )]);
    let (mut controller, _) = controller(endpoint.clone());
    controller.set_input("teks lama");

    assert!(controller.pick_situation("izin_pergi").await);
    assert_eq!(controller.state().input_text, "Bapak, saya pamit dulu.");
    assert!(endpoint.prompt(0).contains("minta izin mau pergi"));
}

#[tokio::test]
async fn unknown_situation_makes_no_call() {
    let endpoint = ScriptedEndpoint::replying(vec![]);
    let (mut controller, _) = controller(endpoint.clone());
    assert!(!controller.pick_situation("tidak_ada").await);
    assert!(!controller.fill_situation("tidak_ada"));
    assert_eq!(endpoint.calls(), 0);
}

#[test]
fn fill_situation_copies_seed_sentence() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    assert!(controller.fill_situation("tanya_kabar"));
    assert_eq!(
        controller.state().input_text,
        "Halo kawan, apa kabarmu hari ini? Semoga sehat selalu ya."
    );
}

#[test]
fn adding_existing_context_selects_without_growing() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    assert_eq!(controller.state().available_contexts.len(), 3);

    assert!(controller.add_context(CONTEXT_PEER));
    assert_eq!(controller.state().available_contexts.len(), 3);
    assert_eq!(controller.state().selected_context.label(), CONTEXT_PEER);

    assert!(controller.add_context("  Guru  "));
    assert_eq!(controller.state().available_contexts.len(), 4);
    assert_eq!(controller.state().selected_context.label(), "Guru");

    assert!(!controller.add_context("   "));
    assert_eq!(controller.state().available_contexts.len(), 4);
}

#[test]
fn add_context_form_submits_and_closes() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    controller.open_add_context();
    assert!(controller.state().is_adding_context);
    controller.set_new_context_name("Pak RT");
    assert!(controller.submit_new_context());

    let state = controller.state();
    assert!(!state.is_adding_context);
    assert_eq!(state.new_context_name, "");
    assert_eq!(state.selected_context.label(), "Pak RT");
}

#[test]
fn selecting_unknown_context_keeps_selection() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    assert!(!controller.select_context("Tetangga"));
    assert_eq!(controller.state().selected_context.label(), CONTEXT_ELDER);
}

#[test]
fn reply_after_clear_is_discarded() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    controller.set_input("Saya lapar.");
    let ticket = controller.begin_translate().expect("ticket issued");
    assert!(controller.state().is_loading);
    assert!(controller.begin_translate().is_none());

    controller.clear_input();
    let late = TranslationResult {
        translated_text: "Kula luwe.".to_string(),
        level: Register::KramaMadya,
        explanation: "-".to_string(),
    };
    assert!(!controller.finish_translate(ticket.token, Ok(late)));

    let state = controller.state();
    assert_eq!(state.result, None);
    assert_eq!(state.input_text, "");
    assert!(!state.is_loading);
}

#[test]
fn typing_invalidates_pending_example() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    let ticket = controller.begin_situation("Sungkeman").expect("ticket issued");
    controller.set_input("Saya ketik sendiri.");

    assert!(!controller.finish_situation(ticket.token, "Contoh.".to_string()));
    assert_eq!(controller.state().input_text, "Saya ketik sendiri.");
    assert!(!controller.state().is_generating_situation);
}

#[test]
fn example_is_refused_while_another_request_is_in_flight() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    controller.set_input("Saya lapar.");
    let translating = controller.begin_translate().expect("ticket issued");
    assert!(controller.begin_situation("Sungkeman").is_none());
    assert!(!controller.state().is_generating_situation);
    controller.finish_translate(translating.token, Err(TranslateError::Failed));

    let first = controller.begin_situation("Sungkeman").expect("ticket issued");
    assert!(controller.begin_situation("Kabar Duka").is_none());
    assert!(controller.finish_situation(first.token, "Nyuwun pangapunten.".to_string()));
    assert_eq!(controller.state().input_text, "Nyuwun pangapunten.");
}

#[tokio::test]
async fn copy_and_dismiss_result() {
    let endpoint = ScriptedEndpoint::replying(vec![Ok(KRAMA_REPLY.to_string())]);
    let (mut controller, clipboard) = controller(endpoint);

    assert!(!controller.copy_result());
    controller.set_input("Saya mau pergi ke pasar.");
    controller.translate().await;

    assert!(controller.copy_result());
    assert_eq!(clipboard.contents().as_deref(), Some("Kula badhe tindak dhateng peken."));
    assert_eq!(controller.take_notice().as_deref(), Some(COPIED_NOTICE));
    assert_eq!(controller.take_notice(), None);

    controller.dismiss_result();
    assert_eq!(controller.state().result, None);
    assert_eq!(controller.state().input_text, "Saya mau pergi ke pasar.");
}

#[test]
fn recording_without_recognizer_shows_notice() {
    let (mut controller, _) = controller(ScriptedEndpoint::replying(vec![]));
    assert!(!controller.toggle_recording());
    assert!(!controller.state().is_recording);
    assert_eq!(
        controller.take_notice(),
        Some(VoiceError::Unsupported.to_string())
    );
}

#[test]
fn voice_transcript_is_appended_to_input() {
    let recognizer = ChannelRecognizer::default();
    let voice = VoiceCapture::new(Some(Box::new(recognizer.clone())), RecognitionConfig::default());
    let (mut controller, _) = controller_with_voice(ScriptedEndpoint::replying(vec![]), voice);

    controller.set_input("Selamat");
    assert!(controller.toggle_recording());
    assert!(controller.state().is_recording);

    recognizer.say("halo");
    assert_eq!(controller.poll_voice(), 2);
    assert_eq!(controller.state().input_text, "Selamat halo");
    assert!(!controller.state().is_recording);
    assert!(!controller.voice_pending());
}

#[tokio::test]
async fn waiting_for_voice_applies_the_transcript() {
    let recognizer = ChannelRecognizer::default();
    let voice = VoiceCapture::new(Some(Box::new(recognizer.clone())), RecognitionConfig::default());
    let (mut controller, _) = controller_with_voice(ScriptedEndpoint::replying(vec![]), voice);

    controller.start_recording();
    controller.stop_recording();
    assert!(!controller.state().is_recording);
    assert!(controller.voice_pending());

    recognizer.say("sugeng enjing");
    assert!(controller.wait_voice().await);
    assert_eq!(controller.state().input_text, "sugeng enjing");
}

#[tokio::test]
async fn starting_to_record_clears_the_error() {
    let (mut controller, _) = listening_controller();
    controller.set_input("  ");
    controller.translate().await;
    assert_eq!(
        controller.state().error,
        Some(TranslateError::EmptyInput.to_string())
    );

    assert!(controller.start_recording());
    assert_eq!(controller.state().error, None);
    assert!(controller.state().is_recording);
}

#[test]
fn recognizer_failure_surfaces_as_error() {
    let (mut controller, recognizer) = listening_controller();
    controller.start_recording();

    recognizer.send(RecognitionEvent::Error(RecognitionErrorKind::Other(
        "audio-capture".to_string(),
    )));
    controller.poll_voice();

    let state = controller.state();
    assert_eq!(
        state.error.as_deref(),
        Some("Gagal mengenali suara: audio-capture")
    );
    assert!(!state.is_recording);
}

#[test]
fn no_speech_stops_recording_without_error() {
    let (mut controller, recognizer) = listening_controller();
    controller.set_input("Selamat");
    controller.start_recording();

    recognizer.send(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
    assert_eq!(controller.poll_voice(), 1);

    let state = controller.state();
    assert!(!state.is_recording);
    assert_eq!(state.error, None);
    assert_eq!(state.input_text, "Selamat");
}

#[test]
fn recording_again_waits_for_the_stopped_transcript() {
    let (mut controller, recognizer) = listening_controller();
    controller.start_recording();
    controller.stop_recording();
    assert!(!controller.start_recording());

    recognizer.say("matur nuwun");
    controller.poll_voice();
    assert_eq!(controller.state().input_text, "matur nuwun");
    assert!(controller.start_recording());
}
