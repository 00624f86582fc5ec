pub mod cli;
pub mod clipboard;
pub mod controller;
pub mod generation;
pub mod logging;
pub mod settings;
pub mod situation;
pub mod translation;
pub mod types;
pub mod voice;

use clipboard::{Clipboard, SystemClipboard};
use controller::Controller;
use generation::gemini::GeminiClient;
use generation::{GenerationEndpoint, GenerationError};
use log::info;
use settings::AppSettings;
use situation::SituationWriter;
use std::sync::Arc;
use translation::Translator;
use types::ContextSet;
use voice::microphone::MicrophoneRecognizer;
use voice::VoiceCapture;

/// Wires a controller against the hosted model, the default microphone and
/// the system clipboard.
pub fn build_controller(
    settings: &AppSettings,
    runtime: tokio::runtime::Handle,
) -> Result<Controller, GenerationError> {
    let client = GeminiClient::new(settings.gemini_config())?;
    let recognizer =
        MicrophoneRecognizer::new(client.clone(), &settings.transcription_model, runtime);
    let voice = VoiceCapture::new(Some(Box::new(recognizer)), settings.recognition_config());

    Ok(controller_with(
        Arc::new(client),
        settings,
        voice,
        Box::new(SystemClipboard),
    ))
}

/// Wires a controller from explicit collaborators.
pub fn controller_with(
    endpoint: Arc<dyn GenerationEndpoint>,
    settings: &AppSettings,
    voice: VoiceCapture,
    clipboard: Box<dyn Clipboard>,
) -> Controller {
    let translator = Translator::new(endpoint.clone(), &settings.model);
    let writer = SituationWriter::new(endpoint, &settings.model);
    let mut controller = Controller::new(
        translator,
        writer,
        voice,
        clipboard,
        ContextSet::default(),
    );
    if !controller.select_context(&settings.default_context) {
        info!(
            "Default context '{}' is not a seed context, keeping '{}'",
            settings.default_context,
            controller.state().selected_context
        );
    }
    controller
}
