use super::wav::{downmix, f32_to_wav_base64};
use super::{RecognitionConfig, RecognitionErrorKind, RecognitionEvent, SpeechRecognizer, VoiceError};
use crate::generation::gemini::GeminiClient;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use log::{debug, error, info};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

/// Clips shorter than this fraction of a second are treated as silence.
const MIN_CLIP_FRACTION: u32 = 4;

struct CaptureSession {
    stop_tx: std_mpsc::Sender<()>,
}

/// Records the default input device and transcribes the clip with the hosted
/// model once the session is stopped.
pub struct MicrophoneRecognizer {
    client: GeminiClient,
    model: String,
    runtime: Handle,
    session: Option<CaptureSession>,
}

impl MicrophoneRecognizer {
    pub fn new(client: GeminiClient, model: impl Into<String>, runtime: Handle) -> Self {
        Self {
            client,
            model: model.into(),
            runtime,
            session: None,
        }
    }
}

impl SpeechRecognizer for MicrophoneRecognizer {
    fn is_available(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn start(
        &mut self,
        config: &RecognitionConfig,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError> {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), VoiceError>>();

        let client = self.client.clone();
        let model = self.model.clone();
        let language = config.language.clone();
        let runtime = self.runtime.clone();

        // cpal streams are not Send, so the stream lives and dies on this thread.
        std::thread::spawn(move || {
            let (samples, sample_rate) = match record_until_stopped(&ready_tx, &stop_rx) {
                Some(clip) => clip,
                None => return,
            };

            if samples.len() < (sample_rate / MIN_CLIP_FRACTION) as usize {
                let _ = events.send(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
                let _ = events.send(RecognitionEvent::Ended);
                return;
            }

            let wav = match f32_to_wav_base64(&samples, sample_rate) {
                Ok(wav) => wav,
                Err(e) => {
                    error!("Failed to encode microphone clip: {}", e);
                    let _ = events.send(RecognitionEvent::Error(RecognitionErrorKind::Other(
                        e.to_string(),
                    )));
                    let _ = events.send(RecognitionEvent::Ended);
                    return;
                }
            };

            runtime.spawn(async move {
                match client.transcribe(wav, &model, Some(&language)).await {
                    Ok(text) if !text.is_empty() => {
                        let _ = events.send(RecognitionEvent::Result {
                            transcript: text,
                            is_final: true,
                        });
                    }
                    Ok(_) => {
                        let _ = events.send(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
                    }
                    Err(e) => {
                        let _ = events.send(RecognitionEvent::Error(RecognitionErrorKind::Other(
                            e.to_string(),
                        )));
                    }
                }
                let _ = events.send(RecognitionEvent::Ended);
            });
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.session = Some(CaptureSession { stop_tx });
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(VoiceError::Recognition(
                "microphone thread exited".to_string(),
            )),
        }
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.stop_tx.send(());
        }
    }
}

/// Runs the input stream until a stop signal arrives (or the sender is
/// dropped). Returns mono samples and their rate, or `None` when the stream
/// could not be opened, which has already been reported on `ready`.
fn record_until_stopped(
    ready: &std_mpsc::Sender<Result<(), VoiceError>>,
    stop: &std_mpsc::Receiver<()>,
) -> Option<(Vec<f32>, u32)> {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        let _ = ready.send(Err(VoiceError::Unsupported));
        return None;
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready.send(Err(VoiceError::Recognition(e.to_string())));
            return None;
        }
    };

    let channels = supported.channels() as usize;
    let sample_rate = supported.sample_rate().0;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, buffer.clone()),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, buffer.clone()),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, buffer.clone()),
        other => {
            let _ = ready.send(Err(VoiceError::Recognition(format!(
                "unsupported sample format {:?}",
                other
            ))));
            return None;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(VoiceError::Recognition(e.to_string())));
            return None;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(VoiceError::Recognition(e.to_string())));
        return None;
    }

    info!(
        "Microphone recording: {} Hz, {} channel(s), {:?}",
        sample_rate, channels, sample_format
    );
    let _ = ready.send(Ok(()));

    // Either an explicit stop or a dropped sender ends the recording.
    let _ = stop.recv();
    drop(stream);

    let interleaved = buffer
        .lock()
        .map(|mut samples| std::mem::take(&mut *samples))
        .unwrap_or_default();
    let samples = downmix(&interleaved, channels);
    debug!("Recording stopped, {} samples", samples.len());
    Some((samples, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if let Ok(mut samples) = buffer.lock() {
                samples.extend(data.iter().map(|&s| s.to_sample::<f32>()));
            }
        },
        |err| error!("Microphone stream error: {}", err),
        None,
    )
}
