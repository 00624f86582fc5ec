//! Terminal front end: one-shot subcommands and an interactive session.

use crate::controller::{Controller, SessionState};
use crate::generation::gemini::GeminiClient;
use crate::settings::AppSettings;
use crate::types::{Context, SITUATIONS};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Parser)]
#[command(
    name = "unggah",
    version,
    about = "Translate Indonesian into the right level of Javanese"
)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate one sentence and exit.
    Translate {
        text: String,
        #[arg(long, short)]
        context: Option<String>,
    },
    /// Generate an example sentence for a situation from the catalogue.
    Example {
        situation: String,
        #[arg(long, short)]
        context: Option<String>,
    },
    /// List the seed contexts.
    Contexts,
    /// List the situation catalogue.
    Situations,
    /// Check that the API key and model are usable.
    Check,
    /// Interactive session (default).
    Repl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Translate(String),
    SelectContext(String),
    AddContext(String),
    Situation(String),
    Fill(String),
    Example,
    Record,
    StopRecording,
    Copy,
    Clear,
    Dismiss,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_repl_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return ReplCommand::Translate(line.to_string());
    };

    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim().to_string()),
        None => (rest, String::new()),
    };
    match word {
        "ctx" => ReplCommand::SelectContext(arg),
        "add" => ReplCommand::AddContext(arg),
        "sit" => ReplCommand::Situation(arg),
        "fill" => ReplCommand::Fill(arg),
        "ex" => ReplCommand::Example,
        "rec" => ReplCommand::Record,
        "stop" => ReplCommand::StopRecording,
        "copy" => ReplCommand::Copy,
        "clear" => ReplCommand::Clear,
        "dismiss" => ReplCommand::Dismiss,
        "help" | "h" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Unknown(other.to_string()),
    }
}

pub const REPL_HELP: &str = "\
Ketik kalimat Bahasa Indonesia lalu Enter untuk menerjemahkan.
  :ctx <nama>    pilih lawan bicara      :add <nama>  tambah lawan bicara
  :sit <id>      contoh kalimat situasi  :fill <id>   isi kalimat situasi
  :ex            terjemahkan masukan     :rec / :stop rekam suara
  :copy          salin hasil             :clear       kosongkan
  :dismiss       tutup hasil             :quit        keluar";

/// Renders the parts of the session a user needs to see after an action.
pub fn render(state: &SessionState) -> String {
    let mut out = String::new();
    let contexts: Vec<String> = state
        .available_contexts
        .iter()
        .map(|c| {
            if *c == state.selected_context {
                format!("[{}]", c)
            } else {
                c.to_string()
            }
        })
        .collect();
    out.push_str(&format!("Lawan bicara: {}\n", contexts.join(" | ")));
    if !state.input_text.is_empty() {
        out.push_str(&format!("Masukan: {}\n", state.input_text));
    }
    if state.is_recording {
        out.push_str("(merekam...)\n");
    }
    if let Some(result) = &state.result {
        out.push_str(&format!(
            "\n  {}\n  Tingkatan: {}\n  {}\n",
            result.translated_text, result.level, result.explanation
        ));
    }
    if let Some(error) = &state.error {
        out.push_str(&format!("! {}\n", error));
    }
    out
}

pub async fn translate_once(
    controller: &mut Controller,
    text: String,
    context: Option<String>,
) -> Result<()> {
    if let Some(context) = context_arg(context.as_deref()) {
        controller.add_context(context.label());
    }
    controller.set_input(text);
    controller.translate().await;
    print!("{}", render(controller.state()));
    match &controller.state().error {
        Some(error) => anyhow::bail!("{}", error),
        None => Ok(()),
    }
}

pub async fn example_once(
    controller: &mut Controller,
    situation: &str,
    context: Option<String>,
) -> Result<()> {
    if let Some(context) = context_arg(context.as_deref()) {
        controller.add_context(context.label());
    }
    if !controller.pick_situation(situation).await {
        anyhow::bail!("unknown situation '{}', see `unggah situations`", situation);
    }
    println!("{}", controller.state().input_text);
    Ok(())
}

pub fn print_contexts(controller: &Controller) {
    for context in controller.state().available_contexts.iter() {
        println!("{}", context);
    }
}

pub fn print_situations() {
    for situation in SITUATIONS.iter() {
        println!("{:<14} {:<14} {}", situation.id, situation.label, situation.prompt_seed);
    }
}

pub async fn check(settings: &AppSettings) -> Result<()> {
    let client = GeminiClient::new(settings.gemini_config())?;
    client
        .test_connection(&settings.model)
        .await
        .with_context(|| format!("model '{}' is not reachable", settings.model))?;
    println!("OK: {}", settings.model);
    Ok(())
}

async fn handle(controller: &mut Controller, command: ReplCommand) -> bool {
    match command {
        ReplCommand::Translate(text) => {
            controller.set_input(text);
            controller.translate().await;
        }
        ReplCommand::SelectContext(label) => {
            if !controller.select_context(&label) {
                println!("Tidak ada lawan bicara '{}'. Tambahkan dengan :add", label);
            }
        }
        ReplCommand::AddContext(name) => {
            controller.open_add_context();
            controller.set_new_context_name(name);
            if !controller.submit_new_context() {
                controller.cancel_add_context();
            }
        }
        ReplCommand::Situation(id) => {
            if !controller.pick_situation(&id).await {
                println!("Situasi tidak dikenal. Pilihan: {}", situation_ids());
            }
        }
        ReplCommand::Fill(id) => {
            if !controller.fill_situation(&id) {
                println!("Situasi tidak dikenal. Pilihan: {}", situation_ids());
            }
        }
        ReplCommand::Example => {
            controller.translate().await;
        }
        ReplCommand::Record => {
            controller.start_recording();
        }
        ReplCommand::StopRecording => controller.stop_recording(),
        ReplCommand::Copy => {
            controller.copy_result();
        }
        ReplCommand::Clear => controller.clear_input(),
        ReplCommand::Dismiss => controller.dismiss_result(),
        ReplCommand::Help => println!("{}", REPL_HELP),
        ReplCommand::Quit => return false,
        ReplCommand::Empty => {}
        ReplCommand::Unknown(word) => println!("Perintah tidak dikenal: :{} (lihat :help)", word),
    }
    true
}

fn situation_ids() -> String {
    SITUATIONS.iter().map(|s| s.id).collect::<Vec<_>>().join(", ")
}

pub async fn repl(controller: &mut Controller) -> Result<()> {
    println!("{}\n", REPL_HELP);
    print!("{}", render(controller.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let pending_voice = controller.voice_pending();
        let line = tokio::select! {
            line = lines.next_line() => Some(line?),
            _ = controller.wait_voice(), if pending_voice => None,
        };

        match line {
            Some(Some(line)) => {
                if !handle(controller, parse_repl_line(&line)).await {
                    break;
                }
            }
            Some(None) => break,
            None => println!(),
        }

        controller.poll_voice();
        if let Some(notice) = controller.take_notice() {
            println!("* {}", notice);
        }
        print!("{}", render(controller.state()));
    }
    Ok(())
}

/// Context label given on the command line, as a [`Context`].
pub fn context_arg(label: Option<&str>) -> Option<Context> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Context::new)
}
