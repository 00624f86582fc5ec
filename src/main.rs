use anyhow::{Context as _, Result};
use clap::Parser;
use log::debug;
use std::process::exit;
use unggah_lib::cli::{self, Cli, Command};
use unggah_lib::logging;
use unggah_lib::settings::{default_settings_path, SettingsStore};

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            eprintln!("unggah error: {err:#}");
            exit(1);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let path = match cli.config {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let store = SettingsStore::new(path);
    let mut settings = store.load_or_create()?;
    settings.apply_env(|name| std::env::var(name).ok());

    logging::init(settings.log_level);
    debug!("Settings loaded from {}", store.path().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let handle = runtime.handle().clone();
    match cli.command.unwrap_or(Command::Repl) {
        Command::Situations => {
            cli::print_situations();
            Ok(())
        }
        Command::Check => runtime.block_on(cli::check(&settings)),
        Command::Contexts => {
            let controller = unggah_lib::build_controller(&settings, handle)?;
            cli::print_contexts(&controller);
            Ok(())
        }
        Command::Translate { text, context } => {
            let mut controller = unggah_lib::build_controller(&settings, handle)?;
            runtime.block_on(cli::translate_once(&mut controller, text, context))
        }
        Command::Example { situation, context } => {
            let mut controller = unggah_lib::build_controller(&settings, handle)?;
            runtime.block_on(cli::example_once(&mut controller, &situation, context))
        }
        Command::Repl => {
            let mut controller = unggah_lib::build_controller(&settings, handle)?;
            runtime.block_on(cli::repl(&mut controller))
        }
    }
}
