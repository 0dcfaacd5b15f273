use std::path::PathBuf;

use clap::Parser;

use crate::{
    api::http::RestBackend,
    commands::{App, Commands},
    config::load_config,
    session::{SessionStorage, json::JsonFileSession},
    shell::TerminalShell,
};

mod api;
mod commands;
mod config;
mod models;
mod services;
mod session;
mod shell;
mod timeline;
mod ui;

#[derive(Parser)]
#[command(
    name = "focused-todo",
    about = "Projects, tasks, time tracking and a week timeline against a Focused To-Do backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file, defaults to <config dir>/focused-todo/config.toml
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    /// More output per occurrence
    #[arg(
        global = true,
        short,
        long,
        action = clap::ArgAction::Count,
        help_heading = "Logging"
    )]
    verbose: u8,

    /// Silence all log output
    #[arg(
        global = true,
        short,
        long,
        action = clap::ArgAction::SetTrue,
        help_heading = "Logging"
    )]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .quiet(cli.quiet)
        .verbosity(cli.verbose as usize + 1)
        .init()
    {
        eprintln!("Warning: Failed to initialise logging: {}", e);
    }

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let backend = match RestBackend::new(&config.backend_url, config.timeout) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let session_storage = JsonFileSession::new(config.session_path.clone());
    let session = match session_storage.load() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: Failed to load session: {}", e);
            std::process::exit(1);
        }
    };

    let shell = TerminalShell::new(backend.base_url());
    let mut app = App::new(config, backend, shell, session);
    let result = app.run(cli.command);

    app.capture();
    if let Err(e) = session_storage.save(&app.session) {
        log::warn!("Could not save session: {}", e);
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
