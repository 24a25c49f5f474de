pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

use application::commands::AppState;
use clap::Parser;
use cli::Cli;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("focusflow=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_workspace(workspace: Option<PathBuf>) -> std::io::Result<PathBuf> {
    match workspace {
        Some(path) => Ok(path),
        None => std::env::current_dir(),
    }
}

pub fn run() -> ExitCode {
    init_tracing();
    let args = Cli::parse();

    let workspace_root = match resolve_workspace(args.workspace) {
        Ok(path) => path,
        Err(error) => {
            error!(%error, "failed to resolve workspace directory");
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    let state = match AppState::new(workspace_root) {
        Ok(state) => state,
        Err(error) => {
            error!(%error, "failed to initialize app state");
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            error!(%error, "failed to start async runtime");
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let command_name = args.command.name();
    match runtime.block_on(cli::dispatch(&state, args.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", state.command_error(command_name, &error));
            ExitCode::FAILURE
        }
    }
}
