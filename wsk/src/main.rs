//! Thin binary entry point: parses arguments, opens a host session against
//! the configured workspace archive, dispatches one operation, and prints
//! its JSON result. Not a REPL or an agent loop — see `SPEC_FULL.md`.

mod cli;
mod main_helpers;

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use wsk_commons::ToolError;
use wsk_host::{HostConfig, HostSession};
use wsk_tools::{Encoding, SearchParams};

use cli::{Cli, Commands};

fn parse_encoding(raw: &str) -> Encoding {
    match raw {
        "base64" => Encoding::Base64,
        _ => Encoding::Text,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    main_helpers::initialize_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = HostConfig::new(cli.workspace.clone());
    let mut session = HostSession::open(config).context("failed to open workspace")?;

    match cli.command {
        Commands::Read { path, encoding, max_bytes } => {
            print_result(session.fs_read(&path, parse_encoding(&encoding), max_bytes))
        }
        Commands::ReadLines { path, start_line, end_line } => {
            print_result(session.fs_read_lines(&path, start_line, end_line, u64::MAX))
        }
        Commands::Write { path, content, encoding, overwrite } => {
            print_result(session.fs_write(&path, &content, parse_encoding(&encoding), overwrite))
        }
        Commands::List { path } => print_result(session.fs_list(&path)),
        Commands::Stat { path } => print_result(session.fs_stat(&path)),
        Commands::Mkdir { path, recursive } => print_result(session.fs_mkdir(&path, recursive)),
        Commands::Delete { path } => print_result(session.fs_delete(&path)),
        Commands::PatchLines { path, start_line, end_line, replacement } => {
            print_result(session.fs_patch_lines(&path, start_line, end_line, &replacement))
        }
        Commands::Search { query, path_prefix, max_results, context_lines } => {
            let params = SearchParams {
                query,
                path_prefix,
                max_results,
                context_lines,
                ..Default::default()
            };
            print_result(session.fs_search(&params))
        }
        Commands::History => print_result(session.history()),
        Commands::Undo { steps } => print_result(session.undo(steps)),
        Commands::Redo { steps } => print_result(session.redo(steps)),
        Commands::Restore { id } => print_result(session.restore(&id)),
        Commands::Diff { id, max_files, max_preview_lines } => {
            print_result(session.diff(&id, max_files, max_preview_lines))
        }
        Commands::Execute { entry_path, timeout_ms, argv } => {
            let env: BTreeMap<String, String> = BTreeMap::new();
            print_result(session.execute(&entry_path, &argv, &env, Some(timeout_ms)).await)
        }
        Commands::Summary => print_result(session.snapshot_summary()),
    }

    Ok(())
}

fn print_result<T: serde::Serialize>(result: Result<T, wsk_host::HostError>) {
    match result {
        Ok(value) => {
            let payload = serde_json::to_string_pretty(&value).expect("result is always serializable");
            println!("{payload}");
        }
        Err(err) => {
            let tool_err = ToolError {
                ok: false,
                error: err.to_string(),
                code: Some(err.code().to_string()),
            };
            let payload = serde_json::to_string_pretty(&tool_err).expect("tool error is always serializable");
            eprintln!("{payload}");
        }
    }
}
