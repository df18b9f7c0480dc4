//! Command-line surface: one subcommand per tool/history/execute operation.
//! Arguments mirror the JSON field names of the operation they front.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "wsk", about = "Portable agent workspace: a ZIP-backed virtual filesystem with undo/redo history and sandboxed script execution")]
pub struct Cli {
    /// Path to the workspace's ZIP archive.
    #[arg(long, global = true, default_value = "workspace.zip")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read a file's contents.
    Read {
        path: String,
        #[arg(long, default_value = "text")]
        encoding: String,
        #[arg(long, default_value_t = u64::MAX)]
        max_bytes: u64,
    },
    /// Read a line range of a file.
    ReadLines {
        path: String,
        #[arg(long, default_value_t = 1)]
        start_line: usize,
        #[arg(long, default_value_t = 200)]
        end_line: usize,
    },
    /// Write a file, creating ancestor directories as needed.
    Write {
        path: String,
        content: String,
        #[arg(long, default_value = "text")]
        encoding: String,
        #[arg(long, default_value_t = true)]
        overwrite: bool,
    },
    /// List a directory's immediate children.
    List { path: String },
    /// Stat a path.
    Stat { path: String },
    /// Create a directory.
    Mkdir {
        path: String,
        #[arg(long, default_value_t = true)]
        recursive: bool,
    },
    /// Delete a file or empty directory.
    Delete { path: String },
    /// Replace an inclusive line range in a file.
    PatchLines {
        path: String,
        start_line: usize,
        end_line: usize,
        replacement: String,
    },
    /// Search file contents for a literal query.
    Search {
        query: String,
        #[arg(long, default_value = "/")]
        path_prefix: String,
        #[arg(long, default_value_t = 8)]
        max_results: usize,
        #[arg(long, default_value_t = 2)]
        context_lines: usize,
    },
    /// Show the recorded history, oldest first.
    History,
    /// Undo the last N mutations.
    Undo {
        #[arg(default_value_t = 1)]
        steps: usize,
    },
    /// Redo the last N undone mutations.
    Redo {
        #[arg(default_value_t = 1)]
        steps: usize,
    },
    /// Restore the workspace to the state just after a given entry.
    Restore { id: String },
    /// Show a diff for a given history entry.
    Diff {
        id: String,
        #[arg(long, default_value_t = 50)]
        max_files: usize,
        #[arg(long, default_value_t = 20)]
        max_preview_lines: usize,
    },
    /// Run a guest script against the workspace in an isolated sandbox.
    Execute {
        #[arg(long, default_value = "~/main.ts")]
        entry_path: String,
        #[arg(long, default_value_t = 1500)]
        timeout_ms: u64,
        argv: Vec<String>,
    },
    /// Print file/directory/history counts for the workspace.
    Summary,
}
