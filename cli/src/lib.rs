//! The `docpeek` command line: configuration, logging, local collaborators
//! for the navigator (file-backed store, system editor and clipboard), and
//! the subcommands that tie them together.

pub mod commands;
pub mod config;
pub mod file_store;
pub mod history;
pub mod logging;
pub mod system_clipboard;
pub mod system_editor;

pub use commands::AppContext;
pub use commands::Cli;
pub use commands::Command;
pub use config::Config;
pub use file_store::JsonLinesStore;
pub use history::QueryHistory;
pub use system_clipboard::SystemClipboard;
pub use system_editor::SystemEditor;

use anyhow::Result;

/// Loads configuration from the docpeek home, installs logging and runs
/// `cli.command`.
pub fn run(cli: Cli) -> Result<()> {
    let home = config::find_docpeek_home()?;
    let _log_guard = logging::init(&home)?;
    let config = Config::load(&home)?;
    let ctx = AppContext::new(&home, config, &cli)?;
    tracing::debug!(home = %home.display(), command = ?cli.command, "running command");
    let result = commands::run(cli.command, &ctx);
    if let Err(err) = &result {
        tracing::error!("command failed: {err:#}");
    }
    result
}
