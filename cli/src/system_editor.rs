use docpeek_navigator::EditorError;
use docpeek_navigator::ExternalEditor;
use std::fs;
use std::io::Write;
use std::process::Command;
use tracing::debug;
use tracing::warn;

const FALLBACK_EDITOR: &str = "vi";

/// Runs a user-chosen editor on a temporary `.json` file.
#[derive(Debug, Clone)]
pub struct SystemEditor {
    command: String,
}

impl SystemEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The configured command, else `$VISUAL`, else `$EDITOR`, else `vi`.
    pub fn resolve(configured: Option<&str>) -> Self {
        let from_env = |name: &str| std::env::var(name).ok().filter(|value| !value.trim().is_empty());
        let command = configured
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .or_else(|| from_env("VISUAL"))
            .or_else(|| from_env("EDITOR"))
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        Self { command }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl ExternalEditor for SystemEditor {
    fn edit(&mut self, text: &str) -> Result<String, EditorError> {
        let argv = shlex::split(&self.command)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| EditorError::InvalidCommand {
                command: self.command.clone(),
            })?;

        let mut file = tempfile::Builder::new()
            .prefix("docpeek-")
            .suffix(".json")
            .tempfile()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        debug!(command = %self.command, path = %file.path().display(), "launching editor");
        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .arg(file.path())
            .status()?;
        if !status.success() {
            warn!(command = %self.command, %status, "editor exited unsuccessfully");
            return Err(EditorError::Exited {
                command: self.command.clone(),
                status: status.to_string(),
            });
        }
        Ok(fs::read_to_string(file.path())?)
    }
}
