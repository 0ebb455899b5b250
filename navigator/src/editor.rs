use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no editor configured; set `editor` in config.toml, $VISUAL or $EDITOR")]
    NotConfigured,
    #[error("editor command {command:?} could not be parsed")]
    InvalidCommand { command: String },
    #[error("editor {command:?} exited with {status}")]
    Exited { command: String, status: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lets the user change text in an external program. Blocks until the
/// program exits.
pub trait ExternalEditor {
    fn edit(&mut self, text: &str) -> Result<String, EditorError>;
}

impl<F> ExternalEditor for F
where
    F: FnMut(&str) -> Result<String, EditorError>,
{
    fn edit(&mut self, text: &str) -> Result<String, EditorError> {
        self(text)
    }
}
