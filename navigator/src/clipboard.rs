use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {message}")]
    Unavailable { message: String },
    #[error("clipboard does not hold text")]
    NotText,
}

pub trait Clipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError>;

    fn read(&mut self) -> Result<String, ClipboardError>;
}

/// Clipboard kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.contents = Some(text.to_string());
        Ok(())
    }

    fn read(&mut self) -> Result<String, ClipboardError> {
        self.contents.clone().ok_or(ClipboardError::NotText)
    }
}
