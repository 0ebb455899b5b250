use docpeek_navigator::Clipboard;
use docpeek_navigator::ClipboardError;

/// The desktop clipboard. Connecting is deferred to the first use so
/// commands that never copy work without a display.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn connect(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().map_err(unavailable)?);
        }
        self.inner.as_mut().ok_or_else(|| ClipboardError::Unavailable {
            message: "clipboard connection was lost".to_string(),
        })
    }
}

fn unavailable(err: arboard::Error) -> ClipboardError {
    ClipboardError::Unavailable {
        message: err.to_string(),
    }
}

impl Clipboard for SystemClipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.connect()?.set_text(text.to_string()).map_err(unavailable)
    }

    fn read(&mut self) -> Result<String, ClipboardError> {
        match self.connect()?.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::NotText),
            Err(err) => Err(unavailable(err)),
        }
    }
}
