use anyhow::{Context, Result};

/// Destination for the copy actions
pub trait ClipboardWriter {
    fn write(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard, opened per copy
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new().context("Clipboard is unavailable")?;
        clipboard
            .set_text(text.to_owned())
            .context("Failed to write to clipboard")
    }
}
