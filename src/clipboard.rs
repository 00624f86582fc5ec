use anyhow::{anyhow, Result};
use cli_clipboard::{ClipboardContext, ClipboardProvider};

/// Write-only clipboard access.
pub trait Clipboard: Send {
    fn write_text(&self, text: &str) -> Result<()>;
}

#[derive(Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut ctx = ClipboardContext::new().map_err(|e| anyhow!("clipboard unavailable: {}", e))?;
        ctx.set_contents(text.to_string())
            .map_err(|e| anyhow!("failed to copy to clipboard: {}", e))
    }
}

/// Clipboard that only remembers what was written. Used where no system
/// clipboard exists and in tests.
#[derive(Default, Clone)]
pub struct MemoryClipboard {
    contents: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| anyhow!("clipboard lock poisoned"))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}
