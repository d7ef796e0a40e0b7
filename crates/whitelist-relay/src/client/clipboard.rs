use std::time::{Duration, Instant};

pub const COPIED_LABEL: &str = "Copied!";
pub const COPIED_FEEDBACK: Duration = Duration::from_millis(1150);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable")]
    Unavailable,
    #[error("copy rejected: {0}")]
    Rejected(String),
}

/// Anything that can place text on the system clipboard.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Which clipboard path ended up holding the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Clipboard,
    LegacySelection,
}

/// A "copy" button: copies its text and briefly swaps its label for `Copied!`.
#[derive(Debug, Clone)]
pub struct CopyControl {
    text: String,
    idle_label: String,
    copied_at: Option<Instant>,
}

impl CopyControl {
    pub fn new(idle_label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            idle_label: idle_label.into(),
            copied_at: None,
        }
    }

    /// Prefer the text carried by the element's data attribute, else the fixed default.
    pub fn from_attribute(
        idle_label: impl Into<String>,
        attribute: Option<&str>,
        default_text: &str,
    ) -> Self {
        let text = attribute
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(default_text);
        Self::new(idle_label, text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Copy through `primary`, falling back to `legacy` when the primary path fails.
    pub fn copy(
        &mut self,
        primary: &mut dyn Clipboard,
        legacy: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<CopyMethod, ClipboardError> {
        let method = match primary.write_text(&self.text) {
            Ok(()) => CopyMethod::Clipboard,
            Err(primary_err) => {
                tracing::debug!(error = %primary_err, "clipboard write failed, using legacy copy");
                legacy.write_text(&self.text)?;
                CopyMethod::LegacySelection
            }
        };
        self.copied_at = Some(now);
        Ok(method)
    }

    pub fn label(&self, now: Instant) -> &str {
        match self.copied_at {
            Some(copied_at) if now.saturating_duration_since(copied_at) < COPIED_FEEDBACK => {
                COPIED_LABEL
            }
            _ => &self.idle_label,
        }
    }
}
