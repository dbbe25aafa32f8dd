use std::cell::RefCell;
use std::rc::Rc;

/// Why a clipboard write did not happen.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard is not available")]
    Unavailable,
    #[error("clipboard access was denied")]
    PermissionDenied,
    #[error("clipboard write failed: {0}")]
    WriteFailed(String),
}

/// Host clipboard used by copy affordances.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Default)]
struct MemoryClipboardState {
    writes: Vec<String>,
    failure: Option<ClipboardError>,
}

/// In-process clipboard.
///
/// Clones share the same storage, so a caller can keep a handle after moving one into a
/// [`super::Window`]. It can be told to fail, which is how copy paths are exercised without a
/// system clipboard.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    state: Rc<RefCell<MemoryClipboardState>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose writes all fail with `error`.
    pub fn failing(error: ClipboardError) -> Self {
        let cb = Self::new();
        cb.set_failure(Some(error));
        cb
    }

    pub fn set_failure(&self, error: Option<ClipboardError>) {
        self.state.borrow_mut().failure = error;
    }

    /// Most recently written text.
    pub fn contents(&self) -> Option<String> {
        self.state.borrow().writes.last().cloned()
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.state.borrow().writes.clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.failure.clone() {
            return Err(err);
        }
        state.writes.push(text.to_string());
        Ok(())
    }
}

/// System clipboard backed by `arboard`.
///
/// The platform handle is opened lazily on first write and reused afterwards.
#[cfg(feature = "system-clipboard")]
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().map_err(map_arboard_error)?);
        }
        let Some(cb) = self.inner.as_mut() else {
            return Err(ClipboardError::Unavailable);
        };
        cb.set_text(text.to_string()).map_err(map_arboard_error)
    }
}

#[cfg(feature = "system-clipboard")]
fn map_arboard_error(err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardNotSupported => ClipboardError::Unavailable,
        arboard::Error::ClipboardOccupied => ClipboardError::PermissionDenied,
        other => ClipboardError::WriteFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_writes() {
        let handle = MemoryClipboard::new();
        let mut writer = handle.clone();
        writer.write_text("a").unwrap();
        writer.write_text("b").unwrap();
        assert_eq!(handle.contents().as_deref(), Some("b"));
        assert_eq!(handle.writes(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn failing_clipboard_records_nothing() {
        let handle = MemoryClipboard::failing(ClipboardError::PermissionDenied);
        let mut writer = handle.clone();
        assert_eq!(
            writer.write_text("x"),
            Err(ClipboardError::PermissionDenied)
        );
        assert!(handle.writes().is_empty());

        handle.set_failure(None);
        assert!(writer.write_text("x").is_ok());
    }
}
