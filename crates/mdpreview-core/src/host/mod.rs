//! Retained host layer: the element tree, window-level listeners, timers and clipboard that
//! interactive components are mounted into.

mod clipboard;
mod document;
mod window;

#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use clipboard::Clipboard;
pub use clipboard::ClipboardError;
pub use clipboard::MemoryClipboard;
pub use document::Document;
pub use document::NodeId;
pub use window::HostContext;
pub use window::PointerDownEvent;
pub use window::Subscription;
pub use window::Window;
