//! Markdown preview component for ratatui apps.
//!
//! [`MarkdownPreviewer`] shows markdown content cut to a character limit with a "more"/"less"
//! toggle, optionally opens a hover popover with the full content, and makes code blocks
//! copyable through a window-level listener.
//!
//! The building blocks live in two sibling crates, re-exported here:
//! - [`core`] (`mdpreview-core`): theme, input events, and the host layer ([`host::Window`]).
//! - [`markdown`] (`mdpreview-markdown`): the markdown viewer and code block renderer.
pub mod copy;
pub mod i18n;
pub mod options;
pub mod previewer;
pub mod tooltip;
pub mod truncate;

pub use mdpreview_core as core;
pub use mdpreview_core::host;
pub use mdpreview_core::input;
pub use mdpreview_core::theme;
pub use mdpreview_markdown as markdown;

pub use options::DESCRIPTION_MAX_PREVIEW_CHARACTERS;
pub use options::PreviewerOptions;
pub use options::TextVariant;
pub use options::TooltipOptions;
pub use previewer::MarkdownPreviewer;
pub use previewer::PreviewerAction;
pub use tooltip::Placement;
