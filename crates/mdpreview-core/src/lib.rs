//! `mdpreview-core` provides the building blocks shared by the mdpreview crates.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: you drive input, timers and rendering from your app.
//! - No async runtime: everything runs on the main thread.
//! - Components paint into a `ratatui` buffer and mount the regions they paint into a
//!   [`host::Document`], so window-level listeners can resolve what is under the pointer.
//!
//! Useful entry points:
//! - [`host::Window`]: document + pointer-down listeners + timers + clipboard.
//! - [`render::render_spans_clipped`]: span painting used by the widgets.
//! - [`theme::Theme`]: styles shared by the markdown viewer and the previewer.
pub mod theme;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod host;
pub mod input;
pub mod render;
