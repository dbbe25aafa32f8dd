//! Markdown viewer used by `mdpreview`.
//!
//! [`MarkdownViewer`] parses markdown with `pulldown-cmark`, wraps it to a column width and
//! returns styled lines plus [`Element`] regions (links, code blocks) that a host can mount
//! for hit-testing. Code block rendering can be replaced through [`CustomRenderer`];
//! [`CopyableCodeBlocks`] adds a copy marker to each block.
pub mod autolink;
pub mod custom;
pub mod view;

pub use custom::CodeBlockContext;
pub use custom::CopyableCodeBlocks;
pub use custom::CustomRenderer;
pub use custom::RenderedBlock;
pub use view::Element;
pub use view::LinkTarget;
pub use view::MarkdownViewer;
pub use view::RenderedMarkdown;
pub use view::ViewerProps;
