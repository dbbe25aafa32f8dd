//! Renderer overrides for specific markdown constructs.

use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::view::Element;
use mdpreview_core::theme::Theme;

/// `data-testid` of the copy marker emitted by [`CopyableCodeBlocks`].
pub const COPY_ICON_TEST_ID: &str = "code-block-copy-icon";
/// Attribute on the code block container that carries the raw code.
pub const DATA_CONTENT: &str = "data-content";
/// Visual feedback attribute toggled on the marker and the code body after a copy.
pub const DATA_COPIED: &str = "data-copied";
pub const DATA_TESTID: &str = "data-testid";
pub const CLASS: &str = "class";

/// What a [`CustomRenderer`] sees for a code block.
#[derive(Clone, Copy, Debug)]
pub struct CodeBlockContext<'a> {
    /// Fence info string, normalized to its first word.
    pub language: Option<&'a str>,
    /// Raw code, without the trailing newline.
    pub code: &'a str,
    /// Columns available to the block (after any blockquote/list prefix).
    pub width: u16,
}

/// Lines plus element regions produced by an override.
///
/// Element coordinates are relative to the block: line `0`, column `0` is the block's first
/// cell. The viewer shifts them into document coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedBlock {
    pub lines: Vec<Line<'static>>,
    pub elements: Vec<Element>,
}

/// Hook invoked by [`crate::MarkdownViewer`] for constructs it lets callers override.
///
/// Returning `None` keeps the viewer's default rendering.
pub trait CustomRenderer {
    fn code_block(&self, ctx: &CodeBlockContext<'_>, theme: &Theme) -> Option<RenderedBlock>;
}

/// Renders code blocks with a header line carrying a copy marker.
///
/// Element structure per block:
///
/// ```text
/// container  class="code-block" data-content=<code> data-language=<lang>
/// ├── body   class="code-block-body"
/// └── icon   class="code-block-copy-icon" data-testid="code-block-copy-icon"
/// ```
///
/// The body is the icon's previous sibling, and the icon's parent carries the code to copy.
#[derive(Clone, Debug)]
pub struct CopyableCodeBlocks {
    pub copy_label: String,
    pub copied_label: String,
    pub body_indent: u16,
}

impl Default for CopyableCodeBlocks {
    fn default() -> Self {
        Self {
            copy_label: "copy".to_string(),
            copied_label: "copied".to_string(),
            body_indent: 2,
        }
    }
}

impl CopyableCodeBlocks {
    pub fn with_labels(copy_label: impl Into<String>, copied_label: impl Into<String>) -> Self {
        Self {
            copy_label: copy_label.into(),
            copied_label: copied_label.into(),
            ..Self::default()
        }
    }

    /// Width reserved for the marker, wide enough for either label.
    pub fn icon_width(&self) -> u16 {
        let copy = display_width(&self.copy_label);
        let copied = display_width(&self.copied_label);
        (copy.max(copied) + 2) as u16
    }

    /// Bracketed marker text, padded to [`Self::icon_width`].
    pub fn marker_label(&self, copied: bool) -> String {
        let label = if copied {
            &self.copied_label
        } else {
            &self.copy_label
        };
        format!("[{}]", centered(label, self.icon_width() as usize - 2))
    }
}

impl CustomRenderer for CopyableCodeBlocks {
    fn code_block(&self, ctx: &CodeBlockContext<'_>, theme: &Theme) -> Option<RenderedBlock> {
        let icon_w = self.icon_width();
        let code_lines: Vec<String> = if ctx.code.is_empty() {
            Vec::new()
        } else {
            ctx.code.split('\n').map(|l| l.replace('\t', "    ")).collect()
        };

        // Long code lines are clipped at paint time; the marker stays in the top-right corner.
        let width = ctx.width.max(icon_w + 1);
        let icon_col = width - icon_w;

        let lang = ctx.language.unwrap_or("");
        let lang_w = display_width(lang).min(icon_col.saturating_sub(1) as usize);
        let mut header = vec![Span::styled(
            truncate_cols(lang, lang_w),
            theme.text_muted,
        )];
        let gap = icon_col as usize - lang_w;
        header.push(Span::styled(" ".repeat(gap), theme.text_muted));
        header.push(Span::styled(self.marker_label(false), theme.accent));

        let mut lines = vec![Line::from(header)];
        let indent = " ".repeat(self.body_indent as usize);
        for line in &code_lines {
            lines.push(Line::from(vec![
                Span::styled(indent.clone(), theme.code_block),
                Span::styled(line.clone(), theme.code_block),
            ]));
        }

        let body_h = code_lines.len().max(1);
        let body = Element::new(1, 0, width, body_h).with_attr(CLASS, "code-block-body");
        let icon = Element::new(0, icon_col, icon_w, 1)
            .with_attr(CLASS, "code-block-copy-icon")
            .with_attr(DATA_TESTID, COPY_ICON_TEST_ID);
        let container = Element::new(0, 0, width, body_h + 1)
            .with_attr(CLASS, "code-block")
            .with_attr(DATA_CONTENT, ctx.code)
            .with_attr("data-language", lang)
            .with_child(body)
            .with_child(icon);

        if code_lines.is_empty() {
            lines.push(Line::from(Span::styled(String::new(), Style::default())));
        }

        Some(RenderedBlock {
            lines,
            elements: vec![container],
        })
    }
}

fn truncate_cols(s: &str, max_cols: usize) -> String {
    let mut out = String::new();
    let mut cols = 0;
    for ch in s.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if cols + w > max_cols {
            break;
        }
        cols += w;
        out.push(ch);
    }
    out
}

fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn centered(label: &str, width: usize) -> String {
    let w = display_width(label).min(width);
    let label = truncate_cols(label, w);
    let left = (width - w) / 2;
    let right = width - w - left;
    format!("{}{label}{}", " ".repeat(left), " ".repeat(right))
}
