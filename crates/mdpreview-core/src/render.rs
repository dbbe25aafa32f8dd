use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Paints `spans` starting at `(x, y)`, clipped to `max_cols` cells.
///
/// Spans with a default style are painted with `fallback_style`. Tabs expand to four spaces and
/// wide characters that would straddle the clip edge are dropped. Returns the number of cells
/// written.
pub fn render_spans_clipped(
    x: u16,
    y: u16,
    max_cols: u16,
    buf: &mut Buffer,
    spans: &[Span<'_>],
    fallback_style: Style,
) -> u16 {
    if max_cols == 0 {
        return 0;
    }

    let max_cols = max_cols as usize;
    let mut out_cols = 0usize;
    let mut tmp = [0u8; 4];

    for span in spans {
        let style = if span.style == Style::default() {
            fallback_style
        } else {
            fallback_style.patch(span.style)
        };
        for ch in span.content.chars() {
            if ch == '\t' {
                for _ in 0..4 {
                    if out_cols + 1 > max_cols {
                        return out_cols as u16;
                    }
                    put(buf, x + out_cols as u16, y, " ", style);
                    out_cols += 1;
                }
                continue;
            }

            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if w == 0 {
                continue;
            }
            if out_cols + w > max_cols {
                return out_cols as u16;
            }

            put(buf, x + out_cols as u16, y, ch.encode_utf8(&mut tmp), style);
            out_cols += 1;
            if w == 2 {
                put(buf, x + out_cols as u16, y, "", style);
                out_cols += 1;
            }
        }
    }
    out_cols as u16
}

fn put(buf: &mut Buffer, x: u16, y: u16, symbol: &str, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_style(style);
        cell.set_symbol(symbol);
    }
}

/// Display width of `spans` in terminal cells.
pub fn spans_width(spans: &[Span<'_>]) -> usize {
    spans
        .iter()
        .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
        .sum()
}

/// Returns `true` if `(x, y)` is inside `area`.
pub fn rect_contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x
        && y >= area.y
        && (x as u32) < area.x as u32 + area.width as u32
        && (y as u32) < area.y as u32 + area.height as u32
}
