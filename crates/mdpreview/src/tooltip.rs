//! Popover placement.

use ratatui::layout::Rect;

/// Side of the anchor the popover opens on, with optional edge alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Placement {
    #[default]
    Top,
    TopLeft,
    TopRight,
    Bottom,
    BottomLeft,
    BottomRight,
    Left,
    Right,
}

impl Placement {
    fn flipped(self) -> Self {
        match self {
            Placement::Top => Placement::Bottom,
            Placement::TopLeft => Placement::BottomLeft,
            Placement::TopRight => Placement::BottomRight,
            Placement::Bottom => Placement::Top,
            Placement::BottomLeft => Placement::TopLeft,
            Placement::BottomRight => Placement::TopRight,
            Placement::Left => Placement::Right,
            Placement::Right => Placement::Left,
        }
    }

    fn fits(self, anchor: Rect, width: u16, height: u16, frame: Rect) -> bool {
        match self {
            Placement::Top | Placement::TopLeft | Placement::TopRight => {
                anchor.y.saturating_sub(frame.y) >= height
            }
            Placement::Bottom | Placement::BottomLeft | Placement::BottomRight => {
                frame.bottom().saturating_sub(anchor.bottom()) >= height
            }
            Placement::Left => anchor.x.saturating_sub(frame.x) >= width,
            Placement::Right => frame.right().saturating_sub(anchor.right()) >= width,
        }
    }
}

/// Places a `width`x`height` popover next to `anchor` inside `frame`.
///
/// When the requested side has no room but the opposite one does, the placement flips. The
/// result is then clamped into `frame`, so it may overlap the anchor on small screens.
pub fn popover_rect(
    anchor: Rect,
    width: u16,
    height: u16,
    frame: Rect,
    placement: Placement,
) -> Rect {
    let width = width.min(frame.width);
    let height = height.min(frame.height);
    if width == 0 || height == 0 {
        return Rect::new(frame.x, frame.y, 0, 0);
    }

    let placement = if !placement.fits(anchor, width, height, frame)
        && placement.flipped().fits(anchor, width, height, frame)
    {
        placement.flipped()
    } else {
        placement
    };

    let center_x = (anchor.x as i32 + anchor.width as i32 / 2 - width as i32 / 2).max(0);
    let center_y = (anchor.y as i32 + anchor.height as i32 / 2 - height as i32 / 2).max(0);
    let left = anchor.x as i32;
    let right_aligned = anchor.right() as i32 - width as i32;
    let above = anchor.y as i32 - height as i32;
    let below = anchor.bottom() as i32;

    let (x, y) = match placement {
        Placement::Top => (center_x, above),
        Placement::TopLeft => (left, above),
        Placement::TopRight => (right_aligned, above),
        Placement::Bottom => (center_x, below),
        Placement::BottomLeft => (left, below),
        Placement::BottomRight => (right_aligned, below),
        Placement::Left => (anchor.x as i32 - width as i32, center_y),
        Placement::Right => (anchor.right() as i32, center_y),
    };

    let max_x = (frame.right() - width) as i32;
    let max_y = (frame.bottom() - height) as i32;
    let x = x.clamp(frame.x as i32, max_x) as u16;
    let y = y.clamp(frame.y as i32, max_y) as u16;
    Rect::new(x, y, width, height)
}
