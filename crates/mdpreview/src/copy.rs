//! Copy-to-clipboard for code block markers.
//!
//! The marker is emitted by [`mdpreview_markdown::CopyableCodeBlocks`] deep inside the viewer
//! output, so the previewer does not hold it. Instead [`handle_pointer_down`] runs for every
//! pointer-down on the window and checks whether the target is a marker.

use std::time::Duration;

use mdpreview_core::host::HostContext;
use mdpreview_core::host::NodeId;
use mdpreview_core::host::PointerDownEvent;
use mdpreview_markdown::custom::COPY_ICON_TEST_ID;
use mdpreview_markdown::custom::DATA_CONTENT;
use mdpreview_markdown::custom::DATA_COPIED;
use mdpreview_markdown::custom::DATA_TESTID;

/// How long `data-copied="true"` stays on a marker after a copy.
pub const COPIED_RESET_DELAY: Duration = Duration::from_secs(2);

/// Window-level pointer-down listener.
///
/// Returns `true` when a copy happened. A failed clipboard write changes nothing.
pub fn handle_pointer_down(event: &PointerDownEvent, ctx: &mut HostContext<'_>) -> bool {
    let Some((marker, sibling)) = copy_marker(event, ctx) else {
        return false;
    };

    let doc = &*ctx.document;
    let content = doc
        .parent_element(marker)
        .and_then(|parent| doc.attribute(parent, DATA_CONTENT))
        .unwrap_or_default()
        .to_string();

    if ctx.clipboard.write_text(&content).is_err() {
        return false;
    }

    ctx.document.set_attribute(marker, DATA_COPIED, "true");
    ctx.document.set_attribute(sibling, DATA_COPIED, "true");
    ctx.set_timeout(COPIED_RESET_DELAY, move |doc| {
        doc.set_attribute(marker, DATA_COPIED, "false");
        doc.set_attribute(sibling, DATA_COPIED, "false");
    });

    #[cfg(feature = "tracing")]
    tracing::debug!(bytes = content.len(), "code block copied");

    true
}

fn copy_marker(event: &PointerDownEvent, ctx: &HostContext<'_>) -> Option<(NodeId, NodeId)> {
    let target = event.target?;
    if ctx.document.attribute(target, DATA_TESTID) != Some(COPY_ICON_TEST_ID) {
        return None;
    }
    let sibling = ctx.document.previous_element_sibling(target)?;
    Some((target, sibling))
}
