use std::borrow::Cow;
use std::sync::Arc;

use mdpreview_core::host::Document;
use mdpreview_core::host::NodeId;
use mdpreview_core::host::Subscription;
use mdpreview_core::host::Window;
use mdpreview_core::input::InputEvent;
use mdpreview_core::input::KeyCode;
use mdpreview_core::input::MouseEventKind;
use mdpreview_core::render::rect_contains;
use mdpreview_core::render::render_spans_clipped;
use mdpreview_core::theme::Theme;
use mdpreview_markdown::CopyableCodeBlocks;
use mdpreview_markdown::CustomRenderer;
use mdpreview_markdown::Element;
use mdpreview_markdown::LinkTarget;
use mdpreview_markdown::MarkdownViewer;
use mdpreview_markdown::ViewerProps;
use mdpreview_markdown::custom::CLASS;
use mdpreview_markdown::custom::COPY_ICON_TEST_ID;
use mdpreview_markdown::custom::DATA_COPIED;
use mdpreview_markdown::custom::DATA_TESTID;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Clear;
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::copy;
use crate::i18n::EnglishLabels;
use crate::i18n::LabelKey;
use crate::i18n::Localizer;
use crate::options::PreviewerOptions;
use crate::tooltip::popover_rect;
use crate::truncate::TruncationPolicy;

pub const CONTAINER_CLASS: &str = "rich-text-editor-container";
pub const CONTAINER_TEST_ID: &str = "viewer-container";
pub const PARSER_CLASS: &str = "markdown-parser";
pub const PARSER_TEST_ID: &str = "markdown-parser";
pub const READ_MORE_TEST_ID: &str = "read-more-button";
pub const READ_LESS_TEST_ID: &str = "read-less-button";
pub const POPOVER_TEST_ID: &str = "markdown-popover";

/// What the app should do after [`MarkdownPreviewer::handle_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewerAction {
    None,
    Redraw,
    /// A rendered link was clicked.
    OpenLink {
        href: String,
        /// The link asked for a new browsing context (`target="_blank"`).
        new_context: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    content: Rect,
    toggle: Option<Rect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TreeKey {
    area: Rect,
    generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct CopyMarker {
    icon: NodeId,
    body: NodeId,
}

/// Nodes mounted for one painted viewer.
#[derive(Debug)]
struct PaintedTree {
    node: NodeId,
    key: TreeKey,
    markers: Vec<CopyMarker>,
}

struct Mount {
    _listener: Subscription,
    root: NodeId,
}

struct Popover {
    viewer: MarkdownViewer,
    rect: Option<Rect>,
    tree: Option<PaintedTree>,
}

/// Read-only markdown preview with read more/less truncation and an optional hover popover.
///
/// Lifecycle:
/// - [`Self::mount`] registers the window-level copy listener and creates the root node.
/// - [`Self::render_ref`] paints into a buffer and keeps the mounted nodes in sync with what
///   was painted.
/// - [`Self::handle_event`] reacts to toggle clicks, link clicks and hover.
/// - [`Self::unmount`] (or dropping the previewer) removes the listener.
pub struct MarkdownPreviewer {
    options: PreviewerOptions,
    content: String,
    expanded: bool,
    generation: u64,
    labels: Arc<dyn Localizer + Send + Sync>,
    code_blocks: Arc<CopyableCodeBlocks>,
    viewer: MarkdownViewer,
    mount: Option<Mount>,
    main: Option<PaintedTree>,
    popover: Option<Popover>,
    layout: Option<Layout>,
    detached: Vec<NodeId>,
}

impl Default for MarkdownPreviewer {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for MarkdownPreviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownPreviewer")
            .field("options", &self.options)
            .field("content_len", &self.content.len())
            .field("expanded", &self.expanded)
            .field("mounted", &self.mount.is_some())
            .field("popover_open", &self.popover.is_some())
            .finish()
    }
}

impl MarkdownPreviewer {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_options(content, PreviewerOptions::default())
    }

    pub fn with_options(content: impl Into<String>, options: PreviewerOptions) -> Self {
        let labels: Arc<dyn Localizer + Send + Sync> = Arc::new(EnglishLabels);
        let code_blocks = Arc::new(code_blocks_for(labels.as_ref()));
        let mut previewer = Self {
            options,
            content: content.into(),
            expanded: false,
            generation: 0,
            labels,
            viewer: MarkdownViewer::new(ViewerProps::default()),
            code_blocks,
            mount: None,
            main: None,
            popover: None,
            layout: None,
            detached: Vec::new(),
        };
        previewer.viewer = MarkdownViewer::new(previewer.viewer_props(String::new()));
        previewer
    }

    /// Uses `labels` for the toggle and the code block markers.
    pub fn with_localizer(mut self, labels: Arc<dyn Localizer + Send + Sync>) -> Self {
        self.set_localizer(labels);
        self
    }

    pub fn set_localizer(&mut self, labels: Arc<dyn Localizer + Send + Sync>) {
        self.code_blocks = Arc::new(code_blocks_for(labels.as_ref()));
        self.labels = labels;
        let value = self.viewer.value().to_string();
        self.viewer = MarkdownViewer::new(self.viewer_props(value));
        if let Some(popover) = self.popover.as_mut() {
            popover.viewer = MarkdownViewer::new(ViewerProps {
                value: self.content.clone(),
                ..self.viewer.props().clone()
            });
        }
        self.invalidate();
    }

    pub fn options(&self) -> &PreviewerOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PreviewerOptions) {
        if !options.tooltip_enabled() {
            self.detach_popover();
        }
        self.options = options;
        self.invalidate();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the content. The expanded/collapsed state is kept.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content == self.content {
            return;
        }
        self.content = content;
        if let Some(popover) = self.popover.as_mut() {
            popover.viewer.set_value(&self.content);
        }
        self.invalidate();
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        if self.expanded != expanded {
            self.expanded = expanded;
            self.invalidate();
        }
    }

    /// Flips between collapsed and expanded.
    pub fn toggle(&mut self) {
        self.set_expanded(!self.expanded);

        #[cfg(feature = "tracing")]
        tracing::trace!(expanded = self.expanded, "previewer toggled");
    }

    pub fn truncation(&self) -> TruncationPolicy {
        TruncationPolicy::new(
            self.options.truncation_enabled,
            self.options.truncation_limit,
        )
    }

    pub fn has_overflow(&self) -> bool {
        self.truncation().has_overflow(&self.content)
    }

    /// The markdown handed to the main viewer.
    pub fn display_text(&self) -> Cow<'_, str> {
        self.truncation().display_text(&self.content, self.expanded)
    }

    /// `true` when a toggle line is shown under the content.
    pub fn shows_toggle(&self) -> bool {
        self.options.show_toggle_button && self.has_overflow()
    }

    pub fn toggle_label(&self) -> &str {
        let key = if self.expanded {
            LabelKey::Less
        } else {
            LabelKey::More
        };
        self.labels.label(key)
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    pub fn is_popover_open(&self) -> bool {
        self.popover.is_some()
    }

    /// Full content shown by the popover, if it is open.
    pub fn popover_value(&self) -> Option<&str> {
        self.popover.as_ref().map(|p| p.viewer.value())
    }

    /// Root node of the mounted tree.
    pub fn root_node(&self) -> Option<NodeId> {
        self.mount.as_ref().map(|m| m.root)
    }

    /// Registers the copy listener and creates the root node. No-op if already mounted.
    pub fn mount(&mut self, window: &mut Window) {
        if self.mount.is_some() {
            return;
        }
        let listener = window.add_pointer_down_listener(|event, ctx| {
            copy::handle_pointer_down(event, ctx);
        });
        let doc = window.document_mut();
        let parent = doc.root();
        let Some(root) = doc.create_element(parent, Rect::default()) else {
            return;
        };
        doc.set_attribute(root, CLASS, self.container_class());
        doc.set_attribute(root, DATA_TESTID, CONTAINER_TEST_ID);
        self.mount = Some(Mount {
            _listener: listener,
            root,
        });
        self.main = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(listeners = window.listener_count(), "previewer mounted");
    }

    /// Removes the copy listener and every node this previewer created.
    pub fn unmount(&mut self, window: &mut Window) {
        self.detach_popover();
        let doc = window.document_mut();
        for node in self.detached.drain(..) {
            doc.remove(node);
        }
        if let Some(mount) = self.mount.take() {
            doc.remove(mount.root);
        }
        self.main = None;
        self.layout = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(listeners = window.listener_count(), "previewer unmounted");
    }

    /// Paints the preview into `area` and the popover (if open) on top of `buf`.
    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer, window: &mut Window, theme: &Theme) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "widget_render",
            widget = "MarkdownPreviewer",
            x = area.x,
            y = area.y,
            w = area.width,
            h = area.height
        )
        .entered();

        for node in self.detached.drain(..) {
            window.document_mut().remove(node);
        }

        let theme = theme
            .clone()
            .with_text_base(self.options.text_variant.base_style());
        let display = self.display_text().into_owned();
        self.viewer.set_value(&display);

        let shows_toggle = self.shows_toggle();
        let toggle_label = self.toggle_label().to_string();
        let container_class = self.container_class();
        let key = TreeKey {
            area,
            generation: self.generation,
        };

        let rendered = self.viewer.render(area.width, &theme);
        let reserved = u16::from(shows_toggle && area.height > 0);
        let content_h = (rendered.height().min(u16::MAX as usize) as u16)
            .min(area.height.saturating_sub(reserved));
        let content = Rect::new(area.x, area.y, area.width, content_h);
        let toggle = (shows_toggle && area.height > 0).then(|| {
            let w = (UnicodeWidthStr::width(toggle_label.as_str()).min(u16::MAX as usize) as u16)
                .min(area.width);
            Rect::new(area.x, area.y + content_h, w, 1)
        });

        paint_lines(buf, content, rendered.lines(), &theme);
        if let Some(rect) = toggle {
            render_spans_clipped(
                rect.x,
                rect.y,
                rect.width,
                buf,
                &[Span::styled(toggle_label.clone(), theme.accent)],
                theme.text_primary,
            );
        }

        let mut main_rebuilt = false;
        if let Some(mount) = &self.mount {
            let doc = window.document_mut();
            doc.set_rect(mount.root, area);
            if self.main.as_ref().is_none_or(|t| t.key != key) {
                doc.clear_children(mount.root);
                doc.set_attribute(mount.root, CLASS, container_class);
                self.main = mount_tree(
                    doc,
                    mount.root,
                    content,
                    &[
                        (CLASS, parser_class(&self.options)),
                        (DATA_TESTID, PARSER_TEST_ID.to_string()),
                    ],
                    rendered.elements(),
                    key,
                );
                if let Some(rect) = toggle
                    && let Some(node) = doc.create_element(mount.root, rect)
                {
                    let test_id = if self.expanded {
                        READ_LESS_TEST_ID
                    } else {
                        READ_MORE_TEST_ID
                    };
                    doc.set_attribute(node, DATA_TESTID, test_id);
                    doc.set_attribute(node, "role", "button");
                }
                main_rebuilt = true;
            }
        }
        if let Some(tree) = &self.main {
            paint_copied(buf, window.document(), tree, &self.code_blocks, &theme);
        }

        self.layout = Some(Layout {
            content,
            toggle,
        });

        if self.popover.is_some() {
            let anchor = if content.height > 0 { content } else { area };
            self.render_popover(anchor, buf, window, &theme, main_rebuilt);
        }
    }

    fn render_popover(
        &mut self,
        anchor: Rect,
        buf: &mut Buffer,
        window: &mut Window,
        theme: &Theme,
        force_remount: bool,
    ) {
        let Some(popover) = self.popover.as_mut() else {
            return;
        };
        let opts = self.options.tooltip.unwrap_or_default();
        let frame = buf.area;
        let inner_w = opts.max_width.min(frame.width).saturating_sub(2);
        if inner_w == 0 {
            popover.rect = None;
            return;
        }

        let rendered = popover.viewer.render(inner_w, theme);
        let outer_w = rendered.content_width().clamp(1, inner_w) + 2;
        let outer_h = (rendered.height().min(u16::MAX as usize) as u16)
            .saturating_add(2)
            .min(opts.max_height);
        let rect = popover_rect(anchor, outer_w, outer_h, frame, opts.placement);
        if rect.width < 3 || rect.height < 3 {
            popover.rect = None;
            return;
        }

        Clear.render(rect, buf);
        let block = Block::bordered().border_style(theme.popover_border);
        let inner = block.inner(rect);
        block.render(rect, buf);
        paint_lines(buf, inner, rendered.lines(), theme);
        popover.rect = Some(rect);

        if self.mount.is_some() {
            let key = TreeKey {
                area: rect,
                generation: self.generation,
            };
            let doc = window.document_mut();
            let stale = force_remount || popover.tree.as_ref().is_none_or(|t| t.key != key);
            if stale {
                if let Some(tree) = popover.tree.take() {
                    doc.remove(tree.node);
                }
                let parent = doc.root();
                if let Some(node) = doc.create_element(parent, rect) {
                    doc.set_attribute(node, DATA_TESTID, POPOVER_TEST_ID);
                    let tree = mount_tree(
                        doc,
                        node,
                        inner,
                        &[
                            (CLASS, parser_class(&self.options)),
                            (DATA_TESTID, PARSER_TEST_ID.to_string()),
                        ],
                        rendered.elements(),
                        key,
                    );
                    popover.tree = tree.map(|t| PaintedTree { node, ..t });
                }
            }
        }
        if let Some(tree) = &popover.tree {
            paint_copied(buf, window.document(), tree, &self.code_blocks, theme);
        }
    }

    /// Handles toggle clicks, link clicks and hover. Copy clicks go through the window.
    pub fn handle_event(&mut self, event: &InputEvent, window: &mut Window) -> PreviewerAction {
        let mouse = match event {
            InputEvent::Mouse(m) => *m,
            InputEvent::Key(key) if key.code == KeyCode::Esc && self.popover.is_some() => {
                self.close_popover(window);
                return PreviewerAction::Redraw;
            }
            InputEvent::Key(_) => return PreviewerAction::None,
        };
        let Some(layout) = self.layout else {
            return PreviewerAction::None;
        };
        let over_popover = self
            .popover
            .as_ref()
            .and_then(|p| p.rect)
            .is_some_and(|r| rect_contains(r, mouse.x, mouse.y));

        match mouse.kind {
            _ if mouse.is_left_down() => {
                if !over_popover
                    && layout
                        .toggle
                        .is_some_and(|r| rect_contains(r, mouse.x, mouse.y))
                {
                    self.toggle();
                    return PreviewerAction::Redraw;
                }
                self.link_at(window.document(), mouse.x, mouse.y)
                    .unwrap_or(PreviewerAction::None)
            }
            MouseEventKind::Moved => {
                if !self.options.tooltip_enabled() {
                    return PreviewerAction::None;
                }
                let over_main = rect_contains(layout.content, mouse.x, mouse.y);
                if over_main && self.popover.is_none() {
                    self.open_popover();
                    return PreviewerAction::Redraw;
                }
                if !over_main && !over_popover && self.popover.is_some() {
                    self.close_popover(window);
                    return PreviewerAction::Redraw;
                }
                PreviewerAction::None
            }
            _ => PreviewerAction::None,
        }
    }

    /// Opens the popover with a fresh viewer over the full content.
    pub fn open_popover(&mut self) {
        if self.popover.is_some() {
            return;
        }
        self.popover = Some(Popover {
            viewer: MarkdownViewer::new(self.viewer_props(self.content.clone())),
            rect: None,
            tree: None,
        });

        #[cfg(feature = "tracing")]
        tracing::trace!("popover opened");
    }

    /// Closes the popover, dropping its viewer and removing its nodes.
    pub fn close_popover(&mut self, window: &mut Window) {
        self.detach_popover();
        let doc = window.document_mut();
        for node in self.detached.drain(..) {
            doc.remove(node);
        }
    }

    fn detach_popover(&mut self) {
        if let Some(popover) = self.popover.take() {
            if let Some(tree) = popover.tree {
                self.detached.push(tree.node);
            }

            #[cfg(feature = "tracing")]
            tracing::trace!("popover closed");
        }
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn viewer_props(&self, value: String) -> ViewerProps {
        let renderer: Arc<dyn CustomRenderer + Send + Sync> = self.code_blocks.clone();
        ViewerProps::new(value)
            .with_autolink(true)
            .with_link_target(LinkTarget::Blank)
            .with_custom_renderer(renderer)
    }

    fn container_class(&self) -> String {
        join_classes(CONTAINER_CLASS, &self.options.container_class)
    }

    fn owns(&self, doc: &Document, node: NodeId) -> bool {
        let main = self.main.as_ref().map(|t| t.node);
        let popover = self
            .popover
            .as_ref()
            .and_then(|p| p.tree.as_ref())
            .map(|t| t.node);
        let mut cur = Some(node);
        while let Some(id) = cur {
            if Some(id) == main || Some(id) == popover {
                return true;
            }
            cur = doc.parent_element(id);
        }
        false
    }

    fn link_at(&self, doc: &Document, x: u16, y: u16) -> Option<PreviewerAction> {
        let target = doc.hit_test(x, y)?;
        if !self.owns(doc, target) {
            return None;
        }
        let href = doc.attribute(target, "href")?;
        Some(PreviewerAction::OpenLink {
            href: href.to_string(),
            new_context: doc.attribute(target, "target") == Some("_blank"),
        })
    }
}

fn code_blocks_for(labels: &dyn Localizer) -> CopyableCodeBlocks {
    CopyableCodeBlocks::with_labels(labels.label(LabelKey::Copy), labels.label(LabelKey::Copied))
}

fn join_classes(base: &str, extra: &str) -> String {
    let extra = extra.trim();
    if extra.is_empty() {
        base.to_string()
    } else {
        format!("{base} {extra}")
    }
}

fn parser_class(options: &PreviewerOptions) -> String {
    join_classes(PARSER_CLASS, options.text_variant.class_name())
}

fn paint_lines(buf: &mut Buffer, area: Rect, lines: &[Line<'static>], theme: &Theme) {
    let area = area.intersection(buf.area);
    for (row, line) in lines.iter().take(area.height as usize).enumerate() {
        render_spans_clipped(
            area.x,
            area.y + row as u16,
            area.width,
            buf,
            &line.spans,
            theme.text_primary,
        );
    }
}

/// Mounts a wrapper node at `rect` and the visible `elements` under it.
fn mount_tree(
    doc: &mut Document,
    parent: NodeId,
    rect: Rect,
    attrs: &[(&str, String)],
    elements: &[Element],
    key: TreeKey,
) -> Option<PaintedTree> {
    let node = doc.create_element(parent, rect)?;
    for (name, value) in attrs {
        doc.set_attribute(node, *name, value.as_str());
    }
    let mut markers = Vec::new();
    mount_elements(doc, node, elements, rect, &mut markers);
    Some(PaintedTree { node, key, markers })
}

fn mount_elements(
    doc: &mut Document,
    parent: NodeId,
    elements: &[Element],
    clip: Rect,
    markers: &mut Vec<CopyMarker>,
) {
    for el in elements {
        let Some(rect) = element_rect(el, clip) else {
            continue;
        };
        let Some(node) = doc.create_element(parent, rect) else {
            continue;
        };
        for (name, value) in &el.attributes {
            doc.set_attribute(node, name.as_str(), value.as_str());
        }
        if el.attr(DATA_TESTID) == Some(COPY_ICON_TEST_ID)
            && let Some(body) = doc.previous_element_sibling(node)
        {
            markers.push(CopyMarker { icon: node, body });
        }
        mount_elements(doc, node, &el.children, clip, markers);
    }
}

fn element_rect(el: &Element, clip: Rect) -> Option<Rect> {
    if el.line >= clip.height as usize || el.col >= clip.width {
        return None;
    }
    let rect = Rect::new(
        clip.x + el.col,
        clip.y + el.line as u16,
        el.width,
        el.height.min(u16::MAX as usize) as u16,
    )
    .intersection(clip);
    (!rect.is_empty()).then_some(rect)
}

/// Highlights code blocks whose marker carries `data-copied="true"`.
fn paint_copied(
    buf: &mut Buffer,
    doc: &Document,
    tree: &PaintedTree,
    code_blocks: &CopyableCodeBlocks,
    theme: &Theme,
) {
    for marker in &tree.markers {
        if doc.attribute(marker.icon, DATA_COPIED) != Some("true") {
            continue;
        }
        if let Some(rect) = doc.rect(marker.body) {
            buf.set_style(rect.intersection(buf.area), theme.copied);
        }
        if let Some(rect) = doc.rect(marker.icon) {
            render_spans_clipped(
                rect.x,
                rect.y,
                rect.width,
                buf,
                &[Span::styled(code_blocks.marker_label(true), theme.copied)],
                theme.accent,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TooltipOptions;
    use crate::tooltip::Placement;
    use mdpreview_core::host::MemoryClipboard;
    use mdpreview_core::input::MouseEvent;
    use std::time::Instant;

    fn plain_row(buf: &Buffer, y: u16) -> String {
        let area = buf.area;
        (area.x..area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn draw(p: &mut MarkdownPreviewer, window: &mut Window, area: Rect) -> Buffer {
        let mut buf = Buffer::empty(area);
        p.render_ref(area, &mut buf, window, &Theme::default());
        buf
    }

    fn short_limit() -> PreviewerOptions {
        PreviewerOptions::default().with_truncation_limit(10)
    }

    #[test]
    fn collapsed_content_shows_ellipsis_and_more() {
        let mut p = MarkdownPreviewer::with_options("0123456789abcdef", short_limit());
        assert!(p.has_overflow());
        assert_eq!(p.display_text(), "0123456789...");
        assert_eq!(p.toggle_label(), "more");

        let mut window = Window::default();
        let buf = draw(&mut p, &mut window, Rect::new(0, 0, 30, 4));
        assert_eq!(plain_row(&buf, 0), "0123456789...");
        assert_eq!(plain_row(&buf, 1), "more");
    }

    #[test]
    fn toggle_click_expands_and_collapses() {
        let mut window = Window::default();
        let mut p = MarkdownPreviewer::with_options("0123456789abcdef", short_limit());
        p.mount(&mut window);
        draw(&mut p, &mut window, Rect::new(0, 0, 30, 4));

        let toggle = window.document().find_by_attribute(DATA_TESTID, READ_MORE_TEST_ID);
        assert_eq!(toggle.len(), 1);

        let click = InputEvent::Mouse(MouseEvent::left_down(1, 1));
        assert_eq!(p.handle_event(&click, &mut window), PreviewerAction::Redraw);
        assert!(p.is_expanded());
        assert_eq!(p.display_text(), "0123456789abcdef");
        assert_eq!(p.toggle_label(), "less");

        let buf = draw(&mut p, &mut window, Rect::new(0, 0, 30, 4));
        assert_eq!(plain_row(&buf, 0), "0123456789abcdef");
        assert_eq!(plain_row(&buf, 1), "less");
        assert!(window.document().find_by_attribute(DATA_TESTID, READ_MORE_TEST_ID).is_empty());
        assert_eq!(
            window.document().find_by_attribute(DATA_TESTID, READ_LESS_TEST_ID).len(),
            1
        );

        p.handle_event(&click, &mut window);
        assert!(!p.is_expanded());
    }

    #[test]
    fn short_content_has_no_toggle() {
        let mut window = Window::default();
        let mut p = MarkdownPreviewer::with_options("short", short_limit());
        p.mount(&mut window);
        let buf = draw(&mut p, &mut window, Rect::new(0, 0, 20, 3));
        assert!(!p.shows_toggle());
        assert_eq!(plain_row(&buf, 0), "short");
        assert_eq!(plain_row(&buf, 1), "");
        assert!(window.document().find_by_attribute(DATA_TESTID, READ_MORE_TEST_ID).is_empty());
    }

    #[test]
    fn hidden_toggle_still_truncates() {
        let opts = short_limit().with_toggle_button(false);
        let p = MarkdownPreviewer::with_options("0123456789abcdef", opts);
        assert!(!p.shows_toggle());
        assert_eq!(p.display_text(), "0123456789...");
    }

    #[test]
    fn content_swap_keeps_expansion() {
        let mut p = MarkdownPreviewer::with_options("0123456789abcdef", short_limit());
        p.toggle();
        p.set_content("fedcba9876543210 and more");
        assert!(p.is_expanded());
        assert_eq!(p.display_text(), "fedcba9876543210 and more");
    }

    #[test]
    fn mount_creates_tagged_root_and_one_listener() {
        let mut window = Window::default();
        let opts = PreviewerOptions::default().with_container_class("entity-description");
        let mut p = MarkdownPreviewer::with_options("hi", opts);
        p.mount(&mut window);
        p.mount(&mut window);
        assert_eq!(window.listener_count(), 1);

        let root = p.root_node().unwrap();
        let doc = window.document();
        assert_eq!(doc.attribute(root, DATA_TESTID), Some(CONTAINER_TEST_ID));
        assert_eq!(
            doc.attribute(root, CLASS),
            Some("rich-text-editor-container entity-description")
        );

        draw(&mut p, &mut window, Rect::new(0, 0, 10, 2));
        let parser = window.document().find_by_attribute(DATA_TESTID, PARSER_TEST_ID);
        assert_eq!(parser.len(), 1);
        assert_eq!(
            window.document().attribute(parser[0], CLASS),
            Some("markdown-parser black")
        );

        p.unmount(&mut window);
        assert_eq!(window.listener_count(), 0);
        assert!(!window.document().contains(root));
    }

    #[test]
    fn dropping_a_mounted_previewer_removes_its_listener() {
        let mut window = Window::default();
        let mut p = MarkdownPreviewer::new("hi");
        p.mount(&mut window);
        assert_eq!(window.listener_count(), 1);
        drop(p);
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn link_clicks_report_the_destination() {
        let mut window = Window::default();
        let mut p = MarkdownPreviewer::new("see https://example.com");
        p.mount(&mut window);
        draw(&mut p, &mut window, Rect::new(0, 0, 40, 2));

        let click = InputEvent::Mouse(MouseEvent::left_down(6, 0));
        assert_eq!(
            p.handle_event(&click, &mut window),
            PreviewerAction::OpenLink {
                href: "https://example.com".to_string(),
                new_context: true,
            }
        );
        let miss = InputEvent::Mouse(MouseEvent::left_down(1, 0));
        assert_eq!(p.handle_event(&miss, &mut window), PreviewerAction::None);
    }

    #[test]
    fn hover_opens_full_content_popover_and_leaving_destroys_it() {
        let mut window = Window::new(MemoryClipboard::new());
        let opts = short_limit().with_tooltip(TooltipOptions::enabled(Placement::Bottom));
        let mut p = MarkdownPreviewer::with_options("0123456789abcdef", opts);
        p.mount(&mut window);
        let frame = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(frame);
        p.render_ref(Rect::new(0, 0, 20, 2), &mut buf, &mut window, &Theme::default());

        let hover = InputEvent::Mouse(MouseEvent::moved(2, 0));
        assert_eq!(p.handle_event(&hover, &mut window), PreviewerAction::Redraw);
        assert!(p.is_popover_open());
        assert_eq!(p.popover_value(), Some("0123456789abcdef"));
        assert_eq!(p.display_text(), "0123456789...");

        p.render_ref(Rect::new(0, 0, 20, 2), &mut buf, &mut window, &Theme::default());
        let popovers = window.document().find_by_attribute(DATA_TESTID, POPOVER_TEST_ID);
        assert_eq!(popovers.len(), 1);
        let rect = window.document().rect(popovers[0]).unwrap();
        assert_eq!(rect.y, 1);
        assert_eq!(plain_row(&buf, rect.y + 1).trim(), "│0123456789abcdef│");

        let inside = InputEvent::Mouse(MouseEvent::moved(rect.x + 1, rect.y + 1));
        assert_eq!(p.handle_event(&inside, &mut window), PreviewerAction::None);
        assert!(p.is_popover_open());

        let away = InputEvent::Mouse(MouseEvent::moved(39, 11));
        assert_eq!(p.handle_event(&away, &mut window), PreviewerAction::Redraw);
        assert!(!p.is_popover_open());
        assert!(!window.document().contains(popovers[0]));
    }

    #[test]
    fn hover_without_tooltip_does_nothing() {
        let mut window = Window::default();
        let mut p = MarkdownPreviewer::new("text");
        draw(&mut p, &mut window, Rect::new(0, 0, 10, 1));
        let hover = InputEvent::Mouse(MouseEvent::moved(1, 0));
        assert_eq!(p.handle_event(&hover, &mut window), PreviewerAction::None);
        assert!(!p.is_popover_open());
    }

    #[test]
    fn copied_feedback_is_painted_until_reset() {
        let clipboard = MemoryClipboard::new();
        let mut window = Window::new(clipboard.clone());
        let mut p = MarkdownPreviewer::new("```\nls\n```");
        p.mount(&mut window);
        let area = Rect::new(0, 0, 20, 3);
        let buf = draw(&mut p, &mut window, area);
        assert!(plain_row(&buf, 0).ends_with("[ copy ]"));

        let t0 = Instant::now();
        window.dispatch_pointer_down(15, 0, t0);
        assert_eq!(clipboard.contents().as_deref(), Some("ls"));
        let buf = draw(&mut p, &mut window, area);
        assert!(plain_row(&buf, 0).ends_with("[copied]"));
        assert_eq!(buf[(2, 1)].style().fg, Theme::default().copied.fg);

        window.run_timers(t0 + copy::COPIED_RESET_DELAY);
        let buf = draw(&mut p, &mut window, area);
        assert!(plain_row(&buf, 0).ends_with("[ copy ]"));
    }
}
