use std::sync::Arc;

use mdpreview_core::render::spans_width;
use mdpreview_core::theme::Theme;
use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::CowStr;
use pulldown_cmark::Event;
use pulldown_cmark::HeadingLevel;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use pulldown_cmark::TextMergeStream;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;
use url::Url;

use crate::autolink;
use crate::custom::CLASS;
use crate::custom::CodeBlockContext;
use crate::custom::CustomRenderer;
use crate::custom::DATA_CONTENT;

/// Where activated links should open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkTarget {
    /// A new browsing context (`target="_blank"`).
    #[default]
    Blank,
    /// The current context.
    Same,
}

impl LinkTarget {
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            LinkTarget::Blank => Some("_blank"),
            LinkTarget::Same => None,
        }
    }
}

/// Inputs of a [`MarkdownViewer`].
#[derive(Clone)]
pub struct ViewerProps {
    pub value: String,
    /// Turn bare `http(s)://` and `www.` URLs into links.
    pub autolink: bool,
    pub link_target: LinkTarget,
    pub custom_renderer: Option<Arc<dyn CustomRenderer + Send + Sync>>,
    /// Base for resolving relative link destinations.
    pub base_url: Option<String>,
}

impl Default for ViewerProps {
    fn default() -> Self {
        Self {
            value: String::new(),
            autolink: true,
            link_target: LinkTarget::Blank,
            custom_renderer: None,
            base_url: None,
        }
    }
}

impl std::fmt::Debug for ViewerProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerProps")
            .field("value", &self.value)
            .field("autolink", &self.autolink)
            .field("link_target", &self.link_target)
            .field("custom_renderer", &self.custom_renderer.is_some())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ViewerProps {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_autolink(mut self, autolink: bool) -> Self {
        self.autolink = autolink;
        self
    }

    pub fn with_link_target(mut self, target: LinkTarget) -> Self {
        self.link_target = target;
        self
    }

    pub fn with_custom_renderer(
        mut self,
        renderer: Arc<dyn CustomRenderer + Send + Sync>,
    ) -> Self {
        self.custom_renderer = Some(renderer);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// A rectangular region of rendered output with attributes.
///
/// `line`/`col` are relative to the rendered text. Children use the same coordinate space as
/// their parent, not coordinates relative to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub line: usize,
    pub col: u16,
    pub width: u16,
    pub height: usize,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(line: usize, col: u16, width: u16, height: usize) -> Self {
        Self {
            line,
            col,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn shift(&mut self, lines: usize, cols: u16) {
        self.line += lines;
        self.col = self.col.saturating_add(cols);
        for child in &mut self.children {
            child.shift(lines, cols);
        }
    }
}

/// Output of [`MarkdownViewer::render`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedMarkdown {
    lines: Vec<Line<'static>>,
    elements: Vec<Element>,
    content_width: u16,
}

impl RenderedMarkdown {
    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Widest line, in terminal cells.
    pub fn content_width(&self) -> u16 {
        self.content_width
    }

    /// Lines as plain strings, trailing whitespace removed.
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }
}

/// Read-only markdown viewer.
///
/// Parses once per value change and caches the layout for the last `(width, theme)`.
pub struct MarkdownViewer {
    props: ViewerProps,
    doc: ParsedDoc,
    cache: Option<RenderCache>,
}

struct RenderCache {
    width: u16,
    theme: Theme,
    rendered: RenderedMarkdown,
}

impl MarkdownViewer {
    pub fn new(props: ViewerProps) -> Self {
        let doc = parse(&props);
        Self {
            props,
            doc,
            cache: None,
        }
    }

    pub fn props(&self) -> &ViewerProps {
        &self.props
    }

    pub fn value(&self) -> &str {
        &self.props.value
    }

    /// Replaces the markdown source. No-op if unchanged.
    pub fn set_value(&mut self, value: &str) {
        if self.props.value == value {
            return;
        }
        self.props.value = value.to_string();
        self.doc = parse(&self.props);
        self.cache = None;
    }

    /// Lays out the document for `width` columns.
    pub fn render(&mut self, width: u16, theme: &Theme) -> &RenderedMarkdown {
        let fresh = self
            .cache
            .as_ref()
            .is_some_and(|c| c.width == width && &c.theme == theme);
        if !fresh {
            self.cache = None;
        }
        let cache = self.cache.get_or_insert_with(|| RenderCache {
            width,
            theme: theme.clone(),
            rendered: layout(&self.doc, width, theme, &self.props),
        });
        &cache.rendered
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct InlineFlags {
    emphasis: bool,
    strong: bool,
    strike: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProseStyle {
    Normal,
    Heading(u8),
    BlockQuote,
}

#[derive(Clone, Debug)]
struct Segment {
    text: String,
    style: ProseStyle,
    flags: InlineFlags,
    inline_code: bool,
    link: Option<usize>,
    muted: bool,
}

impl Segment {
    fn new(text: impl Into<String>, style: ProseStyle, flags: InlineFlags) -> Self {
        Self {
            text: text.into(),
            style,
            flags,
            inline_code: false,
            link: None,
            muted: false,
        }
    }

    fn muted(text: impl Into<String>) -> Self {
        let mut seg = Self::new(text, ProseStyle::Normal, InlineFlags::default());
        seg.muted = true;
        seg
    }
}

#[derive(Clone, Debug)]
struct ProseBlock {
    lines: Vec<Vec<Segment>>,
    initial_prefix: Vec<Segment>,
    subsequent_prefix: Vec<Segment>,
    wrap: bool,
}

#[derive(Clone, Debug)]
struct CodeBlock {
    language: Option<String>,
    code: String,
    prefix: Vec<Segment>,
}

#[derive(Clone, Debug)]
enum Block {
    Prose(ProseBlock),
    Code(CodeBlock),
    Rule(Vec<Segment>),
    Blank(Vec<Segment>),
}

#[derive(Clone, Debug, Default)]
struct ParsedDoc {
    blocks: Vec<Block>,
    links: Vec<String>,
}

fn parse(props: &ViewerProps) -> ParsedDoc {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = TextMergeStream::new(Parser::new_ext(&props.value, options));

    #[derive(Clone, Debug)]
    struct IndentCtx {
        initial: Vec<Segment>,
        subsequent: Vec<Segment>,
        used: bool,
    }

    #[derive(Clone, Debug)]
    struct ListCtx {
        ordered: bool,
        index: u64,
    }

    struct Builder<'a> {
        props: &'a ViewerProps,
        blocks: Vec<Block>,
        links: Vec<String>,
        indent_stack: Vec<IndentCtx>,
        list_stack: Vec<ListCtx>,
        in_paragraph: bool,
        current_style: ProseStyle,
        inline: InlineFlags,
        current_link: Option<usize>,
        para_lines: Vec<Vec<Segment>>,
        para_current: Vec<Segment>,
        para_prefix_initial: Vec<Segment>,
        para_prefix_subsequent: Vec<Segment>,
        para_wrap: bool,
        in_code_block: bool,
        code_language: Option<String>,
        code_text: String,
        image: Option<(String, String)>,
        table_cell: usize,
        wants_blank: bool,
    }

    impl<'a> Builder<'a> {
        fn new(props: &'a ViewerProps) -> Self {
            Self {
                props,
                blocks: Vec::new(),
                links: Vec::new(),
                indent_stack: Vec::new(),
                list_stack: Vec::new(),
                in_paragraph: false,
                current_style: ProseStyle::Normal,
                inline: InlineFlags::default(),
                current_link: None,
                para_lines: Vec::new(),
                para_current: Vec::new(),
                para_prefix_initial: Vec::new(),
                para_prefix_subsequent: Vec::new(),
                para_wrap: true,
                in_code_block: false,
                code_language: None,
                code_text: String::new(),
                image: None,
                table_cell: 0,
                wants_blank: false,
            }
        }

        fn snapshot_prefixes(&self) -> (Vec<Segment>, Vec<Segment>) {
            let mut initial = Vec::new();
            let mut subsequent = Vec::new();
            for ctx in &self.indent_stack {
                if ctx.used {
                    initial.extend(ctx.subsequent.clone());
                } else {
                    initial.extend(ctx.initial.clone());
                }
                subsequent.extend(ctx.subsequent.clone());
            }
            (initial, subsequent)
        }

        fn mark_prefixes_used(&mut self) {
            for ctx in &mut self.indent_stack {
                ctx.used = true;
            }
        }

        fn maybe_blank(&mut self) {
            if self.wants_blank && !matches!(self.blocks.last(), None | Some(Block::Blank(_))) {
                let (_, subsequent) = self.snapshot_prefixes();
                self.blocks.push(Block::Blank(subsequent));
            }
            self.wants_blank = false;
        }

        fn block_done(&mut self) {
            self.mark_prefixes_used();
            self.wants_blank = self.list_stack.is_empty();
        }

        fn start_paragraph(&mut self, style: ProseStyle) {
            self.flush_para();
            self.maybe_blank();
            self.in_paragraph = true;
            self.current_style = match style {
                ProseStyle::Normal if self.in_blockquote() => ProseStyle::BlockQuote,
                other => other,
            };
            let (initial, subsequent) = self.snapshot_prefixes();
            self.para_prefix_initial = initial;
            self.para_prefix_subsequent = subsequent;
            self.para_wrap = true;
        }

        fn ensure_paragraph(&mut self) {
            if !self.in_paragraph {
                self.start_paragraph(ProseStyle::Normal);
            }
        }

        fn in_blockquote(&self) -> bool {
            self.indent_stack
                .iter()
                .any(|ctx| ctx.initial.first().is_some_and(|s| s.style == ProseStyle::BlockQuote))
        }

        fn break_line(&mut self) {
            self.para_lines.push(std::mem::take(&mut self.para_current));
        }

        fn flush_para(&mut self) {
            if !self.in_paragraph {
                return;
            }
            if !self.para_current.is_empty() {
                self.break_line();
            }
            let lines = std::mem::take(&mut self.para_lines);
            if !lines.is_empty() {
                self.blocks.push(Block::Prose(ProseBlock {
                    lines,
                    initial_prefix: std::mem::take(&mut self.para_prefix_initial),
                    subsequent_prefix: std::mem::take(&mut self.para_prefix_subsequent),
                    wrap: self.para_wrap,
                }));
                self.block_done();
            }
            self.in_paragraph = false;
            self.current_style = ProseStyle::Normal;
        }

        fn flush_code(&mut self) {
            if !self.in_code_block {
                return;
            }
            let mut code = std::mem::take(&mut self.code_text);
            if code.ends_with('\n') {
                code.pop();
            }
            let (_, prefix) = self.snapshot_prefixes();
            self.blocks.push(Block::Code(CodeBlock {
                language: self.code_language.take(),
                code,
                prefix,
            }));
            self.in_code_block = false;
            self.block_done();
        }

        fn push_segment(&mut self, mut seg: Segment) {
            self.ensure_paragraph();
            if seg.link.is_none() {
                seg.link = self.current_link;
            }
            self.para_current.push(seg);
        }

        fn push_text(&mut self, text: &str) {
            let style = self.current_style;
            let flags = self.inline;
            if !self.props.autolink || self.current_link.is_some() {
                self.push_segment(Segment::new(text, style, flags));
                return;
            }

            let mut last = 0;
            for found in autolink::find_links(text) {
                if found.range.start > last {
                    self.push_segment(Segment::new(&text[last..found.range.start], style, flags));
                }
                let mut seg = Segment::new(&text[found.range.clone()], style, flags);
                seg.link = Some(self.register_link(found.href));
                self.push_segment(seg);
                last = found.range.end;
            }
            if last < text.len() {
                self.push_segment(Segment::new(&text[last..], style, flags));
            }
        }

        fn register_link(&mut self, href: String) -> usize {
            self.links.push(href);
            self.links.len() - 1
        }

        fn resolve_dest(&self, dest: &str) -> String {
            resolve_url(self.props.base_url.as_deref(), dest)
        }
    }

    let mut b = Builder::new(props);

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => b.start_paragraph(ProseStyle::Normal),
                Tag::Heading { level, .. } => {
                    b.start_paragraph(ProseStyle::Heading(heading_level(level)));
                }
                Tag::BlockQuote(_) => {
                    b.flush_para();
                    b.maybe_blank();
                    let mut bar = Segment::muted("│ ");
                    bar.style = ProseStyle::BlockQuote;
                    b.indent_stack.push(IndentCtx {
                        initial: vec![bar.clone()],
                        subsequent: vec![bar],
                        used: false,
                    });
                }
                Tag::CodeBlock(kind) => {
                    b.flush_para();
                    b.maybe_blank();
                    b.in_code_block = true;
                    b.code_text.clear();
                    b.code_language = match kind {
                        CodeBlockKind::Fenced(lang) => normalize_fenced_lang(&lang),
                        CodeBlockKind::Indented => None,
                    };
                }
                Tag::List(start) => {
                    b.flush_para();
                    b.list_stack.push(ListCtx {
                        ordered: start.is_some(),
                        index: start.unwrap_or(1),
                    });
                }
                Tag::Item => {
                    b.flush_para();
                    let Some(list) = b.list_stack.last() else {
                        continue;
                    };
                    let marker = if list.ordered {
                        format!("{}. ", list.index)
                    } else {
                        "• ".to_string()
                    };
                    let marker_width = UnicodeWidthStr::width(marker.as_str());
                    b.indent_stack.push(IndentCtx {
                        initial: vec![Segment::new(
                            marker,
                            ProseStyle::Normal,
                            InlineFlags::default(),
                        )],
                        subsequent: vec![Segment::new(
                            " ".repeat(marker_width),
                            ProseStyle::Normal,
                            InlineFlags::default(),
                        )],
                        used: false,
                    });
                }
                Tag::Table(_) => {
                    b.start_paragraph(ProseStyle::Normal);
                    b.para_wrap = false;
                }
                Tag::TableHead => {
                    b.inline.strong = true;
                    b.table_cell = 0;
                }
                Tag::TableRow => b.table_cell = 0,
                Tag::TableCell => {
                    if b.table_cell > 0 {
                        b.push_segment(Segment::muted(" │ "));
                    }
                    b.table_cell += 1;
                }
                Tag::Emphasis => b.inline.emphasis = true,
                Tag::Strong => b.inline.strong = true,
                Tag::Strikethrough => b.inline.strike = true,
                Tag::Link { dest_url, .. } => {
                    let href = b.resolve_dest(dest_url.as_ref());
                    b.current_link = Some(b.register_link(href));
                }
                Tag::Image { dest_url, .. } => {
                    let href = b.resolve_dest(dest_url.as_ref());
                    b.image = Some((href, String::new()));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph => b.flush_para(),
                TagEnd::Heading(_) => b.flush_para(),
                TagEnd::BlockQuote(_) => {
                    b.flush_para();
                    b.indent_stack.pop();
                    b.wants_blank = b.list_stack.is_empty();
                }
                TagEnd::CodeBlock => b.flush_code(),
                TagEnd::List(_) => {
                    b.flush_para();
                    b.list_stack.pop();
                    b.wants_blank = b.list_stack.is_empty();
                }
                TagEnd::Item => {
                    b.flush_para();
                    if let Some(list) = b.list_stack.last_mut() {
                        list.index += 1;
                    }
                    b.indent_stack.pop();
                }
                TagEnd::TableHead => {
                    b.inline.strong = false;
                    b.break_line();
                }
                TagEnd::TableRow => b.break_line(),
                TagEnd::Table => {
                    b.table_cell = 0;
                    b.flush_para();
                }
                TagEnd::Emphasis => b.inline.emphasis = false,
                TagEnd::Strong => b.inline.strong = false,
                TagEnd::Strikethrough => b.inline.strike = false,
                TagEnd::Link => b.current_link = None,
                TagEnd::Image => {
                    let Some((href, alt)) = b.image.take() else {
                        continue;
                    };
                    let alt = alt.trim();
                    let alt = if alt.is_empty() { "image" } else { alt };
                    b.push_segment(Segment::muted("Image: "));
                    let mut seg = Segment::new(alt, b.current_style, b.inline);
                    seg.link = Some(b.register_link(href.clone()));
                    b.push_segment(seg);
                    if !href.is_empty() {
                        b.push_segment(Segment::muted(format!(" → {href}")));
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                if b.in_code_block {
                    b.code_text.push_str(&text);
                } else if let Some((_, alt)) = b.image.as_mut() {
                    alt.push_str(&text);
                } else {
                    b.push_text(&text);
                }
            }
            Event::Code(code) => {
                if let Some((_, alt)) = b.image.as_mut() {
                    alt.push_str(&code);
                    continue;
                }
                let mut seg = Segment::new(code.to_string(), b.current_style, b.inline);
                seg.inline_code = true;
                b.push_segment(seg);
            }
            Event::SoftBreak => {
                if b.image.is_none() {
                    b.push_segment(Segment::new(" ", b.current_style, b.inline));
                }
            }
            Event::HardBreak => {
                b.ensure_paragraph();
                b.break_line();
            }
            Event::Rule => {
                b.flush_para();
                b.maybe_blank();
                let (initial, _) = b.snapshot_prefixes();
                b.blocks.push(Block::Rule(initial));
                b.block_done();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                b.push_segment(Segment::muted(marker));
            }
            Event::InlineHtml(html) => {
                if is_line_break_tag(&html) {
                    b.ensure_paragraph();
                    b.break_line();
                }
            }
            Event::FootnoteReference(label) => {
                b.push_segment(Segment::muted(format!("[^{label}]")));
            }
            _ => {}
        }
    }

    b.flush_code();
    b.flush_para();

    while matches!(b.blocks.last(), Some(Block::Blank(_))) {
        b.blocks.pop();
    }

    ParsedDoc {
        blocks: b.blocks,
        links: b.links,
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn normalize_fenced_lang(lang: &CowStr<'_>) -> Option<String> {
    let first = lang.split_whitespace().next()?;
    let first = first.trim_matches(|c| c == '{' || c == '}' || c == '.');
    if first.is_empty() {
        None
    } else {
        Some(first.to_ascii_lowercase())
    }
}

fn is_line_break_tag(html: &str) -> bool {
    let t = html.trim().to_ascii_lowercase();
    t == "<br>" || t == "<br/>" || t == "<br />"
}

fn resolve_url(base_url: Option<&str>, dest: &str) -> String {
    let dest = dest.trim();
    if dest.is_empty() || is_absolute_url(dest) {
        return dest.to_string();
    }
    let Some(base) = base_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return dest.to_string();
    };
    match Url::parse(base) {
        Ok(base) => base
            .join(dest)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| dest.to_string()),
        Err(_) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            dest.trim_start_matches("./").trim_start_matches('/')
        ),
    }
}

fn is_absolute_url(dest: &str) -> bool {
    dest.starts_with('#')
        || dest.starts_with('/')
        || Url::parse(dest).is_ok_and(|u| !u.cannot_be_a_base() || u.scheme() == "mailto")
}

fn layout(doc: &ParsedDoc, width: u16, theme: &Theme, props: &ViewerProps) -> RenderedMarkdown {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut elements: Vec<Element> = Vec::new();
    if width == 0 {
        return RenderedMarkdown::default();
    }

    for block in &doc.blocks {
        match block {
            Block::Blank(prefix) => {
                let mut spans = segments_to_spans(prefix, theme);
                if let Some(last) = spans.last_mut() {
                    last.content = last.content.trim_end().to_string().into();
                }
                lines.push(Line::from(spans));
            }
            Block::Rule(prefix) => {
                let mut spans = segments_to_spans(prefix, theme);
                let prefix_w = spans_width(&spans);
                let len = (width as usize).saturating_sub(prefix_w).max(3);
                spans.push(Span::styled("─".repeat(len), theme.text_muted));
                lines.push(Line::from(spans));
            }
            Block::Prose(p) => {
                let wrap_width = if p.wrap { width as usize } else { usize::MAX };
                for (i, logical) in p.lines.iter().enumerate() {
                    let initial = if i == 0 {
                        &p.initial_prefix
                    } else {
                        &p.subsequent_prefix
                    };
                    for wrapped in wrap_segments(
                        initial,
                        &p.subsequent_prefix,
                        logical,
                        wrap_width,
                        theme,
                    ) {
                        let line_idx = lines.len();
                        for hit in wrapped.links {
                            elements.push(link_element(
                                line_idx,
                                hit,
                                &doc.links,
                                props.link_target,
                            ));
                        }
                        lines.push(Line::from(wrapped.spans));
                    }
                }
            }
            Block::Code(code) => {
                let prefix_spans = segments_to_spans(&code.prefix, theme);
                let prefix_w = spans_width(&prefix_spans) as u16;
                let ctx = CodeBlockContext {
                    language: code.language.as_deref(),
                    code: &code.code,
                    width: width.saturating_sub(prefix_w),
                };
                let custom = props
                    .custom_renderer
                    .as_ref()
                    .and_then(|r| r.code_block(&ctx, theme));
                let start = lines.len();

                match custom {
                    Some(block) => {
                        for line in block.lines {
                            let mut spans = prefix_spans.clone();
                            spans.extend(line.spans);
                            lines.push(Line::from(spans));
                        }
                        for mut el in block.elements {
                            el.shift(start, prefix_w);
                            elements.push(el);
                        }
                    }
                    None => {
                        let mut count = 0;
                        for line in code.code.split('\n') {
                            if code.code.is_empty() {
                                break;
                            }
                            let mut spans = prefix_spans.clone();
                            spans.push(Span::styled("    ", theme.code_block));
                            spans.push(Span::styled(line.replace('\t', "    "), theme.code_block));
                            lines.push(Line::from(spans));
                            count += 1;
                        }
                        if count > 0 {
                            elements.push(
                                Element::new(start, prefix_w, ctx.width, count)
                                    .with_attr(CLASS, "code-block")
                                    .with_attr(DATA_CONTENT, code.code.as_str()),
                            );
                        }
                    }
                }
            }
        }
    }

    let content_width = lines
        .iter()
        .map(|l| spans_width(&l.spans))
        .max()
        .unwrap_or(0)
        .min(u16::MAX as usize) as u16;

    RenderedMarkdown {
        lines,
        elements,
        content_width,
    }
}

fn link_element(line: usize, hit: LinkHit, links: &[String], target: LinkTarget) -> Element {
    let href = links.get(hit.link).map(String::as_str).unwrap_or_default();
    let mut el = Element::new(line, hit.col as u16, hit.width as u16, 1)
        .with_attr(CLASS, "link")
        .with_attr("href", href);
    if let Some(target) = target.as_attr() {
        el = el.with_attr("target", target);
    }
    el
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LinkHit {
    col: usize,
    width: usize,
    link: usize,
}

struct WrappedLine {
    spans: Vec<Span<'static>>,
    links: Vec<LinkHit>,
}

struct Piece {
    text: String,
    style: Style,
    link: Option<usize>,
    ws: bool,
}

struct LineBuf {
    spans: Vec<Span<'static>>,
    cols: usize,
    has_content: bool,
    pending_ws: Vec<Piece>,
    links: Vec<LinkHit>,
}

impl LineBuf {
    fn new(prefix: Vec<Span<'static>>) -> Self {
        let cols = spans_width(&prefix);
        Self {
            spans: prefix,
            cols,
            has_content: false,
            pending_ws: Vec::new(),
            links: Vec::new(),
        }
    }

    fn pending_width(&self) -> usize {
        self.pending_ws
            .iter()
            .map(|p| UnicodeWidthStr::width(p.text.as_str()))
            .sum()
    }

    fn flush_pending(&mut self) {
        for piece in std::mem::take(&mut self.pending_ws) {
            self.push(piece.text, piece.style, piece.link);
        }
    }

    fn push(&mut self, text: String, style: Style, link: Option<usize>) {
        let w = UnicodeWidthStr::width(text.as_str());
        if let Some(link) = link {
            match self.links.last_mut() {
                Some(hit) if hit.link == link && hit.col + hit.width == self.cols => {
                    hit.width += w;
                }
                _ => self.links.push(LinkHit {
                    col: self.cols,
                    width: w,
                    link,
                }),
            }
        }
        self.cols += w;
        self.has_content = true;
        self.spans.push(Span::styled(text, style));
    }

    fn finish(self) -> WrappedLine {
        WrappedLine {
            spans: self.spans,
            links: self.links,
        }
    }
}

fn wrap_segments(
    initial_prefix: &[Segment],
    subsequent_prefix: &[Segment],
    segments: &[Segment],
    width: usize,
    theme: &Theme,
) -> Vec<WrappedLine> {
    let mut out = Vec::new();
    let mut cur = LineBuf::new(segments_to_spans(initial_prefix, theme));

    let pieces = split_pieces(segments, theme);
    let widths: Vec<usize> = pieces
        .iter()
        .map(|p| UnicodeWidthStr::width(p.text.as_str()))
        .collect();
    let ws: Vec<bool> = pieces.iter().map(|p| p.ws).collect();
    let mut prev_ws = true;

    for (i, piece) in pieces.into_iter().enumerate() {
        if piece.ws {
            if cur.has_content {
                cur.pending_ws.push(piece);
            }
            prev_ws = true;
            continue;
        }

        // A word may span several styled pieces; only break before its first piece.
        let word_start = std::mem::replace(&mut prev_ws, false);
        let word_w: usize = if word_start {
            let mut w = widths[i];
            let mut j = i + 1;
            while j < widths.len() && !ws[j] {
                w += widths[j];
                j += 1;
            }
            w
        } else {
            0
        };
        if word_start && cur.has_content && cur.cols + cur.pending_width() + word_w > width {
            out.push(std::mem::replace(
                &mut cur,
                LineBuf::new(segments_to_spans(subsequent_prefix, theme)),
            ));
        } else {
            cur.flush_pending();
        }

        let mut text = piece.text;
        loop {
            let avail = width.saturating_sub(cur.cols);
            if UnicodeWidthStr::width(text.as_str()) <= avail {
                cur.push(text, piece.style, piece.link);
                break;
            }
            if cur.has_content {
                out.push(std::mem::replace(
                    &mut cur,
                    LineBuf::new(segments_to_spans(subsequent_prefix, theme)),
                ));
                continue;
            }
            if avail == 0 {
                // Prefix alone fills the line; let the painter clip.
                cur.push(text, piece.style, piece.link);
                break;
            }
            let (head, tail) = split_at_cols(&text, avail);
            cur.push(head, piece.style, piece.link);
            text = tail;
            if text.is_empty() {
                break;
            }
        }
    }

    out.push(cur);
    out.into_iter().map(LineBuf::finish).collect()
}

fn split_pieces(segments: &[Segment], theme: &Theme) -> Vec<Piece> {
    let mut out = Vec::new();
    for seg in segments {
        let style = style_for_segment(theme, seg);
        let mut run = String::new();
        let mut run_ws = false;
        for ch in seg.text.chars() {
            let ws = ch.is_whitespace();
            if !run.is_empty() && ws != run_ws {
                out.push(Piece {
                    text: std::mem::take(&mut run),
                    style,
                    link: seg.link,
                    ws: run_ws,
                });
            }
            run_ws = ws;
            run.push(if ch == '\t' { ' ' } else { ch });
        }
        if !run.is_empty() {
            out.push(Piece {
                text: run,
                style,
                link: seg.link,
                ws: run_ws,
            });
        }
    }
    out
}

/// Splits `text` after at most `max_cols` cells, always taking at least one char.
fn split_at_cols(text: &str, max_cols: usize) -> (String, String) {
    let mut cols = 0;
    for (idx, ch) in text.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if cols + w > max_cols && idx > 0 {
            return (text[..idx].to_string(), text[idx..].to_string());
        }
        cols += w;
    }
    (text.to_string(), String::new())
}

fn segments_to_spans(segs: &[Segment], theme: &Theme) -> Vec<Span<'static>> {
    segs.iter()
        .map(|s| Span::styled(s.text.clone(), style_for_segment(theme, s)))
        .collect()
}

fn style_for_segment(theme: &Theme, seg: &Segment) -> Style {
    let mut style = match seg.style {
        ProseStyle::Normal => theme.text_primary,
        ProseStyle::Heading(_) => theme.text_primary.patch(theme.heading),
        ProseStyle::BlockQuote => theme.text_primary.add_modifier(Modifier::ITALIC),
    };
    if seg.flags.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if seg.flags.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if seg.flags.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if seg.inline_code {
        style = style.patch(theme.code_inline);
    }
    if seg.link.is_some() {
        style = style.patch(theme.link);
    }
    if seg.muted {
        style = style.patch(theme.text_muted);
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::COPY_ICON_TEST_ID;
    use crate::custom::CopyableCodeBlocks;
    use crate::custom::DATA_TESTID;

    fn render_plain(md: &str, width: u16) -> Vec<String> {
        let mut viewer = MarkdownViewer::new(ViewerProps::new(md));
        viewer.render(width, &Theme::default()).plain_lines()
    }

    #[test]
    fn empty_value_renders_nothing() {
        let mut viewer = MarkdownViewer::new(ViewerProps::default());
        let rendered = viewer.render(40, &Theme::default());
        assert_eq!(rendered.height(), 0);
        assert!(rendered.elements().is_empty());
    }

    #[test]
    fn paragraphs_are_separated_and_wrapped() {
        let lines = render_plain("one two three four\n\nsecond", 9);
        assert_eq!(lines, vec!["one two", "three", "four", "", "second"]);
    }

    #[test]
    fn long_words_are_hard_split() {
        let lines = render_plain("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn lists_and_quotes_carry_prefixes() {
        let lines = render_plain("- alpha\n- beta gamma\n\n> quoted", 12);
        assert_eq!(lines, vec!["• alpha", "• beta gamma", "", "│ quoted"]);

        let lines = render_plain("1. first item here", 10);
        assert_eq!(lines, vec!["1. first", "   item", "   here"]);
    }

    #[test]
    fn headings_drop_markers() {
        let lines = render_plain("# Title\n\nbody", 20);
        assert_eq!(lines, vec!["Title", "", "body"]);
    }

    #[test]
    fn bare_urls_become_blank_target_links() {
        let mut viewer = MarkdownViewer::new(ViewerProps::new("go to https://example.com now"));
        let rendered = viewer.render(80, &Theme::default());
        let links: Vec<_> = rendered
            .elements()
            .iter()
            .filter(|e| e.attr(CLASS) == Some("link"))
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].attr("href"), Some("https://example.com"));
        assert_eq!(links[0].attr("target"), Some("_blank"));
        assert_eq!((links[0].line, links[0].col, links[0].width), (0, 6, 19));
    }

    #[test]
    fn autolink_off_leaves_bare_urls_as_text() {
        let mut viewer =
            MarkdownViewer::new(ViewerProps::new("https://example.com").with_autolink(false));
        let rendered = viewer.render(80, &Theme::default());
        assert!(rendered.elements().is_empty());
    }

    #[test]
    fn explicit_links_resolve_against_base_and_honor_target() {
        let props = ViewerProps::new("[docs](guide/intro.md)")
            .with_base_url("https://example.com/root/")
            .with_link_target(LinkTarget::Same);
        let mut viewer = MarkdownViewer::new(props);
        let rendered = viewer.render(80, &Theme::default());
        let link = &rendered.elements()[0];
        assert_eq!(link.attr("href"), Some("https://example.com/root/guide/intro.md"));
        assert_eq!(link.attr("target"), None);
        assert_eq!(link.width, 4);
    }

    #[test]
    fn link_spanning_words_is_one_element_per_line() {
        let mut viewer = MarkdownViewer::new(ViewerProps::new("[read the docs](https://x.io)"));
        let rendered = viewer.render(80, &Theme::default());
        assert_eq!(rendered.elements().len(), 1);
        assert_eq!(rendered.elements()[0].width, 13);
    }

    #[test]
    fn custom_renderer_gets_code_blocks() {
        let props = ViewerProps::new("text\n\n```sh\necho hi\n```\n")
            .with_custom_renderer(Arc::new(CopyableCodeBlocks::default()));
        let mut viewer = MarkdownViewer::new(props);
        let rendered = viewer.render(30, &Theme::default());
        let lines = rendered.plain_lines();
        assert_eq!(lines[0], "text");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("sh"));
        assert_eq!(lines[3], "  echo hi");

        let container = rendered
            .elements()
            .iter()
            .find(|e| e.attr(CLASS) == Some("code-block"))
            .unwrap();
        assert_eq!(container.line, 2);
        assert_eq!(container.attr(DATA_CONTENT), Some("echo hi"));
        assert_eq!(container.children[1].attr(DATA_TESTID), Some(COPY_ICON_TEST_ID));
        assert_eq!(container.children[1].line, 2);
        assert_eq!(container.children[0].line, 3);
    }

    #[test]
    fn default_code_blocks_are_indented() {
        let lines = render_plain("```\nlet a = 1;\n```", 30);
        assert_eq!(lines, vec!["    let a = 1;"]);
    }

    #[test]
    fn tables_render_cells_on_one_line() {
        let lines = render_plain("| a | b |\n|---|---|\n| 1 | 2 |", 30);
        assert_eq!(lines, vec!["a │ b", "1 │ 2"]);
    }

    #[test]
    fn render_is_cached_per_width() {
        let mut viewer = MarkdownViewer::new(ViewerProps::new("hello world"));
        let theme = Theme::default();
        assert_eq!(viewer.render(5, &theme).height(), 2);
        assert_eq!(viewer.render(40, &theme).height(), 1);
        viewer.set_value("a\n\nb");
        assert_eq!(viewer.render(40, &theme).height(), 3);
    }

    #[test]
    fn task_markers_and_images() {
        let lines = render_plain("- [x] done\n\n![logo](https://x.io/l.png)", 40);
        assert_eq!(
            lines,
            vec!["• [x] done", "", "Image: logo → https://x.io/l.png"]
        );
    }
}
