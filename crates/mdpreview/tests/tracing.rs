//! Span and event instrumentation.
//!
//!   cargo test -p mdpreview --features tracing --test tracing
#![cfg(feature = "tracing")]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use mdpreview::MarkdownPreviewer;
use mdpreview::host::MemoryClipboard;
use mdpreview::host::Window;
use mdpreview::markdown::custom::COPY_ICON_TEST_ID;
use mdpreview::markdown::custom::DATA_TESTID;
use mdpreview::theme::Theme;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Clone, Default)]
struct Capture {
    spans: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    events: Arc<Mutex<Vec<String>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans
            .lock()
            .unwrap()
            .push((attrs.metadata().name().to_string(), visitor.0));
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        if let Some((_, message)) = visitor.0.into_iter().find(|(k, _)| k == "message") {
            self.events.lock().unwrap().push(message);
        }
    }
}

#[test]
fn render_span_and_lifecycle_events() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    tracing::subscriber::with_default(subscriber, || {
        let clipboard = MemoryClipboard::new();
        let mut window = Window::new(clipboard);
        let mut p = MarkdownPreviewer::new("```\nls\n```");
        p.mount(&mut window);

        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        p.render_ref(area, &mut buf, &mut window, &Theme::default());

        let icon = window.document().find_by_attribute(DATA_TESTID, COPY_ICON_TEST_ID)[0];
        let rect = window.document().rect(icon).unwrap();
        window.dispatch_pointer_down(rect.x, rect.y, Instant::now());
        p.unmount(&mut window);
    });

    let spans = capture.spans.lock().unwrap();
    assert!(spans.iter().any(|(name, fields)| {
        name == "widget_render"
            && fields
                .iter()
                .any(|(k, v)| k == "widget" && v.contains("MarkdownPreviewer"))
    }));

    let events = capture.events.lock().unwrap();
    for expected in ["previewer mounted", "code block copied", "previewer unmounted"] {
        assert!(
            events.iter().any(|e| e == expected),
            "missing {expected:?} in {events:?}"
        );
    }
}
