use std::io;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use mdpreview::MarkdownPreviewer;
use mdpreview::Placement;
use mdpreview::PreviewerAction;
use mdpreview::PreviewerOptions;
use mdpreview::TooltipOptions;
use mdpreview::core::crossterm_input::input_event_from_crossterm;
use mdpreview::host::Window;
use mdpreview::i18n::Catalog;
use mdpreview::i18n::LabelKey;
use mdpreview::input::InputEvent;
use mdpreview::input::KeyCode;
use mdpreview::theme::Theme;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Paragraph;

const DESCRIPTION: &str = r#"
Orders placed through the **storefront**, one row per order line. Refreshed hourly by the
`orders_ingest` pipeline; see https://example.com/pipelines/orders for run history.

To rebuild a single day:

```sh
pipeline run orders_ingest --date 2024-05-01
```

> Late-arriving returns are corrected by the nightly backfill, so totals for the current day
> may move until 02:00 UTC.

- `order_id`: primary key
- `amount`: gross amount in the order currency
- `status`: one of *placed*, *shipped*, *returned*
"#;

struct App {
    window: Window,
    previewer: MarkdownPreviewer,
    french: bool,
    status: String,
}

fn main() -> io::Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let options = PreviewerOptions::default()
        .with_truncation_limit(160)
        .with_container_class("entity-description")
        .with_tooltip(TooltipOptions::enabled(Placement::Bottom).with_max_size(70, 18));
    let mut app = App {
        window: new_window(),
        previewer: MarkdownPreviewer::with_options(DESCRIPTION.trim(), options),
        french: false,
        status: "q: quit  t: tooltip  l: language  click `[ copy ]` to copy".to_string(),
    };
    app.previewer.mount(&mut app.window);

    let res = run(&mut terminal, &mut app);

    app.previewer.unmount(&mut app.window);
    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    res
}

#[cfg(feature = "system-clipboard")]
fn new_window() -> Window {
    Window::new(mdpreview::host::SystemClipboard::new())
}

#[cfg(not(feature = "system-clipboard"))]
fn new_window() -> Window {
    Window::default()
}

fn run<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let theme = Theme::default();
    loop {
        terminal.draw(|f| {
            let [title, body, status] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .areas(f.area());

            f.render_widget(Line::from("orders_line_items".cyan().bold()), title);
            let block = Block::bordered().title("Description");
            let inner = block.inner(body);
            f.render_widget(block, body);
            f.render_widget(Paragraph::new(app.status.as_str()).dark_gray(), status);

            app.previewer
                .render_ref(inner, f.buffer_mut(), &mut app.window, &theme);
        })?;

        let now = Instant::now();
        let timeout = app
            .window
            .next_deadline()
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(Duration::from_millis(250))
            .min(Duration::from_millis(250));
        if !crossterm::event::poll(timeout)? {
            app.window.run_timers(Instant::now());
            continue;
        }

        let Some(event) = input_event_from_crossterm(crossterm::event::read()?) else {
            continue;
        };
        if let InputEvent::Key(key) = &event {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('t') => {
                    let mut options = app.previewer.options().clone();
                    let tooltip = options.tooltip.get_or_insert_with(TooltipOptions::default);
                    tooltip.enabled = !tooltip.enabled;
                    app.status = format!("tooltip: {}", tooltip.enabled);
                    app.previewer.set_options(options);
                }
                KeyCode::Char('l') => {
                    app.french = !app.french;
                    let locale = if app.french { "fr" } else { "en" };
                    let catalog = Catalog::new(locale).with_table(
                        "fr",
                        [
                            (LabelKey::More, "plus"),
                            (LabelKey::Less, "moins"),
                            (LabelKey::Copy, "copier"),
                            (LabelKey::Copied, "copié"),
                        ],
                    );
                    app.previewer.set_localizer(Arc::new(catalog));
                    app.status = format!("locale: {locale}");
                }
                _ => {}
            }
        }

        let now = Instant::now();
        app.window.dispatch_input(&event, now);
        match app.previewer.handle_event(&event, &mut app.window) {
            PreviewerAction::OpenLink { href, new_context } => {
                app.status = format!("open {href} (new window: {new_context})");
            }
            PreviewerAction::Redraw | PreviewerAction::None => {}
        }
        app.window.run_timers(now);
    }
}
