// app.rs
use crate::map::MapView;
use crate::message::{Message, Role};
use crate::orchestrator::QueryOrchestrator;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::prelude::Rect;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::canvas::{Canvas, Map, MapResolution},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const PAGE: u16 = 10;

/// The chat + map screen.
pub struct App {
    orchestrator: QueryOrchestrator,
    map: Rc<RefCell<MapView>>,
    /// Lines scrolled up from the bottom of the chat.
    scroll: u16,
    spinner: usize,
    should_quit: bool,
}

impl App {
    pub fn new(orchestrator: QueryOrchestrator, map: Rc<RefCell<MapView>>) -> Self {
        Self {
            orchestrator,
            map,
            scroll: 0,
            spinner: 0,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Runs until the user quits. Must be called inside a `LocalSet`.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(120));

        while !self.should_quit() {
            terminal.draw(|f| self.draw(f))?;

            tokio::select! {
                _ = ticker.tick() => self.tick(),
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) => self.handle_key(key),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => self.should_quit = true,
                },
            }
        }
        Ok(())
    }

    fn tick(&mut self) {
        if self.orchestrator.is_pending() {
            self.spinner = (self.spinner + 1) % SPINNER.len();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => self.orchestrator.pop_draft_char(),
            KeyCode::Up => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(PAGE),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(PAGE),
            KeyCode::Char(c) => self.orchestrator.push_draft_char(c),
            _ => {}
        }
    }

    /// Hands the draft to the orchestrator without blocking the UI.
    ///
    /// The draft is cleared here, so keys typed while the answer is on its way
    /// start the next draft.
    fn submit(&mut self) {
        if !self.orchestrator.can_submit() {
            return;
        }
        let input = self.orchestrator.draft_input();
        tokio::task::spawn_local(self.orchestrator.submit_query(input));
        self.scroll = 0;
    }

    pub fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "FloatChat",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  AI-Powered Ocean Data Discovery"),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        self.draw_chat(frame, panels[0]);
        self.draw_map(frame, panels[1]);
        self.draw_input(frame, chunks[2]);

        let status = if self.orchestrator.is_pending() {
            Span::styled("Loading...", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("Ready", Style::default().fg(Color::Green))
        };
        let asked = self.orchestrator.state().timeline.count_by(Role::User);
        let status_bar = Paragraph::new(Line::from(vec![
            Span::raw(" Status: "),
            status,
            Span::raw(format!("   Questions: {}", asked)),
            Span::raw("   Enter send | Esc quit | Up/Down scroll"),
        ]));
        frame.render_widget(status_bar, chunks[3]);
    }

    fn draw_chat(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self
            .orchestrator
            .state()
            .timeline
            .messages()
            .iter()
            .flat_map(message_lines)
            .collect();

        if self.orchestrator.is_pending() {
            lines.push(Line::from(Span::styled(
                format!("{} FloatChat is thinking...", SPINNER[self.spinner]),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        let inner_width = area.width.saturating_sub(2).max(1) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        let total_rows: usize = lines
            .iter()
            .map(|l| l.width().max(1).div_ceil(inner_width))
            .sum();
        let bottom = total_rows.saturating_sub(inner_height);
        let offset = bottom.saturating_sub(self.scroll as usize);
        let offset = u16::try_from(offset).unwrap_or(u16::MAX);

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Chat"))
            .wrap(Wrap { trim: false })
            .scroll((offset, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_map(&self, frame: &mut Frame, area: Rect) {
        let map = self.map.borrow();
        let (x_bounds, y_bounds) = map.bounds();
        let focus = map.focus().copied();

        let canvas = Canvas::default()
            .block(Block::default().borders(Borders::ALL).title(map.caption()))
            .marker(symbols::Marker::Braille)
            .x_bounds(x_bounds)
            .y_bounds(y_bounds)
            .paint(move |ctx| {
                ctx.draw(&Map {
                    color: Color::Green,
                    resolution: MapResolution::High,
                });
                if let Some(place) = focus {
                    ctx.layer();
                    ctx.print(
                        place.lon,
                        place.lat,
                        Span::styled("X", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                    );
                }
            });
        frame.render_widget(canvas, area);
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let draft = self.orchestrator.draft_input();
        let style = if self.orchestrator.is_pending() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let input = Paragraph::new(draft.as_str()).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Ask about ocean data, ARGO floats, trends..."),
        );
        frame.render_widget(input, area);

        let cursor_x = area.x + 1 + draft.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

/// Header line plus content lines for one message.
fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let (label_style, body_style) = match message.role {
        Role::User => (
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            Style::default().fg(Color::White),
        ),
        Role::Bot => (
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(message.role.to_string(), label_style),
        Span::styled(
            format!("  {}", message.created_at.with_timezone(&chrono::Local).format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    lines.extend(
        message
            .display_text()
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), body_style))),
    );
    lines.push(Line::default());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AnswerBackend, BackendAnswer, BackendError};
    use crate::location::DisabledLocationExtractor;
    use crate::map::MapZoomNotifier;
    use crate::state::OrchestratorState;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use tokio::task::LocalSet;

    struct EchoBackend;

    #[async_trait(?Send)]
    impl AnswerBackend for EchoBackend {
        async fn answer(&self, text: &str) -> Result<BackendAnswer, BackendError> {
            Ok(BackendAnswer {
                summary: Some(format!("<p>You asked about {}</p>", text)),
            })
        }
    }

    fn app() -> App {
        let map = Rc::new(RefCell::new(MapView::new()));
        let target = Rc::clone(&map);
        let notifier: MapZoomNotifier = Rc::new(move |loc: &str| target.borrow_mut().zoom_to_location(loc));
        let orchestrator = QueryOrchestrator::new(
            OrchestratorState::new(Some("Hello! I'm FloatChat.")),
            Rc::new(DisabledLocationExtractor),
            Rc::new(EchoBackend),
            notifier,
        );
        App::new(orchestrator, map)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<Vec<_>>()
            .join("")
    }

    #[test]
    fn test_typing_edits_draft() {
        let mut app = app();
        type_text(&mut app, "tempx");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.orchestrator.draft_input(), "temp");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit());

        let mut app = self::app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
        assert!(app.orchestrator.draft_input().is_empty());
    }

    #[test]
    fn test_scroll_saturates() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        assert_eq!(app.scroll, 0);
        press(&mut app, KeyCode::PageUp);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.scroll, PAGE + 1);
    }

    #[tokio::test]
    async fn test_enter_submits_draft() {
        LocalSet::new()
            .run_until(async {
                let mut app = app();
                type_text(&mut app, "salinity");
                press(&mut app, KeyCode::Enter);

                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                let messages = app.orchestrator.messages();
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[1].content, "salinity");
                assert_eq!(messages[2].display_text(), "You asked about salinity\n");
                assert!(app.orchestrator.draft_input().is_empty());
                assert!(!app.orchestrator.is_pending());
            })
            .await;
    }

    #[tokio::test]
    async fn test_typing_after_enter_starts_next_draft() {
        LocalSet::new()
            .run_until(async {
                let mut app = app();
                type_text(&mut app, "salinity");
                press(&mut app, KeyCode::Enter);
                assert!(app.orchestrator.draft_input().is_empty());
                assert!(app.orchestrator.is_pending());

                type_text(&mut app, "x");
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                let messages = app.orchestrator.messages();
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[1].content, "salinity");
                assert_eq!(app.orchestrator.draft_input(), "x");
                assert!(!app.orchestrator.is_pending());
            })
            .await;
    }

    #[tokio::test]
    async fn test_enter_with_blank_draft_does_nothing() {
        LocalSet::new()
            .run_until(async {
                let mut app = app();
                type_text(&mut app, "   ");
                press(&mut app, KeyCode::Enter);
                tokio::task::yield_now().await;

                assert_eq!(app.orchestrator.messages().len(), 1);
                assert_eq!(app.orchestrator.draft_input(), "   ");
            })
            .await;
    }

    #[test]
    fn test_draw_shows_chat_and_map() {
        let app = app();
        app.map.borrow_mut().zoom_to_location("Bay of Bengal");

        let screen = rendered(&app);
        assert!(screen.contains("FloatChat"));
        assert!(screen.contains("Hello! I'm FloatChat."));
        assert!(screen.contains("Map - Bay of Bengal"));
        assert!(screen.contains("Ready"));
    }
}
