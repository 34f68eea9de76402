//! Interactive operator console for a SyncMesh node.
//!
//! A ratatui TUI showing the node registry, the message feed seen from
//! this node, and the shared status log, with single-key admin actions
//! and a send form.
//!
//! Launch with `syncmesh-console` and no subcommand.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::admin::AdminAction;
use crate::controller::{Controller, Trigger};
use crate::error::{ConsoleError, Result};
use crate::feed::{self, FeedState};
use crate::registry::RegistryState;
use crate::status_log::LogLevel;

/// Which part of the screen receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Actions,
    Compose,
}

struct OperatorConsole {
    controller: Controller,
    focus: Focus,
    /// Scroll offset for the message feed panel.
    feed_scroll: u16,
}

const HELP_LINES: &[&str] = &[
    "Keys: n nodes, m messages, h heartbeats, l leader, r replicas, R refresh replicas",
    "      e election, p/P partition on/off, y replay, Tab send form, q quit",
    "Send form: Left/Right sender, Up/Down receiver, Enter send, Esc back",
    "Commands: /unicast <target>, /help, /quit",
];

impl OperatorConsole {
    fn new(mut controller: Controller) -> Self {
        controller.note(
            LogLevel::Info,
            "SyncMesh Operator Console ready. Press Tab to compose a message, /help for keys.",
        );
        Self {
            controller,
            focus: Focus::Actions,
            feed_scroll: 0,
        }
    }

    /// Run a slash command typed into the payload field. Returns `true`
    /// if the console should exit.
    fn process_command(&mut self, cmd: &str) -> bool {
        let mut parts = cmd.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();

        match command {
            "/quit" | "/exit" | "/q" => return true,
            "/help" => {
                for line in HELP_LINES {
                    self.controller.note(LogLevel::Info, *line);
                }
            }
            "/unicast" => {
                if args.is_empty() {
                    self.controller
                        .note(LogLevel::Error, "Usage: /unicast <target>");
                } else if !self.controller.run_admin(AdminAction::Unicast {
                    target: args.to_string(),
                }) {
                    self.controller
                        .note(LogLevel::Info, "Unicast already in flight");
                }
            }
            other => {
                self.controller
                    .note(LogLevel::Error, format!("Unknown command: {}", other));
            }
        }
        self.controller.payload_mut().clear();
        false
    }

    /// Enter in the send form: a slash command or a message submission.
    fn process_input(&mut self) -> bool {
        let input = self.controller.payload().trim().to_string();
        if input.starts_with('/') {
            return self.process_command(&input);
        }
        self.controller.submit_current();
        false
    }

    fn action_for_key(c: char) -> Option<AdminAction> {
        Some(match c {
            'h' => AdminAction::Heartbeats,
            'l' => AdminAction::Leader,
            'r' => AdminAction::Replicas,
            'R' => AdminAction::RefreshReplicas,
            'e' => AdminAction::TriggerElection,
            'p' => AdminAction::Partition { enable: true },
            'P' => AdminAction::Partition { enable: false },
            'y' => AdminAction::Replay,
            _ => return None,
        })
    }

    /// Handle keyboard input. Returns `true` if the console should exit.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (code, modifiers) {
            return true;
        }
        match self.focus {
            Focus::Actions => self.handle_action_key(code),
            Focus::Compose => self.handle_compose_key(code),
        }
    }

    fn handle_action_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.focus = Focus::Compose,
            KeyCode::Char('n') => {
                self.controller.refresh_nodes();
            }
            KeyCode::Char('m') => {
                self.controller.refresh_messages();
            }
            KeyCode::Char(c) => {
                if let Some(action) = Self::action_for_key(c) {
                    self.controller.run_admin(action);
                }
            }
            KeyCode::PageUp => self.feed_scroll = self.feed_scroll.saturating_sub(5),
            KeyCode::PageDown => self.feed_scroll = self.feed_scroll.saturating_add(5),
            _ => {}
        }
        false
    }

    fn handle_compose_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Tab | KeyCode::Esc => self.focus = Focus::Actions,
            KeyCode::Enter => return self.process_input(),
            KeyCode::Char(c) => self.controller.payload_mut().push(c),
            KeyCode::Backspace => {
                self.controller.payload_mut().pop();
            }
            KeyCode::Left => self.controller.cycle_sender(false),
            KeyCode::Right => self.controller.cycle_sender(true),
            KeyCode::Up => self.controller.cycle_receiver(false),
            KeyCode::Down => self.controller.cycle_receiver(true),
            _ => {}
        }
        false
    }

    /// Render the full operator console layout.
    fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Status bar
                Constraint::Min(8),     // Nodes + feed
                Constraint::Length(10), // Status log
                Constraint::Length(6),  // Send form
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0]);
        self.render_main_area(frame, outer[1]);
        self.render_status_log(frame, outer[2]);
        self.render_send_form(frame, outer[3]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" SyncMesh Operator Console ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let identity = self.controller.identity();
        let mut busy: Vec<String> = self
            .controller
            .busy()
            .iter()
            .map(|t| format!("{:?}", t))
            .collect();
        busy.sort();
        let busy = if busy.is_empty() {
            "idle".to_string()
        } else {
            busy.join(", ")
        };

        let status_line = Line::from(vec![
            Span::styled("  Current Server: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} ({})",
                    identity.current_server_id(),
                    identity.current_server()
                ),
                Style::default().fg(Color::White),
            ),
            Span::styled("  |  API: ", Style::default().fg(Color::Gray)),
            Span::styled(
                self.controller.api().base_url(),
                Style::default().fg(Color::LightCyan),
            ),
            Span::styled("  |  In flight: ", Style::default().fg(Color::Gray)),
            Span::styled(busy, Style::default().fg(Color::Yellow)),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35), // Nodes
                Constraint::Percentage(65), // Feed
            ])
            .split(area);

        self.render_nodes(frame, columns[0]);
        self.render_feed(frame, columns[1]);
    }

    fn render_nodes(&self, frame: &mut Frame, area: Rect) {
        let title = if self.controller.is_enabled(Trigger::Nodes) {
            " Active Nodes [n] "
        } else {
            " Active Nodes (loading) "
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));

        let registry = self.controller.registry();
        let lines: Vec<Line> = match registry.state() {
            RegistryState::Loaded => registry
                .entries()
                .iter()
                .map(|entry| {
                    let style = if entry.is_current {
                        Style::default()
                            .fg(Color::Green)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    Line::from(Span::styled(format!("  {}", entry.line()), style))
                })
                .collect(),
            RegistryState::Failed => registry
                .lines()
                .into_iter()
                .map(|l| Line::from(Span::styled(format!("  {}", l), Style::default().fg(Color::Red))))
                .collect(),
            _ => registry
                .lines()
                .into_iter()
                .map(|l| {
                    Line::from(Span::styled(
                        format!("  {}", l),
                        Style::default().fg(Color::DarkGray),
                    ))
                })
                .collect(),
        };

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_feed(&self, frame: &mut Frame, area: Rect) {
        let feed_view = self.controller.feed();
        let title = format!(
            " Messages [m] ({} shown / {} fetched) ",
            feed_view.entries().len(),
            feed_view.fetched()
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));

        let lines: Vec<Line> = match feed_view.state() {
            FeedState::Loaded => feed_view
                .entries()
                .iter()
                .flat_map(|entry| {
                    let label_color = match entry.direction {
                        feed::Direction::SentAndReceived => Color::Cyan,
                        feed::Direction::Sent => Color::Yellow,
                        feed::Direction::Received => Color::Green,
                    };
                    let mut lines: Vec<Line> = entry
                        .lines()
                        .into_iter()
                        .enumerate()
                        .map(|(i, text)| {
                            let style = if i == 0 {
                                Style::default()
                                    .fg(label_color)
                                    .add_modifier(Modifier::BOLD)
                            } else {
                                Style::default().fg(Color::White)
                            };
                            Line::from(Span::styled(format!("  {}", text), style))
                        })
                        .collect();
                    lines.push(Line::from(""));
                    lines
                })
                .collect(),
            FeedState::Failed => vec![Line::from(Span::styled(
                format!("  {}", feed::MESSAGES_ERROR_LINE),
                Style::default().fg(Color::Red),
            ))],
            _ => feed_view
                .lines()
                .into_iter()
                .map(|l| {
                    Line::from(Span::styled(
                        format!("  {}", l),
                        Style::default().fg(Color::DarkGray),
                    ))
                })
                .collect(),
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.feed_scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn render_status_log(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Status ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let entries = self.controller.status().entries();
        let inner_height = area.height.saturating_sub(2) as usize;

        if entries.is_empty() {
            let text = Paragraph::new(Line::from(Span::styled(
                "  No status yet",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(text, area);
            return;
        }

        // Show the most recent entries that fit.
        let start = entries.len().saturating_sub(inner_height);
        let lines: Vec<Line> = entries[start..]
            .iter()
            .map(|entry| {
                let color = match entry.level {
                    LogLevel::Info => Color::White,
                    LogLevel::Success => Color::Green,
                    LogLevel::Error => Color::Red,
                };
                Line::from(vec![
                    Span::styled(
                        format!("  [{}] ", entry.timestamp.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(entry.text.as_str(), Style::default().fg(color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_send_form(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Compose;
        let block = Block::default()
            .title(" Send Message (Tab = focus, Enter = send, /help = commands) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Green
            } else {
                Color::DarkGray
            }));

        let registry = self.controller.registry();
        let payload = self.controller.payload();
        let selectors = Line::from(vec![
            Span::styled("  From: ", Style::default().fg(Color::Gray)),
            Span::styled(
                registry.sender().selected_label(),
                Style::default().fg(Color::White),
            ),
            Span::styled("   To: ", Style::default().fg(Color::Gray)),
            Span::styled(
                registry.receiver().selected_label(),
                Style::default().fg(Color::White),
            ),
        ]);
        let input_display = if payload.is_empty() {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(
                    "Type a message payload or /command...",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        } else {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(payload, Style::default().fg(Color::White)),
            ])
        };
        let hint_line = Line::from(Span::styled(
            if focused {
                "  Left/Right sender  |  Up/Down receiver  |  Esc to leave form"
            } else {
                "  Ctrl+C or q to exit  |  Tab to compose  |  /help for keys"
            },
            Style::default().fg(Color::DarkGray),
        ));

        let paragraph = Paragraph::new(vec![selectors, input_display, hint_line]).block(block);
        frame.render_widget(paragraph, area);

        if focused {
            let cursor_x = area.x + 5 + payload.chars().count() as u16;
            let cursor_y = area.y + 2;
            frame.set_cursor_position((cursor_x, cursor_y));
        }
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the operator console event loop until the operator quits.
///
/// Loads the node registry (and through it the message feed) on start,
/// then applies request completions between frames.
pub async fn run_operator_console(controller: Controller, tick_rate: Duration) -> Result<()> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(ConsoleError::Terminal(io::Error::new(
            io::ErrorKind::Unsupported,
            "operator console requires a terminal (TTY); use a subcommand for scripted use",
        )));
    }

    // Set up panic hook to restore terminal.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut console = OperatorConsole::new(controller);
    console.controller.refresh_nodes();

    loop {
        console.controller.drain();

        terminal.draw(|frame| console.render(frame))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press
                    && console.handle_key(key_event.code, key_event.modifiers)
                {
                    break;
                }
            }
        }
    }

    restore_terminal(&mut terminal)?;
    tracing::info!("Operator console closed");
    Ok(())
}
