//! Full-screen live view of a running validation

use crate::proxy::ProxyCheckResult;
use crate::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::Duration;

/// Maximum number of recent results kept per list
const MAX_RECENT: usize = 100;

/// Results drained per frame, so a burst does not starve the redraw
const MAX_RESULTS_PER_TICK: usize = 64;

/// Live validation view; collects every result it receives
pub struct CheckProgressApp {
    rx: mpsc::Receiver<ProxyCheckResult>,
    total: usize,
    results: Vec<ProxyCheckResult>,
    good_count: usize,
    bad_count: usize,
    recent_good: VecDeque<ProxyCheckResult>,
    recent_bad: VecDeque<ProxyCheckResult>,
    /// 0 = good list, 1 = bad list
    selected_list: usize,
    list_state: ListState,
    status_message: String,
    is_complete: bool,
    should_quit: bool,
}

impl CheckProgressApp {
    pub fn new(rx: mpsc::Receiver<ProxyCheckResult>, total: usize) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            rx,
            total,
            results: Vec::with_capacity(total),
            good_count: 0,
            bad_count: 0,
            recent_good: VecDeque::new(),
            recent_bad: VecDeque::new(),
            selected_list: 0,
            list_state,
            status_message: "Checking proxies...".to_string(),
            is_complete: false,
            should_quit: false,
        }
    }

    /// Show the view until the check completes and the user leaves it.
    ///
    /// Returns every result in completion order.
    pub async fn run(mut self) -> Result<Vec<ProxyCheckResult>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let outcome = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        outcome?;
        Ok(self.results)
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code);
                        if self.should_quit {
                            break;
                        }
                    }
                }
            }

            if !self.is_complete {
                self.drain_results();
            }
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn drain_results(&mut self) {
        for _ in 0..MAX_RESULTS_PER_TICK {
            match self.rx.try_recv() {
                Ok(result) => self.record(result),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.is_complete = true;
                    self.status_message = format!(
                        "Complete! Checked: {} | Good: {} | Bad: {} | Press 'q' to continue",
                        self.results.len(),
                        self.good_count,
                        self.bad_count
                    );
                    return;
                }
            }
        }
    }

    fn record(&mut self, result: ProxyCheckResult) {
        let recent = if result.is_working() {
            self.good_count += 1;
            &mut self.recent_good
        } else {
            self.bad_count += 1;
            &mut self.recent_bad
        };
        recent.push_back(result.clone());
        if recent.len() > MAX_RECENT {
            recent.pop_front();
        }
        self.results.push(result);

        let checked = self.results.len();
        let percentage = (checked as f64 / self.total.max(1) as f64 * 100.0) as u32;
        self.status_message = format!(
            "Checking... {}% ({}/{}) | Good: {} | Bad: {}",
            percentage, checked, self.total, self.good_count, self.bad_count
        );
    }

    fn handle_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                // Checks cannot be cancelled once dispatched
                if self.is_complete {
                    self.should_quit = true;
                } else {
                    self.status_message =
                        "Still checking, the view can be closed once all proxies are done"
                            .to_string();
                }
            }
            KeyCode::Tab => {
                self.selected_list = (self.selected_list + 1) % 2;
                self.list_state.select(Some(0));
            }
            KeyCode::Down => {
                let len = self.selected_len();
                let i = match self.list_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.list_state.select(Some(i));
            }
            KeyCode::Up => {
                let len = self.selected_len();
                let i = match self.list_state.selected() {
                    Some(0) | None => len.saturating_sub(1),
                    Some(i) => i - 1,
                };
                self.list_state.select(Some(i));
            }
            _ => {}
        }
    }

    fn selected_len(&self) -> usize {
        if self.selected_list == 0 {
            self.recent_good.len()
        } else {
            self.recent_bad.len()
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Progress bar
                Constraint::Min(0),    // Result lists
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        let title = Paragraph::new("ProxySync - Proxy Validation")
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let checked = self.results.len();
        let progress = if self.total > 0 {
            (checked as f64 / self.total as f64 * 100.0) as u16
        } else {
            100
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .percent(progress.min(100))
            .label(format!("{}/{} ({}%)", checked, self.total, progress));
        f.render_widget(gauge, chunks[1]);

        let list_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);

        render_results(
            f,
            list_chunks[0],
            "Working",
            &self.recent_good,
            self.good_count,
            Color::Green,
            (self.selected_list == 0).then_some(&mut self.list_state),
        );
        render_results(
            f,
            list_chunks[1],
            "Failed",
            &self.recent_bad,
            self.bad_count,
            Color::Red,
            (self.selected_list == 1).then_some(&mut self.list_state),
        );

        let status = Paragraph::new(self.status_message.clone())
            .style(if self.is_complete {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Yellow)
            })
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[3]);
    }
}

fn render_results(
    f: &mut Frame,
    area: Rect,
    title: &str,
    results: &VecDeque<ProxyCheckResult>,
    total_count: usize,
    color: Color,
    list_state: Option<&mut ListState>,
) {
    let items: Vec<ListItem> = results
        .iter()
        .rev() // newest first
        .map(|result| ListItem::new(result_line(result)).style(Style::default().fg(color)))
        .collect();

    let border_style = if list_state.is_some() {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({})", title, total_count))
                .border_style(border_style),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    match list_state {
        Some(state) => f.render_stateful_widget(list, area, state),
        None => f.render_widget(list, area),
    }
}

fn result_line(result: &ProxyCheckResult) -> String {
    match (result.failure(), result.response_time_ms) {
        (Some(reason), _) => format!("{}  {}", result.display_address(), reason),
        (None, Some(ms)) => format!("{} ({}ms)", result.display_address(), ms),
        (None, None) => result.display_address().to_string(),
    }
}
