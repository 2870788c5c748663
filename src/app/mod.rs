use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::heatmap::{Colorbar, Heatmap};
use crate::interpolate::InterpolatedField;
use crate::render::RenderSink;

const TITLE: &str = "Interpolated Power Heatmap";

/// Display state: the last good frame plus what the status line shows.
#[derive(Debug)]
pub struct App {
    /// Cleared by q / Esc / Ctrl+C.
    running: bool,
    watched: PathBuf,
    resolution: usize,
    frame: Option<InterpolatedField>,
    last_refresh: Option<DateTime<Local>>,
}

impl App {
    pub fn new(watched: PathBuf, resolution: usize) -> Self {
        Self {
            running: true,
            watched,
            resolution,
            frame: None,
            last_refresh: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Store a freshly interpolated field; the previous one is dropped.
    pub fn show(&mut self, field: InterpolatedField) {
        self.frame = Some(field);
        self.last_refresh = Some(Local::now());
    }

    /// Renders the user interface.
    pub fn draw(&self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![
                Constraint::Length(3),
                Constraint::Fill(1),
                Constraint::Length(8),
            ])
            .split(frame.area());

        frame.render_widget(
            Paragraph::new(self.status_line()).block(
                Block::bordered()
                    .title("Watching")
                    .title_bottom(Line::from(vec![
                        " Quit ".into(),
                        "<Q>".blue().bold(),
                        " / ".into(),
                        "<Esc>".blue().bold(),
                        " ".into(),
                    ])),
            ),
            layout[0],
        );

        let plot_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Fill(1), Constraint::Length(12)])
            .split(layout[1]);

        let plot_block = Block::bordered().title(TITLE);
        match &self.frame {
            Some(field) => {
                let inner = plot_block.inner(plot_layout[0]);
                frame.render_widget(plot_block, plot_layout[0]);
                frame.render_widget(&Heatmap { field }, inner);
            }
            None => {
                frame.render_widget(
                    Paragraph::new("Waiting for plottable data...").block(plot_block),
                    plot_layout[0],
                );
            }
        }

        let bar_block = Block::bordered();
        let bar_inner = bar_block.inner(plot_layout[1]);
        frame.render_widget(bar_block, plot_layout[1]);
        frame.render_widget(
            &Colorbar {
                range: self.frame.as_ref().and_then(InterpolatedField::value_range),
            },
            bar_inner,
        );

        frame.render_widget(
            TuiLoggerWidget::default()
                .block(Block::bordered().title("Log"))
                .style_error(Style::default().fg(Color::Red))
                .style_debug(Style::default().fg(Color::Green))
                .style_warn(Style::default().fg(Color::Yellow))
                .style_trace(Style::default().fg(Color::Magenta))
                .style_info(Style::default().fg(Color::Cyan))
                .output_separator(':')
                .output_timestamp(Some("%H:%M:%S".to_string()))
                .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
                .output_target(false)
                .output_file(false)
                .output_line(false),
            layout[2],
        );
    }

    fn status_line(&self) -> Line<'_> {
        let mut spans = vec![
            Span::raw(self.watched.display().to_string()).yellow(),
            Span::raw(format!("  grid {0}x{0}", self.resolution)),
        ];
        if let Some(field) = &self.frame {
            spans.push(Span::raw(format!("  samples {}", field.points.len())));
            if field.degenerate {
                spans.push(Span::raw("  (collinear)").dark_gray());
            }
        }
        spans.push(Span::raw(match self.last_refresh {
            Some(t) => format!("  last refresh {}", t.format("%H:%M:%S")),
            None => "  no plot yet".to_string(),
        }));
        Line::from(spans)
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
            // Resize is handled by the redraw that follows every event.
            _ => {}
        }
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        if matches!(
            (key.modifiers, key.code),
            (_, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q'))
                | (
                    KeyModifiers::CONTROL,
                    KeyCode::Char('c') | KeyCode::Char('C')
                )
        ) {
            self.quit();
        }
    }

    fn quit(&mut self) {
        self.running = false;
    }
}

/// [`RenderSink`] backed by the full-screen terminal.
pub struct TerminalSink {
    terminal: DefaultTerminal,
    app: App,
}

impl TerminalSink {
    pub fn new(terminal: DefaultTerminal, app: App) -> Self {
        Self { terminal, app }
    }
}

impl RenderSink for TerminalSink {
    fn render(&mut self, field: InterpolatedField) {
        self.app.show(field);
    }

    fn is_open(&self) -> bool {
        self.app.is_running()
    }

    fn pump(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.terminal.draw(|frame| self.app.draw(frame))?;
        while self.app.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !event::poll(remaining)? {
                break;
            }
            self.app.handle_event(event::read()?);
            self.terminal.draw(|frame| self.app.draw(frame))?;
        }
        Ok(())
    }
}
