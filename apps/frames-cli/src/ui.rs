use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use frames_types::{
    attendance::RecordedEvent,
    events::{BannerEvent, EventPayload, KioskEvent, LifecyclePhase},
    telemetry::TickCounters,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};

const MAX_VISIBLE_RECORDS: usize = 200;
const SCANNING: &str = "Scanning...";

pub enum UiMessage {
    Event(KioskEvent),
    Shutdown,
}

/// Why the dashboard closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    Shutdown,
}

/// Screen model fed by bus events.
#[derive(Debug)]
pub struct DashboardState {
    class_badge: String,
    phase: LifecyclePhase,
    phase_detail: Option<String>,
    banner: Option<String>,
    recorded: VecDeque<RecordedEvent>,
    total_recorded: u64,
    face_in_view: bool,
    counters: TickCounters,
    last_round_trip_ms: Option<u64>,
}

impl DashboardState {
    pub fn new(class_badge: impl Into<String>) -> Self {
        Self {
            class_badge: class_badge.into(),
            phase: LifecyclePhase::Idle,
            phase_detail: None,
            banner: None,
            recorded: VecDeque::with_capacity(MAX_VISIBLE_RECORDS),
            total_recorded: 0,
            face_in_view: false,
            counters: TickCounters::default(),
            last_round_trip_ms: None,
        }
    }

    pub fn apply(&mut self, event: &KioskEvent) {
        match &event.payload {
            EventPayload::Lifecycle(lifecycle) => {
                self.phase = lifecycle.phase;
                self.phase_detail = lifecycle.details.clone();
            }
            EventPayload::Recorded(recorded) => {
                if self.recorded.len() == MAX_VISIBLE_RECORDS {
                    self.recorded.pop_back();
                }
                self.recorded.push_front(recorded.clone());
                self.total_recorded += 1;
            }
            EventPayload::Banner(BannerEvent::Shown { text }) => self.banner = Some(text.clone()),
            EventPayload::Banner(BannerEvent::Cleared) => self.banner = None,
            EventPayload::Highlight(highlight) => self.face_in_view = highlight.region.is_some(),
            EventPayload::Telemetry(telemetry) => {
                self.counters = telemetry.counters.clone();
                if let Some(latency) = &telemetry.latency {
                    self.last_round_trip_ms = Some(latency.total_ms);
                }
            }
        }
    }

    pub fn status_text(&self) -> &str {
        self.banner.as_deref().unwrap_or(SCANNING)
    }

    pub fn record_lines(&self) -> Vec<String> {
        self.recorded
            .iter()
            .map(|event| {
                format!(
                    "{}  (ID: {})  {}",
                    event.display_name,
                    event.subject_id,
                    event.time_label()
                )
            })
            .collect()
    }

    fn phase_label(&self) -> &'static str {
        match self.phase {
            LifecyclePhase::Idle => "Starting camera",
            LifecyclePhase::Armed => "Armed",
            LifecyclePhase::Sampling => "Sampling",
            LifecyclePhase::Stopped => "Stopped",
            LifecyclePhase::Fault => "Camera fault",
        }
    }
}

pub fn run(receiver: Receiver<UiMessage>, mut state: DashboardState) -> Result<UiExit> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, &mut state);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    state: &mut DashboardState,
) -> Result<UiExit> {
    loop {
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => state.apply(&event),
                Ok(UiMessage::Shutdown) | Err(TryRecvError::Disconnected) => {
                    return Ok(UiExit::Shutdown)
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        terminal.draw(|f| draw(f, state))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(UiExit::Quit);
                }
            }
        }
    }
}

fn draw(f: &mut ratatui::Frame, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let mut header_spans = vec![
        Span::styled(
            "FRAMES",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(state.class_badge.clone(), Style::default().fg(Color::Magenta)),
        Span::raw("  "),
        Span::raw(state.phase_label()),
    ];
    if state.face_in_view {
        header_spans.push(Span::raw("  "));
        header_spans.push(Span::styled(
            "FACE IN VIEW",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let header = Paragraph::new(Line::from(header_spans))
        .block(Block::default().borders(Borders::ALL).title("Attendance Kiosk"));
    f.render_widget(header, chunks[0]);

    let status_style = if state.banner.is_some() {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let status = Paragraph::new(Span::styled(state.status_text().to_string(), status_style))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[1]);

    let items: Vec<ListItem> = state.record_lines().into_iter().map(ListItem::new).collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Recorded Attendance ({})", state.total_recorded)),
    );
    f.render_widget(list, chunks[2]);

    let counters = &state.counters;
    let mut footer = vec![
        Span::raw(format!(
            "ticks {}  submitted {}  no match {}  errors {}",
            counters.ticks,
            counters.submissions,
            counters.no_match,
            counters.rejected + counters.transport_errors + counters.timeouts
        )),
    ];
    if let Some(ms) = state.last_round_trip_ms {
        footer.push(Span::raw(format!("  last tick {ms}ms")));
    }
    if let Some(detail) = &state.phase_detail {
        footer.push(Span::raw(format!("  {detail}")));
    }
    footer.push(Span::raw("  "));
    footer.push(Span::styled("q", Style::default().fg(Color::Yellow)));
    footer.push(Span::raw(" to quit"));
    let footer = Paragraph::new(Line::from(footer)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[3]);
}
