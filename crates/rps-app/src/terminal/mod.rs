use std::{
    collections::VecDeque,
    fs::{self, File},
    io::{self, Stdout},
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{CrosstermBackend, TestBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use rps_clock::{LoopState, ManualTime, MonotonicTime, TimeSource};
use rps_core::{Census, ControlCommand, Kind, Playfield, Position, SimulationConfig};
use serde::Serialize;
use supports_color::{ColorLevel, Stream, on_cached};
use tracing::{info, warn};

use crate::{
    driver::{FrameReport, Simulation},
    renderer::{HeadlessOptions, Renderer, RendererContext},
    sound::LoggedSound,
};

const DRAW_INTERVAL_MILLIS: u64 = 16;
pub const DEFAULT_HEADLESS_FRAMES: usize = 120;
pub const MAX_HEADLESS_FRAMES: usize = 100_000;
const HEADLESS_COLUMNS: u16 = 80;
const HEADLESS_ROWS: u16 = 36;
const EVENT_LOG_CAPACITY: usize = 16;
const HUD_ROWS: u16 = 5;

const RATE_STEP: f64 = 5.0;
const MIN_RATE: f64 = 1.0;
const MAX_RATE: f64 = 1_000.0;
const COUNT_STEP: usize = 10;
const SIZE_STEP: f32 = 2.0;
const MIN_SIZE: f32 = 2.0;

pub struct TerminalRenderer {
    draw_interval: Duration,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self {
            draw_interval: Duration::from_millis(DRAW_INTERVAL_MILLIS),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn run(&self, ctx: RendererContext) -> Result<()> {
        if let Some(options) = &ctx.headless {
            let report = self.run_headless(ctx.config.clone(), options)?;
            info!(
                target: "rps::terminal",
                frames = report.summary.frame_count,
                ticks_simulated = report.summary.ticks_simulated,
                final_tick = report.summary.final_tick,
                rock = report.summary.final_census.rock,
                paper = report.summary.final_census.paper,
                scissors = report.summary.final_census.scissors,
                conversions = report.summary.total_conversions,
                winner = ?report.summary.winner,
                "Terminal headless run completed"
            );
            return Ok(());
        }

        let simulation = Simulation::new(ctx.config).context("failed to start simulation")?;

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to build terminal backend")?;
        terminal.hide_cursor().ok();

        let result = run_event_loop(self, &mut terminal, simulation);

        terminal.show_cursor().ok();
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        ) {
            tracing::error!(?err, "failed to leave alternate screen");
        }

        result
    }
}

fn run_event_loop(
    renderer: &TerminalRenderer,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    simulation: Simulation<MonotonicTime>,
) -> Result<()> {
    let mut app = TerminalApp::new(simulation, Palette::detect());

    loop {
        let frame_start = Instant::now();
        app.advance();
        terminal.draw(|frame| app.draw(frame))?;

        let timeout = renderer
            .draw_interval
            .saturating_sub(frame_start.elapsed());
        if !event::poll(timeout).unwrap_or(false) {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press && app.handle_key(key) => break,
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {}
        }
    }

    Ok(())
}

impl TerminalRenderer {
    /// Drive the simulation against a manual clock and an off-screen buffer.
    pub fn run_headless(
        &self,
        config: SimulationConfig,
        options: &HeadlessOptions,
    ) -> Result<HeadlessReport> {
        let time = Arc::new(ManualTime::new());
        let simulation = Simulation::with_time_source(config, Arc::clone(&time))
            .context("failed to start simulation")?;
        let backend = TestBackend::new(HEADLESS_COLUMNS, HEADLESS_ROWS);
        let mut terminal = Terminal::new(backend).context("failed to build test backend")?;
        let mut app = TerminalApp::new(simulation, Palette::detect());
        let mut report = HeadlessReport::new(FrameStats::initial(&app.simulation));
        let frames = options.frames.min(MAX_HEADLESS_FRAMES);
        if frames < options.frames {
            warn!(
                target: "rps::terminal",
                requested = options.frames,
                frames,
                "headless frame budget clamped"
            );
        }

        for _ in 0..frames {
            time.advance(options.frame_duration);
            let frame = app.advance();
            report.record(&frame);
            terminal.draw(|frame| app.draw(frame))?;
        }

        report.finalize(app.simulation.sound().total_plays());

        if let Some(path) = &options.report_path {
            report.write_json(path).with_context(|| {
                format!("failed to write headless report to {}", path.display())
            })?;
        }

        Ok(report)
    }
}

struct TerminalApp<T: TimeSource> {
    simulation: Simulation<T>,
    palette: Palette,
    help_visible: bool,
    map_area: Rect,
    event_log: VecDeque<EventEntry>,
    last_frame: Option<FrameReport>,
    total_conversions: u64,
    winner: Option<Kind>,
}

impl<T: TimeSource> TerminalApp<T> {
    fn new(simulation: Simulation<T>, palette: Palette) -> Self {
        let winner = simulation.world().census().winner();
        Self {
            simulation,
            palette,
            help_visible: false,
            map_area: Rect::default(),
            event_log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
            last_frame: None,
            total_conversions: 0,
            winner,
        }
    }

    fn advance(&mut self) -> FrameReport {
        let report = self.simulation.frame();
        self.ingest(&report);
        report
    }

    fn ingest(&mut self, report: &FrameReport) {
        self.total_conversions += report.conversions as u64;
        if report.conversions > 0 {
            let gained: Vec<&str> = report.sounds.iter().map(|kind| kind.label()).collect();
            let plural = if report.conversions == 1 { "" } else { "s" };
            self.push_event(
                report.tick.0,
                EventKind::Conversion,
                format!(
                    "{} conversion{plural} ({})",
                    report.conversions,
                    gained.join(", ")
                ),
            );
        }
        if report.resynced {
            self.push_event(
                report.tick.0,
                EventKind::Info,
                "Fell behind; pending ticks dropped",
            );
        }
        let winner = report.census.winner();
        if let Some(kind) = winner
            && self.winner != Some(kind)
        {
            info!(target: "rps::terminal", tick = report.tick.0, %kind, "arena settled");
            self.push_event(report.tick.0, EventKind::Victory, format!("{kind} holds the arena"));
        }
        self.winner = winner;
        self.last_frame = Some(report.clone());
    }

    fn push_event(&mut self, tick: u64, kind: EventKind, message: impl Into<String>) {
        if self.event_log.len() >= EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(EventEntry {
            tick,
            kind,
            message: message.into(),
        });
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let hud_rows = if self.simulation.world().config().hud_visible {
            HUD_ROWS
        } else {
            0
        };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(hud_rows),
            ])
            .split(frame.area());

        self.draw_header(frame, outer[0]);
        self.draw_map(frame, outer[1]);
        if hud_rows > 0 {
            self.draw_hud(frame, outer[2]);
        }

        if self.help_visible {
            self.draw_help(frame);
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let world = self.simulation.world();
        let config = world.config();
        let clock = self.simulation.clock();
        let status = format!(
            "Tick {:>7}  Rate {:>6.1}/s  Blend {:>4.2}  Pieces {:>4}  Size {:>4.0}  Samples {:>3}",
            world.tick().0,
            clock.rate(),
            clock.blend(),
            world.piece_count(),
            config.piece_size,
            config.piece_samples,
        );

        let run_flag = if self.simulation.is_paused() {
            Span::styled(" PAUSED ", self.palette.paused_style())
        } else {
            Span::styled(" RUNNING ", self.palette.running_style())
        };

        let mut line = Line::from(vec![Span::styled(status, self.palette.header_style())]);
        line.spans.push(Span::raw("  "));
        line.spans.push(run_flag);
        if clock.state() == LoopState::Capped {
            line.spans.push(Span::raw(" "));
            line.spans
                .push(Span::styled(" BEHIND ", self.palette.warning_style()));
        }

        let paragraph = Paragraph::new(line).block(
            Block::default()
                .title(self.palette.title("Rock Paper Scissors"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_map(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let config = self.simulation.world().config();
        let playfield = config.playfield();
        let title = format!(
            "Arena {:.0}×{:.0}",
            playfield.width,
            playfield.usable_height()
        );
        let block = Block::default()
            .title(self.palette.title(title))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.map_area = inner;

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let height = inner.height as usize;
        let mut occupancy = vec![CellOccupancy::default(); width * height];
        let half = config.piece_size * 0.5;
        let selected = self.simulation.world().selected();

        for (index, (kind, position)) in self.simulation.render_pieces().enumerate() {
            let centre = Position::new(position.x + half, position.y + half);
            if let Some((col, row)) = world_to_cell(inner, &playfield, centre) {
                let cell = &mut occupancy[row * width + col];
                cell.add(kind);
                cell.selected |= selected == Some(index);
            }
        }

        let mut lines = Vec::with_capacity(height);
        for row in occupancy.chunks(width) {
            let spans: Vec<Span> = row
                .iter()
                .map(|cell| {
                    let (glyph, style) = self.palette.piece_symbol(cell);
                    Span::styled(glyph.to_string(), style)
                })
                .collect();
            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_hud(&self, frame: &mut Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let census = self.simulation.world().census();
        let total = census.total().max(1);
        let mut shares = Vec::new();
        for kind in Kind::ALL {
            let count = census.count(kind);
            shares.push(Span::styled(
                format!("{:<8}", kind.label()),
                self.palette.kind_style(kind).add_modifier(Modifier::BOLD),
            ));
            shares.push(Span::raw(format!(
                "{:>4} ({:>3}%)  ",
                count,
                count * 100 / total
            )));
        }

        let sound = self.simulation.sound();
        let last_ticks = self.last_frame.as_ref().map_or(0, |frame| frame.ticks);
        let lines = vec![
            Line::from(shares),
            Line::from(vec![
                Span::styled("Conversions ", self.palette.header_style()),
                Span::raw(format!("{:>6}", self.total_conversions)),
                Span::raw("  "),
                Span::styled("Cues ", self.palette.header_style()),
                Span::raw(cue_summary(sound)),
            ]),
            Line::from(vec![
                Span::styled("Last frame ", self.palette.header_style()),
                Span::raw(format!("{last_ticks} tick(s)")),
                Span::raw("  "),
                Span::styled("Press ? for help", self.palette.accent_style()),
            ]),
        ];

        let paragraph = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(self.palette.title("Census"))
                .borders(Borders::ALL),
        );
        frame.render_widget(paragraph, columns[0]);

        let events: Vec<ListItem> = self
            .event_log
            .iter()
            .rev()
            .map(|entry| {
                let text = format!("[t{:>6}] {}", entry.tick, entry.message);
                ListItem::new(Span::styled(text, self.palette.event_style(entry.kind)))
            })
            .collect();
        let block = Block::default()
            .title(self.palette.title("Recent Events"))
            .borders(Borders::ALL);
        frame.render_widget(List::new(events).block(block), columns[1]);
    }

    fn draw_help(&self, frame: &mut Frame<'_>) {
        let size = frame.area();
        let help_width = ((size.width as f32 * 0.6).round() as u16).min(size.width);
        let help_height = 14.min(size.height);
        let help_x = size.x + (size.width - help_width) / 2;
        let help_y = size.y + (size.height - help_height) / 2;
        let area = Rect::new(help_x, help_y, help_width, help_height);

        let help_lines = vec![
            Line::from(vec![Span::styled(
                "Controls",
                self.palette.header_style().add_modifier(Modifier::BOLD),
            )]),
            Line::raw(" q / Esc  Quit"),
            Line::raw(" space    Toggle pause"),
            Line::raw(" s        Single step"),
            Line::raw(" r        Reset population"),
            Line::raw(" + / -    Adjust tick rate"),
            Line::raw(" ] / [    Add / remove pieces"),
            Line::raw(" . / ,    Grow / shrink pieces"),
            Line::raw(" h        Toggle HUD"),
            Line::raw(" mouse    Drag a piece"),
            Line::raw(" ?        Toggle this help"),
        ];

        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(help_lines).block(
            Block::default()
                .title(self.palette.title("Help"))
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Black).fg(Color::White)),
        );
        frame.render_widget(paragraph, area);
    }

    /// Returns true when the session should end.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let config = self.simulation.world().config();
        let rate = config.simulation_rate;
        let count = config.piece_count;
        let size = config.piece_size;
        let hud_visible = config.hud_visible;
        let tick = self.simulation.world().tick().0;

        match (key.code, key.modifiers) {
            (KeyCode::Esc, _)
            | (KeyCode::Char('q'), _)
            | (KeyCode::Char('Q'), _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                return true;
            }
            (KeyCode::Char(' '), _) => {
                let paused = !self.simulation.is_paused();
                self.simulation.set_paused(paused);
                self.push_event(
                    tick,
                    EventKind::Info,
                    if paused {
                        "Simulation paused"
                    } else {
                        "Simulation resumed"
                    },
                );
            }
            (KeyCode::Char('s'), _) => {
                self.simulation.set_paused(true);
                self.simulation.step_once();
                self.push_event(tick + 1, EventKind::Info, "Single-step executed");
            }
            (KeyCode::Char('r'), _) => {
                self.simulation.submit(ControlCommand::Reset);
                self.push_event(0, EventKind::Info, "Population reset");
            }
            (KeyCode::Char('+') | KeyCode::Char('='), _) => {
                let next = (rate + RATE_STEP).min(MAX_RATE);
                self.simulation.submit(ControlCommand::SetRate(next));
                self.push_event(tick, EventKind::Info, format!("Rate {next:.1}/s"));
            }
            (KeyCode::Char('-') | KeyCode::Char('_'), _) => {
                let next = (rate - RATE_STEP).max(MIN_RATE);
                self.simulation.submit(ControlCommand::SetRate(next));
                self.push_event(tick, EventKind::Info, format!("Rate {next:.1}/s"));
            }
            (KeyCode::Char(']'), _) => {
                self.simulation
                    .submit(ControlCommand::SetPieceCount(count + COUNT_STEP));
            }
            (KeyCode::Char('['), _) => {
                self.simulation
                    .submit(ControlCommand::SetPieceCount(count.saturating_sub(COUNT_STEP)));
            }
            (KeyCode::Char('.'), _) => {
                self.simulation
                    .submit(ControlCommand::SetPieceSize(size + SIZE_STEP));
            }
            (KeyCode::Char(','), _) => {
                self.simulation
                    .submit(ControlCommand::SetPieceSize((size - SIZE_STEP).max(MIN_SIZE)));
            }
            (KeyCode::Char('h'), _) => {
                self.simulation
                    .submit(ControlCommand::SetHudVisible(!hud_visible));
            }
            (KeyCode::Char('?'), _) => {
                self.help_visible = !self.help_visible;
            }
            _ => {}
        }

        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Up(MouseButton::Left) = mouse.kind {
            self.simulation.submit(ControlCommand::Release);
            return;
        }
        let playfield = self.simulation.world().config().playfield();
        let Some(point) = cell_to_world(self.map_area, &playfield, mouse.column, mouse.row) else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.simulation.submit(ControlCommand::Select(point));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.simulation.submit(ControlCommand::Drag(point));
            }
            _ => {}
        }
    }
}

/// Per-kind cue counts followed by the most recent audible cue.
fn cue_summary(sound: &LoggedSound) -> String {
    let last = sound.last().map_or("none", Kind::label);
    format!(
        "R{} P{} S{}  last {last}",
        sound.plays(Kind::Rock),
        sound.plays(Kind::Paper),
        sound.plays(Kind::Scissors)
    )
}

/// Grid cell (relative to `area`) holding the world point `centre`.
fn world_to_cell(area: Rect, playfield: &Playfield, centre: Position) -> Option<(usize, usize)> {
    let usable_height = playfield.usable_height();
    if area.width == 0 || area.height == 0 || playfield.width <= 0.0 || usable_height <= 0.0 {
        return None;
    }
    let width = area.width as f32;
    let height = area.height as f32;
    let col = (centre.x / playfield.width * width)
        .floor()
        .clamp(0.0, width - 1.0) as usize;
    let row = (centre.y / usable_height * height)
        .floor()
        .clamp(0.0, height - 1.0) as usize;
    Some((col, row))
}

/// World point at the centre of the terminal cell `(column, row)`.
fn cell_to_world(area: Rect, playfield: &Playfield, column: u16, row: u16) -> Option<Position> {
    if column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }
    let u = (f32::from(column - area.x) + 0.5) / f32::from(area.width);
    let v = (f32::from(row - area.y) + 0.5) / f32::from(area.height);
    Some(Position::new(
        u * playfield.width,
        v * playfield.usable_height(),
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub tick: u64,
    pub ticks: u32,
    pub blend: f64,
    pub capped: bool,
    pub resynced: bool,
    pub census: Census,
    pub conversions: usize,
    pub sounds: Vec<Kind>,
}

impl FrameStats {
    fn initial<T: TimeSource>(simulation: &Simulation<T>) -> Self {
        Self {
            tick: simulation.world().tick().0,
            ticks: 0,
            blend: simulation.clock().blend(),
            capped: false,
            resynced: false,
            census: simulation.world().census(),
            conversions: 0,
            sounds: Vec::new(),
        }
    }

    fn from_report(report: &FrameReport) -> Self {
        Self {
            tick: report.tick.0,
            ticks: report.ticks,
            blend: report.blend,
            capped: report.state == LoopState::Capped,
            resynced: report.resynced,
            census: report.census,
            conversions: report.conversions,
            sounds: report.sounds.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSummary {
    pub frame_count: usize,
    pub ticks_simulated: u64,
    pub final_tick: u64,
    pub final_census: Census,
    pub total_conversions: usize,
    pub capped_frames: usize,
    pub resyncs: usize,
    pub sound_plays: u64,
    pub winner: Option<Kind>,
}

impl ReportSummary {
    fn from(initial: &FrameStats, frames: &[FrameStats], sound_plays: u64) -> Self {
        let last = frames.last().unwrap_or(initial);
        Self {
            frame_count: frames.len(),
            ticks_simulated: last.tick.saturating_sub(initial.tick),
            final_tick: last.tick,
            final_census: last.census,
            total_conversions: frames.iter().map(|frame| frame.conversions).sum(),
            capped_frames: frames.iter().filter(|frame| frame.capped).count(),
            resyncs: frames.iter().filter(|frame| frame.resynced).count(),
            sound_plays,
            winner: last.census.winner(),
        }
    }
}

/// Frame-by-frame record of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub initial: FrameStats,
    pub frames: Vec<FrameStats>,
    pub summary: ReportSummary,
}

impl HeadlessReport {
    fn new(initial: FrameStats) -> Self {
        Self {
            initial,
            frames: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    fn record(&mut self, report: &FrameReport) {
        self.frames.push(FrameStats::from_report(report));
    }

    fn finalize(&mut self, sound_plays: u64) {
        self.summary = ReportSummary::from(&self.initial, &self.frames, sound_plays);
    }

    fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).context("failed to serialize headless report")?;
        Ok(())
    }
}

struct EventEntry {
    tick: u64,
    message: String,
    kind: EventKind,
}

#[derive(Clone, Copy, Debug)]
enum EventKind {
    Conversion,
    Victory,
    Info,
}

#[derive(Clone, Copy, Debug, Default)]
struct CellOccupancy {
    counts: [u16; 3],
    selected: bool,
}

impl CellOccupancy {
    fn add(&mut self, kind: Kind) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(1);
    }

    fn total(&self) -> u32 {
        self.counts.iter().map(|count| u32::from(*count)).sum()
    }

    fn dominant(&self) -> Option<Kind> {
        Kind::ALL
            .into_iter()
            .filter(|kind| self.counts[kind.index()] > 0)
            .max_by_key(|kind| self.counts[kind.index()])
    }

    fn mixed(&self) -> bool {
        self.counts.iter().filter(|count| **count > 0).count() > 1
    }
}

struct Palette {
    level: Option<ColorLevel>,
}

impl Palette {
    fn detect() -> Self {
        Self {
            level: on_cached(Stream::Stdout),
        }
    }

    fn header_style(&self) -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    fn accent_style(&self) -> Style {
        Style::default().fg(Color::LightMagenta)
    }

    fn paused_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    fn running_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    fn warning_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    fn title<T: Into<String>>(&self, title: T) -> Span<'static> {
        Span::styled(title.into(), self.header_style())
    }

    fn event_style(&self, kind: EventKind) -> Style {
        let color = match kind {
            EventKind::Conversion => Color::Yellow,
            EventKind::Victory => Color::Green,
            EventKind::Info => Color::Cyan,
        };
        Style::default().fg(color)
    }

    fn has_color(&self) -> bool {
        self.level.is_some()
    }

    fn kind_color(&self, kind: Kind) -> Color {
        let rich = self
            .level
            .is_some_and(|level| level.has_16m || level.has_256);
        match (kind, rich) {
            (Kind::Rock, true) => Color::Rgb(170, 160, 150),
            (Kind::Paper, true) => Color::Rgb(120, 180, 255),
            (Kind::Scissors, true) => Color::Rgb(255, 110, 110),
            (Kind::Rock, false) => Color::Gray,
            (Kind::Paper, false) => Color::LightBlue,
            (Kind::Scissors, false) => Color::LightRed,
        }
    }

    fn kind_style(&self, kind: Kind) -> Style {
        if self.has_color() {
            Style::default().fg(self.kind_color(kind))
        } else {
            Style::default()
        }
    }

    fn piece_symbol(&self, cell: &CellOccupancy) -> (char, Style) {
        let Some(kind) = cell.dominant() else {
            return (' ', Style::default());
        };
        let stacked = cell.total() > 1;
        let glyph = if cell.mixed() {
            '*'
        } else {
            match (kind, stacked) {
                (Kind::Rock, false) => 'r',
                (Kind::Paper, false) => 'p',
                (Kind::Scissors, false) => 's',
                (Kind::Rock, true) => 'R',
                (Kind::Paper, true) => 'P',
                (Kind::Scissors, true) => 'S',
            }
        };
        let mut style = self.kind_style(kind);
        if stacked {
            style = style.add_modifier(Modifier::BOLD);
        }
        if cell.selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        (glyph, style)
    }
}
