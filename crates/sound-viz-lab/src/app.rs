//! Terminal host for the render loop.
//!
//! The frame interval drives `on_frame` while a frame token is live; every
//! interval tick also polls the engine's timers so decay and warning expiry
//! keep running when playback is idle. Input arrives on an mpsc channel fed
//! by a blocking reader task.

use std::io;
use std::time::{Duration, Instant};

use deck_core::{FrameRequest, FrameToken, RenderLoop, TrackRef};
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Frame, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::source::LabBackend;
use crate::ui::{self, toast::ToastManager, View};

/// Pan step for the arrow keys, in percent of the pannable range.
const PAN_STEP: f32 = 5.0;
const INTENSITY_STEP: f32 = 1.25;

enum AppMessage {
    Event(Event),
}

pub struct App {
    engine: RenderLoop<LabBackend>,
    track: TrackRef,
    frame_token: Option<FrameToken>,
    frame_interval: Duration,
    toasts: ToastManager,
    scope_area: Rect,
    drag_origin: Option<u16>,
    should_quit: bool,
}

impl App {
    pub fn new(engine: RenderLoop<LabBackend>, track: TrackRef, frame_rate: u32) -> Self {
        Self {
            engine,
            track,
            frame_token: None,
            frame_interval: Duration::from_millis(1000 / u64::from(frame_rate.max(1))),
            toasts: ToastManager::new(),
            scope_area: Rect::default(),
            drag_origin: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard/mouse events ────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut frame_tick = tokio::time::interval(self.frame_interval);
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.start_playback(Instant::now());

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    match msg {
                        AppMessage::Event(ev) => self.handle_event(ev),
                    }
                    needs_redraw = true;
                }

                _ = frame_tick.tick() => {
                    needs_redraw = self.frame(Instant::now());
                }

                _ = toast_tick.tick() => {
                    self.toasts.tick();
                    needs_redraw = true;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("sound-viz-lab exiting");

        Ok(())
    }

    /// One host frame. Returns whether anything visible may have changed.
    fn frame(&mut self, now: Instant) -> bool {
        let mut active = false;
        if let Some(token) = self.frame_token {
            match self.engine.on_frame(token, now) {
                FrameRequest::Continue(next) => {
                    self.frame_token = Some(next);
                    active = true;
                }
                FrameRequest::Halt => self.frame_token = None,
            }
        }
        self.engine.poll_timers(now);
        active || self.engine.has_pending_timers()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let snapshot = self.engine.snapshot();
        let view = View {
            snapshot: &snapshot,
            title: &self.track.title,
            position_secs: self.engine.backend().position_secs(),
            intensity: self.engine.intensity(),
            toasts: &self.toasts,
        };
        self.scope_area = ui::draw(frame, &view);
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    fn start_playback(&mut self, now: Instant) {
        match self.engine.play(&self.track, now) {
            Ok(token) => self.frame_token = Some(token),
            Err(e) => {
                warn!("play failed: {}", e);
                self.toasts.error(format!("play failed: {}", e));
            }
        }
    }

    fn toggle_playback(&mut self, now: Instant) {
        if self.engine.is_playing() {
            self.frame_token = None;
            if let Err(e) = self.engine.pause(now) {
                self.toasts.error(format!("pause: {}", e));
            }
        } else {
            self.start_playback(now);
        }
    }

    fn stop(&mut self, now: Instant) {
        self.frame_token = None;
        if let Err(e) = self.engine.stop(now) {
            self.toasts.error(format!("stop: {}", e));
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_event(&mut self, ev: Event) {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.toggle_playback(now),
            KeyCode::Char('s') => self.stop(now),
            KeyCode::Char('t') => self.change_tier(self.engine.profile().tier.lower(), now),
            KeyCode::Char('T') => self.change_tier(self.engine.profile().tier.higher(), now),
            KeyCode::Char('a') => {
                let enabled = !self.engine.auto_adjust();
                self.engine.set_auto_adjust(enabled);
                self.toasts
                    .info(format!("auto adjust {}", if enabled { "on" } else { "off" }));
            }
            KeyCode::Char('m') => {
                let mode = self.engine.scope_state().mode.toggled();
                self.engine.set_mode(mode);
                self.toasts.info(format!("scope: {}", mode));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                if !self.engine.zoom_in() {
                    self.toasts.info("zoom at maximum");
                }
            }
            KeyCode::Char('-') => {
                if !self.engine.zoom_out() {
                    self.toasts.info("zoom at minimum");
                }
            }
            KeyCode::Left => self.nudge_pan(-PAN_STEP),
            KeyCode::Right => self.nudge_pan(PAN_STEP),
            KeyCode::Up => {
                self.engine.amplitude_in();
            }
            KeyCode::Down => {
                self.engine.amplitude_out();
            }
            KeyCode::Char('[') => {
                let i = self.engine.intensity() / INTENSITY_STEP;
                self.engine.set_intensity(i);
            }
            KeyCode::Char(']') => {
                let i = self.engine.intensity() * INTENSITY_STEP;
                self.engine.set_intensity(i);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let inside = mouse.column >= self.scope_area.x
            && mouse.column < self.scope_area.x + self.scope_area.width
            && mouse.row >= self.scope_area.y
            && mouse.row < self.scope_area.y + self.scope_area.height;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => {
                self.drag_origin = Some(mouse.column);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(origin) = self.drag_origin {
                    let dx = f32::from(mouse.column) - f32::from(origin);
                    self.engine.drag(dx, f32::from(self.scope_area.width));
                    self.drag_origin = Some(mouse.column);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.drag_origin = None,
            MouseEventKind::ScrollUp if inside => {
                self.engine.zoom_in();
            }
            MouseEventKind::ScrollDown if inside => {
                self.engine.zoom_out();
            }
            _ => {}
        }
    }

    fn nudge_pan(&mut self, delta: f32) {
        let pan = self.engine.scope_state().pan;
        self.engine.set_pan(pan + delta);
    }

    fn change_tier(&mut self, tier: deck_proto::QualityTier, now: Instant) {
        if tier == self.engine.profile().tier {
            return;
        }
        self.engine.set_tier(tier, now);
        self.toasts.info(format!("tier: {}", tier));
    }
}
