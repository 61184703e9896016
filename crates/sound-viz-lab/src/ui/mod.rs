pub mod meter;
pub mod scope;
pub mod spectrum;
pub mod theme;
pub mod toast;

use deck_proto::state::{BackendStatus, EngineSnapshot};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use self::toast::ToastManager;

/// Everything one frame of the UI reads.
pub struct View<'a> {
    pub snapshot: &'a EngineSnapshot,
    pub title: &'a str,
    pub position_secs: Option<f64>,
    pub intensity: f32,
    pub toasts: &'a ToastManager,
}

const KEY_HINTS: &str = "space play/pause · s stop · t/T tier · a auto · m mode · +/- zoom · ←/→ pan · ↑/↓ amp · [ ] intensity · q quit";

/// Draw the whole screen and return the oscilloscope area for mouse hit-testing.
pub fn draw(frame: &mut Frame, view: &View) -> Rect {
    let area = frame.area();
    frame.render_widget(Block::default().style(theme::style_default().bg(theme::C_BG)), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Percentage(35),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(header(view)), rows[0]);

    let snap = view.snapshot;
    meter::draw(frame, rows[1], &snap.meter, snap.profile.meter_segment_count);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(24)])
        .split(rows[2]);
    spectrum::draw(frame, middle[0], &snap.spectrum, view.intensity);
    scope::draw_phase(frame, middle[1], &snap.meter.phase_points);

    scope::draw_oscilloscope(frame, rows[3], &snap.scope);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(KEY_HINTS, theme::style_muted()))),
        rows[4],
    );

    view.toasts.draw(frame, area, &snap.warnings);
    rows[3]
}

fn header(view: &View) -> Line<'static> {
    let snap = view.snapshot;
    let (state, state_style) = if snap.playing {
        ("▶ playing", ratatui::style::Style::default().fg(theme::C_PLAYING))
    } else {
        ("■ idle", ratatui::style::Style::default().fg(theme::C_PAUSED))
    };

    let mut spans = vec![
        Span::styled(" sound-viz-lab ", theme::style_accent()),
        Span::styled(state, state_style),
        Span::styled(format!("  {}", view.title), theme::style_default()),
    ];
    if let Some(secs) = view.position_secs {
        spans.push(Span::styled(format!("  {:>6.1}s", secs), theme::style_secondary()));
    }
    spans.push(Span::styled(
        format!(
            "  tier {}{}  {:.0} fps  skip {}",
            snap.profile.tier,
            if snap.auto_adjust { " (auto)" } else { "" },
            snap.performance.average_fps,
            snap.performance.frame_skip
        ),
        theme::style_secondary(),
    ));
    if let BackendStatus::Faulted { reason } = &snap.backend {
        spans.push(Span::styled(format!("  backend: {}", reason), theme::style_accent()));
    }
    Line::from(spans)
}
