//! LED-strip level meters. Segment count follows the active quality profile.

use deck_proto::state::{ChannelLevels, MeterState};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{self, lerp_color};

const LIT: char = '▮';
const UNLIT: char = '┆';
const HOLD: char = '▐';
const GAP: char = ' ';

/// Label column width, e.g. `"L PPM "`.
const LABEL_WIDTH: usize = 6;
/// Numeric readout column width, e.g. `" 100"`.
const READOUT_WIDTH: usize = 4;

struct MeterColors;

impl MeterColors {
    const LOW: Color = Color::Rgb(62, 160, 110);
    const MID: Color = Color::Rgb(210, 190, 70);
    const HIGH: Color = Color::Rgb(214, 80, 50);
    const HOLD: Color = Color::Rgb(214, 120, 50);
    const EMPTY: Color = Color::Rgb(36, 36, 48);

    /// Zone color for a segment position (0.0 = quiet end, 1.0 = loud end).
    fn zone(frac: f32) -> Color {
        if frac < 0.6 {
            lerp_color(Self::LOW, Self::MID, frac / 0.6)
        } else {
            lerp_color(Self::MID, Self::HIGH, (frac - 0.6) / 0.4)
        }
    }
}

/// Build one meter strip for `level` and `hold` in `[0, 100]`.
///
/// `segments` is the desired resolution; it shrinks when `width` cannot fit
/// one character plus a gap per segment.
pub fn build_led_meter(level: f32, hold: f32, segments: usize, width: usize) -> Line<'static> {
    let segments = segments.min(width / 2);
    if segments == 0 {
        return Line::from(vec![]);
    }

    let lit = ((level.clamp(0.0, 100.0) / 100.0) * segments as f32).round() as usize;
    let hold_segment = if hold > 0.5 {
        Some((((hold.clamp(0.0, 100.0) / 100.0) * segments as f32) as usize).min(segments - 1))
    } else {
        None
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_color: Option<Color> = None;
    let mut current_str = String::new();

    let flush = |spans: &mut Vec<Span<'static>>, color: Color, s: String| {
        if !s.is_empty() {
            spans.push(Span::styled(s, Style::default().fg(color)));
        }
    };

    for i in 0..segments {
        let frac = (i as f32 + 0.5) / segments as f32;
        let (ch, color) = if i < lit {
            (LIT, MeterColors::zone(frac))
        } else if Some(i) == hold_segment {
            (HOLD, MeterColors::HOLD)
        } else {
            (UNLIT, MeterColors::EMPTY)
        };

        if current_color != Some(color) {
            if let Some(c) = current_color.take() {
                flush(&mut spans, c, std::mem::take(&mut current_str));
            }
            current_color = Some(color);
        }
        current_str.push(ch);
        current_str.push(GAP);
    }

    if let Some(c) = current_color {
        flush(&mut spans, c, current_str);
    }

    Line::from(spans)
}

fn meter_row(label: &str, level: f32, hold: f32, segments: usize, width: usize) -> Line<'static> {
    let strip_width = width.saturating_sub(LABEL_WIDTH + READOUT_WIDTH);
    let mut spans = vec![Span::styled(
        format!("{:<w$}", label, w = LABEL_WIDTH),
        theme::style_secondary(),
    )];
    spans.extend(build_led_meter(level, hold, segments, strip_width).spans);
    spans.push(Span::styled(
        format!("{:>w$.0}", level, w = READOUT_WIDTH),
        theme::style_muted(),
    ));
    Line::from(spans)
}

fn channel_rows(name: &str, ch: &ChannelLevels, segments: usize, width: usize) -> [Line<'static>; 2] {
    [
        meter_row(&format!("{} VU", name), ch.vu, ch.vu_hold, segments, width),
        meter_row(&format!("{} PPM", name), ch.ppm, ch.ppm_hold, segments, width),
    ]
}

pub fn draw(frame: &mut Frame, area: Rect, meter: &MeterState, segments: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::style_border())
        .title(Span::styled(" levels ", theme::style_secondary()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let mut lines: Vec<Line> = Vec::with_capacity(5);
    lines.extend(channel_rows("L", &meter.left, segments, width));
    lines.extend(channel_rows("R", &meter.right, segments, width));
    lines.push(Line::from(vec![
        Span::styled("loud  ", theme::style_secondary()),
        Span::styled(format!("{:>6.1}", meter.loudness), theme::style_default()),
        Span::styled("   corr ", theme::style_secondary()),
        Span::styled(format!("{:>+5.2}", meter.correlation), theme::style_default()),
    ]));

    frame.render_widget(Paragraph::new(lines), inner);
}
