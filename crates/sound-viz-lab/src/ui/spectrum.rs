use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{self, lerp_color, C_SPECTRUM_HIGH, C_SPECTRUM_LOW};

/// Partial blocks for sub-cell precision [1/8, 2/8, ..., 7/8].
const FRACTIONAL: [char; 7] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇'];
const FULL: char = '█';

/// Value shown by screen column `x` when `values` is stretched or squeezed
/// across `width` columns.
fn column_value(values: &[f32], x: usize, width: usize) -> f32 {
    if values.is_empty() || width == 0 {
        return 0.0;
    }
    let idx = x * values.len() / width;
    values[idx.min(values.len() - 1)]
}

/// Render spectrum columns (each in `[0, 100]`) as vertical bars, top row first.
pub fn bar_lines(values: &[f32], width: usize, height: usize) -> Vec<Line<'static>> {
    let eighths: Vec<usize> = (0..width)
        .map(|x| {
            let v = column_value(values, x, width).clamp(0.0, 100.0);
            (v / 100.0 * (height * 8) as f32).round() as usize
        })
        .collect();

    (0..height)
        .map(|row| {
            // Rows count up from the bottom.
            let level = height - 1 - row;
            let color = lerp_color(C_SPECTRUM_LOW, C_SPECTRUM_HIGH, level as f32 / height.max(1) as f32);
            let text: String = eighths
                .iter()
                .map(|&e| {
                    let filled = e.saturating_sub(level * 8);
                    match filled {
                        0 => ' ',
                        f if f >= 8 => FULL,
                        f => FRACTIONAL[f - 1],
                    }
                })
                .collect();
            Line::from(Span::styled(text, Style::default().fg(color)))
        })
        .collect()
}

pub fn draw(frame: &mut Frame, area: Rect, values: &[f32], intensity: f32) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::style_border())
        .title(Span::styled(
            format!(" spectrum · {} bars · x{:.2} ", values.len(), intensity),
            theme::style_secondary(),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = bar_lines(values, inner.width as usize, inner.height as usize);
    frame.render_widget(Paragraph::new(lines), inner);
}
