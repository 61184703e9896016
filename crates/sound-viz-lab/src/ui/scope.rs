//! Chart-based displays: the oscilloscope trace and the phase (X/Y) scope.
//! Both consume engine output that is already normalised to `[-1, 1]`.

use deck_proto::state::{OscilloscopeState, PhasePoint, ScopeMode};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use super::theme::{self, C_PHASE, C_SCOPE, C_SCOPE_AXIS};

pub enum Dimension {
    X,
    Y,
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub scatter: bool,
    pub references: bool,
    pub marker_type: Marker,
    pub color: Color,
    pub axis_color: Color,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            scatter: false,
            references: true,
            marker_type: Marker::Braille,
            color: C_SCOPE,
            axis_color: C_SCOPE_AXIS,
        }
    }
}

pub trait DisplayMode {
    type Input: ?Sized;

    fn axis(&self, cfg: &GraphConfig, dimension: Dimension) -> Axis<'_>;
    fn process(&self, cfg: &GraphConfig, data: &Self::Input) -> Vec<DataSet>;
    fn references(&self, _cfg: &GraphConfig) -> Vec<DataSet> {
        vec![]
    }
}

pub struct DataSet {
    pub data: Vec<(f64, f64)>,
    pub marker_type: Marker,
    pub graph_type: GraphType,
    pub color: Color,
}

impl DataSet {
    pub fn new(data: Vec<(f64, f64)>, marker_type: Marker, graph_type: GraphType, color: Color) -> Self {
        Self {
            data,
            marker_type,
            graph_type,
            color,
        }
    }
}

impl<'a> From<&'a DataSet> for Dataset<'a> {
    fn from(ds: &'a DataSet) -> Dataset<'a> {
        Dataset::default()
            .marker(ds.marker_type)
            .graph_type(ds.graph_type)
            .style(Style::default().fg(ds.color))
            .data(&ds.data)
    }
}

// ── Oscilloscope ──────────────────────────────────────────────────────────────

/// Horizontal trace of the scope display buffer.
pub struct Oscilloscope {
    samples: usize,
}

impl Oscilloscope {
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }
}

impl DisplayMode for Oscilloscope {
    type Input = [f32];

    fn axis(&self, cfg: &GraphConfig, dimension: Dimension) -> Axis<'_> {
        let bounds = match dimension {
            Dimension::X => [0.0, self.samples.max(1) as f64],
            Dimension::Y => [-1.0, 1.0],
        };
        Axis::default()
            .style(Style::default().fg(cfg.axis_color))
            .bounds(bounds)
    }

    fn references(&self, cfg: &GraphConfig) -> Vec<DataSet> {
        vec![DataSet::new(
            vec![(0.0, 0.0), (self.samples as f64, 0.0)],
            cfg.marker_type,
            GraphType::Line,
            cfg.axis_color,
        )]
    }

    fn process(&self, cfg: &GraphConfig, data: &[f32]) -> Vec<DataSet> {
        let pts = data
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as f64, s as f64))
            .collect();
        vec![DataSet::new(
            pts,
            cfg.marker_type,
            if cfg.scatter {
                GraphType::Scatter
            } else {
                GraphType::Line
            },
            cfg.color,
        )]
    }
}

// ── Phase scope ───────────────────────────────────────────────────────────────

/// Left/right pairs plotted as points; a mono signal lies on the diagonal.
pub struct PhaseScope;

impl DisplayMode for PhaseScope {
    type Input = [PhasePoint];

    fn axis(&self, cfg: &GraphConfig, _dimension: Dimension) -> Axis<'_> {
        Axis::default()
            .style(Style::default().fg(cfg.axis_color))
            .bounds([-1.0, 1.0])
    }

    fn references(&self, cfg: &GraphConfig) -> Vec<DataSet> {
        vec![
            DataSet::new(vec![(-1.0, 0.0), (1.0, 0.0)], cfg.marker_type, GraphType::Line, cfg.axis_color),
            DataSet::new(vec![(0.0, -1.0), (0.0, 1.0)], cfg.marker_type, GraphType::Line, cfg.axis_color),
        ]
    }

    fn process(&self, cfg: &GraphConfig, data: &[PhasePoint]) -> Vec<DataSet> {
        let pts = data.iter().map(|p| (p.x as f64, p.y as f64)).collect();
        vec![DataSet::new(pts, cfg.marker_type, GraphType::Scatter, cfg.color)]
    }
}

fn render_chart<M: DisplayMode + ?Sized>(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    mode: &M,
    cfg: &GraphConfig,
    data: &M::Input,
) {
    let mut datasets: Vec<DataSet> = Vec::new();
    if cfg.references {
        datasets.extend(mode.references(cfg));
    }
    datasets.extend(mode.process(cfg, data));

    let ratatui_datasets: Vec<Dataset> = datasets.iter().map(|ds| ds.into()).collect();
    let chart = Chart::new(ratatui_datasets)
        .block(block)
        .x_axis(mode.axis(cfg, Dimension::X))
        .y_axis(mode.axis(cfg, Dimension::Y));
    frame.render_widget(chart, area);
}

fn scope_title(state: &OscilloscopeState) -> String {
    let mut title = format!(" scope · {} · zoom {} · amp {}x ", state.mode, state.zoom, state.amplitude.factor() as u32);
    if state.zoom.is_magnified() {
        title.push_str(&format!("· pan {:.0}% ", state.pan));
    }
    title
}

pub fn draw_oscilloscope(frame: &mut Frame, area: Rect, state: &OscilloscopeState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::style_border())
        .title(Span::styled(scope_title(state), theme::style_secondary()));
    let cfg = GraphConfig {
        scatter: state.mode == ScopeMode::Freq,
        ..GraphConfig::default()
    };
    let osc = Oscilloscope::new(state.display.len());
    render_chart(frame, area, block, &osc, &cfg, state.display.as_slice());
}

pub fn draw_phase(frame: &mut Frame, area: Rect, points: &[PhasePoint]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::style_border())
        .title(Span::styled(" phase ", theme::style_secondary()));
    let cfg = GraphConfig {
        color: C_PHASE,
        marker_type: Marker::Dot,
        ..GraphConfig::default()
    };
    render_chart(frame, area, block, &PhaseScope, &cfg, points);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oscilloscope_plots_every_sample() {
        let osc = Oscilloscope::new(4);
        let sets = osc.process(&GraphConfig::default(), &[0.0, 0.5, -0.5, 1.0]);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].data, vec![(0.0, 0.0), (1.0, 0.5), (2.0, -0.5), (3.0, 1.0)]);
        assert_eq!(sets[0].graph_type, GraphType::Line);
    }

    #[test]
    fn test_reference_spans_display() {
        let osc = Oscilloscope::new(256);
        let refs = osc.references(&GraphConfig::default());
        assert_eq!(refs[0].data, vec![(0.0, 0.0), (256.0, 0.0)]);
    }

    #[test]
    fn test_phase_points_are_scattered() {
        let pts = [PhasePoint { x: 0.25, y: -0.5 }];
        let sets = PhaseScope.process(&GraphConfig::default(), &pts);
        assert_eq!(sets[0].graph_type, GraphType::Scatter);
        assert_eq!(sets[0].data, vec![(0.25, -0.5)]);
    }

    #[test]
    fn test_title_shows_pan_only_when_magnified() {
        let mut state = OscilloscopeState::new(8);
        assert!(!scope_title(&state).contains("pan"));
        state.zoom = deck_proto::state::ZoomLevel::X4;
        state.pan = 40.0;
        assert!(scope_title(&state).contains("pan 40%"));
    }
}
