use ratatui::{
    prelude::Buffer,
    prelude::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::interpolate::InterpolatedField;

/// Gutter on the left for elevation ticks and the axis label.
const Y_GUTTER: u16 = 10;
/// Rows under the plot for azimuth ticks and the axis label.
const X_GUTTER: u16 = 2;
const MARKER: &str = "•";

/// Heatmap of an interpolated field with the raw samples drawn on top.
///
/// Each terminal cell shows the grid node nearest to its centre. Nodes with
/// no value leave the cell untouched.
#[derive(Debug, Clone, Copy)]
pub struct Heatmap<'a> {
    pub field: &'a InterpolatedField,
}

impl Widget for &Heatmap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width <= Y_GUTTER || area.height <= X_GUTTER {
            return;
        }
        let plot = Rect {
            x: area.x + Y_GUTTER,
            y: area.y,
            width: area.width - Y_GUTTER,
            height: area.height - X_GUTTER,
        };
        let field = self.field;
        let res = field.resolution();
        let range = field.value_range();

        for y in 0..plot.height {
            // terminal rows grow downward, elevation grows upward
            let row = cell_to_node(plot.height - 1 - y, plot.height, res);
            for x in 0..plot.width {
                let col = cell_to_node(x, plot.width, res);
                let Some(value) = field.get(col, row) else {
                    continue;
                };
                buf.set_string(
                    plot.x + x,
                    plot.y + y,
                    " ",
                    Style::default().bg(heatmap_color(normalize(value, range))),
                );
            }
        }

        let b = field.bounds;
        for &(az, el) in &field.points {
            let x = position_to_cell(az, b.az_min, b.az_max, plot.width);
            let y = plot.height - 1 - position_to_cell(el, b.el_min, b.el_max, plot.height);
            buf.set_string(
                plot.x + x,
                plot.y + y,
                MARKER,
                Style::default().fg(Color::White),
            );
        }

        // Axes
        let label = Style::default().fg(Color::Gray);
        buf.set_stringn(area.x, plot.y, tick(b.el_max), Y_GUTTER as usize - 1, label);
        buf.set_stringn(
            area.x,
            plot.y + plot.height - 1,
            tick(b.el_min),
            Y_GUTTER as usize - 1,
            label,
        );
        if plot.height > 2 {
            buf.set_string(area.x, plot.y + plot.height / 2, "Elevation", label);
        }

        let ticks_y = plot.y + plot.height;
        let max_label = tick(b.az_max);
        buf.set_string(plot.x, ticks_y, tick(b.az_min), label);
        let right = (plot.x + plot.width).saturating_sub(max_label.len() as u16);
        buf.set_string(right.max(plot.x), ticks_y, &max_label, label);
        let title = "Azimuth";
        let centre = plot.x + plot.width.saturating_sub(title.len() as u16) / 2;
        buf.set_string(centre, ticks_y + 1, title, label);
    }
}

/// Vertical colour scale, max at the top.
#[derive(Debug, Clone, Copy)]
pub struct Colorbar {
    pub range: Option<(f64, f64)>,
}

impl Widget for &Colorbar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 4 || area.width < 2 {
            return;
        }
        let label = Style::default().fg(Color::Gray);
        buf.set_stringn(area.x, area.y, "Power", area.width as usize, label);
        let Some((lo, hi)) = self.range else {
            return;
        };

        let strip_top = area.y + 2;
        let strip_height = area.height - 3;
        buf.set_stringn(area.x, area.y + 1, tick(hi), area.width as usize, label);
        for i in 0..strip_height {
            let t = if strip_height == 1 {
                0.5
            } else {
                1.0 - i as f64 / (strip_height - 1) as f64
            };
            buf.set_string(
                area.x,
                strip_top + i,
                "  ",
                Style::default().bg(heatmap_color(t)),
            );
        }
        buf.set_stringn(
            area.x,
            area.y + area.height - 1,
            tick(lo),
            area.width as usize,
            label,
        );
    }
}

fn tick(v: f64) -> String {
    format!("{v:.1}")
}

/// Terminal cell index -> nearest grid node index.
fn cell_to_node(cell: u16, cells: u16, nodes: usize) -> usize {
    let t = (cell as f64 + 0.5) / cells as f64;
    ((t * nodes as f64) as usize).min(nodes - 1)
}

/// Axis coordinate -> terminal cell index, centred on a flat axis.
fn position_to_cell(v: f64, min: f64, max: f64, cells: u16) -> u16 {
    if max <= min {
        return cells / 2;
    }
    let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
    (t * (cells - 1) as f64).round() as u16
}

/// Scale `v` into 0..=1 across the field's value range.
fn normalize(v: f64, range: Option<(f64, f64)>) -> f64 {
    match range {
        Some((lo, hi)) if hi > lo => ((v - lo) / (hi - lo)).clamp(0.0, 1.0),
        _ => 0.5,
    }
}

// Viridis-like stops, low -> high.
const STOPS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

pub fn heatmap_color(t: f64) -> Color {
    // Bucket into 50 steps so neighbouring cells don't shimmer.
    let bucket = ((t.clamp(0.0, 1.0) * 100.0) as u8 / 2) * 2;
    let t = bucket as f64 / 100.0;

    let scaled = t * (STOPS.len() - 1) as f64;
    let i = (scaled as usize).min(STOPS.len() - 2);
    let f = scaled - i as f64;
    let (r0, g0, b0) = STOPS[i];
    let (r1, g1, b1) = STOPS[i + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;

    Color::Rgb(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}
