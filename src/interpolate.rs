//! Scattered (azimuth, elevation, power) samples -> regular grid.
//!
//! Linear interpolation over a Delaunay triangulation of the sample
//! positions. Grid nodes outside the convex hull carry no value. Samples that
//! all sit on one line cannot be triangulated; those fall back to 1-D linear
//! interpolation along the line.

use std::collections::HashMap;

use delaunator::{Point, triangulate};
use thiserror::Error;

use crate::sample::Sample;

/// Grid points per axis unless overridden on the command line.
pub const DEFAULT_RESOLUTION: usize = 100;

/// Fewer samples than this cannot be plotted.
pub const MIN_SAMPLES: usize = 2;

// Barycentric slack so nodes on hull edges and vertices are kept.
const EPS: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpolateError {
    #[error("not enough data to plot ({found} sample(s), need at least {min})", min = MIN_SAMPLES)]
    InsufficientData { found: usize },
}

/// Axis extents of a grid, taken from the samples' min/max.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub az_min: f64,
    pub az_max: f64,
    pub el_min: f64,
    pub el_max: f64,
}

impl Bounds {
    fn of(samples: &[Sample]) -> Self {
        samples.iter().fold(
            Bounds {
                az_min: f64::INFINITY,
                az_max: f64::NEG_INFINITY,
                el_min: f64::INFINITY,
                el_max: f64::NEG_INFINITY,
            },
            |b, s| Bounds {
                az_min: b.az_min.min(s.azimuth),
                az_max: b.az_max.max(s.azimuth),
                el_min: b.el_min.min(s.elevation),
                el_max: b.el_max.max(s.elevation),
            },
        )
    }

    pub fn az_span(&self) -> f64 {
        self.az_max - self.az_min
    }

    pub fn el_span(&self) -> f64 {
        self.el_max - self.el_min
    }
}

/// Power on a `resolution x resolution` grid, row 0 at `el_min`.
///
/// Built fresh on every refresh and handed to the render sink by value.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedField {
    pub bounds: Bounds,
    /// Raw sample positions for the scatter overlay, in file order.
    pub points: Vec<(f64, f64)>,
    /// True when the samples were collinear and the line fallback was used.
    pub degenerate: bool,
    resolution: usize,
    values: Vec<Option<f64>>,
}

impl InterpolatedField {
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Value at azimuth index `col`, elevation index `row`.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.resolution || row >= self.resolution {
            return None;
        }
        self.values[row * self.resolution + col]
    }

    /// Min and max over nodes that carry a value.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    pub fn filled(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: f64,
    y: f64,
    v: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GridInterpolator {
    resolution: usize,
}

impl Default for GridInterpolator {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl GridInterpolator {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution: resolution.max(1),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn interpolate(&self, samples: &[Sample]) -> Result<InterpolatedField, InterpolateError> {
        if samples.len() < MIN_SAMPLES {
            return Err(InterpolateError::InsufficientData {
                found: samples.len(),
            });
        }

        let bounds = Bounds::of(samples);
        let az = linspace(bounds.az_min, bounds.az_max, self.resolution);
        let el = linspace(bounds.el_min, bounds.el_max, self.resolution);
        let nodes = merge_duplicates(samples);

        let mut values = vec![None; self.resolution * self.resolution];
        let filled_by_triangles = nodes.len() >= 3 && fill_triangles(&nodes, &az, &el, &mut values);
        if !filled_by_triangles {
            fill_along_line(&nodes, &bounds, &az, &el, &mut values);
        }

        Ok(InterpolatedField {
            bounds,
            points: samples.iter().map(Sample::position).collect(),
            degenerate: !filled_by_triangles,
            resolution: self.resolution,
            values,
        })
    }
}

/// `n` evenly spaced values from `min` to `max` inclusive.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
            out[n - 1] = max;
            out
        }
    }
}

/// Collapse samples sharing an exact (azimuth, elevation) into one node with
/// the mean power. Nodes keep first-occurrence order.
fn merge_duplicates(samples: &[Sample]) -> Vec<Node> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::with_capacity(samples.len());
    let mut sums: Vec<(Node, usize)> = Vec::with_capacity(samples.len());

    for s in samples {
        // + 0.0 folds -0.0 into 0.0 so both land on the same key
        let key = ((s.azimuth + 0.0).to_bits(), (s.elevation + 0.0).to_bits());
        match index.get(&key) {
            Some(&i) => {
                sums[i].0.v += s.power;
                sums[i].1 += 1;
            }
            None => {
                index.insert(key, sums.len());
                sums.push((
                    Node {
                        x: s.azimuth,
                        y: s.elevation,
                        v: s.power,
                    },
                    1,
                ));
            }
        }
    }

    sums.into_iter()
        .map(|(mut n, count)| {
            n.v /= count as f64;
            n
        })
        .collect()
}

/// Index range of `axis` values inside `[lo, hi]` (with slack).
fn axis_range(axis: &[f64], lo: f64, hi: f64) -> std::ops::Range<usize> {
    let span = (axis[axis.len() - 1] - axis[0]).abs().max(1.0);
    let slack = EPS * span;
    let start = axis.partition_point(|&v| v < lo - slack);
    let end = axis.partition_point(|&v| v <= hi + slack);
    start..end.max(start)
}

/// Barycentric fill over the Delaunay triangles. Returns false when the
/// points are collinear and no triangle exists.
fn fill_triangles(nodes: &[Node], az: &[f64], el: &[f64], values: &mut [Option<f64>]) -> bool {
    let points: Vec<Point> = nodes.iter().map(|n| Point { x: n.x, y: n.y }).collect();
    let triangulation = triangulate(&points);
    if triangulation.triangles.is_empty() {
        return false;
    }

    let width = az.len();
    for t in triangulation.triangles.chunks_exact(3) {
        let (a, b, c) = (nodes[t[0]], nodes[t[1]], nodes[t[2]]);
        let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if det == 0.0 {
            continue;
        }

        let cols = axis_range(az, a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x));
        let rows = axis_range(el, a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y));
        for row in rows {
            let py = el[row];
            for col in cols.clone() {
                let slot = &mut values[row * width + col];
                if slot.is_some() {
                    continue;
                }
                let px = az[col];
                let l1 = ((b.y - c.y) * (px - c.x) + (c.x - b.x) * (py - c.y)) / det;
                let l2 = ((c.y - a.y) * (px - c.x) + (a.x - c.x) * (py - c.y)) / det;
                let l3 = 1.0 - l1 - l2;
                if l1 >= -EPS && l2 >= -EPS && l3 >= -EPS {
                    *slot = Some(l1 * a.v + l2 * b.v + l3 * c.v);
                }
            }
        }
    }
    true
}

/// 1-D fallback for collinear samples: interpolate along the line through
/// them, leave nodes off the segment empty.
fn fill_along_line(
    nodes: &[Node],
    bounds: &Bounds,
    az: &[f64],
    el: &[f64],
    values: &mut [Option<f64>],
) {
    let origin = nodes[0];
    let far = nodes
        .iter()
        .copied()
        .max_by(|p, q| {
            let dp = (p.x - origin.x).hypot(p.y - origin.y);
            let dq = (q.x - origin.x).hypot(q.y - origin.y);
            dp.total_cmp(&dq)
        })
        .unwrap_or(origin);
    let length = (far.x - origin.x).hypot(far.y - origin.y);

    if length == 0.0 {
        // every sample at one position
        values.iter_mut().for_each(|v| *v = Some(origin.v));
        return;
    }

    let (dx, dy) = ((far.x - origin.x) / length, (far.y - origin.y) / length);
    let mut along: Vec<(f64, f64)> = nodes
        .iter()
        .map(|n| ((n.x - origin.x) * dx + (n.y - origin.y) * dy, n.v))
        .collect();
    along.sort_by(|p, q| p.0.total_cmp(&q.0));

    let slack = EPS * bounds.az_span().max(bounds.el_span());
    let (t_first, t_last) = (along[0].0, along[along.len() - 1].0);
    let width = az.len();

    for (row, &py) in el.iter().enumerate() {
        for (col, &px) in az.iter().enumerate() {
            let (rx, ry) = (px - origin.x, py - origin.y);
            let off_line = (rx * dy - ry * dx).abs();
            let t = rx * dx + ry * dy;
            if off_line > slack || t < t_first - slack || t > t_last + slack {
                continue;
            }
            let t = t.clamp(t_first, t_last);
            let upper = along.partition_point(|&(s, _)| s < t).min(along.len() - 1);
            let value = if upper == 0 {
                along[0].1
            } else {
                let (t0, v0) = along[upper - 1];
                let (t1, v1) = along[upper];
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            };
            values[row * width + col] = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(power: f64, azimuth: f64, elevation: f64) -> Sample {
        Sample::new(0.0, power, azimuth, elevation)
    }

    fn square() -> Vec<Sample> {
        vec![
            s(1.0, 0.0, 0.0),
            s(2.0, 10.0, 0.0),
            s(3.0, 0.0, 10.0),
            s(4.0, 10.0, 10.0),
        ]
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fewer_than_two_samples_is_insufficient() {
        let interp = GridInterpolator::default();
        assert_eq!(
            interp.interpolate(&[]),
            Err(InterpolateError::InsufficientData { found: 0 })
        );
        assert_eq!(
            interp.interpolate(&[s(1.0, 0.0, 0.0)]),
            Err(InterpolateError::InsufficientData { found: 1 })
        );
    }

    #[test]
    fn four_corner_scan_fills_the_whole_grid() {
        let field = GridInterpolator::default().interpolate(&square()).unwrap();

        assert_eq!(field.resolution(), 100);
        assert_eq!(
            field.bounds,
            Bounds {
                az_min: 0.0,
                az_max: 10.0,
                el_min: 0.0,
                el_max: 10.0
            }
        );
        assert!(!field.degenerate);
        assert_eq!(field.filled(), 100 * 100);

        assert!(close(field.get(0, 0).unwrap(), 1.0));
        assert!(close(field.get(99, 0).unwrap(), 2.0));
        assert!(close(field.get(0, 99).unwrap(), 3.0));
        assert!(close(field.get(99, 99).unwrap(), 4.0));
    }

    #[test]
    fn interior_is_linear_blend() {
        // The four corners lie on the plane p = 1 + az/10 + el/5, which any
        // triangulation reproduces exactly.
        let field = GridInterpolator::default().interpolate(&square()).unwrap();
        let az = linspace(0.0, 10.0, 100);
        let el = linspace(0.0, 10.0, 100);
        for row in (0..100).step_by(7) {
            for col in (0..100).step_by(11) {
                let expected = 1.0 + az[col] / 10.0 + el[row] / 5.0;
                assert!(close(field.get(col, row).unwrap(), expected));
            }
        }
    }

    #[test]
    fn bounds_match_sample_extremes() {
        let samples = vec![
            s(1.0, 93.5, 12.0),
            s(2.0, 181.25, 5.5),
            s(3.0, 120.0, 64.0),
            s(4.0, 140.0, 30.0),
        ];
        let field = GridInterpolator::new(17).interpolate(&samples).unwrap();

        assert_eq!(field.bounds.az_min, 93.5);
        assert_eq!(field.bounds.az_max, 181.25);
        assert_eq!(field.bounds.el_min, 5.5);
        assert_eq!(field.bounds.el_max, 64.0);
    }

    #[test]
    fn outside_hull_has_no_value() {
        let samples = vec![s(1.0, 0.0, 0.0), s(2.0, 10.0, 0.0), s(3.0, 0.0, 10.0)];
        let field = GridInterpolator::new(11).interpolate(&samples).unwrap();

        // Grid step is 1.0; the hull is az + el <= 10.
        for row in 0..11 {
            for col in 0..11 {
                let value = field.get(col, row);
                if col + row > 10 {
                    assert_eq!(value, None, "node ({col}, {row}) was extrapolated");
                } else {
                    assert!(value.is_some(), "node ({col}, {row}) missing");
                }
            }
        }
    }

    #[test]
    fn interpolation_is_repeatable() {
        let samples = vec![
            s(-60.0, 90.0, 5.0),
            s(-55.0, 95.0, 7.0),
            s(-52.0, 100.0, 5.0),
            s(-48.0, 92.0, 12.0),
            s(-50.0, 99.0, 11.0),
        ];
        let interp = GridInterpolator::default();
        assert_eq!(
            interp.interpolate(&samples).unwrap(),
            interp.interpolate(&samples).unwrap()
        );
    }

    #[test]
    fn duplicate_positions_are_averaged() {
        let samples = vec![
            s(1.0, 0.0, 0.0),
            s(2.0, 10.0, 0.0),
            s(3.0, 0.0, 10.0),
            s(5.0, 0.0, 0.0),
        ];
        let field = GridInterpolator::new(11).interpolate(&samples).unwrap();

        assert!(close(field.get(0, 0).unwrap(), 3.0));
        // Raw overlay keeps every row, duplicates included.
        assert_eq!(field.points.len(), 4);
    }

    #[test]
    fn constant_azimuth_interpolates_along_elevation() {
        let samples = vec![s(1.0, 45.0, 0.0), s(3.0, 45.0, 10.0), s(2.0, 45.0, 5.0)];
        let field = GridInterpolator::new(11).interpolate(&samples).unwrap();

        assert!(field.degenerate);
        assert_eq!((field.bounds.az_min, field.bounds.az_max), (45.0, 45.0));
        assert_eq!(field.filled(), 11 * 11);
        assert!(close(field.get(0, 0).unwrap(), 1.0));
        assert!(close(field.get(7, 5).unwrap(), 2.0));
        assert!(close(field.get(3, 10).unwrap(), 3.0));
        assert!(close(field.get(0, 8).unwrap(), 2.6));
    }

    #[test]
    fn constant_elevation_interpolates_along_azimuth() {
        let samples = vec![s(0.0, 100.0, 20.0), s(10.0, 200.0, 20.0)];
        let field = GridInterpolator::new(11).interpolate(&samples).unwrap();

        assert!(field.degenerate);
        assert!(close(field.get(4, 3).unwrap(), 4.0));
    }

    #[test]
    fn diagonal_line_leaves_off_line_nodes_empty() {
        let samples = vec![s(0.0, 0.0, 0.0), s(10.0, 10.0, 10.0)];
        let field = GridInterpolator::new(11).interpolate(&samples).unwrap();

        assert!(close(field.get(6, 6).unwrap(), 6.0));
        assert_eq!(field.get(6, 5), None);
        assert_eq!(field.filled(), 11);
    }

    #[test]
    fn single_position_fills_with_mean() {
        let samples = vec![s(2.0, 7.0, 7.0), s(4.0, 7.0, 7.0)];
        let field = GridInterpolator::default().interpolate(&samples).unwrap();

        assert!(field.degenerate);
        assert_eq!(field.value_range(), Some((3.0, 3.0)));
    }

    #[test]
    fn linspace_is_inclusive() {
        assert_eq!(linspace(0.0, 10.0, 3), vec![0.0, 5.0, 10.0]);
        assert_eq!(linspace(4.0, 9.0, 1), vec![4.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
