use serde::{Deserialize, Serialize};

use crate::core::error::MalformedGeometry;

/// Tolerance for treating two coordinates as the same vertex.
pub const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Tight box around a point sequence. `None` for an empty sequence.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().skip(1).fold(init, |acc, p| Self {
            x0: acc.x0.min(p.x),
            y0: acc.y0.min(p.y),
            x1: acc.x1.max(p.x),
            y1: acc.y1.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Clockwise (in image coordinates) 4-point polygon, starting top-left.
    pub fn to_polygon(&self) -> Vec<Point> {
        vec![
            Point::new(self.x0, self.y0),
            Point::new(self.x1, self.y0),
            Point::new(self.x1, self.y1),
            Point::new(self.x0, self.y1),
        ]
    }
}

/// Drops consecutive repeated vertices, including a closing vertex that
/// repeats the first one.
pub fn dedup_vertices(points: &[Point]) -> Vec<Point> {
    let same = |a: &Point, b: &Point| (a.x - b.x).abs() <= EPSILON && (a.y - b.y).abs() <= EPSILON;
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().map_or(true, |last| !same(last, p)) {
            out.push(*p);
        }
    }
    while out.len() > 1 && same(&out[0], &out[out.len() - 1]) {
        out.pop();
    }
    out
}

/// Arithmetic mean of the vertices.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Shoelace area, orientation independent.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice = edges(points).fold(0.0, |acc, (a, b)| acc + (a.x * b.y - b.x * a.y));
    (twice * 0.5).abs()
}

pub fn all_identical(points: &[Point]) -> bool {
    match points.first() {
        Some(first) => points
            .iter()
            .all(|p| (p.x - first.x).abs() <= EPSILON && (p.y - first.y).abs() <= EPSILON),
        None => true,
    }
}

/// Even-odd ray casting. Points exactly on an edge may land on either side;
/// callers that care use [`buffered_contains`].
pub fn contains_point(points: &[Point], p: Point) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in edges(points) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= EPSILON * EPSILON {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// Minimum distance from `p` to the polygon outline (closing edge included).
pub fn distance_to_boundary(points: &[Point], p: Point) -> f64 {
    match points.len() {
        0 => f64::INFINITY,
        1 => p.distance(&points[0]),
        _ => edges(points)
            .map(|(a, b)| distance_to_segment(p, a, b))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Membership test against the polygon grown outward by `buffer` (Minkowski
/// sum with a disc). The polygon itself is never modified.
pub fn buffered_contains(points: &[Point], p: Point, buffer: f64) -> bool {
    contains_point(points, p) || distance_to_boundary(points, p) <= buffer.max(0.0)
}

/// Distance from `p` to the outline of the buffered polygon; 0 when inside.
pub fn buffered_distance(points: &[Point], p: Point, buffer: f64) -> f64 {
    if contains_point(points, p) {
        return 0.0;
    }
    (distance_to_boundary(points, p) - buffer.max(0.0)).max(0.0)
}

/// True when two non-adjacent edges touch or cross.
pub fn is_self_intersecting(points: &[Point]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (points[i], points[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// Validates a region outline: enough vertices, a well-defined non-zero area.
pub fn validate_region_polygon(points: &[Point]) -> Result<(), MalformedGeometry> {
    if points.len() < 3 {
        return Err(MalformedGeometry::TooFewPoints {
            count: points.len(),
        });
    }
    if is_self_intersecting(points) {
        return Err(MalformedGeometry::SelfIntersecting);
    }
    if polygon_area(points) <= EPSILON {
        return Err(MalformedGeometry::ZeroArea);
    }
    Ok(())
}

/// Validates a token outline. Collinear tokens still have a usable centroid,
/// so only the fully collapsed case is rejected besides short polygons.
pub fn validate_token_polygon(points: &[Point]) -> Result<(), MalformedGeometry> {
    if points.len() < 3 {
        return Err(MalformedGeometry::TooFewPoints {
            count: points.len(),
        });
    }
    if all_identical(points) {
        return Err(MalformedGeometry::ZeroArea);
    }
    Ok(())
}

fn edges(points: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
        && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
    {
        return true;
    }

    (d1.abs() <= EPSILON && on_segment(b1, b2, a1))
        || (d2.abs() <= EPSILON && on_segment(b1, b2, a2))
        || (d3.abs() <= EPSILON && on_segment(a1, a2, b1))
        || (d4.abs() <= EPSILON && on_segment(a1, a2, b2))
}
