//! Planar geometry for route interaction and sector metrics.
//!
//! All coordinates are in nautical miles on a local flat projection.

use crate::models::{Flightpath, Point, Segment};
use std::collections::BTreeMap;

/// Check whether `p` lies on `segment`, within `eps` nautical miles.
///
/// The test compares the segment length against the two-leg distance
/// through `p`, so it checks betweenness and collinearity at once. A point
/// collinear with the segment but beyond either end fails.
pub fn point_on_segment(p: Point, segment: &Segment, eps: f64) -> bool {
    let ab = segment.start.distance(segment.end);
    let ap = segment.start.distance(p);
    let pb = p.distance(segment.end);
    (ab - (ap + pb)).abs() < eps
}

/// Intersection point of the finite segments `p0-p1` and `p2-p3`.
///
/// Parallel and collinear segments (overlapping or not) never intersect
/// here; shared sub-segments are found by the overlap detector instead.
/// When the segments share an endpoint, that endpoint is returned exactly.
pub fn segment_intersection(p0: Point, p1: Point, p2: Point, p3: Point) -> Option<Point> {
    let s10 = p0.vector_to(p1);
    let s32 = p2.vector_to(p3);

    let denom = s10.0 * s32.1 - s32.0 * s10.1;
    if denom == 0.0 || denom.is_nan() {
        return None;
    }

    for shared in [p0, p1] {
        if shared == p2 || shared == p3 {
            return Some(shared);
        }
    }

    let s02 = (p0.x - p2.x, p0.y - p2.y);

    // s runs along p2-p3, t along p0-p1; both ends are inclusive
    let s = (s10.0 * s02.1 - s10.1 * s02.0) / denom;
    let t = (s32.0 * s02.1 - s32.1 * s02.0) / denom;
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
        return None;
    }

    if t == 0.0 {
        return Some(p0);
    }
    if t == 1.0 {
        return Some(p1);
    }
    if s == 0.0 {
        return Some(p2);
    }
    if s == 1.0 {
        return Some(p3);
    }
    Some(Point::new(p0.x + t * s10.0, p0.y + t * s10.1))
}

/// Unsigned angle between two vectors, in radians within `[0, π]`.
///
/// A zero-length vector yields NaN.
pub fn angle_between(v1: (f64, f64), v2: (f64, f64)) -> f64 {
    let n1 = v1.0.hypot(v1.1);
    let n2 = v2.0.hypot(v2.1);
    let dot = (v1.0 / n1) * (v2.0 / n2) + (v1.1 / n1) * (v2.1 / n2);
    dot.clamp(-1.0, 1.0).acos()
}

/// Minimum distance from a point to a segment.
pub fn distance_to_segment(p: Point, segment: &Segment) -> f64 {
    let (sx, sy) = segment.direction();
    let (px, py) = segment.start.vector_to(p);

    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < f64::EPSILON {
        // Segment is essentially a point
        return p.distance(segment.start);
    }

    // Project onto the segment: t = ((P-A) · (B-A)) / |B-A|²
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    let dx = px - t * sx;
    let dy = py - t * sy;
    (dx * dx + dy * dy).sqrt()
}

/// Distance from `p` to the nearest of `edges`. NaN for NaN positions or no edges.
pub fn distance_to_edges(p: Point, edges: impl IntoIterator<Item = Segment>) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    edges
        .into_iter()
        .map(|edge| distance_to_segment(p, &edge))
        .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
        .unwrap_or(f64::NAN)
}

/// Even-odd point-in-polygon test over an open vertex ring.
///
/// Points within `tolerance` of the boundary count as outside.
pub fn point_in_polygon(p: Point, vertices: &[Point], tolerance: f64) -> bool {
    if p.is_nan() || vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    if !inside {
        return false;
    }

    let n = vertices.len();
    let edges = (0..n).map(|i| Segment::new(vertices[i], vertices[(i + 1) % n]));
    distance_to_edges(p, edges) > tolerance
}

/// Distance from `p` to the nearest point of `points`, `None` when empty.
pub fn nearest_distance(p: Point, points: &[Point]) -> Option<f64> {
    points
        .iter()
        .map(|candidate| p.distance(*candidate))
        .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
}

/// Crossing points between every pair of standard routes.
///
/// For each unordered pair only the first interaction in route order is
/// kept: segments shared in either sense are skipped, a shared waypoint is
/// taken as the crossing point, otherwise the segment intersection is used.
pub fn standard_crossing_points(
    routes: &BTreeMap<String, Flightpath>,
) -> BTreeMap<(String, String), Point> {
    let named: Vec<(&String, &Flightpath)> = routes.iter().collect();
    let mut out = BTreeMap::new();
    for (i, (name1, route1)) in named.iter().enumerate() {
        for (name2, route2) in &named[i + 1..] {
            if let Some(point) = first_route_crossing(route1, route2) {
                out.insert(((*name1).clone(), (*name2).clone()), point);
            }
        }
    }
    out
}

fn first_route_crossing(route1: &Flightpath, route2: &Flightpath) -> Option<Point> {
    for a in route1.segments() {
        for b in route2.segments() {
            if (a.start == b.start && a.end == b.end) || (a.start == b.end && a.end == b.start) {
                continue;
            }
            if a.start == b.start || a.start == b.end {
                return Some(a.start);
            }
            if a.end == b.start || a.end == b.end {
                return Some(a.end);
            }
            if let Some(point) = segment_intersection(a.start, a.end, b.start, b.end) {
                return Some(point);
            }
        }
    }
    None
}
