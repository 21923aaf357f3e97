//! Static route interactions between two flightpaths.
//!
//! Every segment of one flightpath is tested against every segment of the
//! other, in route order. Shared sub-segments become overlaps (merged into
//! maximal runs afterwards) and single intersection points become crossings.

use crate::models::{Flightpath, Point, Segment};
use crate::rules::ConflictParams;
use crate::spatial::{angle_between, point_on_segment, segment_intersection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Segment indices `(first, second)` of the two flightpaths being compared.
///
/// Ordering matches the detector's traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentPair {
    pub first: usize,
    pub second: usize,
}

impl SegmentPair {
    pub const fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }
}

/// Single intersection point of two flightpaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub point: Point,
    /// Angle between the incoming directions of both routes, in degrees
    pub angle_deg: f64,
}

/// Shared stretch of route between two flightpaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    /// Entry waypoint of the shared stretch
    pub start: Point,
    /// Exit waypoint of the shared stretch
    pub end: Point,
}

/// All crossings and merged overlaps between two flightpaths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interactions {
    pub crossings: BTreeMap<SegmentPair, Crossing>,
    pub overlaps: BTreeMap<SegmentPair, Overlap>,
}

impl Interactions {
    pub fn is_empty(&self) -> bool {
        self.crossings.is_empty() && self.overlaps.is_empty()
    }
}

/// Find every crossing and overlap between `path1` and `path2`.
///
/// Aircraft assigned to the same standard flow (`same_route`) can only
/// overlap, so crossings are not searched for them.
pub fn detect_interactions(
    path1: &Flightpath,
    path2: &Flightpath,
    same_route: bool,
    params: &ConflictParams,
) -> Interactions {
    let mut crossings: BTreeMap<SegmentPair, Crossing> = BTreeMap::new();
    let mut overlaps: BTreeMap<SegmentPair, Overlap> = BTreeMap::new();

    for (i, s1) in path1.segments().enumerate() {
        for (j, s2) in path2.segments().enumerate() {
            let key = SegmentPair::new(i, j);

            if let Some(overlap) = segment_overlap(&s1, &s2, params.eps_route_nm) {
                overlaps.insert(key, overlap);
            }

            if same_route {
                continue;
            }

            let Some(point) = segment_intersection(s1.start, s1.end, s2.start, s2.end) else {
                continue;
            };
            if crossings.values().any(|crossing| crossing.point == point) {
                continue;
            }

            let v1 = incoming_vector(path1, i, point);
            let v2 = incoming_vector(path2, j, point);
            crossings.insert(
                key,
                Crossing {
                    point,
                    angle_deg: angle_between(v1, v2).to_degrees(),
                },
            );
        }
    }

    Interactions {
        crossings,
        overlaps: merge_overlaps(&overlaps),
    }
}

/// Shared stretch of two segments, if any.
fn segment_overlap(s1: &Segment, s2: &Segment, eps: f64) -> Option<Overlap> {
    let p1a_in = point_on_segment(s1.start, s2, eps);
    let p1b_in = point_on_segment(s1.end, s2, eps);
    let p2a_in = point_on_segment(s2.start, s1, eps);
    let p2b_in = point_on_segment(s2.end, s1, eps);

    if p1a_in && p1b_in && p2a_in && p2b_in {
        let shorter = if s2.length() < s1.length() { s2 } else { s1 };
        return Some(Overlap {
            start: shorter.start,
            end: shorter.end,
        });
    }

    // Partial containment: prefer the first path's endpoint when both
    // corresponding endpoints are contained.
    let start = if p1a_in {
        s1.start
    } else if p2a_in {
        s2.start
    } else {
        return None;
    };
    let end = if p1b_in {
        s1.end
    } else if p2b_in {
        s2.end
    } else {
        return None;
    };

    (start != end).then_some(Overlap { start, end })
}

/// Direction a route arrives from, as a vector from the crossing point.
///
/// When the segment starts exactly at the crossing point the previous
/// waypoint is used. A route that starts at the crossing has no previous
/// waypoint, so its first segment is mirrored through the point.
fn incoming_vector(path: &Flightpath, segment: usize, point: Point) -> (f64, f64) {
    let waypoints = path.waypoints();
    let start = waypoints[segment];
    let origin = if start != point {
        start
    } else if let Some(previous) = segment.checked_sub(1) {
        waypoints[previous]
    } else {
        let next = waypoints[segment + 1];
        Point::new(2.0 * point.x - next.x, 2.0 * point.y - next.y)
    };
    point.vector_to(origin)
}

/// Merge overlaps whose end point is exactly the start point of the next.
///
/// Overlaps arrive in traversal order, so a single left-to-right pass
/// builds maximal runs. Each run is keyed by its first segment pair.
/// Endpoint equality is exact, unlike the tolerant point-on-segment test.
pub fn merge_overlaps(overlaps: &BTreeMap<SegmentPair, Overlap>) -> BTreeMap<SegmentPair, Overlap> {
    let mut merged = BTreeMap::new();
    let mut run: Option<(SegmentPair, Overlap)> = None;

    for (&key, &overlap) in overlaps {
        run = match run {
            Some((run_key, current)) if current.end == overlap.start => Some((
                run_key,
                Overlap {
                    start: current.start,
                    end: overlap.end,
                },
            )),
            Some((run_key, current)) => {
                merged.insert(run_key, current);
                Some((key, overlap))
            }
            None => Some((key, overlap)),
        };
    }
    if let Some((run_key, current)) = run {
        merged.insert(run_key, current);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn path(points: &[(f64, f64)]) -> Flightpath {
        Flightpath::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    fn overlap(a: f64, b: f64) -> Overlap {
        Overlap {
            start: Point::new(a, 0.0),
            end: Point::new(b, 0.0),
        }
    }

    #[test]
    fn merge_chains_contiguous_overlaps() {
        let mut overlaps = BTreeMap::new();
        overlaps.insert(SegmentPair::new(0, 0), overlap(0.0, 1.0));
        overlaps.insert(SegmentPair::new(1, 1), overlap(1.0, 2.0));
        overlaps.insert(SegmentPair::new(2, 2), overlap(2.0, 3.0));

        let merged = merge_overlaps(&overlaps);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&SegmentPair::new(0, 0)], overlap(0.0, 3.0));

        assert_eq!(merge_overlaps(&merged), merged);
    }

    #[test]
    fn merge_keeps_disjoint_runs() {
        let mut overlaps = BTreeMap::new();
        overlaps.insert(SegmentPair::new(0, 0), overlap(0.0, 1.0));
        overlaps.insert(SegmentPair::new(1, 1), overlap(1.0, 2.0));
        overlaps.insert(SegmentPair::new(3, 4), overlap(5.0, 6.0));

        let merged = merge_overlaps(&overlaps);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&SegmentPair::new(0, 0)], overlap(0.0, 2.0));
        assert_eq!(merged[&SegmentPair::new(3, 4)], overlap(5.0, 6.0));
        assert_eq!(merge_overlaps(&merged), merged);
    }

    #[test]
    fn merge_requires_exact_endpoint_equality() {
        let mut overlaps = BTreeMap::new();
        overlaps.insert(SegmentPair::new(0, 0), overlap(0.0, 1.0));
        overlaps.insert(SegmentPair::new(1, 1), overlap(1.0 + 1e-9, 2.0));
        assert_eq!(merge_overlaps(&overlaps).len(), 2);
    }

    #[test]
    fn detects_crossing_with_angle() {
        let p1 = path(&[(0.0, 0.0), (100.0, 0.0)]);
        let p2 = path(&[(50.0, -50.0), (50.0, 50.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        assert!(found.overlaps.is_empty());
        let crossing = found.crossings[&SegmentPair::new(0, 0)];
        assert_eq!(crossing.point, Point::new(50.0, 0.0));
        assert!((crossing.angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_at_route_start_uses_mirrored_direction() {
        let p1 = path(&[(0.0, 0.0), (100.0, 0.0)]);
        let p2 = path(&[(50.0, 0.0), (50.0, 100.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        let crossing = found.crossings[&SegmentPair::new(0, 0)];
        assert_eq!(crossing.point, Point::new(50.0, 0.0));
        assert!((crossing.angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_at_shared_waypoint_recorded_once() {
        let p1 = path(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let p2 = path(&[(10.0, -10.0), (10.0, 10.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        assert_eq!(found.crossings.len(), 1);
        let crossing = found.crossings[&SegmentPair::new(0, 0)];
        assert_eq!(crossing.point, Point::new(10.0, 0.0));
        assert!((crossing.angle_deg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_points_do_not_depend_on_argument_order() {
        let p1 = path(&[(0.0, 0.0), (40.0, 40.0), (80.0, 0.0)]);
        let p2 = path(&[(0.0, 20.0), (80.0, 20.0)]);
        let params = ConflictParams::default();
        let points = |found: &Interactions| -> BTreeSet<(u64, u64)> {
            found
                .crossings
                .values()
                .map(|c| (c.point.x.to_bits(), c.point.y.to_bits()))
                .collect()
        };
        let forward = detect_interactions(&p1, &p2, false, &params);
        let backward = detect_interactions(&p2, &p1, false, &params);
        assert_eq!(forward.crossings.len(), 2);
        assert_eq!(points(&forward), points(&backward));
    }

    #[test]
    fn same_route_skips_crossings() {
        let p1 = path(&[(0.0, 0.0), (100.0, 0.0)]);
        let p2 = path(&[(50.0, -50.0), (50.0, 50.0)]);
        let found = detect_interactions(&p1, &p2, true, &ConflictParams::default());
        assert!(found.is_empty());
    }

    #[test]
    fn shared_route_merges_into_one_overlap() {
        let p1 = path(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let p2 = path(&[(-10.0, 10.0), (0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 20.0)]);
        let found = detect_interactions(&p1, &p2, true, &ConflictParams::default());
        assert_eq!(found.overlaps.len(), 1);
        let run = found.overlaps[&SegmentPair::new(0, 1)];
        assert_eq!(run.start, Point::new(0.0, 0.0));
        assert_eq!(run.end, Point::new(20.0, 0.0));
    }

    #[test]
    fn partial_containment_uses_contained_endpoints() {
        let p1 = path(&[(0.0, 0.0), (20.0, 0.0)]);
        let p2 = path(&[(10.0, 0.0), (30.0, 0.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        assert!(found.crossings.is_empty());
        assert_eq!(found.overlaps[&SegmentPair::new(0, 0)], overlap(10.0, 20.0));
    }

    #[test]
    fn collinear_disjoint_segments_do_not_interact() {
        let p1 = path(&[(0.0, 0.0), (10.0, 0.0)]);
        let p2 = path(&[(20.0, 0.0), (30.0, 0.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        assert!(found.is_empty());
    }

    #[test]
    fn touching_collinear_segments_do_not_overlap() {
        let p1 = path(&[(0.0, 0.0), (10.0, 0.0)]);
        let p2 = path(&[(10.0, 0.0), (20.0, 0.0)]);
        let found = detect_interactions(&p1, &p2, false, &ConflictParams::default());
        assert!(found.overlaps.is_empty());
        assert!(found.crossings.is_empty());
    }
}
