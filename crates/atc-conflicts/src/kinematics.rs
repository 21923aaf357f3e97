//! Distances, times and positions measured along a flightpath.
//!
//! Positions are matched to the route with the tolerant point-on-segment
//! test, so a sampled aircraft position slightly off the nominal route still
//! resolves to its segment. Anything that cannot be matched yields NaN or
//! `None`.

use crate::models::{Flightpath, Point};
use crate::rules::ConflictParams;
use crate::spatial::point_on_segment;

impl Flightpath {
    /// Index of the first segment containing `p`.
    pub fn segment_containing(&self, p: Point, eps_route: f64) -> Option<usize> {
        self.segments()
            .position(|segment| point_on_segment(p, &segment, eps_route))
    }

    /// True when `p` lies on any segment of the route.
    pub fn contains_point(&self, p: Point, eps_route: f64) -> bool {
        self.segment_containing(p, eps_route).is_some()
    }

    /// Signed distance flown along the route from `p0` to `p1`.
    ///
    /// Positive when `p1` is ahead of `p0` in route order, negative when it
    /// is behind, NaN when either point is off the route.
    pub fn distance_to_location(&self, p0: Point, p1: Point, params: &ConflictParams) -> f64 {
        let eps = params.eps_route_nm;
        let (Some(s0), Some(s1)) = (
            self.segment_containing(p0, eps),
            self.segment_containing(p1, eps),
        ) else {
            return f64::NAN;
        };

        let waypoints = self.waypoints();
        if s0 == s1 {
            let start = waypoints[s0];
            return start.distance(p1) - start.distance(p0);
        }

        let (from, to, s_from, s_to, sign) = if s0 < s1 {
            (p0, p1, s0, s1, 1.0)
        } else {
            (p1, p0, s1, s0, -1.0)
        };

        let mut dist = from.distance(waypoints[s_from + 1]);
        for k in s_from + 1..s_to {
            dist += waypoints[k].distance(waypoints[k + 1]);
        }
        dist += waypoints[s_to].distance(to);

        sign * dist
    }

    /// Time to fly from `p0` to `p1` at `speed` (nm/s). NaN when unreachable.
    pub fn time_to_location(
        &self,
        p0: Point,
        p1: Point,
        speed: f64,
        params: &ConflictParams,
    ) -> f64 {
        self.distance_to_location(p0, p1, params) / params.floor_speed(speed)
    }

    /// Position reached after flying `distance` along the route from `p`.
    ///
    /// Negative distances walk backwards. Walking past either end stops at
    /// the first or last waypoint. Returns `None` when `p` is off the route
    /// or the inputs are NaN.
    pub fn location_at_distance(
        &self,
        p: Point,
        distance: f64,
        params: &ConflictParams,
    ) -> Option<Point> {
        if distance.is_nan() || p.is_nan() {
            return None;
        }
        let sno = self.segment_containing(p, params.eps_route_nm)?;
        let waypoints = self.waypoints();

        if distance >= 0.0 {
            Some(walk(p, distance, waypoints[sno + 1..].iter()).unwrap_or_else(|| self.last()))
        } else {
            Some(walk(p, -distance, waypoints[..=sno].iter().rev()).unwrap_or_else(|| self.first()))
        }
    }

    /// Position reached after `time` seconds at `speed` (nm/s) from `p`.
    pub fn location_at_time(
        &self,
        p: Point,
        speed: f64,
        time: f64,
        params: &ConflictParams,
    ) -> Option<Point> {
        self.location_at_distance(p, speed * time, params)
    }
}

/// Advance `remaining` nautical miles from `from` through `targets` in order.
fn walk<'a>(
    mut from: Point,
    mut remaining: f64,
    targets: impl Iterator<Item = &'a Point>,
) -> Option<Point> {
    for &target in targets {
        let leg = from.distance(target);
        if remaining < leg {
            let ratio = remaining / leg;
            return Some(Point::new(
                from.x + (target.x - from.x) * ratio,
                from.y + (target.y - from.y) * ratio,
            ));
        }
        remaining -= leg;
        from = target;
    }
    None
}
