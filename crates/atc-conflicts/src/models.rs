//! Core data models for route interaction and conflict evaluation.
//!
//! Horizontal coordinates are in nautical miles, altitudes in feet and
//! times in seconds.

use crate::error::ConflictError;
use crate::spatial;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

const KNOTS_PER_NM_S: f64 = 3600.0;
const SECS_PER_MIN: f64 = 60.0;
const MS_PER_SEC: f64 = 1000.0;

/// A horizontal position in nautical miles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Route waypoints are plain positions.
pub type Waypoint = Point;

impl Point {
    /// Position used when a value is undefined.
    pub const NAN: Point = Point {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Vector from `self` to `other`.
    pub fn vector_to(&self, other: Point) -> (f64, f64) {
        (other.x - self.x, other.y - self.y)
    }
}

/// Adjacent waypoint pair of a flightpath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn direction(&self) -> (f64, f64) {
        self.start.vector_to(self.end)
    }

    /// Heading of the segment in radians, measured from the x axis.
    pub fn heading(&self) -> f64 {
        let (dx, dy) = self.direction();
        dy.atan2(dx)
    }
}

/// Ordered waypoint sequence an aircraft is cleared to follow.
///
/// Always holds at least two waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Flightpath {
    waypoints: Vec<Point>,
}

impl Flightpath {
    pub fn new(waypoints: Vec<Point>) -> Result<Self, ConflictError> {
        if waypoints.len() < 2 {
            return Err(ConflictError::DegenerateFlightpath(waypoints.len()));
        }
        Ok(Self { waypoints })
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn first(&self) -> Point {
        self.waypoints[0]
    }

    pub fn last(&self) -> Point {
        self.waypoints[self.waypoints.len() - 1]
    }

    pub fn segment_count(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn segment(&self, index: usize) -> Option<Segment> {
        let start = *self.waypoints.get(index)?;
        let end = *self.waypoints.get(index + 1)?;
        Some(Segment::new(start, end))
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.waypoints
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
    }

    /// Heading of every segment, in route order.
    pub fn headings(&self) -> Vec<f64> {
        self.segments().map(|segment| segment.heading()).collect()
    }

    /// Distance flown along the route when reaching each waypoint.
    pub fn cumulative_distances(&self) -> Vec<f64> {
        let mut total = 0.0;
        let mut out = Vec::with_capacity(self.waypoints.len());
        out.push(0.0);
        for segment in self.segments() {
            total += segment.length();
            out.push(total);
        }
        out
    }

    pub fn length(&self) -> f64 {
        self.segments().map(|segment| segment.length()).sum()
    }
}

impl TryFrom<Vec<Point>> for Flightpath {
    type Error = ConflictError;

    fn try_from(waypoints: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(waypoints)
    }
}

impl From<Flightpath> for Vec<Point> {
    fn from(flightpath: Flightpath) -> Self {
        flightpath.waypoints
    }
}

/// Kinematic state of one aircraft at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Ground speed in nm/s
    pub speed: f64,
    /// Heading in radians
    pub heading: f64,
    /// Climb rate in ft/s
    pub climb_rate: f64,
    pub vx: f64,
    pub vy: f64,
    pub insector: bool,
}

impl TrajectorySample {
    /// Create a sample; velocity components are derived from speed and heading.
    pub fn new(
        time: f64,
        position: Point,
        z: f64,
        speed: f64,
        heading: f64,
        climb_rate: f64,
    ) -> Self {
        Self {
            time,
            x: position.x,
            y: position.y,
            z,
            speed,
            heading,
            climb_rate,
            vx: speed * heading.cos(),
            vy: speed * heading.sin(),
            insector: false,
        }
    }

    pub fn with_insector(mut self, insector: bool) -> Self {
        self.insector = insector;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Raw per-aircraft state record, as emitted by the simulator log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallUpdate {
    /// Milliseconds since the start of the run
    pub time: f64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Altitude in feet
    pub z: f64,
    /// Ground speed in knots
    pub speed: f64,
    /// Heading in radians
    pub heading: f64,
    /// Climb rate in feet per minute
    #[serde(default)]
    pub climb: f64,
}

impl CallUpdate {
    fn to_sample(&self, sector: &Sector) -> TrajectorySample {
        let time = (self.time / MS_PER_SEC).round() - 1.0;
        let position = Point::new(self.x, self.y);
        TrajectorySample::new(
            time,
            position,
            self.z,
            self.speed / KNOTS_PER_NM_S,
            self.heading,
            self.climb / SECS_PER_MIN,
        )
        .with_insector(sector.contains(position))
    }
}

/// Time-ordered samples of one aircraft with unique timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TrajectorySample>", into = "Vec<TrajectorySample>")]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    /// Sort samples by time and keep the first sample of every timestamp.
    pub fn new(mut samples: Vec<TrajectorySample>) -> Self {
        samples.retain(|sample| !sample.time.is_nan());
        samples.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
        samples.dedup_by(|later, earlier| later.time == earlier.time);
        Self { samples }
    }

    /// Build a trajectory from raw state records of a single aircraft.
    pub fn from_calls<'a>(
        calls: impl IntoIterator<Item = &'a CallUpdate>,
        sector: &Sector,
    ) -> Self {
        Self::new(calls.into_iter().map(|call| call.to_sample(sector)).collect())
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_at(&self, time: f64) -> Option<&TrajectorySample> {
        self.samples
            .binary_search_by(|sample| {
                sample
                    .time
                    .partial_cmp(&time)
                    .unwrap_or(Ordering::Less)
            })
            .ok()
            .map(|idx| &self.samples[idx])
    }
}

impl From<Vec<TrajectorySample>> for Trajectory {
    fn from(samples: Vec<TrajectorySample>) -> Self {
        Self::new(samples)
    }
}

impl From<Trajectory> for Vec<TrajectorySample> {
    fn from(trajectory: Trajectory) -> Self {
        trajectory.samples
    }
}

/// Group raw records by aircraft name and build one trajectory per aircraft.
pub fn trajectories_from_calls(calls: &[CallUpdate], sector: &Sector) -> BTreeMap<String, Trajectory> {
    let mut grouped: BTreeMap<&str, Vec<&CallUpdate>> = BTreeMap::new();
    for call in calls {
        grouped.entry(call.name.as_str()).or_default().push(call);
    }
    grouped
        .into_iter()
        .map(|(name, calls)| (name.to_string(), Trajectory::from_calls(calls, sector)))
        .collect()
}

/// Control sector polygon.
///
/// Stored as an open ring; a closing vertex equal to the first is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Sector {
    vertices: Vec<Point>,
    tolerance: f64,
}

impl Sector {
    pub fn new(mut vertices: Vec<Point>) -> Result<Self, ConflictError> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(ConflictError::DegenerateSector(vertices.len()));
        }
        Ok(Self {
            vertices,
            tolerance: crate::rules::ConflictParams::default().sector_tolerance_nm,
        })
    }

    /// Override the inward tolerance of [`Sector::contains`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Edges of the closed ring, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// True when `p` is strictly inside the polygon. NaN positions are outside.
    pub fn contains(&self, p: Point) -> bool {
        spatial::point_in_polygon(p, &self.vertices, self.tolerance)
    }

    /// Distance from `p` to the nearest sector edge, NaN for NaN positions.
    pub fn distance_to_boundary(&self, p: Point) -> f64 {
        spatial::distance_to_edges(p, self.edges())
    }
}

impl TryFrom<Vec<Point>> for Sector {
    type Error = ConflictError;

    fn try_from(vertices: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(vertices)
    }
}

impl From<Sector> for Vec<Point> {
    fn from(sector: Sector) -> Self {
        sector.vertices
    }
}

/// A standard flow: a named route and the aircraft assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    #[serde(default)]
    pub aircraft: Vec<String>,
}

impl Flow {
    pub fn contains(&self, aircraft: &str) -> bool {
        self.aircraft.iter().any(|name| name == aircraft)
    }
}

/// True when some flow lists both aircraft.
pub fn same_flow(aircraft_a: &str, aircraft_b: &str, flows: &[Flow]) -> bool {
    flows
        .iter()
        .any(|flow| flow.contains(aircraft_a) && flow.contains(aircraft_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_sector() -> Sector {
        Sector::new(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn flightpath_rejects_single_waypoint() {
        let err = Flightpath::new(vec![Point::new(0.0, 0.0)]).unwrap_err();
        assert_eq!(err, ConflictError::DegenerateFlightpath(1));
    }

    #[test]
    fn flightpath_derives_headings_and_distances() {
        let path = Flightpath::new(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 10.0),
        ])
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        assert_eq!(path.cumulative_distances(), vec![0.0, 5.0, 11.0]);
        assert_eq!(path.length(), 11.0);
        let headings = path.headings();
        assert!((headings[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn flightpath_deserializes_from_point_list() {
        let path: Flightpath =
            serde_json::from_str(r#"[{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}]"#).unwrap();
        assert_eq!(path.last(), Point::new(1.0, 0.0));
        assert!(serde_json::from_str::<Flightpath>(r#"[{"x": 0.0, "y": 0.0}]"#).is_err());
    }

    #[test]
    fn sector_drops_closing_vertex() {
        let sector = square_sector();
        assert_eq!(sector.vertices().len(), 4);
        assert_eq!(sector.edges().count(), 4);
    }

    #[test]
    fn trajectory_sorts_and_dedups_timestamps() {
        let sample = |time: f64, x: f64| {
            TrajectorySample::new(time, Point::new(x, 0.0), 30000.0, 0.1, 0.0, 0.0)
        };
        let trajectory = Trajectory::new(vec![
            sample(2.0, 2.0),
            sample(1.0, 1.0),
            sample(2.0, 99.0),
            sample(f64::NAN, 5.0),
        ]);
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.samples()[0].time, 1.0);
        assert_eq!(trajectory.sample_at(2.0).map(|s| s.x), Some(2.0));
        assert!(trajectory.sample_at(3.0).is_none());
    }

    #[test]
    fn trajectory_from_calls_converts_units() {
        let sector = square_sector();
        let call = CallUpdate {
            time: 1_400.0,
            name: "IB1234".into(),
            x: 50.0,
            y: 50.0,
            z: 30000.0,
            speed: 360.0,
            heading: 0.0,
            climb: 600.0,
        };
        let trajectory = Trajectory::from_calls([&call], &sector);
        let sample = trajectory.samples()[0];
        assert_eq!(sample.time, 0.0);
        assert!((sample.speed - 0.1).abs() < 1e-12);
        assert!((sample.vx - 0.1).abs() < 1e-12);
        assert_eq!(sample.climb_rate, 10.0);
        assert!(sample.insector);
    }

    #[test]
    fn trajectories_group_by_aircraft() {
        let sector = square_sector();
        let call = |name: &str, time: f64| CallUpdate {
            time,
            name: name.into(),
            x: 150.0,
            y: 50.0,
            z: 30000.0,
            speed: 400.0,
            heading: 1.0,
            climb: 0.0,
        };
        let calls = vec![call("A", 1000.0), call("B", 1000.0), call("A", 2000.0)];
        let trajectories = trajectories_from_calls(&calls, &sector);
        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories["A"].len(), 2);
        assert!(!trajectories["B"].samples()[0].insector);
    }

    #[test]
    fn same_flow_requires_both_aircraft() {
        let flows = vec![Flow {
            name: "R1".into(),
            aircraft: vec!["A".into(), "B".into()],
        }];
        assert!(same_flow("A", "B", &flows));
        assert!(!same_flow("A", "C", &flows));
    }
}
