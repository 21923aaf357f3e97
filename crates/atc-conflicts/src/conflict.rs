//! Conflict evaluation for one pair of aircraft.
//!
//! Each interaction between two flightpaths becomes a table with one row
//! per timestamp of either aircraft (outer join on time). A row predicts
//! when both aircraft reach the conflict point and derives separation
//! values and conflict flags from that prediction. Rows are built by pure
//! functions; a table is never modified after it is returned.

use crate::error::ConflictError;
use crate::interaction::{Crossing, Overlap, SegmentPair};
use crate::models::{Flightpath, Point, Sector, Segment, Trajectory, TrajectorySample};
use crate::rules::ConflictParams;
use crate::spatial::{nearest_distance, point_in_polygon};
use serde::{Deserialize, Serialize};

/// Geometric kind of the interaction behind a conflict table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Crossing,
    Overlap,
}

impl InteractionKind {
    /// Single-letter tag used in conflict identifiers.
    pub fn tag(&self) -> char {
        match self {
            InteractionKind::Crossing => 'C',
            InteractionKind::Overlap => 'O',
        }
    }
}

/// Relative sense in which two aircraft fly a shared stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapDirection {
    /// Same direction: the faster aircraft may catch up
    Solidary,
    /// Opposite directions: head-on encounter
    Opposite,
}

/// Classify two segments by the sign of the dot product of their directions.
pub fn overlap_direction(s1: &Segment, s2: &Segment) -> OverlapDirection {
    let (d1, d2) = (s1.direction(), s2.direction());
    if d1.0 * d2.0 + d1.1 * d2.1 < 0.0 {
        OverlapDirection::Opposite
    } else {
        OverlapDirection::Solidary
    }
}

/// Interaction a conflict table was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConflictSource {
    Crossing {
        segments: SegmentPair,
        crossing: Crossing,
    },
    Overlap {
        segments: SegmentPair,
        overlap: Overlap,
        direction: OverlapDirection,
    },
}

/// Derived conflict values at one timestamp.
///
/// Undefined values are NaN; every comparison against them is false, so
/// the boolean columns degrade to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConflictRow {
    pub time: f64,
    pub a1: Option<TrajectorySample>,
    pub a2: Option<TrajectorySample>,
    pub xc: f64,
    pub yc: f64,
    pub tc_a1: f64,
    pub tc_a2: f64,
    pub tc_max: f64,
    pub tc_diff: f64,
    /// Convergence angle of the routes, NaN for overlaps
    pub angle_deg: f64,
    pub converging: bool,
    /// Predicted altitude of each aircraft when reaching the conflict point
    pub zc_a1: f64,
    pub zc_a2: f64,
    pub vdist_conflict_ft: f64,
    pub hdist_a1_conflict_nm: f64,
    pub hdist_a2_conflict_nm: f64,
    pub dist_a1_a2_nm: f64,
    pub dist_a1_a2_m: f64,
    pub hdist_conflict_sector_nm: f64,
    pub hdist_conflict_crossing_points_nm: f64,
    /// `tc_diff / tc_max`
    pub relative_time_to_conflict: f64,
    pub in_sector: bool,
    pub in_time: bool,
    /// Both aircraft close to the conflict point
    pub conflict_strict: bool,
    /// Aircraft close to each other
    pub conflict_permissive: bool,
    /// Strict flag for crossings, permissive flag for overlaps
    pub in_conflict: bool,
}

impl ConflictRow {
    pub fn conflict_point(&self) -> Point {
        Point::new(self.xc, self.yc)
    }
}

/// Time-indexed conflict values for one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictTable {
    pub source: ConflictSource,
    pub rows: Vec<ConflictRow>,
}

impl ConflictTable {
    pub fn kind(&self) -> InteractionKind {
        match self.source {
            ConflictSource::Crossing { .. } => InteractionKind::Crossing,
            ConflictSource::Overlap { .. } => InteractionKind::Overlap,
        }
    }

    pub fn rows(&self) -> &[ConflictRow] {
        &self.rows
    }

    pub fn row_at(&self, time: f64) -> Option<&ConflictRow> {
        self.rows.iter().find(|row| row.time == time)
    }

    /// Timestamps at which the aircraft are in conflict.
    pub fn conflict_times(&self) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|row| row.in_conflict)
            .map(|row| row.time)
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.rows.iter().any(|row| row.in_conflict)
    }
}

/// Route and trajectory of one aircraft in the pair.
#[derive(Debug, Clone, Copy)]
pub struct AircraftTrack<'a> {
    pub flightpath: &'a Flightpath,
    pub trajectory: &'a Trajectory,
}

/// Builds conflict tables for one aircraft pair.
pub struct ConflictEvaluator<'a> {
    first: AircraftTrack<'a>,
    second: AircraftTrack<'a>,
    sector: &'a Sector,
    crossing_points: &'a [Point],
    params: &'a ConflictParams,
}

/// Samples of both aircraft at one timestamp of the outer join.
#[derive(Debug, Clone, Copy)]
struct JoinedSample<'a> {
    time: f64,
    a1: Option<&'a TrajectorySample>,
    a2: Option<&'a TrajectorySample>,
}

/// Predicted conflict point and times to reach it.
#[derive(Debug, Clone, Copy)]
struct ConflictTiming {
    point: Point,
    tc_a1: f64,
    tc_a2: f64,
}

impl ConflictTiming {
    const UNDEFINED: ConflictTiming = ConflictTiming {
        point: Point::NAN,
        tc_a1: f64::NAN,
        tc_a2: f64::NAN,
    };
}

impl<'a> ConflictEvaluator<'a> {
    pub fn new(
        first: AircraftTrack<'a>,
        second: AircraftTrack<'a>,
        sector: &'a Sector,
        crossing_points: &'a [Point],
        params: &'a ConflictParams,
    ) -> Self {
        Self {
            first,
            second,
            sector,
            crossing_points,
            params,
        }
    }

    /// Conflict table for a crossing: the conflict point is the crossing point.
    pub fn evaluate_crossing(&self, segments: SegmentPair, crossing: &Crossing) -> ConflictTable {
        let rows = self
            .outer_join()
            .into_iter()
            .map(|joined| {
                let timing = self.crossing_timing(&joined, crossing.point);
                self.derive_row(&joined, timing, crossing.angle_deg, InteractionKind::Crossing)
            })
            .collect();

        ConflictTable {
            source: ConflictSource::Crossing {
                segments,
                crossing: *crossing,
            },
            rows,
        }
    }

    /// Conflict table for a shared stretch of route.
    ///
    /// Both aircraft share a single closing time per row; the conflict point
    /// is where the first aircraft will be at that time.
    pub fn evaluate_overlap(
        &self,
        segments: SegmentPair,
        overlap: &Overlap,
    ) -> Result<ConflictTable, ConflictError> {
        let s1 = self
            .first
            .flightpath
            .segment(segments.first)
            .ok_or(ConflictError::SegmentOutOfRange(segments.first))?;
        let s2 = self
            .second
            .flightpath
            .segment(segments.second)
            .ok_or(ConflictError::SegmentOutOfRange(segments.second))?;
        let direction = overlap_direction(&s1, &s2);

        let rows = self
            .outer_join()
            .into_iter()
            .map(|joined| {
                let timing = self.overlap_timing(&joined, overlap, direction);
                self.derive_row(&joined, timing, f64::NAN, InteractionKind::Overlap)
            })
            .collect();

        Ok(ConflictTable {
            source: ConflictSource::Overlap {
                segments,
                overlap: *overlap,
                direction,
            },
            rows,
        })
    }

    /// Union of both trajectories' timestamps, in time order.
    fn outer_join(&self) -> Vec<JoinedSample<'a>> {
        let a = self.first.trajectory.samples();
        let b = self.second.trajectory.samples();
        let mut out = Vec::with_capacity(a.len().max(b.len()));
        let (mut i, mut j) = (0, 0);

        loop {
            let joined = match (a.get(i), b.get(j)) {
                (Some(s1), Some(s2)) if s1.time == s2.time => {
                    i += 1;
                    j += 1;
                    JoinedSample { time: s1.time, a1: Some(s1), a2: Some(s2) }
                }
                (Some(s1), Some(s2)) if s1.time < s2.time => {
                    i += 1;
                    JoinedSample { time: s1.time, a1: Some(s1), a2: None }
                }
                (Some(_), Some(s2)) | (None, Some(s2)) => {
                    j += 1;
                    JoinedSample { time: s2.time, a1: None, a2: Some(s2) }
                }
                (Some(s1), None) => {
                    i += 1;
                    JoinedSample { time: s1.time, a1: Some(s1), a2: None }
                }
                (None, None) => break,
            };
            out.push(joined);
        }

        out
    }

    fn crossing_timing(&self, joined: &JoinedSample<'_>, point: Point) -> ConflictTiming {
        let time_to = |path: &Flightpath, sample: Option<&TrajectorySample>| {
            sample.map_or(f64::NAN, |s| {
                path.time_to_location(s.position(), point, s.speed, self.params)
            })
        };
        ConflictTiming {
            point,
            tc_a1: time_to(self.first.flightpath, joined.a1),
            tc_a2: time_to(self.second.flightpath, joined.a2),
        }
    }

    fn overlap_timing(
        &self,
        joined: &JoinedSample<'_>,
        overlap: &Overlap,
        direction: OverlapDirection,
    ) -> ConflictTiming {
        let (Some(s1), Some(s2)) = (joined.a1, joined.a2) else {
            return ConflictTiming::UNDEFINED;
        };
        let tc = match direction {
            OverlapDirection::Solidary => self.solidary_closing_time(s1, s2, overlap),
            OverlapDirection::Opposite => self.opposite_closing_time(s1, s2),
        };
        let speed = self.params.floor_speed(s1.speed);
        let point = self
            .first
            .flightpath
            .location_at_time(s1.position(), speed, tc, self.params)
            .unwrap_or(Point::NAN);
        ConflictTiming {
            point,
            tc_a1: tc,
            tc_a2: tc,
        }
    }

    /// Time until the faster aircraft catches up with the slower one inside
    /// the shared stretch, NaN when that cannot happen.
    fn solidary_closing_time(
        &self,
        s1: &TrajectorySample,
        s2: &TrajectorySample,
        overlap: &Overlap,
    ) -> f64 {
        let params = self.params;
        let (path1, path2) = (self.first.flightpath, self.second.flightpath);
        let (pos1, pos2) = (s1.position(), s2.position());
        let (v1, v2) = (params.floor_speed(s1.speed), params.floor_speed(s2.speed));

        let to_entry1 = path1.distance_to_location(pos1, overlap.start, params);
        let to_entry2 = path2.distance_to_location(pos2, overlap.start, params);
        if to_entry1.is_nan() || to_entry2.is_nan() {
            return f64::NAN;
        }

        if to_entry1 < 0.0 || to_entry2 < 0.0 {
            // At least one aircraft is already inside the shared stretch
            let to_exit1 = path1.distance_to_location(pos1, overlap.end, params);
            let to_exit2 = path2.distance_to_location(pos2, overlap.end, params);
            if !(to_exit1 >= 0.0 && to_exit2 >= 0.0) {
                return f64::NAN;
            }
            if to_exit1 >= to_exit2 {
                self.close_gap(path1, pos1, pos2, v1, v2, to_exit2 / v2)
            } else {
                self.close_gap(path2, pos2, pos1, v2, v1, to_exit1 / v1)
            }
        } else {
            let t_entry1 = to_entry1 / v1;
            let t_entry2 = to_entry2 / v2;
            if t_entry1 < t_entry2 {
                self.close_gap_after_entry(path1, path2, pos1, v1, v2, t_entry2, overlap)
            } else {
                self.close_gap_after_entry(path2, path1, pos2, v2, v1, t_entry1, overlap)
            }
        }
    }

    /// Trailing aircraft at `trail_pos` closing on the aircraft at `lead_pos`.
    ///
    /// The gap must close before the leader has used up `lead_time_left`.
    fn close_gap(
        &self,
        trail_path: &Flightpath,
        trail_pos: Point,
        lead_pos: Point,
        v_trail: f64,
        v_lead: f64,
        lead_time_left: f64,
    ) -> f64 {
        if v_lead >= v_trail {
            return f64::NAN;
        }
        let gap = trail_path.distance_to_location(trail_pos, lead_pos, self.params);
        if !(gap >= 0.0) {
            return f64::NAN;
        }
        let t_gap = gap / (v_trail - v_lead);
        if t_gap <= lead_time_left {
            t_gap
        } else {
            f64::NAN
        }
    }

    /// Neither aircraft is inside yet; `early` reaches the entry first and
    /// `late` arrives `t_late_entry` seconds from now.
    #[allow(clippy::too_many_arguments)]
    fn close_gap_after_entry(
        &self,
        early_path: &Flightpath,
        late_path: &Flightpath,
        early_pos: Point,
        v_early: f64,
        v_late: f64,
        t_late_entry: f64,
        overlap: &Overlap,
    ) -> f64 {
        if v_early >= v_late {
            return f64::NAN;
        }
        let Some(ahead) = early_path.location_at_time(early_pos, v_early, t_late_entry, self.params)
        else {
            return f64::NAN;
        };
        let time_left = early_path.time_to_location(ahead, overlap.end, v_early, self.params);
        let gap = late_path.distance_to_location(overlap.start, ahead, self.params);
        if !(gap >= 0.0) {
            return f64::NAN;
        }
        let t_gap = gap / (v_late - v_early);
        if t_gap <= time_left {
            t_gap
        } else {
            f64::NAN
        }
    }

    /// Time until two head-on aircraft meet, NaN once they have passed.
    fn opposite_closing_time(&self, s1: &TrajectorySample, s2: &TrajectorySample) -> f64 {
        let params = self.params;
        let (pos1, pos2) = (s1.position(), s2.position());
        let closing_speed = params.floor_speed(s1.speed + s2.speed);

        let ahead1 = self.first.flightpath.distance_to_location(pos1, pos2, params);
        if ahead1 >= 0.0 {
            return ahead1 / closing_speed;
        }
        let ahead2 = self.second.flightpath.distance_to_location(pos2, pos1, params);
        if ahead2 >= 0.0 {
            return ahead2 / closing_speed;
        }
        f64::NAN
    }

    fn derive_row(
        &self,
        joined: &JoinedSample<'_>,
        timing: ConflictTiming,
        angle_deg: f64,
        kind: InteractionKind,
    ) -> ConflictRow {
        let params = self.params;
        let state = |sample: Option<&TrajectorySample>| {
            sample.map_or((Point::NAN, f64::NAN, f64::NAN), |s| {
                (s.position(), s.z, s.climb_rate)
            })
        };
        let (pos1, z1, climb1) = state(joined.a1);
        let (pos2, z2, climb2) = state(joined.a2);
        let ConflictTiming { point, tc_a1, tc_a2 } = timing;

        let zc_a1 = tc_a1 * climb1 + z1;
        let zc_a2 = tc_a2 * climb2 + z2;
        let vdist = (zc_a1 - zc_a2).abs();
        let hdist_a1 = pos1.distance(point);
        let hdist_a2 = pos2.distance(point);
        let dist_a1_a2 = pos1.distance(pos2);

        let tc_max = if tc_a1.is_nan() || tc_a2.is_nan() {
            f64::NAN
        } else {
            tc_a1.max(tc_a2)
        };
        let tc_diff = (tc_a1 - tc_a2).abs();

        let in_sector =
            point_in_polygon(point, self.sector.vertices(), params.sector_tolerance_nm);
        let in_time = params.within_horizon(tc_a1) && params.within_horizon(tc_a2);
        let vertically_close = vdist < params.altitude_threshold_ft;
        let threshold = params.distance_threshold_nm;
        let conflict_strict = vertically_close
            && hdist_a1 < threshold
            && hdist_a2 < threshold
            && in_time
            && in_sector;
        let conflict_permissive = vertically_close && dist_a1_a2 < threshold && in_time && in_sector;

        ConflictRow {
            time: joined.time,
            a1: joined.a1.copied(),
            a2: joined.a2.copied(),
            xc: point.x,
            yc: point.y,
            tc_a1,
            tc_a2,
            tc_max,
            tc_diff,
            angle_deg,
            converging: angle_deg < params.angle_threshold_deg,
            zc_a1,
            zc_a2,
            vdist_conflict_ft: vdist,
            hdist_a1_conflict_nm: hdist_a1,
            hdist_a2_conflict_nm: hdist_a2,
            dist_a1_a2_nm: dist_a1_a2,
            dist_a1_a2_m: dist_a1_a2 * params.nm_to_meters,
            hdist_conflict_sector_nm: self.sector.distance_to_boundary(point),
            hdist_conflict_crossing_points_nm: crossing_point_distance(
                point,
                self.crossing_points,
                params,
            ),
            relative_time_to_conflict: tc_diff / tc_max,
            in_sector,
            in_time,
            conflict_strict,
            conflict_permissive,
            in_conflict: match kind {
                InteractionKind::Crossing => conflict_strict,
                InteractionKind::Overlap => conflict_permissive,
            },
        }
    }
}

/// Distance from the conflict point to the nearest standard crossing point.
///
/// Falls back to the configured sentinel when no crossing points exist or
/// the nearest one is degenerate (closer than the configured minimum).
pub fn crossing_point_distance(point: Point, crossing_points: &[Point], params: &ConflictParams) -> f64 {
    if point.is_nan() {
        return f64::NAN;
    }
    match nearest_distance(point, crossing_points) {
        Some(d) if d >= params.crossing_point_min_distance_nm => d,
        _ => params.crossing_point_sentinel,
    }
}
