//! Thresholds and tolerances for interaction detection and conflict evaluation.

use serde::{Deserialize, Serialize};

/// Configuration shared by every detector and evaluator call.
///
/// Distances are in nautical miles, altitudes in feet, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictParams {
    /// Tolerance of the point-on-segment test
    pub eps_route_nm: f64,
    /// Vertical separation below which two aircraft may be in conflict
    pub altitude_threshold_ft: f64,
    /// Horizontal separation below which two aircraft may be in conflict
    pub distance_threshold_nm: f64,
    /// Crossings with a smaller convergence angle are flagged as converging
    pub angle_threshold_deg: f64,
    /// Look-ahead horizon for the in-time flag
    pub tmax_s: f64,
    pub nm_to_meters: f64,
    /// Nearest standard crossing points closer than this are treated as degenerate
    pub crossing_point_min_distance_nm: f64,
    /// Distance reported when no usable standard crossing point exists
    pub crossing_point_sentinel: f64,
    /// Points closer than this to the sector boundary count as outside
    pub sector_tolerance_nm: f64,
    /// Floor applied to speeds (nm/s) before dividing by them
    pub min_speed_nm_s: f64,
    /// Size of the worker pool; `None` uses one thread per core
    pub worker_threads: Option<usize>,
}

impl Default for ConflictParams {
    fn default() -> Self {
        Self {
            eps_route_nm: 0.1,
            altitude_threshold_ft: 800.0,
            distance_threshold_nm: 10.0,
            angle_threshold_deg: 90.0,
            tmax_s: 600.0,
            nm_to_meters: 1852.0,
            crossing_point_min_distance_nm: 0.5,
            crossing_point_sentinel: 1.0,
            sector_tolerance_nm: 1e-9,
            min_speed_nm_s: 1e-4,
            worker_threads: None,
        }
    }
}

impl ConflictParams {
    /// Floor a speed before it is used as a divisor. NaN stays NaN.
    pub fn floor_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            speed
        } else {
            speed.max(self.min_speed_nm_s)
        }
    }

    /// True when a time to conflict lies inside `[0, tmax)`.
    pub fn within_horizon(&self, tc: f64) -> bool {
        tc >= 0.0 && tc < self.tmax_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: ConflictParams =
            serde_json::from_str(r#"{ "tmax_s": 60.0, "worker_threads": 2 }"#).unwrap();
        assert_eq!(params.tmax_s, 60.0);
        assert_eq!(params.worker_threads, Some(2));
        assert_eq!(params.eps_route_nm, 0.1);
        assert_eq!(params.altitude_threshold_ft, 800.0);
    }

    #[test]
    fn floor_speed_keeps_nan() {
        let params = ConflictParams::default();
        assert!(params.floor_speed(f64::NAN).is_nan());
        assert_eq!(params.floor_speed(0.0), params.min_speed_nm_s);
        assert_eq!(params.floor_speed(0.1), 0.1);
    }

    #[test]
    fn horizon_rejects_nan_and_negative() {
        let params = ConflictParams::default();
        assert!(params.within_horizon(0.0));
        assert!(!params.within_horizon(600.0));
        assert!(!params.within_horizon(-1.0));
        assert!(!params.within_horizon(f64::NAN));
    }
}
