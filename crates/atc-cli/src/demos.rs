//! Built-in traffic scenarios for trying the engine without a recorded run.

use crate::scenario_file::{FlowRoute, ScenarioFile};
use atc_conflicts::{CallUpdate, Point};
use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

pub const NAMES: &[&str] = &["crossing", "trailing", "head-on"];

const CRUISE_FT: f64 = 30000.0;
const STEP_S: u32 = 10;

pub fn by_name(name: &str) -> Option<ScenarioFile> {
    match name {
        "crossing" => Some(crossing()),
        "trailing" => Some(trailing()),
        "head-on" => Some(head_on()),
        _ => None,
    }
}

fn sector() -> Vec<Point> {
    vec![
        Point::new(-100.0, -100.0),
        Point::new(200.0, -100.0),
        Point::new(200.0, 200.0),
        Point::new(-100.0, 200.0),
    ]
}

/// Straight level flight sampled every `STEP_S` seconds.
fn straight_calls(name: &str, start: Point, heading: f64, speed_kn: f64, duration_s: u32) -> Vec<CallUpdate> {
    let speed_nm_s = speed_kn / 3600.0;
    (0..=duration_s / STEP_S)
        .map(|k| {
            let t = f64::from(k * STEP_S);
            CallUpdate {
                time: (t + 1.0) * 1000.0,
                name: name.to_string(),
                x: start.x + speed_nm_s * t * heading.cos(),
                y: start.y + speed_nm_s * t * heading.sin(),
                z: CRUISE_FT,
                speed: speed_kn,
                heading,
                climb: 0.0,
            }
        })
        .collect()
}

/// Two aircraft on perpendicular routes, both 10 minutes from the crossing.
///
/// - A1: flying north along x = 0
/// - A2: flying east along y = 50
pub fn crossing() -> ScenarioFile {
    let north = vec![Point::new(0.0, 0.0), Point::new(0.0, 100.0)];
    let east = vec![Point::new(-50.0, 50.0), Point::new(100.0, 50.0)];

    let mut calls = straight_calls("A1", north[0], FRAC_PI_2, 300.0, 700);
    calls.extend(straight_calls("A2", east[0], 0.0, 300.0, 700));

    ScenarioFile {
        name: "crossing".to_string(),
        sector: sector(),
        flows: vec![
            FlowRoute {
                name: "NORTH".to_string(),
                route: north.clone(),
                aircraft: vec!["A1".to_string()],
            },
            FlowRoute {
                name: "EAST".to_string(),
                route: east.clone(),
                aircraft: vec!["A2".to_string()],
            },
        ],
        crossing_points: None,
        aircraft: BTreeMap::from([("A1".to_string(), north), ("A2".to_string(), east)]),
        calls,
        params: None,
    }
}

/// A fast aircraft catching up with a slower one on the same flow.
pub fn trailing() -> ScenarioFile {
    let route = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];

    let mut calls = straight_calls("T1", Point::new(0.0, 0.0), 0.0, 360.0, 600);
    calls.extend(straight_calls("T2", Point::new(20.0, 0.0), 0.0, 240.0, 600));

    ScenarioFile {
        name: "trailing".to_string(),
        sector: sector(),
        flows: vec![FlowRoute {
            name: "EAST".to_string(),
            route: route.clone(),
            aircraft: vec!["T1".to_string(), "T2".to_string()],
        }],
        crossing_points: Some(Vec::new()),
        aircraft: BTreeMap::from([("T1".to_string(), route.clone()), ("T2".to_string(), route)]),
        calls,
        params: None,
    }
}

/// Two aircraft flying the same airway in opposite directions.
pub fn head_on() -> ScenarioFile {
    let eastbound = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
    let westbound = vec![Point::new(100.0, 0.0), Point::new(0.0, 0.0)];

    let mut calls = straight_calls("H1", eastbound[0], 0.0, 360.0, 500);
    calls.extend(straight_calls("H2", westbound[0], std::f64::consts::PI, 360.0, 500));

    ScenarioFile {
        name: "head-on".to_string(),
        sector: sector(),
        flows: Vec::new(),
        crossing_points: Some(Vec::new()),
        aircraft: BTreeMap::from([("H1".to_string(), eastbound), ("H2".to_string(), westbound)]),
        calls,
        params: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_demo_builds() {
        for name in NAMES {
            let file = by_name(name).unwrap();
            let loaded = file.build(&atc_conflicts::ConflictParams::default()).unwrap();
            assert!(loaded.skipped.is_empty(), "{name}");
            assert_eq!(loaded.trajectories.len(), 2, "{name}");
        }
        assert!(by_name("missing").is_none());
    }

    #[test]
    fn straight_calls_start_at_time_zero() {
        let calls = straight_calls("X", Point::new(0.0, 0.0), 0.0, 360.0, 20);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].time, 1000.0);
        assert!((calls[2].x - 2.0).abs() < 1e-12);
    }
}
