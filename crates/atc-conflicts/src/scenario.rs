//! Batch conflict computation over every aircraft pair of a scenario.

use crate::conflict::{AircraftTrack, ConflictEvaluator, ConflictTable, InteractionKind};
use crate::error::ConflictError;
use crate::interaction::{detect_interactions, Interactions};
use crate::models::{same_flow, Flightpath, Flow, Point, Sector, Trajectory};
use crate::rules::ConflictParams;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Static airspace description: routes, flows, sector and crossing points.
#[derive(Debug, Clone)]
pub struct Scenario {
    flightpaths: BTreeMap<String, Flightpath>,
    flows: Vec<Flow>,
    sector: Sector,
    crossing_points: Vec<Point>,
}

impl Scenario {
    pub fn new(sector: Sector) -> Self {
        Self {
            flightpaths: BTreeMap::new(),
            flows: Vec::new(),
            sector,
            crossing_points: Vec::new(),
        }
    }

    pub fn with_flows(mut self, flows: Vec<Flow>) -> Self {
        self.flows = flows;
        self
    }

    pub fn with_crossing_points(mut self, crossing_points: Vec<Point>) -> Self {
        self.crossing_points = crossing_points;
        self
    }

    pub fn add_flightpath(&mut self, aircraft: impl Into<String>, flightpath: Flightpath) {
        self.flightpaths.insert(aircraft.into(), flightpath);
    }

    /// Register raw waypoints; fails for routes with fewer than two waypoints.
    pub fn add_waypoints(
        &mut self,
        aircraft: impl Into<String>,
        waypoints: Vec<Point>,
    ) -> Result<(), ConflictError> {
        let flightpath = Flightpath::new(waypoints)?;
        self.add_flightpath(aircraft, flightpath);
        Ok(())
    }

    pub fn flightpath(&self, aircraft: &str) -> Option<&Flightpath> {
        self.flightpaths.get(aircraft)
    }

    pub fn flightpaths(&self) -> &BTreeMap<String, Flightpath> {
        &self.flightpaths
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    pub fn crossing_points(&self) -> &[Point] {
        &self.crossing_points
    }

    /// Unordered aircraft pairs, each once with the names in sorted order.
    pub fn aircraft_pairs(&self) -> Vec<(&str, &str)> {
        let names: Vec<&str> = self.flightpaths.keys().map(String::as_str).collect();
        names
            .iter()
            .enumerate()
            .flat_map(|(i, a)| names[i + 1..].iter().map(move |b| (*a, *b)))
            .collect()
    }

    fn interactions(&self, a: &str, b: &str, params: &ConflictParams) -> Result<Interactions, ConflictError> {
        let path_a = self
            .flightpath(a)
            .ok_or_else(|| ConflictError::MissingFlightpath(a.to_string()))?;
        let path_b = self
            .flightpath(b)
            .ok_or_else(|| ConflictError::MissingFlightpath(b.to_string()))?;
        Ok(detect_interactions(
            path_a,
            path_b,
            same_flow(a, b, &self.flows),
            params,
        ))
    }
}

/// Identifies one conflict table: the pair, the interaction kind and its index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictKey {
    pub aircraft_a: String,
    pub aircraft_b: String,
    pub kind: InteractionKind,
    pub index: usize,
}

impl ConflictKey {
    pub fn new(aircraft_a: &str, aircraft_b: &str, kind: InteractionKind, index: usize) -> Self {
        Self {
            aircraft_a: aircraft_a.to_string(),
            aircraft_b: aircraft_b.to_string(),
            kind,
            index,
        }
    }

    pub fn involves(&self, aircraft: &str) -> bool {
        self.aircraft_a == aircraft || self.aircraft_b == aircraft
    }
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}{}",
            self.aircraft_a,
            self.aircraft_b,
            self.kind.tag(),
            self.index
        )
    }
}

/// A pair left out of the report and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Omission {
    pub aircraft_a: String,
    pub aircraft_b: String,
    pub reason: String,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub tables: BTreeMap<ConflictKey, ConflictTable>,
    pub omissions: Vec<Omission>,
}

impl ConflictReport {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, key: &ConflictKey) -> Option<&ConflictTable> {
        self.tables.get(key)
    }

    /// Tables involving both aircraft, in either order.
    pub fn for_pair<'a>(
        &'a self,
        a: &'a str,
        b: &'a str,
    ) -> impl Iterator<Item = (&'a ConflictKey, &'a ConflictTable)> + 'a {
        self.tables
            .iter()
            .filter(move |(key, _)| key.involves(a) && key.involves(b))
    }

    /// Number of tables whose row at `time` is in conflict.
    pub fn active_conflicts_at(&self, time: f64) -> usize {
        self.tables
            .values()
            .filter(|table| table.row_at(time).is_some_and(|row| row.in_conflict))
            .count()
    }
}

/// Interactions for every unordered pair that has at least one.
pub fn potential_interactions(
    scenario: &Scenario,
    params: &ConflictParams,
) -> BTreeMap<(String, String), Interactions> {
    scenario
        .aircraft_pairs()
        .into_iter()
        .filter_map(|(a, b)| {
            let interactions = match scenario.interactions(a, b, params) {
                Ok(interactions) => interactions,
                Err(err) => {
                    warn!(aircraft_a = a, aircraft_b = b, error = %err, "pair skipped");
                    return None;
                }
            };
            (!interactions.is_empty()).then(|| ((a.to_string(), b.to_string()), interactions))
        })
        .collect()
}

/// Evaluate every interaction of every aircraft pair.
///
/// Pairs run on a bounded worker pool. A pair that cannot be evaluated is
/// recorded as an omission and the rest of the batch continues.
pub fn compute_conflicts(
    scenario: &Scenario,
    trajectories: &BTreeMap<String, Trajectory>,
    params: &ConflictParams,
) -> ConflictReport {
    let pairs = scenario.aircraft_pairs();
    info!(
        aircraft = scenario.flightpaths().len(),
        pairs = pairs.len(),
        "computing conflicts"
    );

    let run = || {
        pairs
            .par_iter()
            .map(|&(a, b)| (a, b, evaluate_pair(scenario, trajectories, a, b, params)))
            .collect::<Vec<_>>()
    };
    let outcomes = match worker_pool(params) {
        Ok(pool) => pool.install(run),
        Err(err) => {
            warn!(error = %err, "using the global worker pool");
            run()
        }
    };

    let mut report = ConflictReport::default();
    for (a, b, outcome) in outcomes {
        match outcome {
            Ok(tables) => report.tables.extend(tables),
            Err(err) => {
                warn!(aircraft_a = a, aircraft_b = b, error = %err, "pair omitted");
                report.omissions.push(Omission {
                    aircraft_a: a.to_string(),
                    aircraft_b: b.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        tables = report.tables.len(),
        omissions = report.omissions.len(),
        "conflict computation finished"
    );
    report
}

fn worker_pool(params: &ConflictParams) -> Result<rayon::ThreadPool, ConflictError> {
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("conflict-worker-{i}"));
    if let Some(threads) = params.worker_threads {
        builder = builder.num_threads(threads);
    }
    builder
        .build()
        .map_err(|err| ConflictError::WorkerPool(err.to_string()))
}

fn evaluate_pair(
    scenario: &Scenario,
    trajectories: &BTreeMap<String, Trajectory>,
    a: &str,
    b: &str,
    params: &ConflictParams,
) -> Result<Vec<(ConflictKey, ConflictTable)>, ConflictError> {
    let interactions = scenario.interactions(a, b, params)?;
    if interactions.is_empty() {
        return Ok(Vec::new());
    }

    let evaluator = ConflictEvaluator::new(
        track(scenario, trajectories, a)?,
        track(scenario, trajectories, b)?,
        scenario.sector(),
        scenario.crossing_points(),
        params,
    );

    let mut tables = Vec::with_capacity(interactions.crossings.len() + interactions.overlaps.len());
    for (index, (segments, crossing)) in interactions.crossings.iter().enumerate() {
        tables.push((
            ConflictKey::new(a, b, InteractionKind::Crossing, index),
            evaluator.evaluate_crossing(*segments, crossing),
        ));
    }
    for (index, (segments, overlap)) in interactions.overlaps.iter().enumerate() {
        tables.push((
            ConflictKey::new(a, b, InteractionKind::Overlap, index),
            evaluator.evaluate_overlap(*segments, overlap)?,
        ));
    }

    debug!(
        aircraft_a = a,
        aircraft_b = b,
        crossings = interactions.crossings.len(),
        overlaps = interactions.overlaps.len(),
        "pair evaluated"
    );
    Ok(tables)
}

fn track<'a>(
    scenario: &'a Scenario,
    trajectories: &'a BTreeMap<String, Trajectory>,
    aircraft: &str,
) -> Result<AircraftTrack<'a>, ConflictError> {
    Ok(AircraftTrack {
        flightpath: scenario
            .flightpath(aircraft)
            .ok_or_else(|| ConflictError::MissingFlightpath(aircraft.to_string()))?,
        trajectory: trajectories
            .get(aircraft)
            .ok_or_else(|| ConflictError::MissingTrajectory(aircraft.to_string()))?,
    })
}
