//! Scenario files: sector, standard flows, aircraft routes and recorded
//! state updates in one JSON document.

use anyhow::{Context, Result};
use atc_conflicts::{
    standard_crossing_points, trajectories_from_calls, CallUpdate, ConflictParams, Flightpath,
    Flow, Point, Scenario, Sector, Trajectory,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A standard flow with its nominal route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowRoute {
    pub name: String,
    #[serde(default)]
    pub route: Vec<Point>,
    #[serde(default)]
    pub aircraft: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub name: String,
    pub sector: Vec<Point>,
    #[serde(default)]
    pub flows: Vec<FlowRoute>,
    /// Explicit crossing points; derived from the flow routes when absent
    #[serde(default)]
    pub crossing_points: Option<Vec<Point>>,
    /// Route of every aircraft
    #[serde(default)]
    pub aircraft: BTreeMap<String, Vec<Point>>,
    #[serde(default)]
    pub calls: Vec<CallUpdate>,
    #[serde(default)]
    pub params: Option<ConflictParams>,
}

/// Engine inputs built from a scenario file.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub name: String,
    pub scenario: Scenario,
    pub trajectories: BTreeMap<String, Trajectory>,
    /// Aircraft dropped because their route could not be built
    pub skipped: Vec<String>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Validate the file and convert it into engine inputs.
    ///
    /// An invalid sector fails the whole scenario; an invalid aircraft route
    /// only drops that aircraft. The sector takes its boundary tolerance
    /// from `params`.
    pub fn build(&self, params: &ConflictParams) -> Result<LoadedScenario> {
        let sector = Sector::new(self.sector.clone())
            .context("invalid sector polygon")?
            .with_tolerance(params.sector_tolerance_nm);
        let crossing_points = match &self.crossing_points {
            Some(points) => points.clone(),
            None => self.flow_crossing_points(),
        };
        let flows = self
            .flows
            .iter()
            .map(|flow| Flow {
                name: flow.name.clone(),
                aircraft: flow.aircraft.clone(),
            })
            .collect();

        let mut scenario = Scenario::new(sector)
            .with_flows(flows)
            .with_crossing_points(crossing_points);
        let mut skipped = Vec::new();
        for (name, waypoints) in &self.aircraft {
            if let Err(err) = scenario.add_waypoints(name.clone(), waypoints.clone()) {
                warn!(aircraft = %name, error = %err, "skipping aircraft");
                skipped.push(name.clone());
            }
        }

        let trajectories = trajectories_from_calls(&self.calls, scenario.sector());
        debug!(
            aircraft = scenario.flightpaths().len(),
            trajectories = trajectories.len(),
            crossing_points = scenario.crossing_points().len(),
            "scenario loaded"
        );

        Ok(LoadedScenario {
            name: self.name.clone(),
            scenario,
            trajectories,
            skipped,
        })
    }

    fn flow_crossing_points(&self) -> Vec<Point> {
        let routes: BTreeMap<String, Flightpath> = self
            .flows
            .iter()
            .filter(|flow| !flow.route.is_empty())
            .filter_map(|flow| match Flightpath::new(flow.route.clone()) {
                Ok(path) => Some((flow.name.clone(), path)),
                Err(err) => {
                    warn!(flow = %flow.name, error = %err, "ignoring flow route");
                    None
                }
            })
            .collect();
        standard_crossing_points(&routes).into_values().collect()
    }
}
