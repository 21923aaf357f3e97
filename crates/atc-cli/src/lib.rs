//! ATC CLI - batch conflict computation for recorded traffic scenarios.
//!
//! - `scenario_file`: JSON scenario format and conversion into engine inputs
//! - `demos`: built-in scenarios for quick runs
//! - `report`: JSON rendering of conflict reports

pub mod demos;
pub mod report;
pub mod scenario_file;

pub use report::ReportFile;
pub use scenario_file::{LoadedScenario, ScenarioFile};
