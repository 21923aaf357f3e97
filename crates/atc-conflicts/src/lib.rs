pub mod conflict;
pub mod error;
pub mod interaction;
pub mod kinematics;
pub mod models;
pub mod rules;
pub mod scenario;
pub mod spatial;

pub use conflict::{
    crossing_point_distance, overlap_direction, AircraftTrack, ConflictEvaluator, ConflictRow,
    ConflictSource, ConflictTable, InteractionKind, OverlapDirection,
};
pub use error::ConflictError;
pub use interaction::{detect_interactions, merge_overlaps, Crossing, Interactions, Overlap, SegmentPair};
pub use models::{
    same_flow, trajectories_from_calls, CallUpdate, Flightpath, Flow, Point, Sector, Segment,
    Trajectory, TrajectorySample, Waypoint,
};
pub use rules::ConflictParams;
pub use scenario::{
    compute_conflicts, potential_interactions, ConflictKey, ConflictReport, Omission, Scenario,
};
pub use spatial::{segment_intersection, standard_crossing_points};
