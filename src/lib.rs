//! # footstep_planning
//!
//! A footstep planner for bipedal robots. Candidate footsteps live on a lattice in x, y and
//! yaw and are searched with
//! [A*](https://en.wikipedia.org/wiki/A*_search_algorithm). Every candidate is snapped onto
//! the terrain, which is either a list of planar regions or a height map, and then runs
//! through an ordered pipeline of checkers for
//! reachability, foothold support and collisions before it is added to the search graph.
//!
//! ```
//! use footstep_planning::{
//!     feet_around, FootstepPlanner, FootstepPlannerGoal, FootstepPlannerParameters,
//!     FootstepPlannerRequest, PlannerStatus, Terrain,
//! };
//! use nalgebra::Isometry3;
//!
//! let parameters = FootstepPlannerParameters::default();
//! let (left, right) = feet_around(&Isometry3::identity(), parameters.ideal_step_width);
//! let goal = FootstepPlannerGoal::PoseBetweenFeet(Isometry3::translation(0.6, 0.0, 0.0));
//! let request = FootstepPlannerRequest::new(left, right, goal, Terrain::FlatGround { height: 0.0 });
//!
//! let mut planner = FootstepPlanner::new(parameters);
//! let output = planner.plan(request).unwrap();
//! assert_eq!(output.status, PlannerStatus::SolutionFound);
//! assert!(!output.plan.is_empty());
//! ```
pub mod checker;
pub mod cost;
pub mod error;
pub mod expansion;
pub mod geometry;
pub mod graph;
pub mod listener;
pub mod node;
pub mod parameters;
pub mod plan;
pub mod planner;
mod search;
pub mod snapper;
pub mod terrain;

pub use checker::{FootstepNodeChecker, NodeCheckerPipeline, RejectionReason};
pub use error::{PlannerError, Result};
pub use geometry::ConvexPolygon2D;
pub use graph::FootstepGraph;
pub use listener::{
    FootstepPlannerListener, PlannerProgressSnapshot, SearchProgress, ThrottledProgressListener,
};
pub use node::{FootstepNode, RobotSide, GRID_SIZE_XY, YAW_DIVISIONS, YAW_RESOLUTION};
pub use parameters::FootstepPlannerParameters;
pub use plan::{FootstepPlan, PlannedFootstep};
pub use planner::{
    feet_around, CancellationToken, FootstepPlanner, FootstepPlannerGoal, FootstepPlannerOutput,
    FootstepPlannerRequest, PlannerState, PlannerStatistics, PlannerStatus, SearchBudget,
};
pub use snapper::{FootstepNodeSnapData, FootstepNodeSnapper};
pub use terrain::{HeightMap, PlanarRegion, PlanarRegionsList, Terrain};
