//! Error types for footstep planning

use crate::node::FootstepNode;
use thiserror::Error;

/// Errors that stop a planning request before or outside of the search. An unreachable goal,
/// an exhausted budget or a cancelled search are not errors, see
/// [PlannerStatus](crate::planner::PlannerStatus).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Non-finite {what} pose")]
    NonFinitePose { what: &'static str },

    #[error("Terrain contains no supporting surface")]
    EmptyTerrain,

    #[error("Invalid terrain: {0}")]
    InvalidTerrain(String),

    #[error("No interrupted search to resume")]
    NothingToResume,

    #[error("Node {0} was never added to the footstep graph")]
    NodeNotInGraph(FootstepNode),

    #[error("Node {0} has no snap transform")]
    MissingSnapData(FootstepNode),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RobotSide;

    #[test]
    fn test_error_display() {
        let err = PlannerError::InvalidParameter {
            name: "max_step_reach",
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid parameter `max_step_reach`: must be positive"
        );
        let node = FootstepNode::new(1, -2, 0, RobotSide::Left);
        assert_eq!(
            format!("{}", PlannerError::NodeNotInGraph(node)),
            "Node left (1, -2, 0) was never added to the footstep graph"
        );
    }
}
