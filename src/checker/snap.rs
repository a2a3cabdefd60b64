use super::{CheckerContext, FootstepNodeChecker, RejectionReason};
use crate::node::FootstepNode;
use nalgebra::Vector3;

/// Rejects candidates that did not land on any surface or landed on one that is too steep.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapValidityChecker;

impl FootstepNodeChecker for SnapValidityChecker {
    fn name(&self) -> &'static str {
        "snap validity"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        _stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        let pose = ctx
            .snapper
            .snap_transform(candidate)
            .ok_or(RejectionReason::CouldNotSnap)?;
        let up = pose.rotation * Vector3::z();
        if up.z < ctx.parameters.max_surface_incline.cos() {
            return Err(RejectionReason::SurfaceTooSteep);
        }
        Ok(())
    }
}
