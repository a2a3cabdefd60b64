use super::{CheckerContext, FootstepNodeChecker, RejectionReason};
use crate::node::FootstepNode;

/// Tolerance on the foothold ratio, so a full foothold never fails on rounding.
const AREA_RATIO_EPSILON: f64 = 1e-4;

/// Rejects candidates whose supported area is below `min_foothold_percent` of the foot.
#[derive(Clone, Copy, Debug, Default)]
pub struct FootholdAreaChecker;

impl FootstepNodeChecker for FootholdAreaChecker {
    fn name(&self) -> &'static str {
        "foothold area"
    }

    fn check(
        &self,
        candidate: &FootstepNode,
        _stance: Option<&FootstepNode>,
        ctx: &mut CheckerContext<'_>,
    ) -> Result<(), RejectionReason> {
        let foot_area = ctx.snapper.foot_polygon().area();
        let data = ctx.snapper.snap(candidate);
        if !data.is_snapped() {
            return Err(RejectionReason::CouldNotSnap);
        }
        let ratio = data.foothold.area() / foot_area;
        if ratio < ctx.parameters.min_foothold_percent - AREA_RATIO_EPSILON {
            return Err(RejectionReason::FootholdAreaTooSmall);
        }
        Ok(())
    }
}
