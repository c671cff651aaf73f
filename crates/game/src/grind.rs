//! Grind-rail attachment.
//!
//! Air states call [`find_grind_rail`] after moving. A rail is accepted only
//! when every check in [`evaluate_rail`] passes, in this order: not already
//! grinding, falling, away from the rail ends, no wall ahead, inside the
//! vertical window, inside the lateral tolerance.

use glam::Vec3;
use thiserror::Error;

use railrunner_physics::CollisionSolver;

use crate::character::{CharacterContext, GrindBinding};
use crate::level::{GrindRail, Level};

/// Margin below the rail allowed on top of this tick's fall distance.
const VERTICAL_SLACK: f32 = 0.05;

/// Why a rail was not attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GrindRejection {
    #[error("already grinding")]
    AlreadyGrinding,
    #[error("not falling")]
    NotFalling,
    #[error("too close to the rail end")]
    NearRailEnd,
    #[error("wall ahead")]
    WallAhead,
    #[error("vertical gap too large")]
    VerticalGap,
    #[error("lateral offset too large")]
    LateralOffset,
}

/// Where an accepted rail would be attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RailContact {
    pub rail_id: u32,
    /// Closest point on the rail.
    pub point: Vec3,
    /// Travel runs against the curve direction.
    pub reversed: bool,
    /// Distance from the character to `point`.
    pub distance: f32,
}

/// Run the attach checks for one rail.
pub fn evaluate_rail(
    ctx: &CharacterContext,
    level: &Level,
    rail: &GrindRail,
    stepping: bool,
) -> Result<RailContact, GrindRejection> {
    let config = &ctx.config.rail;
    let pose = &ctx.pose;

    if ctx.grind.is_some() {
        return Err(GrindRejection::AlreadyGrinding);
    }

    let landing_grind = config.allow_landing_grind && pose.flags.just_landed();
    if pose.vertical_speed >= 0.0 && !landing_grind {
        return Err(GrindRejection::NotFalling);
    }

    let curve = &rail.curve;
    let offset = curve.closest_offset(pose.position);
    if !curve.is_closed()
        && (offset < config.end_fudge || offset > curve.length() - config.end_fudge)
    {
        return Err(GrindRejection::NearRailEnd);
    }

    let point = curve.sample_position(offset);
    let tangent = curve.sample_tangent(offset);
    let travel = pose.velocity();
    let reversed = tangent.dot(travel) < 0.0;
    let direction = if reversed { -tangent } else { tangent };

    let solver = CollisionSolver::new(&level.collision, &ctx.config.solver);
    if solver.wall_ahead(pose, direction, config.wall_check_distance) {
        return Err(GrindRejection::WallAhead);
    }

    let up = curve.sample_up(offset);
    let delta = pose.position - point;
    let gap = delta.dot(up);
    if !landing_grind {
        let fall_distance = (-pose.vertical_speed).max(0.0) * ctx.dt;
        if gap < -(fall_distance + VERTICAL_SLACK) || gap > config.vertical_tolerance {
            return Err(GrindRejection::VerticalGap);
        }
    }

    let lateral = delta - up * gap - tangent * delta.dot(tangent);
    let tolerance = if stepping {
        config.step_lateral_tolerance
    } else {
        config.lateral_tolerance
    };
    if lateral.length() > tolerance {
        return Err(GrindRejection::LateralOffset);
    }

    Ok(RailContact {
        rail_id: rail.id,
        point,
        reversed,
        distance: delta.length(),
    })
}

/// Nearest rail that accepts the character, skipping `exclude`.
pub fn find_grind_rail(
    ctx: &CharacterContext,
    level: &Level,
    stepping: bool,
    exclude: Option<u32>,
) -> Option<GrindBinding> {
    let mut best: Option<(RailContact, &GrindRail)> = None;

    for rail in level.rails.iter().filter(|rail| Some(rail.id) != exclude) {
        match evaluate_rail(ctx, level, rail, stepping) {
            Ok(contact) => {
                if best.map_or(true, |(current, _)| contact.distance < current.distance) {
                    best = Some((contact, rail));
                }
            }
            Err(reason) => log::trace!("rail {} rejected: {}", rail.id, reason),
        }
    }

    let (contact, rail) = best?;
    Some(GrindBinding::new(
        contact.rail_id,
        rail.curve.clone(),
        contact.reversed,
        contact.point,
    ))
}
