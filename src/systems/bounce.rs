//! Bounce budget and decay policy.
//!
//! A projectile is `Flying` until it hits a surface. An accepted bounce puts it
//! in `Bouncing` for the rest of that tick; the next tick returns it to
//! `Flying`. Lifetime and speed cutoffs are checked at the start of a tick,
//! before any motion. Bounce exhaustion is only checked when a surface is
//! actually hit, so a projectile with no budget left keeps flying straight
//! until its next surface contact.

use bevy::prelude::*;

use crate::components::RicochetProjectile;
use crate::resources::BounceConfig;
use crate::types::TerminationReason;

/// Distance a projectile is pushed off a surface after bouncing, so the next
/// sweep does not start inside the same contact.
pub const BOUNCE_EPSILON: f32 = 0.015;

/// Lifecycle state of a projectile.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Reflect)]
pub enum FlightPhase {
    #[default]
    Flying,
    /// Reflected during the current tick
    Bouncing,
    Terminated(TerminationReason),
}

/// Start-of-tick cutoffs: lifetime first, then minimum speed.
pub fn check_cutoffs(projectile: &RicochetProjectile) -> Option<TerminationReason> {
    let config = &projectile.config;
    if projectile.elapsed >= config.max_lifetime {
        return Some(TerminationReason::LifetimeExpired);
    }
    let min_speed = config.min_speed_to_continue;
    if projectile.velocity.length_squared() < min_speed * min_speed {
        return Some(TerminationReason::BelowMinimumSpeed);
    }
    None
}

/// Whether a surface hit right now would terminate instead of bounce.
pub fn budget_exhausted(projectile: &RicochetProjectile) -> bool {
    projectile.bounces_used >= projectile.config.max_bounces
}

/// Speed after one bounce, floored at half the minimum continue speed.
pub fn decayed_speed(speed: f32, config: &BounceConfig) -> f32 {
    let loss = config.speed_loss_per_bounce.clamp(0.0, 1.0);
    (speed * (1.0 - loss)).max(config.min_speed_to_continue * 0.5)
}

pub fn decayed_damage(damage: f32, config: &BounceConfig) -> f32 {
    damage * (1.0 - config.damage_loss_per_bounce.clamp(0.0, 1.0))
}

/// Outcome of a surface contact.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BounceVerdict {
    Bounced,
    Exhausted,
}

/// Applies a surface contact at `hit_point` with outgoing `direction`.
///
/// With budget left: decays speed and damage, consumes one bounce, and places
/// the projectile [`BOUNCE_EPSILON`] along the new direction from the hit
/// point. Without budget: snaps to the hit point and terminates.
pub fn apply_bounce(projectile: &mut RicochetProjectile, hit_point: Vec3, direction: Vec3) -> BounceVerdict {
    if budget_exhausted(projectile) {
        projectile.position = hit_point;
        projectile.phase = FlightPhase::Terminated(TerminationReason::BouncesExhausted);
        return BounceVerdict::Exhausted;
    }

    let direction = direction.try_normalize().unwrap_or(Vec3::Y);
    let speed = decayed_speed(projectile.speed(), &projectile.config);

    projectile.velocity = direction * speed;
    projectile.damage = decayed_damage(projectile.damage, &projectile.config);
    projectile.bounces_used += 1;
    projectile.position = hit_point + direction * BOUNCE_EPSILON;
    projectile.phase = FlightPhase::Bouncing;
    BounceVerdict::Bounced
}
