//! Reflection engine - mirror reflection with optional target bias.

use bevy::prelude::*;

use crate::world::TargetProbe;

/// Interpolation weight toward a bias target. Fixed by design; not part of
/// [`BounceConfig`](crate::resources::BounceConfig).
pub const BIAS_WEIGHT: f32 = 0.85;

/// Unit normal, or `Vec3::Y` when `normal` is zero or not finite.
pub fn sanitize_normal(normal: Vec3) -> Vec3 {
    normal.try_normalize().unwrap_or(Vec3::Y)
}

/// Mirror reflection of `incoming` about `normal`: `in - 2(in·n)n`.
///
/// The result is unit length and satisfies `out·n == -(in·n)` for unit
/// inputs. A zero incoming direction reflects to the normal itself.
///
/// # Example
/// ```
/// use bevy::prelude::*;
/// use bevy_ricochet::systems::reflection::reflect;
///
/// let out = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
/// assert!((out - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
/// ```
pub fn reflect(incoming: Vec3, normal: Vec3) -> Vec3 {
    let n = sanitize_normal(normal);
    let Some(d) = incoming.try_normalize() else {
        return n;
    };
    (d - 2.0 * d.dot(n) * n).try_normalize().unwrap_or(n)
}

/// Spherical interpolation between two directions.
///
/// `t = 0` returns `from`, `t = 1` returns `to`. Antiparallel inputs rotate
/// about an arbitrary perpendicular axis.
pub fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let (Some(from), Some(to)) = (from.try_normalize(), to.try_normalize()) else {
        return from.normalize_or_zero();
    };
    let arc = Quat::from_rotation_arc(from, to);
    (Quat::IDENTITY.slerp(arc, t) * from).normalize()
}

/// Best bias candidate and its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiasChoice {
    pub target: TargetProbe,
    /// Unit direction from the bounce point to the target
    pub direction: Vec3,
    /// `mirror · direction`
    pub score: f32,
}

/// Picks the candidate best aligned with the mirror direction.
///
/// Candidates must already be filtered for allegiance. Only those scoring
/// strictly above `cos(aim_cone_degrees)` qualify; ties keep the first seen.
///
/// # Arguments
/// * `mirror` - Unbiased reflected direction (unit)
/// * `origin` - Bounce point
/// * `aim_cone_degrees` - Half-angle of the acceptance cone
/// * `candidates` - Targets within the search radius
pub fn select_bias_target(
    mirror: Vec3,
    origin: Vec3,
    aim_cone_degrees: f32,
    candidates: impl IntoIterator<Item = TargetProbe>,
) -> Option<BiasChoice> {
    let threshold = aim_cone_degrees.to_radians().cos();
    let mut best: Option<BiasChoice> = None;

    for target in candidates {
        let Some(direction) = (target.position - origin).try_normalize() else {
            continue;
        };
        let score = mirror.dot(direction);
        if score <= threshold {
            continue;
        }
        if best.is_none_or(|b| score > b.score) {
            best = Some(BiasChoice {
                target,
                direction,
                score,
            });
        }
    }
    best
}

/// Outgoing direction of one bounce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reflection {
    /// Final unit direction
    pub direction: Vec3,
    /// Pure mirror reflection before bias
    pub mirror: Vec3,
    /// Target the direction was bent toward
    pub biased_toward: Option<Entity>,
}

/// Mirror reflection, bent [`BIAS_WEIGHT`] of the way toward the best
/// candidate when one qualifies.
pub fn biased_reflection(
    incoming: Vec3,
    normal: Vec3,
    origin: Vec3,
    aim_cone_degrees: f32,
    candidates: impl IntoIterator<Item = TargetProbe>,
) -> Reflection {
    let mirror = reflect(incoming, normal);
    match select_bias_target(mirror, origin, aim_cone_degrees, candidates) {
        Some(choice) => Reflection {
            direction: slerp_direction(mirror, choice.direction, BIAS_WEIGHT),
            mirror,
            biased_toward: Some(choice.target.entity),
        },
        None => Reflection {
            direction: mirror,
            mirror,
            biased_toward: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LayerMask;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_unit(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if let Some(unit) = v.try_normalize() {
                return unit;
            }
        }
    }

    fn probe(entity: Entity, position: Vec3) -> TargetProbe {
        TargetProbe {
            entity,
            position,
            layers: LayerMask::layer(4),
        }
    }

    #[test]
    fn test_reflection_law_holds_for_sampled_directions() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let d = random_unit(&mut rng);
            let n = random_unit(&mut rng);
            let out = reflect(d, n);

            assert!((out.length() - 1.0).abs() < 1e-4);
            assert!((out.dot(n) + d.dot(n)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_head_on_reflection_reverses() {
        let out = reflect(Vec3::Z, Vec3::NEG_Z);
        assert!((out - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_zero_normal_defaults_to_up() {
        assert_eq!(sanitize_normal(Vec3::ZERO), Vec3::Y);
        let out = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::ZERO);
        assert!((out - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = Vec3::X;
        let b = Vec3::Y;
        assert!((slerp_direction(a, b, 0.0) - a).length() < 1e-5);
        assert!((slerp_direction(a, b, 1.0) - b).length() < 1e-5);
        let mid = slerp_direction(a, b, 0.5);
        assert!((mid.angle_between(a) - mid.angle_between(b)).abs() < 1e-4);
    }

    #[test]
    fn test_bias_weights_toward_target() {
        let mut world = World::new();
        let target = world.spawn_empty().id();

        // Mirror of (0,0,1) off (0,0,-1) is (0,0,-1); target sits 20 degrees off it.
        let angle = 20f32.to_radians();
        let target_pos = Vec3::new(angle.sin(), 0.0, -angle.cos()) * 5.0;
        let result = biased_reflection(Vec3::Z, Vec3::NEG_Z, Vec3::ZERO, 30.0, [probe(target, target_pos)]);

        assert_eq!(result.biased_toward, Some(target));
        let to_target = target_pos.normalize();
        let total = result.mirror.angle_between(to_target);
        let travelled = result.mirror.angle_between(result.direction);
        assert!((travelled / total - BIAS_WEIGHT).abs() < 1e-3);
    }

    #[test]
    fn test_bias_ignores_targets_outside_cone() {
        let mut world = World::new();
        let target = world.spawn_empty().id();

        let result = biased_reflection(Vec3::Z, Vec3::NEG_Z, Vec3::ZERO, 30.0, [probe(target, Vec3::X * 5.0)]);

        assert_eq!(result.biased_toward, None);
        assert_eq!(result.direction, result.mirror);
    }

    #[test]
    fn test_bias_picks_best_aligned() {
        let mut world = World::new();
        let near_axis = world.spawn_empty().id();
        let off_axis = world.spawn_empty().id();

        let choice = select_bias_target(
            Vec3::NEG_Z,
            Vec3::ZERO,
            45.0,
            [
                probe(off_axis, Vec3::new(2.0, 0.0, -4.0)),
                probe(near_axis, Vec3::new(0.2, 0.0, -6.0)),
            ],
        );

        assert_eq!(choice.map(|c| c.target.entity), Some(near_axis));
    }

    #[test]
    fn test_no_candidates_is_plain_mirror() {
        let result = biased_reflection(Vec3::new(1.0, -1.0, 0.0), Vec3::Y, Vec3::ZERO, 30.0, std::iter::empty());
        assert_eq!(result.biased_toward, None);
        assert_eq!(result.direction, result.mirror);
    }
}
