//! Configuration and global resources for the ricochet system.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{Faction, LayerMask};

/// Upper bound on ownership-chain walks.
///
/// Scene hierarchies are far shallower than this; hitting the bound means the
/// table contains a cycle.
pub const MAX_OWNERSHIP_DEPTH: usize = 64;

/// Immutable per-weapon bounce configuration.
///
/// Supplied at projectile creation and shared read-only (behind an `Arc`) by
/// every projectile fired with it.
///
/// # Fields
/// * `initial_speed` - Muzzle speed in units per second
/// * `initial_damage` - Damage carried before any bounce
/// * `max_bounces` - Surface reflections allowed before the projectile dies
/// * `speed_loss_per_bounce` - Fraction of speed lost per bounce, in [0, 1]
/// * `damage_loss_per_bounce` - Fraction of damage lost per bounce, in [0, 1]
/// * `surface_mask` - Layers that reflect the projectile
/// * `target_mask` - Layers that receive damage
/// * `ignore_mask` - Layers the projectile always passes through
/// * `bias_toward_targets` - Bend reflections toward nearby targets
/// * `aim_cone_degrees` - Half-angle of the bias cone
/// * `target_search_radius` - Radius around the bounce point searched for targets
/// * `min_speed_to_continue` - Projectiles slower than this are terminated
/// * `max_lifetime` - Seconds before the projectile expires
/// * `probe_radius` - Sweep radius; zero means a plain ray
///
/// # Example
/// ```
/// use bevy_ricochet::resources::BounceConfig;
/// use bevy_ricochet::types::LayerMask;
///
/// let config = BounceConfig::default()
///     .with_bounces(2)
///     .with_decay(0.2, 0.25)
///     .with_masks(LayerMask::layer(1), LayerMask::layer(4), LayerMask::NONE);
///
/// assert_eq!(config.max_bounces, 2);
/// assert_eq!(config.damage_loss_per_bounce, 0.25);
/// ```
#[derive(Clone, Debug, PartialEq, Reflect, Serialize, Deserialize)]
pub struct BounceConfig {
    pub initial_speed: f32,
    pub initial_damage: f32,
    pub max_bounces: u32,
    pub speed_loss_per_bounce: f32,
    pub damage_loss_per_bounce: f32,
    pub surface_mask: LayerMask,
    pub target_mask: LayerMask,
    pub ignore_mask: LayerMask,
    pub bias_toward_targets: bool,
    pub aim_cone_degrees: f32,
    pub target_search_radius: f32,
    pub min_speed_to_continue: f32,
    pub max_lifetime: f32,
    pub probe_radius: f32,
}

impl Default for BounceConfig {
    /// A three-bounce ricochet round with target bias enabled.
    ///
    /// Masks are left empty, which makes the classifier fall back to
    /// [`RicochetSettings::fallback_layers`].
    fn default() -> Self {
        Self {
            initial_speed: 40.0,
            initial_damage: 20.0,
            max_bounces: 3,
            speed_loss_per_bounce: 0.1,
            damage_loss_per_bounce: 0.15,
            surface_mask: LayerMask::NONE,
            target_mask: LayerMask::NONE,
            ignore_mask: LayerMask::NONE,
            bias_toward_targets: true,
            aim_cone_degrees: 25.0,
            target_search_radius: 8.0,
            min_speed_to_continue: 2.0,
            max_lifetime: 5.0,
            probe_radius: 0.0,
        }
    }
}

impl BounceConfig {
    /// Builder pattern: set muzzle speed and starting damage.
    pub fn with_launch(mut self, speed: f32, damage: f32) -> Self {
        self.initial_speed = speed;
        self.initial_damage = damage;
        self
    }

    /// Builder pattern: set the bounce budget.
    pub fn with_bounces(mut self, max_bounces: u32) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    /// Builder pattern: set per-bounce speed and damage loss fractions.
    pub fn with_decay(mut self, speed_loss: f32, damage_loss: f32) -> Self {
        self.speed_loss_per_bounce = speed_loss;
        self.damage_loss_per_bounce = damage_loss;
        self
    }

    /// Builder pattern: set surface, target and ignore masks.
    pub fn with_masks(mut self, surface: LayerMask, target: LayerMask, ignore: LayerMask) -> Self {
        self.surface_mask = surface;
        self.target_mask = target;
        self.ignore_mask = ignore;
        self
    }

    /// Builder pattern: configure reflection bias.
    ///
    /// Bias only happens when `enabled` is set and both the cone and the
    /// radius are positive.
    pub fn with_bias(mut self, enabled: bool, aim_cone_degrees: f32, search_radius: f32) -> Self {
        self.bias_toward_targets = enabled;
        self.aim_cone_degrees = aim_cone_degrees;
        self.target_search_radius = search_radius;
        self
    }

    /// Builder pattern: set minimum speed and lifetime cutoffs.
    pub fn with_cutoffs(mut self, min_speed: f32, max_lifetime: f32) -> Self {
        self.min_speed_to_continue = min_speed;
        self.max_lifetime = max_lifetime;
        self
    }

    /// Builder pattern: sweep a sphere instead of a ray.
    pub fn with_probe_radius(mut self, radius: f32) -> Self {
        self.probe_radius = radius;
        self
    }

    /// Whether reflection bias should run at all.
    pub fn bias_active(&self) -> bool {
        self.bias_toward_targets && self.target_search_radius > 0.0 && self.aim_cone_degrees > 0.0
    }

    /// Returns a copy with every field forced into its valid range.
    ///
    /// Loss fractions are clamped to [0, 1]; negative or non-finite
    /// magnitudes are reset to zero (or to the default for lifetime). A
    /// warning is logged when anything had to change.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let fraction = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let magnitude = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };

        let clean = Self {
            initial_speed: magnitude(self.initial_speed),
            initial_damage: magnitude(self.initial_damage),
            speed_loss_per_bounce: fraction(self.speed_loss_per_bounce),
            damage_loss_per_bounce: fraction(self.damage_loss_per_bounce),
            aim_cone_degrees: magnitude(self.aim_cone_degrees).min(180.0),
            target_search_radius: magnitude(self.target_search_radius),
            min_speed_to_continue: magnitude(self.min_speed_to_continue),
            max_lifetime: if self.max_lifetime.is_finite() && self.max_lifetime > 0.0 {
                self.max_lifetime
            } else {
                defaults.max_lifetime
            },
            probe_radius: magnitude(self.probe_radius),
            ..self.clone()
        };

        if clean != *self {
            warn!("bounce config had out-of-range values and was clamped: {:?}", self);
        }
        clean
    }
}

/// Presets for common projectile kinds.
pub mod presets {
    use super::*;

    /// Plain bullet: dies on the first surface, no bias.
    pub fn bullet() -> BounceConfig {
        BounceConfig {
            initial_speed: 80.0,
            initial_damage: 25.0,
            max_bounces: 0,
            bias_toward_targets: false,
            ..Default::default()
        }
    }

    /// Ricochet round: several bounces, mild decay, no bias.
    pub fn ricochet_round() -> BounceConfig {
        BounceConfig {
            initial_speed: 50.0,
            initial_damage: 18.0,
            max_bounces: 4,
            speed_loss_per_bounce: 0.15,
            damage_loss_per_bounce: 0.2,
            bias_toward_targets: false,
            ..Default::default()
        }
    }

    /// Seeker round: fewer bounces, strong bias in a wide cone.
    pub fn seeker_round() -> BounceConfig {
        BounceConfig {
            initial_speed: 35.0,
            initial_damage: 22.0,
            max_bounces: 2,
            speed_loss_per_bounce: 0.1,
            damage_loss_per_bounce: 0.1,
            bias_toward_targets: true,
            aim_cone_degrees: 40.0,
            target_search_radius: 12.0,
            ..Default::default()
        }
    }
}

/// Global switches for the ricochet system.
///
/// # Fields
/// * `fallback_layers` - Layers used when a config leaves both target and surface masks empty
/// * `max_pass_through` - Ignorable hits a projectile may pass through in one tick
/// * `debug_draw` - Draw projectile gizmos
#[derive(Resource, Reflect, Clone, Debug)]
#[reflect(Resource)]
pub struct RicochetSettings {
    pub fallback_layers: LayerMask,
    pub max_pass_through: u32,
    pub debug_draw: bool,
}

impl Default for RicochetSettings {
    fn default() -> Self {
        Self {
            fallback_layers: LayerMask::ALL,
            max_pass_through: 4,
            debug_draw: false,
        }
    }
}

/// Faction hostility matrix.
///
/// Symmetric by construction. Two entities are allies when their factions are
/// not hostile to each other; allies never damage one another.
///
/// # Example
/// ```
/// use bevy_ricochet::resources::FactionTable;
/// use bevy_ricochet::types::Faction;
///
/// let mut table = FactionTable::default();
/// assert!(table.is_hostile(Faction::Player, Faction::Enemy));
///
/// table.set_hostility(Faction::Player, Faction::Neutral, false);
/// assert!(table.is_ally(Faction::Neutral, Faction::Player));
/// ```
#[derive(Resource, Clone, Debug)]
pub struct FactionTable {
    hostile: [[bool; Faction::COUNT]; Faction::COUNT],
}

impl Default for FactionTable {
    /// Every faction is friendly to itself and hostile to every other.
    fn default() -> Self {
        let mut hostile = [[true; Faction::COUNT]; Faction::COUNT];
        for (i, row) in hostile.iter_mut().enumerate() {
            row[i] = false;
        }
        Self { hostile }
    }
}

impl FactionTable {
    pub fn is_hostile(&self, a: Faction, b: Faction) -> bool {
        self.hostile[a.index()][b.index()]
    }

    pub fn is_ally(&self, a: Faction, b: Faction) -> bool {
        !self.is_hostile(a, b)
    }

    /// Sets hostility in both directions.
    pub fn set_hostility(&mut self, a: Faction, b: Faction, hostile: bool) {
        self.hostile[a.index()][b.index()] = hostile;
        self.hostile[b.index()][a.index()] = hostile;
    }

    /// Ally test for optional factions. Unaffiliated entities are nobody's ally.
    pub fn allied(&self, a: Option<Faction>, b: Option<Faction>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.is_ally(a, b),
            _ => false,
        }
    }
}

/// Entity → owning entity lookup.
///
/// Colliders, hitboxes and other sub-parts point at the entity that owns them;
/// actors sit at the top of their chain with no owner. Maintained by the world
/// (see [`sync_ownership_table`](crate::systems::hierarchy::sync_ownership_table))
/// and queried by the damage resolver instead of walking a live scene graph.
#[derive(Resource, Default, Clone, Debug)]
pub struct OwnershipTable {
    owners: HashMap<Entity, Entity>,
}

impl OwnershipTable {
    /// Records `owner` as the direct owner of `entity`.
    pub fn set_owner(&mut self, entity: Entity, owner: Entity) {
        if entity != owner {
            self.owners.insert(entity, owner);
        }
    }

    /// Forgets `entity`, making it a chain root.
    pub fn remove(&mut self, entity: Entity) {
        self.owners.remove(&entity);
    }

    pub fn owner_of(&self, entity: Entity) -> Option<Entity> {
        self.owners.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Topmost owner of `entity` (the entity itself when it has none).
    ///
    /// Stops after [`MAX_OWNERSHIP_DEPTH`] steps.
    pub fn root_of(&self, entity: Entity) -> Entity {
        let mut current = entity;
        for _ in 0..MAX_OWNERSHIP_DEPTH {
            match self.owner_of(current) {
                Some(owner) => current = owner,
                None => return current,
            }
        }
        debug!("ownership walk from {entity:?} hit the depth bound");
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_clamps_fractions() {
        let config = BounceConfig::default()
            .with_decay(1.5, -0.2)
            .with_cutoffs(-1.0, f32::NAN);
        let clean = config.sanitized();

        assert_eq!(clean.speed_loss_per_bounce, 1.0);
        assert_eq!(clean.damage_loss_per_bounce, 0.0);
        assert_eq!(clean.min_speed_to_continue, 0.0);
        assert_eq!(clean.max_lifetime, BounceConfig::default().max_lifetime);
    }

    #[test]
    fn test_sanitized_keeps_valid_config() {
        let config = presets::seeker_round();
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn test_bias_requires_cone_and_radius() {
        assert!(BounceConfig::default().bias_active());
        assert!(!BounceConfig::default().with_bias(true, 0.0, 5.0).bias_active());
        assert!(!BounceConfig::default().with_bias(true, 20.0, 0.0).bias_active());
        assert!(!presets::bullet().bias_active());
    }

    #[test]
    fn test_faction_table_symmetry() {
        let mut table = FactionTable::default();
        assert!(table.is_ally(Faction::Enemy, Faction::Enemy));
        assert!(table.is_hostile(Faction::Enemy, Faction::Neutral));

        table.set_hostility(Faction::Enemy, Faction::Neutral, false);
        assert!(table.is_ally(Faction::Neutral, Faction::Enemy));
        assert!(!table.allied(None, Some(Faction::Enemy)));
    }

    #[test]
    fn test_ownership_root_and_cycle_bound() {
        let mut world = World::new();
        let root = world.spawn_empty().id();
        let arm = world.spawn_empty().id();
        let hand = world.spawn_empty().id();

        let mut table = OwnershipTable::default();
        table.set_owner(hand, arm);
        table.set_owner(arm, root);
        assert_eq!(table.root_of(hand), root);
        assert_eq!(table.root_of(root), root);

        // A cycle still terminates.
        table.set_owner(root, hand);
        let _ = table.root_of(hand);
    }
}
