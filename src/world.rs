//! Collaborator seams between the ricochet core and the world it runs in.
//!
//! The core never owns geometry or actors. It asks a [`SpatialQueries`]
//! implementation for sweeps and overlaps, and an [`ActorRegistry`] for
//! ownership, allegiance and damage receivers. The Bevy plugin implements both
//! over ECS queries; [`StaticScene`](crate::scene::StaticScene) implements them
//! in memory for headless use.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::components::{Allegiance, DamageAuthority, DamageReceivers};
use crate::resources::{OwnershipTable, MAX_OWNERSHIP_DEPTH};
use crate::systems::dispatch::DamageReceiver;
use crate::types::{Faction, LayerMask};

/// Result of a swept ray or sphere cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    /// Collider that was hit
    pub entity: Entity,
    /// Contact point in world space
    pub point: Vec3,
    /// Surface normal at the contact; may be zero if the backend could not
    /// provide one
    pub normal: Vec3,
    /// Distance travelled along the sweep
    pub distance: f32,
    /// Layer memberships of the collider
    pub layers: LayerMask,
    /// Sensor/trigger volumes are never solid
    pub is_sensor: bool,
}

/// Entity found by an overlap query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetProbe {
    pub entity: Entity,
    pub position: Vec3,
    pub layers: LayerMask,
}

/// Physics query collaborator.
pub trait SpatialQueries {
    /// Sweeps a ray (`radius == 0`) or sphere from `origin` along `direction`.
    ///
    /// Only colliders whose layers intersect `mask` and that are not in
    /// `excluded` are considered. Returns the closest hit within
    /// `max_distance`.
    fn sweep(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        radius: f32,
        mask: LayerMask,
        excluded: &[Entity],
    ) -> Option<SweepHit>;

    /// All colliders on `mask` overlapping a sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<TargetProbe>;
}

/// Ownership, allegiance and damage-capability collaborator.
pub trait ActorRegistry {
    /// Direct owner of `entity` in the owner-lookup table.
    fn owner_of(&self, entity: Entity) -> Option<Entity>;

    /// Faction set directly on `entity`.
    fn faction_of(&self, entity: Entity) -> Option<Faction>;

    /// Whether `entity` carries the boss/enemy damage-authority marker.
    fn is_damage_authority(&self, entity: Entity) -> bool;

    /// Offers every receiver attached to `entity` to `visitor`, stopping at
    /// the first one it accepts. Returns whether any was accepted.
    fn visit_receivers(
        &mut self,
        entity: Entity,
        visitor: &mut dyn FnMut(&mut dyn DamageReceiver) -> bool,
    ) -> bool;

    /// Topmost owner of `entity`, bounded by [`MAX_OWNERSHIP_DEPTH`].
    fn actor_of(&self, entity: Entity) -> Entity {
        let mut current = entity;
        for _ in 0..MAX_OWNERSHIP_DEPTH {
            match self.owner_of(current) {
                Some(owner) => current = owner,
                None => break,
            }
        }
        current
    }

    /// Nearest faction found walking up from `entity` (inclusive).
    fn allegiance(&self, entity: Entity) -> Option<Faction> {
        let mut current = Some(entity);
        for _ in 0..MAX_OWNERSHIP_DEPTH {
            let node = current?;
            if let Some(faction) = self.faction_of(node) {
                return Some(faction);
            }
            current = self.owner_of(node);
        }
        None
    }
}

/// [`ActorRegistry`] over the ECS: ownership from [`OwnershipTable`],
/// allegiance from [`Allegiance`], receivers from [`DamageReceivers`].
#[derive(SystemParam)]
pub struct EcsActors<'w, 's> {
    ownership: Res<'w, OwnershipTable>,
    allegiances: Query<'w, 's, &'static Allegiance>,
    authorities: Query<'w, 's, (), With<DamageAuthority>>,
    receivers: Query<'w, 's, &'static mut DamageReceivers>,
}

impl ActorRegistry for EcsActors<'_, '_> {
    fn owner_of(&self, entity: Entity) -> Option<Entity> {
        self.ownership.owner_of(entity)
    }

    fn faction_of(&self, entity: Entity) -> Option<Faction> {
        self.allegiances.get(entity).ok().map(|allegiance| allegiance.0)
    }

    fn is_damage_authority(&self, entity: Entity) -> bool {
        self.authorities.contains(entity)
    }

    fn visit_receivers(
        &mut self,
        entity: Entity,
        visitor: &mut dyn FnMut(&mut dyn DamageReceiver) -> bool,
    ) -> bool {
        match self.receivers.get_mut(entity) {
            Ok(mut receivers) => receivers.visit(visitor),
            Err(_) => false,
        }
    }
}
