//! In-memory world for running ricochet projectiles without a physics engine.
//!
//! Geometry is a flat list of infinite planes and spheres, queried by brute
//! force. Actor data lives in a private ECS [`World`] using the same
//! components the plugin reads, so receivers behave identically in both.

use bevy::prelude::*;

use crate::components::{Allegiance, DamageAuthority, DamageReceivers, RicochetProjectile};
use crate::resources::OwnershipTable;
use crate::systems::dispatch::DamageReceiver;
use crate::systems::motion::{self, StepContext, TickReport};
use crate::types::{Faction, LayerMask};
use crate::world::{ActorRegistry, SpatialQueries, SweepHit, TargetProbe};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Shape {
    /// Two-sided infinite plane
    Plane { point: Vec3, normal: Vec3 },
    Sphere { center: Vec3, radius: f32 },
}

#[derive(Clone, Copy, Debug)]
struct SceneCollider {
    entity: Entity,
    shape: Shape,
    layers: LayerMask,
    is_sensor: bool,
}

/// Collision geometry of a [`StaticScene`].
#[derive(Default, Debug)]
pub struct SceneGeometry {
    colliders: Vec<SceneCollider>,
}

impl SceneGeometry {
    fn find_mut(&mut self, entity: Entity) -> Option<&mut SceneCollider> {
        self.colliders.iter_mut().find(|collider| collider.entity == entity)
    }
}

/// Time of impact of a sphere of radius `probe` against `shape`, with the
/// contact point and outward normal.
fn sweep_shape(shape: &Shape, origin: Vec3, direction: Vec3, probe: f32) -> Option<(f32, Vec3, Vec3)> {
    match *shape {
        Shape::Plane { point, normal } => {
            let mut normal = normal.try_normalize()?;
            let mut offset = (origin - point).dot(normal);
            if offset < 0.0 {
                normal = -normal;
                offset = -offset;
            }
            let approach = -direction.dot(normal);
            if approach <= f32::EPSILON {
                return None;
            }
            let t = ((offset - probe) / approach).max(0.0);
            let contact = origin + direction * t - normal * probe.min(offset);
            Some((t, contact, normal))
        }
        Shape::Sphere { center, radius } => {
            let reach = radius + probe;
            let oc = origin - center;
            let b = oc.dot(direction);
            let c = oc.length_squared() - reach * reach;
            let t = if c <= 0.0 {
                0.0
            } else {
                let discriminant = b * b - c;
                if b > 0.0 || discriminant < 0.0 {
                    return None;
                }
                -b - discriminant.sqrt()
            };
            let normal = (origin + direction * t - center).try_normalize().unwrap_or(Vec3::Y);
            Some((t, center + normal * radius, normal))
        }
    }
}

impl SpatialQueries for SceneGeometry {
    fn sweep(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        radius: f32,
        mask: LayerMask,
        excluded: &[Entity],
    ) -> Option<SweepHit> {
        let direction = *direction;
        self.colliders
            .iter()
            .filter(|collider| collider.layers.intersects(mask) && !excluded.contains(&collider.entity))
            .filter_map(|collider| {
                let (distance, point, normal) = sweep_shape(&collider.shape, origin, direction, radius)?;
                (distance <= max_distance).then_some(SweepHit {
                    entity: collider.entity,
                    point,
                    normal,
                    distance,
                    layers: collider.layers,
                    is_sensor: collider.is_sensor,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<TargetProbe> {
        self.colliders
            .iter()
            .filter(|collider| collider.layers.intersects(mask))
            .filter_map(|collider| {
                let position = match collider.shape {
                    Shape::Sphere { center: c, radius: r } => {
                        (c.distance(center) <= radius + r).then_some(c)?
                    }
                    Shape::Plane { point, normal } => {
                        let normal = normal.try_normalize()?;
                        let offset = (center - point).dot(normal);
                        (offset.abs() <= radius).then_some(center - normal * offset)?
                    }
                };
                Some(TargetProbe {
                    entity: collider.entity,
                    position,
                    layers: collider.layers,
                })
            })
            .collect()
    }
}

/// Ownership, allegiance and receivers of a [`StaticScene`].
#[derive(Default)]
pub struct SceneActors {
    world: World,
    ownership: OwnershipTable,
}

impl ActorRegistry for SceneActors {
    fn owner_of(&self, entity: Entity) -> Option<Entity> {
        self.ownership.owner_of(entity)
    }

    fn faction_of(&self, entity: Entity) -> Option<Faction> {
        self.world.get::<Allegiance>(entity).map(|allegiance| allegiance.0)
    }

    fn is_damage_authority(&self, entity: Entity) -> bool {
        self.world.get::<DamageAuthority>(entity).is_some()
    }

    fn visit_receivers(
        &mut self,
        entity: Entity,
        visitor: &mut dyn FnMut(&mut dyn DamageReceiver) -> bool,
    ) -> bool {
        match self.world.get_mut::<DamageReceivers>(entity) {
            Some(mut receivers) => receivers.visit(visitor),
            None => false,
        }
    }
}

/// A self-contained world of static colliders and actors.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::prelude::*;
/// use bevy_ricochet::prelude::*;
///
/// let mut scene = StaticScene::new();
/// let wall = scene.add_plane(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, LayerMask::layer(1));
/// let config = BounceConfig::default().with_masks(LayerMask::layer(1), LayerMask::layer(4), LayerMask::NONE);
///
/// let mut projectile = RicochetProjectile::launch(Vec3::ZERO, Vec3::Z, None, Arc::new(config));
/// let settings = RicochetSettings::default();
/// let factions = FactionTable::default();
/// let ctx = StepContext { settings: &settings, factions: &factions };
///
/// scene.step(&mut projectile, 0.2, ctx);
/// assert_eq!(projectile.bounces_used, 1);
/// # let _ = wall;
/// ```
#[derive(Default)]
pub struct StaticScene {
    geometry: SceneGeometry,
    actors: SceneActors,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_collider(&mut self, shape: Shape, layers: LayerMask) -> Entity {
        let entity = self.actors.world.spawn_empty().id();
        self.geometry.colliders.push(SceneCollider {
            entity,
            shape,
            layers,
            is_sensor: false,
        });
        entity
    }

    /// Adds a two-sided infinite plane through `point`.
    pub fn add_plane(&mut self, point: Vec3, normal: Vec3, layers: LayerMask) -> Entity {
        self.add_collider(Shape::Plane { point, normal }, layers)
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, layers: LayerMask) -> Entity {
        self.add_collider(Shape::Sphere { center, radius }, layers)
    }

    /// Adds an actor with no collider of its own.
    pub fn add_actor(&mut self, faction: Faction) -> Entity {
        self.actors.world.spawn(Allegiance(faction)).id()
    }

    /// Turns a collider into a trigger volume.
    pub fn make_sensor(&mut self, entity: Entity) {
        if let Some(collider) = self.geometry.find_mut(entity) {
            collider.is_sensor = true;
        }
    }

    pub fn set_owner(&mut self, child: Entity, owner: Entity) {
        self.actors.ownership.set_owner(child, owner);
    }

    pub fn set_faction(&mut self, entity: Entity, faction: Faction) {
        if let Ok(mut entity) = self.actors.world.get_entity_mut(entity) {
            entity.insert(Allegiance(faction));
        }
    }

    pub fn mark_authority(&mut self, entity: Entity) {
        if let Ok(mut entity) = self.actors.world.get_entity_mut(entity) {
            entity.insert(DamageAuthority);
        }
    }

    pub fn add_receiver(&mut self, entity: Entity, receiver: impl DamageReceiver) {
        let Ok(mut entity) = self.actors.world.get_entity_mut(entity) else {
            return;
        };
        if let Some(mut receivers) = entity.get_mut::<DamageReceivers>() {
            receivers.push(receiver);
            return;
        }
        entity.insert(DamageReceivers::default().with(receiver));
    }

    /// First receiver of type `T` on `entity`.
    pub fn receiver<T: DamageReceiver>(&self, entity: Entity) -> Option<&T> {
        self.actors.world.get::<DamageReceivers>(entity)?.get::<T>()
    }

    /// Removes a collider or actor and its ownership link.
    pub fn remove(&mut self, entity: Entity) {
        self.geometry.colliders.retain(|collider| collider.entity != entity);
        self.actors.ownership.remove(entity);
        self.actors.world.despawn(entity);
    }

    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    pub fn actors(&self) -> &SceneActors {
        &self.actors
    }

    /// Geometry and actors borrowed separately, for driving a
    /// [`ProjectileSet`](crate::simulation::ProjectileSet).
    pub fn split_mut(&mut self) -> (&SceneGeometry, &mut SceneActors) {
        (&self.geometry, &mut self.actors)
    }

    /// Advances `projectile` by `dt` against this scene.
    pub fn step(&mut self, projectile: &mut RicochetProjectile, dt: f32, ctx: StepContext) -> TickReport {
        motion::advance_projectile(projectile, dt, &self.geometry, &mut self.actors, ctx)
    }
}
