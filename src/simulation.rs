//! Headless projectile lifecycle.
//!
//! [`ProjectileSet`] owns projectiles outside of any ECS world and advances
//! them against caller-supplied collaborators. Terminated projectiles are
//! removed at the end of the tick that terminated them.

use std::sync::Arc;

use bevy::prelude::*;

use crate::components::RicochetProjectile;
use crate::resources::BounceConfig;
use crate::systems::bounce::FlightPhase;
use crate::systems::motion::{self, StepContext, TickOutcome};
use crate::types::TerminationReason;
use crate::world::{ActorRegistry, SpatialQueries};

/// Stable identifier of a projectile in a [`ProjectileSet`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ProjectileHandle(u64);

/// What happened to one projectile during [`ProjectileSet::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileUpdate {
    pub handle: ProjectileHandle,
    pub report: motion::TickReport,
}

/// A collection of live projectiles.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::prelude::*;
/// use bevy_ricochet::prelude::*;
///
/// let mut set = ProjectileSet::new();
/// let handle = set.spawn(Vec3::ZERO, Vec3::X, None, Arc::new(presets::bullet()));
///
/// assert!(set.get(handle).is_some());
/// assert!(set.cancel(handle).is_some_and(|p| p.is_terminated()));
/// assert!(set.is_empty());
/// ```
#[derive(Default)]
pub struct ProjectileSet {
    next: u64,
    live: Vec<(ProjectileHandle, RicochetProjectile)>,
}

impl ProjectileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches a projectile from `origin` along `direction`.
    pub fn spawn(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        owner: Option<Entity>,
        config: Arc<BounceConfig>,
    ) -> ProjectileHandle {
        self.spawn_projectile(RicochetProjectile::launch(origin, direction, owner, config))
    }

    /// Adds an already-built projectile.
    pub fn spawn_projectile(&mut self, projectile: RicochetProjectile) -> ProjectileHandle {
        let handle = ProjectileHandle(self.next);
        self.next += 1;
        self.live.push((handle, projectile));
        handle
    }

    pub fn get(&self, handle: ProjectileHandle) -> Option<&RicochetProjectile> {
        self.live
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, projectile)| projectile)
    }

    /// Removes a projectile without notifications, returning it marked as
    /// cancelled.
    pub fn cancel(&mut self, handle: ProjectileHandle) -> Option<RicochetProjectile> {
        let index = self.live.iter().position(|(h, _)| *h == handle)?;
        let (_, mut projectile) = self.live.remove(index);
        projectile.phase = FlightPhase::Terminated(TerminationReason::Cancelled);
        Some(projectile)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProjectileHandle, &RicochetProjectile)> {
        self.live.iter().map(|(handle, projectile)| (*handle, projectile))
    }

    /// Advances every projectile by `dt` in spawn order.
    ///
    /// Returns one update per projectile that produced notifications or
    /// terminated. Terminated projectiles are gone from the set afterwards.
    pub fn tick<S, A>(&mut self, dt: f32, spatial: &S, actors: &mut A, ctx: StepContext) -> Vec<ProjectileUpdate>
    where
        S: SpatialQueries + ?Sized,
        A: ActorRegistry + ?Sized,
    {
        let mut updates = Vec::new();
        self.live.retain_mut(|(handle, projectile)| {
            let report = motion::advance_projectile(projectile, dt, spatial, actors, ctx);
            let alive = report.outcome == TickOutcome::Continue;
            if !report.notifications.is_empty() || !alive {
                updates.push(ProjectileUpdate {
                    handle: *handle,
                    report,
                });
            }
            alive
        });
        updates
    }
}
