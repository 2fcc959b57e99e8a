//! # Bevy Ricochet
//!
//! Ricochet projectile core for Bevy 0.18.
//!
//! ## Features
//! - Mirror reflection off surfaces, optionally bent toward nearby targets
//! - Per-bounce speed and damage decay with lifetime and speed cutoffs
//! - Layer-mask hit classification with friendly-fire exclusion
//! - Prioritized damage dispatch up an ownership chain
//! - avian3d backend behind the `dim3` feature, plus a headless in-memory scene
//!
//! ## Quick Start
//! ```rust,no_run
//! use std::sync::Arc;
//! use bevy::prelude::*;
//! use bevy_ricochet::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(RicochetPluginGroup)
//!         .add_systems(Update, fire)
//!         .run();
//! }
//!
//! fn fire(mut fire_events: MessageWriter<FireRicochetEvent>) {
//!     fire_events.write(FireRicochetEvent::new(Vec3::ZERO, Vec3::Z, Arc::new(presets::ricochet_round())));
//! }
//! ```

pub mod components;
pub mod events;
pub mod resources;
pub mod scene;
pub mod simulation;
pub mod systems;
pub mod types;
pub mod world;

#[cfg(feature = "dim3")]
pub mod physics;

#[cfg(feature = "netcode")]
pub mod network;

pub mod prelude {
    pub use crate::components::*;
    pub use crate::events::*;
    pub use crate::resources::*;
    pub use crate::scene::StaticScene;
    pub use crate::simulation::{ProjectileHandle, ProjectileSet, ProjectileUpdate};
    pub use crate::systems::bounce::FlightPhase;
    pub use crate::systems::dispatch::{DamagePayload, DamageReceiver, DispatchOutcome};
    pub use crate::systems::motion::{spawn_ricochet, Notification, StepContext, TickOutcome, TickReport};
    pub use crate::types::*;
    pub use crate::world::{ActorRegistry, SpatialQueries};
    pub use crate::RicochetPluginGroup;
    pub use crate::{RicochetDebugPlugin, RicochetPlugin};
}

use bevy::prelude::*;

/// Main plugin group that includes all ricochet subsystems.
///
/// # Example
/// ```no_run
/// use bevy::prelude::*;
/// use bevy_ricochet::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(DefaultPlugins)
///         .add_plugins(RicochetPluginGroup)
///         .run();
/// }
/// ```
#[derive(Default)]
pub struct RicochetPluginGroup;

impl PluginGroup for RicochetPluginGroup {
    fn build(self) -> bevy::app::PluginGroupBuilder {
        bevy::app::PluginGroupBuilder::start::<Self>()
            .add(RicochetPlugin)
            .add(RicochetDebugPlugin)
    }
}

/// Core ricochet plugin.
///
/// # Systems
/// - `sync_ownership_table` - Mirrors `ChildOf` links into [`resources::OwnershipTable`]
///   (`PreUpdate`, so removals are seen every frame)
/// - `spawn_ricochet_projectiles` - Turns [`events::FireRicochetEvent`] into projectiles
/// - `step_ricochet_projectiles` - Sweeps, classifies, bounces and dispatches damage
///   (`dim3`, once avian's spatial query pipeline exists)
pub struct RicochetPlugin;

impl Plugin for RicochetPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<types::LayerMask>()
            .register_type::<types::Faction>()
            .register_type::<components::Allegiance>()
            .register_type::<components::DamageAuthority>()
            .register_type::<resources::BounceConfig>()
            .register_type::<resources::RicochetSettings>()
            .init_resource::<resources::RicochetSettings>()
            .init_resource::<resources::FactionTable>()
            .init_resource::<resources::OwnershipTable>()
            .add_message::<events::FireRicochetEvent>()
            .add_message::<events::RicochetEvent>()
            .add_message::<events::ProjectileImpactEvent>()
            .add_message::<events::ProjectileExpiredEvent>()
            .add_message::<events::DamageBroadcast>()
            .add_systems(PreUpdate, systems::hierarchy::sync_ownership_table)
            .add_systems(FixedUpdate, systems::motion::spawn_ricochet_projectiles);

        #[cfg(feature = "dim3")]
        {
            use avian3d::prelude::SpatialQueryPipeline;
            app.add_systems(
                FixedUpdate,
                systems::motion::step_ricochet_projectiles
                    .after(systems::motion::spawn_ricochet_projectiles)
                    .run_if(resource_exists::<SpatialQueryPipeline>),
            );
        }
    }
}

/// Debug plugin for ricochet visualization.
pub struct RicochetDebugPlugin;

impl Plugin for RicochetDebugPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, systems::debug::draw_ricochet_debug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fire_event_spawns_projectile_with_shooter_faction() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(RicochetPlugin);

        let shooter = app.world_mut().spawn(components::Allegiance(types::Faction::Player)).id();
        app.world_mut().write_message(
            events::FireRicochetEvent::new(Vec3::ZERO, Vec3::X, Arc::new(resources::presets::bullet()))
                .with_shooter(shooter),
        );
        app.world_mut().run_schedule(FixedUpdate);

        let mut projectiles = app.world_mut().query::<&components::RicochetProjectile>();
        let spawned: Vec<_> = projectiles.iter(app.world()).collect();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].owner, Some(shooter));
        assert_eq!(spawned[0].faction, Some(types::Faction::Player));
    }

    #[test]
    fn test_despawned_hitbox_leaves_ownership_table() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(RicochetPlugin);

        let actor = app.world_mut().spawn_empty().id();
        let hitbox = app.world_mut().spawn(ChildOf(actor)).id();
        app.update();
        assert_eq!(app.world().resource::<resources::OwnershipTable>().owner_of(hitbox), Some(actor));

        app.world_mut().entity_mut(hitbox).despawn();
        app.update();
        assert_eq!(app.world().resource::<resources::OwnershipTable>().owner_of(hitbox), None);
    }
}
