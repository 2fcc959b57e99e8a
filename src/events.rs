//! Messages for the ricochet system.
//!
//! Bounce and impact messages are fire-and-forget notifications for
//! presentation code; nothing in the simulation reads them back.

use std::sync::Arc;

use bevy::ecs::message::Message;
use bevy::prelude::*;

use crate::resources::BounceConfig;
use crate::types::{DispatchStrategy, TerminationReason};

/// Request to fire one ricochet projectile.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::prelude::*;
/// use bevy_ricochet::events::FireRicochetEvent;
/// use bevy_ricochet::resources::presets;
///
/// let fire = FireRicochetEvent::new(Vec3::new(0.0, 1.5, 0.0), Vec3::Z, Arc::new(presets::ricochet_round()))
///     .with_shooter(Entity::PLACEHOLDER);
/// assert!(fire.shooter.is_some());
/// ```
#[derive(Message, Clone)]
pub struct FireRicochetEvent {
    /// Muzzle position
    pub origin: Vec3,
    /// Travel direction (normalized on construction)
    pub direction: Vec3,
    /// Firing actor
    pub shooter: Option<Entity>,
    /// Shared configuration
    pub config: Arc<BounceConfig>,
}

impl FireRicochetEvent {
    pub fn new(origin: Vec3, direction: Vec3, config: Arc<BounceConfig>) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            shooter: None,
            config,
        }
    }

    /// Sets the shooter for friendly-fire exclusion.
    pub fn with_shooter(mut self, shooter: Entity) -> Self {
        self.shooter = Some(shooter);
        self
    }
}

/// Sent after an accepted bounce.
#[derive(Message, Clone, Debug)]
pub struct RicochetEvent {
    pub projectile: Entity,
    pub surface: Entity,
    pub impact_point: Vec3,
    pub normal: Vec3,
    /// Direction after reflection and bias
    pub new_direction: Vec3,
    /// Speed after decay
    pub new_speed: f32,
    pub bounces_used: u32,
    /// Target the reflection was bent toward, if any
    pub biased_toward: Option<Entity>,
}

/// Sent when a projectile strikes a target.
///
/// `strategy` is `None` when no receiver accepted the damage and the hit fell
/// through to a [`DamageBroadcast`].
#[derive(Message, Clone, Debug)]
pub struct ProjectileImpactEvent {
    pub projectile: Entity,
    /// Collider that was hit
    pub target: Entity,
    /// Node whose receiver accepted the damage
    pub receiver: Option<Entity>,
    pub impact_point: Vec3,
    pub damage: f32,
    pub strategy: Option<DispatchStrategy>,
}

/// Sent when a projectile leaves the simulation for any reason.
#[derive(Message, Clone, Debug)]
pub struct ProjectileExpiredEvent {
    pub projectile: Entity,
    pub position: Vec3,
    pub reason: TerminationReason,
}

/// Untargeted "apply damage" notification.
///
/// Written when no receiver in the ownership chain accepted a hit. Delivery is
/// best-effort: only systems that read this message see it, and nothing
/// confirms receipt.
#[derive(Message, Clone, Debug, PartialEq)]
pub struct DamageBroadcast {
    /// Collider that was hit
    pub hit: Entity,
    /// Ownership chain from the hit collider upward
    pub chain: Vec<Entity>,
    pub amount: f32,
    pub instigator: Option<Entity>,
}

impl DamageBroadcast {
    /// Whether `entity` is anywhere on the broadcast's chain.
    pub fn reaches(&self, entity: Entity) -> bool {
        self.chain.contains(&entity)
    }
}
