//! Core components for the ricochet system.

use std::any::Any;
use std::sync::Arc;

use bevy::prelude::*;

use crate::resources::BounceConfig;
use crate::systems::bounce::FlightPhase;
use crate::systems::dispatch::{DamagePayload, DamageReceiver};
use crate::types::Faction;

/// A live ricochet projectile.
///
/// Exclusively owns its kinematic and damage state. The bounce configuration
/// is shared read-only with every other projectile fired with it. `owner` is a
/// back reference used only to exclude friendly fire; it never keeps the
/// projectile alive.
///
/// `position` is authoritative; the Bevy step system mirrors it into
/// `Transform` for presentation.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::prelude::*;
/// use bevy_ricochet::components::RicochetProjectile;
/// use bevy_ricochet::resources::BounceConfig;
///
/// let config = Arc::new(BounceConfig::default().with_launch(10.0, 10.0));
/// let projectile = RicochetProjectile::launch(Vec3::ZERO, Vec3::Z, None, config);
///
/// assert_eq!(projectile.velocity, Vec3::new(0.0, 0.0, 10.0));
/// assert_eq!(projectile.damage, 10.0);
/// assert_eq!(projectile.bounces_remaining(), 3);
/// ```
#[derive(Component, Clone, Debug)]
pub struct RicochetProjectile {
    /// World-space position
    pub position: Vec3,
    /// Current velocity (units/s)
    pub velocity: Vec3,
    /// Damage delivered on a target hit
    pub damage: f32,
    /// Accepted bounces so far
    pub bounces_used: u32,
    /// Seconds since launch
    pub elapsed: f32,
    /// Firing actor, for friendly-fire exclusion only
    pub owner: Option<Entity>,
    /// Explicit faction; falls back to the owner's allegiance when unset
    pub faction: Option<Faction>,
    pub phase: FlightPhase,
    pub config: Arc<BounceConfig>,
}

impl RicochetProjectile {
    /// Creates a projectile at `origin` travelling along `direction`.
    ///
    /// Speed and damage come from the configuration, which is clamped into
    /// range first if it needs to be. A zero `direction` launches along
    /// Bevy's forward axis (-Z).
    ///
    /// # Arguments
    /// * `origin` - Spawn position
    /// * `direction` - Travel direction, need not be normalized
    /// * `owner` - Firing actor
    /// * `config` - Shared bounce configuration
    pub fn launch(origin: Vec3, direction: Vec3, owner: Option<Entity>, config: Arc<BounceConfig>) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        let clean = config.sanitized();
        let config = if clean == *config { config } else { Arc::new(clean) };
        Self {
            position: origin,
            velocity: direction * config.initial_speed,
            damage: config.initial_damage,
            bounces_used: 0,
            elapsed: 0.0,
            owner,
            faction: None,
            phase: FlightPhase::Flying,
            config,
        }
    }

    /// Builder pattern: set an explicit faction.
    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Unit travel direction, or zero when stationary.
    pub fn direction(&self) -> Vec3 {
        self.velocity.normalize_or_zero()
    }

    pub fn bounces_remaining(&self) -> u32 {
        self.config.max_bounces.saturating_sub(self.bounces_used)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, FlightPhase::Terminated(_))
    }
}

/// Faction membership of an actor.
#[derive(Component, Reflect, Clone, Copy, Debug, PartialEq, Eq)]
#[reflect(Component)]
pub struct Allegiance(pub Faction);

/// Marks the entity that is authoritative for damage in its ownership chain
/// (bosses, enemies, the player).
#[derive(Component, Reflect, Default, Clone, Copy, Debug)]
#[reflect(Component)]
pub struct DamageAuthority;

/// The damage-receiving capabilities attached to one entity.
///
/// Each entry is one receiver, standing in for one script-like component
/// on the node. The resolver tries every entry on every node of the chain.
#[derive(Component, Default)]
pub struct DamageReceivers {
    receivers: Vec<Box<dyn DamageReceiver>>,
}

impl DamageReceivers {
    /// Builder pattern: attach a receiver.
    pub fn with(mut self, receiver: impl DamageReceiver) -> Self {
        self.push(receiver);
        self
    }

    pub fn push(&mut self, receiver: impl DamageReceiver) {
        self.receivers.push(Box::new(receiver));
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Offers each receiver to `visitor` in attachment order, stopping at the
    /// first one it accepts.
    pub fn visit(&mut self, visitor: &mut dyn FnMut(&mut dyn DamageReceiver) -> bool) -> bool {
        for receiver in self.receivers.iter_mut() {
            if visitor(&mut **receiver) {
                return true;
            }
        }
        false
    }

    /// First receiver of concrete type `T`.
    pub fn get<T: DamageReceiver>(&self) -> Option<&T> {
        self.receivers.iter().find_map(|receiver| {
            let any: &dyn Any = &**receiver;
            any.downcast_ref::<T>()
        })
    }

    pub fn get_mut<T: DamageReceiver>(&mut self) -> Option<&mut T> {
        self.receivers.iter_mut().find_map(|receiver| {
            let any: &mut dyn Any = &mut **receiver;
            any.downcast_mut::<T>()
        })
    }
}

/// Stock hit-point pool.
///
/// Exposes the instigated two-argument shape and the generic amount-only
/// shape, so it is reached before any broadcast fallback.
///
/// # Example
/// ```
/// use bevy_ricochet::components::Health;
///
/// let health = Health::new(100.0);
/// assert!(health.is_alive());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Last actor credited with damage
    pub last_instigator: Option<Entity>,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            last_instigator: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    fn apply(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).clamp(0.0, self.max);
    }
}

impl DamageReceiver for Health {
    fn damage_from(&mut self, amount: f32, instigator: Option<Entity>) -> bool {
        self.apply(amount);
        self.last_instigator = instigator;
        true
    }

    fn take_damage(&mut self, amount: f32) -> bool {
        self.apply(amount);
        true
    }
}

/// Receiver that records every payload it is given, for scripted targets
/// such as training dummies.
#[derive(Default, Clone, Debug)]
pub struct DamageLedger {
    pub entries: Vec<DamagePayload>,
}

impl DamageLedger {
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

impl DamageReceiver for DamageLedger {
    fn damage_from_payload(&mut self, payload: &DamagePayload) -> bool {
        self.entries.push(payload.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_zero_direction_defaults_forward() {
        let config = Arc::new(BounceConfig::default());
        let projectile = RicochetProjectile::launch(Vec3::ONE, Vec3::ZERO, None, config.clone());

        assert_eq!(projectile.direction(), Vec3::NEG_Z);
        assert!((projectile.speed() - config.initial_speed).abs() < 1e-5);
        assert!(!projectile.is_terminated());
        assert!(Arc::ptr_eq(&projectile.config, &config));
    }

    #[test]
    fn test_launch_clamps_out_of_range_config() {
        let config = Arc::new(BounceConfig::default().with_launch(10.0, 10.0).with_decay(-0.5, 1.5));
        let projectile = RicochetProjectile::launch(Vec3::ZERO, Vec3::Z, None, config);

        assert_eq!(projectile.config.speed_loss_per_bounce, 0.0);
        assert_eq!(projectile.config.damage_loss_per_bounce, 1.0);
    }

    #[test]
    fn test_health_never_heals_from_negative_damage() {
        let mut health = Health::new(100.0);
        health.take_damage(-5.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_receivers_downcast() {
        let mut receivers = DamageReceivers::default()
            .with(Health::new(50.0))
            .with(DamageLedger::default());

        assert_eq!(receivers.len(), 2);
        receivers.get_mut::<Health>().map(|health| health.take_damage(20.0));
        assert_eq!(receivers.get::<Health>().map(|h| h.current), Some(30.0));
        assert!(receivers.get::<DamageLedger>().is_some());
    }

    #[test]
    fn test_health_floors_at_zero() {
        let mut health = Health::new(10.0);
        health.take_damage(25.0);
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
    }
}
