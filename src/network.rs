//! Wire format for replicating fire requests.
//!
//! This module is only available with the `netcode` feature flag. Transport
//! is left to the application; this only turns a [`FireRicochetEvent`] into
//! bytes and back.

use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::FireRicochetEvent;
use crate::resources::BounceConfig;

/// Client-to-server request to fire one ricochet projectile.
///
/// Entities are not meaningful across processes, so the shooter travels as an
/// application-assigned network id.
///
/// # Fields
/// * `origin` - World-space muzzle position
/// * `direction` - Fire direction
/// * `shooter` - Network id of the firing actor, if any
/// * `config` - Bounce configuration of the shot
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::prelude::*;
/// use bevy_ricochet::events::FireRicochetEvent;
/// use bevy_ricochet::network::SpawnRequestMessage;
/// use bevy_ricochet::resources::presets;
///
/// let fire = FireRicochetEvent::new(Vec3::ZERO, Vec3::Z, Arc::new(presets::ricochet_round()));
/// let bytes = SpawnRequestMessage::from_fire(&fire, Some(7)).encode().unwrap();
/// let request = SpawnRequestMessage::decode(&bytes).unwrap();
///
/// assert_eq!(request.shooter, Some(7));
/// assert_eq!(request.origin, [0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequestMessage {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub shooter: Option<u64>,
    pub config: BounceConfig,
}

impl SpawnRequestMessage {
    pub fn from_fire(fire: &FireRicochetEvent, shooter: Option<u64>) -> Self {
        Self {
            origin: fire.origin.to_array(),
            direction: fire.direction.to_array(),
            shooter,
            config: (*fire.config).clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decodes a request. The configuration is sanitized, since it came from
    /// the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        let mut request: Self = bincode::deserialize(bytes)?;
        request.config = request.config.sanitized();
        Ok(request)
    }

    /// Rebuilds the fire request, mapping the shooter id to a local entity.
    ///
    /// Non-finite vectors from the wire are zeroed; a zero direction is
    /// repaired when the projectile launches.
    pub fn into_fire(self, resolve_shooter: impl Fn(u64) -> Option<Entity>) -> FireRicochetEvent {
        let finite = |v: Vec3| if v.is_finite() { v } else { Vec3::ZERO };
        FireRicochetEvent {
            origin: finite(Vec3::from_array(self.origin)),
            direction: finite(Vec3::from_array(self.direction)),
            shooter: self.shooter.and_then(resolve_shooter),
            config: Arc::new(self.config),
        }
    }
}
