//! Common types and enums for the ricochet system.

use std::ops::BitOr;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Bit set of collision layers.
///
/// A collider may belong to several layers at once, so membership tests are
/// intersection tests: a hit "is on" a mask when any of its membership bits is
/// set in the mask.
///
/// # Example
/// ```
/// use bevy_ricochet::types::LayerMask;
///
/// let walls = LayerMask::layer(1);
/// let enemies = LayerMask::layer(4);
/// let query = (walls | enemies).without(LayerMask::layer(4));
///
/// assert!(query.intersects(walls));
/// assert!(!query.intersects(enemies));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Reflect, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// No layers.
    pub const NONE: Self = Self(0);
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing only the layer at `index` (0..32).
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index % 32))
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Removes every bit of `other` from this mask.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Team identifier carried by actors.
///
/// Hostility between factions is not encoded here; it lives in
/// [`FactionTable`](crate::resources::FactionTable) so that it is data, not
/// string comparisons scattered through gameplay code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Reflect, Serialize, Deserialize)]
pub enum Faction {
    /// The player and anything fighting on their side
    Player,
    /// Regular enemies and bosses
    Enemy,
    /// Destructibles and wildlife
    #[default]
    Neutral,
}

impl Faction {
    /// Number of factions, i.e. the side length of the hostility matrix.
    pub const COUNT: usize = 3;

    /// All factions in matrix order.
    pub const ALL: [Faction; Self::COUNT] = [Faction::Player, Faction::Enemy, Faction::Neutral];

    /// Row/column of this faction in the hostility matrix.
    pub const fn index(self) -> usize {
        match self {
            Faction::Player => 0,
            Faction::Enemy => 1,
            Faction::Neutral => 2,
        }
    }
}

/// Classification of a single sweep hit.
///
/// # Variants
/// * `Target` - Damageable, hostile entity: deliver damage and stop
/// * `Surface` - Solid reflective geometry: bounce or terminate
/// * `Ignorable` - Anything else: pass through without consuming a bounce
#[derive(Clone, Copy, PartialEq, Eq, Debug, Reflect)]
pub enum HitClass {
    Target,
    Surface,
    Ignorable,
}

/// Transient result of classifying one hit, consumed in the same tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct HitClassification {
    /// World-space hit point
    pub point: Vec3,
    /// Unit surface normal (never zero; degenerate normals become up)
    pub normal: Vec3,
    pub class: HitClass,
}

/// Why a projectile left the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Reflect, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Elapsed lifetime reached `max_lifetime`
    LifetimeExpired,
    /// Speed dropped under `min_speed_to_continue`
    BelowMinimumSpeed,
    /// A surface was hit with no bounce budget left
    BouncesExhausted,
    /// Damage was delivered (or attempted) on a target
    TargetHit,
    /// Removed from the active set by the caller
    Cancelled,
}

/// One of the recognized damage call shapes, in dispatch priority order.
///
/// The first three are the instigator-aware family; the last two are the
/// generic "take damage" fallback family.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Reflect)]
pub enum DispatchStrategy {
    /// Amount and instigator bundled in one payload
    InstigatedPayload,
    /// Amount and instigator as separate arguments
    InstigatedPair,
    /// Amount only, instigator dropped
    InstigatedAmount,
    /// Generic take-damage with amount and instigator
    GenericPair,
    /// Generic take-damage with amount only
    GenericAmount,
}

impl DispatchStrategy {
    /// Every strategy, highest priority first.
    pub const PRIORITY: [DispatchStrategy; 5] = [
        DispatchStrategy::InstigatedPayload,
        DispatchStrategy::InstigatedPair,
        DispatchStrategy::InstigatedAmount,
        DispatchStrategy::GenericPair,
        DispatchStrategy::GenericAmount,
    ];
}
