//! Surface/target classification of sweep hits.

use bevy::prelude::*;

use crate::resources::{BounceConfig, FactionTable, RicochetSettings};
use crate::systems::reflection::sanitize_normal;
use crate::types::{Faction, HitClass, HitClassification, LayerMask};
use crate::world::{ActorRegistry, SweepHit};

/// Layer masks in effect for one projectile.
///
/// When a configuration leaves both the target and the surface mask empty,
/// both resolve to the fallback layer set and `surrogate` is set. In that mode
/// only entities with an allegiance count as targets, so unaffiliated solid
/// geometry still reflects instead of swallowing the projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveMasks {
    pub target: LayerMask,
    pub surface: LayerMask,
    pub ignore: LayerMask,
    pub surrogate: bool,
}

impl EffectiveMasks {
    /// Resolves the masks of `config` against global settings.
    pub fn resolve(config: &BounceConfig, settings: &RicochetSettings) -> Self {
        let surrogate = config.target_mask.is_empty() && config.surface_mask.is_empty();
        if surrogate {
            Self {
                target: settings.fallback_layers,
                surface: settings.fallback_layers,
                ignore: config.ignore_mask,
                surrogate,
            }
        } else {
            Self {
                target: config.target_mask,
                surface: config.surface_mask,
                ignore: config.ignore_mask,
                surrogate,
            }
        }
    }

    /// Composite mask for the motion sweep: targets and surfaces, minus
    /// ignored layers.
    pub fn query_mask(&self) -> LayerMask {
        (self.target | self.surface).without(self.ignore)
    }
}

/// Who fired the projectile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shooter {
    pub actor: Option<Entity>,
    pub faction: Option<Faction>,
}

/// What was hit, with its ownership already resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitSubject {
    pub entity: Entity,
    /// Topmost owner of `entity`
    pub actor: Entity,
    pub faction: Option<Faction>,
    pub layers: LayerMask,
    pub is_sensor: bool,
}

impl HitSubject {
    /// Resolves actor and allegiance of `entity` through the registry.
    pub fn resolve<A: ActorRegistry + ?Sized>(
        actors: &A,
        entity: Entity,
        layers: LayerMask,
        is_sensor: bool,
    ) -> Self {
        Self {
            entity,
            actor: actors.actor_of(entity),
            faction: actors.allegiance(entity),
            layers,
            is_sensor,
        }
    }
}

/// Whether `subject` belongs to the shooter or one of its allies.
pub fn is_friendly(subject: &HitSubject, shooter: &Shooter, factions: &FactionTable) -> bool {
    let own = shooter
        .actor
        .is_some_and(|actor| actor == subject.entity || actor == subject.actor);
    own || factions.allied(shooter.faction, subject.faction)
}

/// Whether `subject` may receive damage (or attract reflection bias).
pub fn is_eligible_target(
    subject: &HitSubject,
    shooter: &Shooter,
    masks: &EffectiveMasks,
    factions: &FactionTable,
) -> bool {
    subject.layers.intersects(masks.target)
        && !subject.layers.intersects(masks.ignore)
        && !is_friendly(subject, shooter, factions)
        && (!masks.surrogate || subject.faction.is_some())
}

/// Classifies a hit as target, surface or ignorable.
///
/// Ignored layers and friendly hits are always ignorable. Targets win over
/// surfaces when a layer is on both masks. Sensors never reflect.
pub fn classify(
    subject: &HitSubject,
    shooter: &Shooter,
    masks: &EffectiveMasks,
    factions: &FactionTable,
) -> HitClass {
    if subject.layers.intersects(masks.ignore) || is_friendly(subject, shooter, factions) {
        return HitClass::Ignorable;
    }
    if is_eligible_target(subject, shooter, masks, factions) {
        return HitClass::Target;
    }
    if subject.layers.intersects(masks.surface) && !subject.is_sensor {
        return HitClass::Surface;
    }
    HitClass::Ignorable
}

/// Classifies a raw sweep hit, resolving its owner through `actors`.
pub fn classify_hit<A: ActorRegistry + ?Sized>(
    hit: &SweepHit,
    actors: &A,
    shooter: &Shooter,
    masks: &EffectiveMasks,
    factions: &FactionTable,
) -> HitClassification {
    let subject = HitSubject::resolve(actors, hit.entity, hit.layers, hit.is_sensor);
    HitClassification {
        point: hit.point,
        normal: sanitize_normal(hit.normal),
        class: classify(&subject, shooter, masks, factions),
    }
}
