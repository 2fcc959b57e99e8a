//! Motion integrator - one swept cast per tick, then classify and react.

use std::sync::Arc;

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::components::{Allegiance, RicochetProjectile};
use crate::events::{DamageBroadcast, FireRicochetEvent, ProjectileExpiredEvent, ProjectileImpactEvent, RicochetEvent};
use crate::resources::{BounceConfig, FactionTable, RicochetSettings};
use crate::systems::bounce::{self, BounceVerdict, FlightPhase};
use crate::systems::classify::{self, EffectiveMasks, HitSubject, Shooter};
use crate::systems::dispatch::{self, DispatchOutcome};
use crate::systems::reflection::{self, Reflection};
use crate::types::{HitClass, TerminationReason};
use crate::world::{ActorRegistry, SpatialQueries};

/// Read-only context shared by every projectile in a tick.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub settings: &'a RicochetSettings,
    pub factions: &'a FactionTable,
}

/// Fire-and-forget side effects of one tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Bounced {
        surface: Entity,
        point: Vec3,
        normal: Vec3,
        direction: Vec3,
        speed: f32,
        bounces_used: u32,
        biased_toward: Option<Entity>,
    },
    Impact {
        target: Entity,
        point: Vec3,
        damage: f32,
        outcome: DispatchOutcome,
    },
    Terminated {
        position: Vec3,
        reason: TerminationReason,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminated(TerminationReason),
}

/// Everything one call to [`advance_projectile`] produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub notifications: Vec<Notification>,
}

impl TickReport {
    fn terminated(projectile: &mut RicochetProjectile, reason: TerminationReason, mut notifications: Vec<Notification>) -> Self {
        projectile.phase = FlightPhase::Terminated(reason);
        debug!("projectile terminated at {:?}: {:?}", projectile.position, reason);
        notifications.push(Notification::Terminated {
            position: projectile.position,
            reason,
        });
        Self {
            outcome: TickOutcome::Terminated(reason),
            notifications,
        }
    }
}

/// Advances one projectile by `dt`.
///
/// Order: start-of-tick cutoffs, then a single sweep over the composite mask
/// for the length of this step. Ignorable hits are passed through by sweeping
/// again with them excluded, up to `settings.max_pass_through` times; when
/// that bound runs out the projectile stops at the last one passed. A target
/// hit dispatches damage and terminates at the contact. A surface hit either
/// bounces (dropping the rest of this step) or terminates when the budget is
/// spent. Lifetime advances only for projectiles still alive.
///
/// # Arguments
/// * `projectile` - Projectile to advance
/// * `dt` - Time step in seconds
/// * `spatial` - Physics query collaborator
/// * `actors` - Ownership and damage collaborator
/// * `ctx` - Global settings and faction table
pub fn advance_projectile<S, A>(
    projectile: &mut RicochetProjectile,
    dt: f32,
    spatial: &S,
    actors: &mut A,
    ctx: StepContext,
) -> TickReport
where
    S: SpatialQueries + ?Sized,
    A: ActorRegistry + ?Sized,
{
    if let FlightPhase::Terminated(reason) = projectile.phase {
        return TickReport {
            outcome: TickOutcome::Terminated(reason),
            notifications: Vec::new(),
        };
    }
    projectile.phase = FlightPhase::Flying;

    if let Some(reason) = bounce::check_cutoffs(projectile) {
        return TickReport::terminated(projectile, reason, Vec::new());
    }

    let mut notifications = Vec::new();
    let step = projectile.velocity * dt;
    let Ok(direction) = Dir3::new(step) else {
        projectile.elapsed += dt;
        return TickReport {
            outcome: TickOutcome::Continue,
            notifications,
        };
    };
    let distance = step.length();

    let config = Arc::clone(&projectile.config);
    let masks = EffectiveMasks::resolve(&config, ctx.settings);
    let shooter = Shooter {
        actor: projectile.owner.map(|owner| actors.actor_of(owner)),
        faction: projectile
            .faction
            .or_else(|| projectile.owner.and_then(|owner| actors.allegiance(owner))),
    };

    let origin = projectile.position;
    let mut passed_through = Vec::new();
    let mut end = origin + *direction * distance;
    let mut last_passed = origin;
    let mut swept_clear = false;

    for _ in 0..=ctx.settings.max_pass_through {
        let Some(hit) = spatial.sweep(
            origin,
            direction,
            distance,
            config.probe_radius,
            masks.query_mask(),
            &passed_through,
        ) else {
            swept_clear = true;
            break;
        };

        let classification = classify::classify_hit(&hit, &*actors, &shooter, &masks, ctx.factions);
        // Probe center at time of impact; equals the contact point for rays.
        let impact = origin + *direction * hit.distance;
        match classification.class {
            HitClass::Ignorable => {
                passed_through.push(hit.entity);
                last_passed = impact;
            }
            HitClass::Target => {
                let damage = projectile.damage;
                let outcome = dispatch::deliver_damage(actors, hit.entity, damage, projectile.owner);
                projectile.position = impact;
                notifications.push(Notification::Impact {
                    target: hit.entity,
                    point: classification.point,
                    damage,
                    outcome,
                });
                return TickReport::terminated(projectile, TerminationReason::TargetHit, notifications);
            }
            HitClass::Surface => {
                if bounce::budget_exhausted(projectile) {
                    bounce::apply_bounce(projectile, impact, Vec3::ZERO);
                    return TickReport::terminated(projectile, TerminationReason::BouncesExhausted, notifications);
                }

                let reflection = reflect_off_surface(
                    projectile,
                    &config,
                    classification.point,
                    classification.normal,
                    hit.entity,
                    spatial,
                    &*actors,
                    &shooter,
                    &masks,
                    ctx.factions,
                );
                if bounce::apply_bounce(projectile, impact, reflection.direction) == BounceVerdict::Bounced {
                    notifications.push(Notification::Bounced {
                        surface: hit.entity,
                        point: classification.point,
                        normal: classification.normal,
                        direction: reflection.direction,
                        speed: projectile.speed(),
                        bounces_used: projectile.bounces_used,
                        biased_toward: reflection.biased_toward,
                    });
                }
                end = projectile.position;
                swept_clear = true;
                break;
            }
        }
    }

    if !swept_clear {
        // Unresolved contacts may remain behind the last pass-through.
        debug!("pass-through bound reached; holding at {:?}", last_passed);
        end = last_passed;
    }

    projectile.position = end;
    projectile.elapsed += dt;
    TickReport {
        outcome: TickOutcome::Continue,
        notifications,
    }
}

/// Mirror reflection at a surface contact, biased toward an eligible target
/// near the contact when the configuration asks for it.
#[allow(clippy::too_many_arguments)]
fn reflect_off_surface<S, A>(
    projectile: &RicochetProjectile,
    config: &BounceConfig,
    point: Vec3,
    normal: Vec3,
    surface: Entity,
    spatial: &S,
    actors: &A,
    shooter: &Shooter,
    masks: &EffectiveMasks,
    factions: &FactionTable,
) -> Reflection
where
    S: SpatialQueries + ?Sized,
    A: ActorRegistry + ?Sized,
{
    let incoming = projectile.direction();
    if !config.bias_active() {
        return reflection::biased_reflection(incoming, normal, point, 0.0, std::iter::empty());
    }

    let candidates = spatial
        .overlap_sphere(point, config.target_search_radius, masks.target.without(masks.ignore))
        .into_iter()
        .filter(|probe| probe.entity != surface)
        .filter(|probe| {
            let subject = HitSubject::resolve(actors, probe.entity, probe.layers, false);
            classify::is_eligible_target(&subject, shooter, masks, factions)
        });
    reflection::biased_reflection(incoming, normal, point, config.aim_cone_degrees, candidates)
}

/// Spawns a ricochet projectile entity.
///
/// Returns the entity, which serves as the projectile handle; despawning it
/// cancels the projectile.
///
/// # Arguments
/// * `commands` - Bevy Commands
/// * `origin` - Muzzle position
/// * `direction` - Travel direction
/// * `owner` - Firing actor, for friendly-fire exclusion
/// * `config` - Shared bounce configuration
pub fn spawn_ricochet(
    commands: &mut Commands,
    origin: Vec3,
    direction: Vec3,
    owner: Option<Entity>,
    config: Arc<BounceConfig>,
) -> Entity {
    spawn_projectile_entity(commands, RicochetProjectile::launch(origin, direction, owner, config))
}

fn spawn_projectile_entity(commands: &mut Commands, projectile: RicochetProjectile) -> Entity {
    let mut transform = Transform::from_translation(projectile.position);
    if projectile.velocity.length_squared() > 0.001 {
        transform.look_to(projectile.direction(), Vec3::Y);
    }
    commands.spawn((transform, projectile)).id()
}

/// Turns fire requests into projectile entities.
///
/// The shooter's allegiance, when it has one, is stamped on the projectile so
/// it survives the shooter despawning mid-flight.
pub fn spawn_ricochet_projectiles(
    mut commands: Commands,
    mut fire_events: MessageReader<FireRicochetEvent>,
    allegiances: Query<&Allegiance>,
) {
    for fire in fire_events.read() {
        let mut projectile =
            RicochetProjectile::launch(fire.origin, fire.direction, fire.shooter, Arc::clone(&fire.config));
        if let Some(Allegiance(faction)) = fire.shooter.and_then(|shooter| allegiances.get(shooter).ok()) {
            projectile.faction = Some(*faction);
        }
        spawn_projectile_entity(&mut commands, projectile);
    }
}

/// Advances every ricochet projectile against the avian3d world.
///
/// Writes bounce, impact, expiry and broadcast messages, mirrors the
/// simulated position into `Transform`, and despawns terminated projectiles.
#[cfg(feature = "dim3")]
#[allow(clippy::too_many_arguments)]
pub fn step_ricochet_projectiles(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<RicochetSettings>,
    factions: Res<FactionTable>,
    spatial: crate::physics::AvianWorld,
    mut actors: crate::world::EcsActors,
    mut projectiles: Query<(Entity, &mut Transform, &mut RicochetProjectile)>,
    mut ricochet_events: MessageWriter<RicochetEvent>,
    mut impact_events: MessageWriter<ProjectileImpactEvent>,
    mut expired_events: MessageWriter<ProjectileExpiredEvent>,
    mut broadcasts: MessageWriter<DamageBroadcast>,
) {
    let dt = time.delta_secs();
    let ctx = StepContext {
        settings: &settings,
        factions: &factions,
    };

    for (entity, mut transform, mut projectile) in projectiles.iter_mut() {
        let report = advance_projectile(&mut projectile, dt, &spatial, &mut actors, ctx);

        transform.translation = projectile.position;
        if projectile.velocity.length_squared() > 0.001 {
            transform.look_to(projectile.direction(), Vec3::Y);
        }

        for notification in report.notifications {
            match notification {
                Notification::Bounced {
                    surface,
                    point,
                    normal,
                    direction,
                    speed,
                    bounces_used,
                    biased_toward,
                } => {
                    ricochet_events.write(RicochetEvent {
                        projectile: entity,
                        surface,
                        impact_point: point,
                        normal,
                        new_direction: direction,
                        new_speed: speed,
                        bounces_used,
                        biased_toward,
                    });
                }
                Notification::Impact {
                    target,
                    point,
                    damage,
                    outcome,
                } => {
                    let (receiver, strategy) = match outcome {
                        DispatchOutcome::Handled { receiver, strategy } => (Some(receiver), Some(strategy)),
                        DispatchOutcome::Unhandled(broadcast) => {
                            broadcasts.write(broadcast);
                            (None, None)
                        }
                    };
                    impact_events.write(ProjectileImpactEvent {
                        projectile: entity,
                        target,
                        receiver,
                        impact_point: point,
                        damage,
                        strategy,
                    });
                }
                Notification::Terminated { position, reason } => {
                    expired_events.write(ProjectileExpiredEvent {
                        projectile: entity,
                        position,
                        reason,
                    });
                }
            }
        }

        if let TickOutcome::Terminated(_) = report.outcome {
            commands.entity(entity).despawn();
        }
    }
}
