//! End-to-end ricochet scenarios on a headless scene.

use std::sync::Arc;

use bevy::prelude::*;
use bevy_ricochet::prelude::*;

const WALLS: LayerMask = LayerMask::layer(1);
const ACTORS: LayerMask = LayerMask::layer(4);

struct Harness {
    scene: StaticScene,
    set: ProjectileSet,
    settings: RicochetSettings,
    factions: FactionTable,
}

impl Harness {
    fn new(scene: StaticScene) -> Self {
        Self {
            scene,
            set: ProjectileSet::new(),
            settings: RicochetSettings::default(),
            factions: FactionTable::default(),
        }
    }

    fn tick(&mut self, dt: f32) -> Vec<ProjectileUpdate> {
        let ctx = StepContext {
            settings: &self.settings,
            factions: &self.factions,
        };
        let (geometry, actors) = self.scene.split_mut();
        self.set.tick(dt, geometry, actors, ctx)
    }

    /// Ticks until the set is empty, returning every notification in order.
    fn run(&mut self, dt: f32, max_ticks: usize) -> Vec<Notification> {
        let mut notifications = Vec::new();
        for _ in 0..max_ticks {
            for update in self.tick(dt) {
                notifications.extend(update.report.notifications);
            }
            if self.set.is_empty() {
                break;
            }
        }
        notifications
    }
}

fn bounces(notifications: &[Notification]) -> Vec<(f32, u32)> {
    notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Bounced { speed, bounces_used, .. } => Some((*speed, *bounces_used)),
            _ => None,
        })
        .collect()
}

fn termination(notifications: &[Notification]) -> Option<TerminationReason> {
    notifications.iter().find_map(|n| match n {
        Notification::Terminated { reason, .. } => Some(*reason),
        _ => None,
    })
}

/// Two facing walls at z = ±0.5.
fn corridor() -> StaticScene {
    let mut scene = StaticScene::new();
    scene.add_plane(Vec3::new(0.0, 0.0, 0.5), Vec3::NEG_Z, WALLS);
    scene.add_plane(Vec3::new(0.0, 0.0, -0.5), Vec3::Z, WALLS);
    scene
}

#[test]
fn test_two_bounces_then_exhaustion() {
    let config = BounceConfig::default()
        .with_launch(10.0, 10.0)
        .with_bounces(2)
        .with_decay(0.2, 0.25)
        .with_masks(WALLS, ACTORS, LayerMask::NONE)
        .with_bias(false, 0.0, 0.0)
        .with_cutoffs(1.0, 10.0);
    let mut harness = Harness::new(corridor());
    let handle = harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    harness.tick(0.1);
    let p = harness.set.get(handle).unwrap();
    assert!((p.speed() - 8.0).abs() < 1e-4);
    assert!((p.damage - 7.5).abs() < 1e-4);
    assert_eq!(p.bounces_used, 1);

    let rest = harness.run(0.1, 100);
    assert_eq!(bounces(&rest).len(), 1);
    let (speed, used) = bounces(&rest)[0];
    assert!((speed - 6.4).abs() < 1e-4);
    assert_eq!(used, 2);
    assert_eq!(termination(&rest), Some(TerminationReason::BouncesExhausted));
}

#[test]
fn test_zero_bounce_budget_terminates_on_first_surface() {
    let config = presets::bullet().with_masks(WALLS, ACTORS, LayerMask::NONE);
    let mut harness = Harness::new(corridor());
    harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    let notifications = harness.run(0.1, 10);

    assert!(bounces(&notifications).is_empty());
    assert_eq!(termination(&notifications), Some(TerminationReason::BouncesExhausted));
}

#[test]
fn test_damage_and_speed_follow_decay_law() {
    let config = BounceConfig::default()
        .with_launch(20.0, 100.0)
        .with_bounces(8)
        .with_decay(0.5, 0.1)
        .with_masks(WALLS, ACTORS, LayerMask::NONE)
        .with_bias(false, 0.0, 0.0)
        .with_cutoffs(4.0, 60.0);
    let mut harness = Harness::new(corridor());
    let handle = harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    let mut seen = 0;
    for _ in 0..400 {
        harness.tick(0.01);
        let Some(p) = harness.set.get(handle) else {
            break;
        };
        if p.bounces_used > seen {
            seen = p.bounces_used;
            let expected = 100.0 * 0.9f32.powi(seen as i32);
            assert!((p.damage - expected).abs() < 1e-3);
            assert!(p.speed() >= 2.0 - 1e-4);
        }
    }
    assert!(seen >= 3);
}

#[test]
fn test_lifetime_cutoff_ignores_speed() {
    let config = BounceConfig::default()
        .with_launch(1000.0, 10.0)
        .with_cutoffs(0.0, 0.25);
    let mut harness = Harness::new(StaticScene::new());
    harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    let mut ticks = 0;
    let mut reason = None;
    while reason.is_none() && ticks < 10 {
        ticks += 1;
        reason = termination(&harness.run(0.1, 1));
    }

    assert_eq!(ticks, 4);
    assert_eq!(reason, Some(TerminationReason::LifetimeExpired));
}

/// Receiver exposing only the instigator-aware, amount-only shape.
#[derive(Default)]
struct Tally {
    received: f32,
    calls: u32,
}

impl DamageReceiver for Tally {
    fn damage_amount(&mut self, amount: f32) -> bool {
        self.received += amount;
        self.calls += 1;
        true
    }
}

#[test]
fn test_amount_only_receiver_is_charged_once() {
    let mut scene = StaticScene::new();
    let enemy = scene.add_sphere(Vec3::new(0.0, 0.0, 3.0), 0.5, ACTORS);
    scene.set_faction(enemy, Faction::Enemy);
    scene.add_receiver(enemy, Tally::default());

    let config = BounceConfig::default()
        .with_launch(10.0, 12.5)
        .with_masks(WALLS, ACTORS, LayerMask::NONE);
    let mut harness = Harness::new(scene);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    let notifications = harness.run(0.1, 10);

    let outcome = notifications.iter().find_map(|n| match n {
        Notification::Impact { outcome, .. } => Some(outcome.clone()),
        _ => None,
    });
    assert_eq!(
        outcome,
        Some(DispatchOutcome::Handled {
            receiver: enemy,
            strategy: DispatchStrategy::InstigatedAmount,
        })
    );
    let tally = harness.scene.receiver::<Tally>(enemy).unwrap();
    assert_eq!(tally.received, 12.5);
    assert_eq!(tally.calls, 1);
    assert_eq!(termination(&notifications), Some(TerminationReason::TargetHit));
}

#[test]
fn test_hit_on_limb_charges_boss() {
    let mut scene = StaticScene::new();
    let boss = scene.add_actor(Faction::Enemy);
    scene.mark_authority(boss);
    scene.add_receiver(boss, Health::new(200.0));
    let limb = scene.add_sphere(Vec3::new(0.0, 0.0, 3.0), 0.5, ACTORS);
    scene.set_owner(limb, boss);

    let player = scene.add_actor(Faction::Player);
    let config = BounceConfig::default()
        .with_launch(10.0, 30.0)
        .with_masks(WALLS, ACTORS, LayerMask::NONE);
    let mut harness = Harness::new(scene);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, Some(player), Arc::new(config));

    harness.run(0.1, 10);

    let health = harness.scene.receiver::<Health>(boss).unwrap();
    assert_eq!(health.current, 170.0);
    assert_eq!(health.last_instigator, Some(player));
}

#[test]
fn test_allies_are_never_damaged() {
    let mut scene = StaticScene::new();
    let player = scene.add_actor(Faction::Player);
    let ally = scene.add_sphere(Vec3::new(0.0, 0.0, 2.0), 0.5, ACTORS);
    scene.set_faction(ally, Faction::Player);
    scene.add_receiver(ally, Health::new(100.0));
    scene.add_plane(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, WALLS);

    let config = presets::bullet().with_masks(WALLS, ACTORS, LayerMask::NONE);
    let mut harness = Harness::new(scene);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, Some(player), Arc::new(config));

    let notifications = harness.run(1.0 / 60.0, 120);

    assert_eq!(harness.scene.receiver::<Health>(ally).map(|h| h.current), Some(100.0));
    assert_eq!(termination(&notifications), Some(TerminationReason::BouncesExhausted));
}

#[test]
fn test_bias_steers_toward_target_off_mirror() {
    let mut scene = StaticScene::new();
    scene.add_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z, WALLS);
    // Mirror direction from the wall is -Z; the enemy sits 20 degrees off it.
    let angle = 20f32.to_radians();
    let enemy_at = Vec3::new(0.0, 0.0, 1.0) + Vec3::new(angle.sin(), 0.0, -angle.cos()) * 4.0;
    let enemy = scene.add_sphere(enemy_at, 0.3, ACTORS);
    scene.set_faction(enemy, Faction::Enemy);

    let config = presets::seeker_round()
        .with_launch(10.0, 10.0)
        .with_masks(WALLS, ACTORS, LayerMask::NONE)
        .with_bias(true, 30.0, 8.0);
    let mut harness = Harness::new(scene);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    let updates = harness.tick(0.2);
    let Some(Notification::Bounced {
        point,
        direction,
        biased_toward,
        ..
    }) = updates.first().and_then(|u| u.report.notifications.first()).cloned()
    else {
        panic!("expected a bounce");
    };

    assert_eq!(biased_toward, Some(enemy));
    let to_enemy = (enemy_at - point).normalize();
    let total = Vec3::NEG_Z.angle_between(to_enemy);
    let travelled = Vec3::NEG_Z.angle_between(direction);
    assert!((travelled / total - 0.85).abs() < 1e-3);
}

#[test]
fn test_empty_masks_still_bounce_off_default_geometry() {
    let mut scene = StaticScene::new();
    scene.add_plane(Vec3::new(0.0, 0.0, 0.5), Vec3::NEG_Z, LayerMask::layer(0));

    let config = BounceConfig::default().with_launch(10.0, 10.0).with_bias(false, 0.0, 0.0);
    let mut harness = Harness::new(scene);
    let handle = harness.set.spawn(Vec3::ZERO, Vec3::Z, None, Arc::new(config));

    harness.tick(0.1);

    assert_eq!(harness.set.get(handle).map(|p| p.bounces_used), Some(1));
}

#[test]
fn test_unhandled_target_still_terminates() {
    let mut scene = StaticScene::new();
    let dummy = scene.add_sphere(Vec3::new(0.0, 0.0, 2.0), 0.5, ACTORS);
    scene.set_faction(dummy, Faction::Enemy);

    let config = BounceConfig::default()
        .with_launch(10.0, 5.0)
        .with_masks(WALLS, ACTORS, LayerMask::NONE);
    let mut harness = Harness::new(scene);
    let player = harness.scene.add_actor(Faction::Player);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, Some(player), Arc::new(config));

    let notifications = harness.run(0.1, 10);

    let broadcast = notifications.iter().find_map(|n| match n {
        Notification::Impact {
            outcome: DispatchOutcome::Unhandled(broadcast),
            ..
        } => Some(broadcast.clone()),
        _ => None,
    });
    let broadcast = broadcast.unwrap();
    assert!(broadcast.reaches(dummy));
    assert_eq!(broadcast.amount, 5.0);
    assert_eq!(broadcast.instigator, Some(player));
    assert!(harness.set.is_empty());
}

#[test]
fn test_overdrawn_damage_loss_never_heals() {
    let mut scene = StaticScene::new();
    scene.add_plane(Vec3::new(0.0, 0.0, 0.5), Vec3::NEG_Z, WALLS);
    let enemy = scene.add_sphere(Vec3::new(0.0, 0.0, -2.0), 0.5, ACTORS);
    scene.set_faction(enemy, Faction::Enemy);
    scene.add_receiver(enemy, Health::new(100.0));

    let config = BounceConfig::default()
        .with_launch(10.0, 10.0)
        .with_decay(0.0, 1.5)
        .with_masks(WALLS, ACTORS, LayerMask::NONE)
        .with_bias(false, 0.0, 0.0);
    let mut harness = Harness::new(scene);
    let player = harness.scene.add_actor(Faction::Player);
    harness.set.spawn(Vec3::ZERO, Vec3::Z, Some(player), Arc::new(config));

    let notifications = harness.run(0.1, 20);

    let damage = notifications.iter().find_map(|n| match n {
        Notification::Impact { target, damage, .. } if *target == enemy => Some(*damage),
        _ => None,
    });
    assert_eq!(damage, Some(0.0));
    let health = harness.scene.receiver::<Health>(enemy).unwrap();
    assert_eq!(health.current, 100.0);
    assert!(health.current <= health.max);
}
