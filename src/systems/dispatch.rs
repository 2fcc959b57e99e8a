//! Damage dispatch resolver.
//!
//! A hit collider is rarely the thing that owns hit points. The resolver walks
//! the ownership chain to the damage authority, then tries the recognized call
//! shapes in a fixed priority order across every receiver on every node of
//! that chain. The first receiver to accept ends the dispatch, so a target
//! exposing several shapes is charged exactly once.

use std::any::Any;

use bevy::prelude::*;

use crate::events::DamageBroadcast;
use crate::resources::MAX_OWNERSHIP_DEPTH;
use crate::types::DispatchStrategy;
use crate::world::ActorRegistry;

/// Amount and instigator bundled for compound-payload receivers.
#[derive(Clone, Debug, PartialEq)]
pub struct DamagePayload {
    pub amount: f32,
    pub instigator: Option<Entity>,
}

/// Damage-receiving capability.
///
/// Every method stands for one call shape. The default bodies return `false`,
/// meaning "this receiver does not expose that shape"; implementors override
/// the shapes they support and return `true` once the damage is applied.
///
/// # Example
/// ```
/// use bevy::prelude::*;
/// use bevy_ricochet::systems::dispatch::DamageReceiver;
///
/// struct Shield {
///     charge: f32,
/// }
///
/// impl DamageReceiver for Shield {
///     fn damage_amount(&mut self, amount: f32) -> bool {
///         self.charge -= amount;
///         true
///     }
/// }
///
/// let mut shield = Shield { charge: 10.0 };
/// assert!(!shield.damage_from(4.0, None));
/// assert!(shield.damage_amount(4.0));
/// assert_eq!(shield.charge, 6.0);
/// ```
pub trait DamageReceiver: Any + Send + Sync {
    /// Instigator-aware, single combined argument.
    fn damage_from_payload(&mut self, _payload: &DamagePayload) -> bool {
        false
    }

    /// Instigator-aware, amount and instigator as separate arguments.
    fn damage_from(&mut self, _amount: f32, _instigator: Option<Entity>) -> bool {
        false
    }

    /// Instigator-aware family, amount only.
    fn damage_amount(&mut self, _amount: f32) -> bool {
        false
    }

    /// Generic take-damage with instigator.
    fn take_damage_from(&mut self, _amount: f32, _instigator: Option<Entity>) -> bool {
        false
    }

    /// Generic take-damage, amount only.
    fn take_damage(&mut self, _amount: f32) -> bool {
        false
    }
}

/// Calls the shape named by `strategy` on `receiver`.
pub fn invoke(strategy: DispatchStrategy, receiver: &mut dyn DamageReceiver, payload: &DamagePayload) -> bool {
    match strategy {
        DispatchStrategy::InstigatedPayload => receiver.damage_from_payload(payload),
        DispatchStrategy::InstigatedPair => receiver.damage_from(payload.amount, payload.instigator),
        DispatchStrategy::InstigatedAmount => receiver.damage_amount(payload.amount),
        DispatchStrategy::GenericPair => receiver.take_damage_from(payload.amount, payload.instigator),
        DispatchStrategy::GenericAmount => receiver.take_damage(payload.amount),
    }
}

/// Ownership chain of a hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerChain {
    /// Nodes from the hit collider (first) up to the resolved owner (last)
    pub nodes: Vec<Entity>,
    /// Whether the owner carries the damage-authority marker; `false` means
    /// the walk fell back to the chain root
    pub found_authority: bool,
}

impl OwnerChain {
    /// The resolved damageable owner.
    pub fn owner(&self) -> Entity {
        self.nodes[self.nodes.len() - 1]
    }
}

/// Walks up from `hit` to the nearest damage authority (inclusive).
///
/// Without an authority anywhere, the chain runs to the topmost ancestor. The
/// walk stops after [`MAX_OWNERSHIP_DEPTH`] nodes.
pub fn resolve_owner_chain<A: ActorRegistry + ?Sized>(actors: &A, hit: Entity) -> OwnerChain {
    let mut nodes = vec![hit];
    let mut current = hit;
    loop {
        if actors.is_damage_authority(current) {
            return OwnerChain {
                nodes,
                found_authority: true,
            };
        }
        let Some(owner) = actors.owner_of(current) else {
            break;
        };
        if nodes.len() >= MAX_OWNERSHIP_DEPTH || nodes.contains(&owner) {
            debug!("ownership chain from {hit:?} cut at {} nodes", nodes.len());
            break;
        }
        nodes.push(owner);
        current = owner;
    }
    OwnerChain {
        nodes,
        found_authority: false,
    }
}

/// Result of a damage delivery.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// A receiver on `receiver` accepted the damage via `strategy`
    Handled {
        receiver: Entity,
        strategy: DispatchStrategy,
    },
    /// Nothing accepted; the broadcast should be published best-effort
    Unhandled(DamageBroadcast),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled { .. })
    }
}

/// Delivers `amount` to the owner of `hit`.
///
/// Strategies are tried in [`DispatchStrategy::PRIORITY`] order. For each
/// strategy every node is visited from the resolved owner down to the hit
/// collider, and every receiver on each node is offered the call. The first
/// acceptance wins and nothing else is invoked.
pub fn deliver_damage<A: ActorRegistry + ?Sized>(
    actors: &mut A,
    hit: Entity,
    amount: f32,
    instigator: Option<Entity>,
) -> DispatchOutcome {
    let chain = resolve_owner_chain(&*actors, hit);
    let payload = DamagePayload { amount, instigator };

    for strategy in DispatchStrategy::PRIORITY {
        for &node in chain.nodes.iter().rev() {
            let accepted = actors.visit_receivers(node, &mut |receiver: &mut dyn DamageReceiver| {
                invoke(strategy, receiver, &payload)
            });
            if accepted {
                trace!("damage {amount} on {hit:?} handled by {node:?} via {strategy:?}");
                return DispatchOutcome::Handled {
                    receiver: node,
                    strategy,
                };
            }
        }
    }

    warn!(
        "no damage receiver in chain of {hit:?} (owner {:?}); broadcasting {amount}",
        chain.owner()
    );
    DispatchOutcome::Unhandled(DamageBroadcast {
        hit,
        chain: chain.nodes,
        amount,
        instigator,
    })
}
