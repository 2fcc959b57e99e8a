//! Keeps [`OwnershipTable`] in step with the Bevy hierarchy.

use bevy::prelude::*;

use crate::resources::OwnershipTable;

/// Mirrors `ChildOf` links into the ownership table.
///
/// Colliders spawned as children of an actor become owned by it. Entries are
/// dropped when the link is removed or the child despawns. Links set directly
/// on the table for entities outside the hierarchy are left alone.
pub fn sync_ownership_table(
    mut ownership: ResMut<OwnershipTable>,
    changed: Query<(Entity, &ChildOf), Changed<ChildOf>>,
    mut removed: RemovedComponents<ChildOf>,
) {
    for entity in removed.read() {
        ownership.remove(entity);
    }
    for (entity, child_of) in changed.iter() {
        ownership.set_owner(entity, child_of.parent());
    }
}
