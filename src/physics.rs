//! avian3d backend for [`SpatialQueries`].

use avian3d::prelude::{Collider, CollisionLayers, Sensor, ShapeCastConfig, SpatialQuery, SpatialQueryFilter};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::types::LayerMask;
use crate::world::{SpatialQueries, SweepHit, TargetProbe};

/// Layer memberships of an avian collider. Colliders without
/// `CollisionLayers` sit on the default layer only.
pub fn memberships(layers: Option<&CollisionLayers>) -> LayerMask {
    match layers {
        Some(layers) => LayerMask(layers.memberships.0),
        None => LayerMask::layer(0),
    }
}

fn query_filter(mask: LayerMask, excluded: &[Entity]) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask(avian3d::prelude::LayerMask(mask.0))
        .with_excluded_entities(excluded.iter().copied())
}

/// Spatial queries against the avian3d pipeline.
///
/// A zero-radius sweep is a solid ray cast; a positive radius casts a sphere
/// collider of that radius. Shapes the sphere already overlaps at the origin
/// are skipped, so a projectile resting against the surface it just left
/// does not hit it again.
#[derive(SystemParam)]
pub struct AvianWorld<'w, 's> {
    spatial_query: SpatialQuery<'w, 's>,
    colliders: Query<'w, 's, (Option<&'static CollisionLayers>, Has<Sensor>)>,
    transforms: Query<'w, 's, &'static GlobalTransform>,
}

impl AvianWorld<'_, '_> {
    fn describe(&self, entity: Entity) -> (LayerMask, bool) {
        match self.colliders.get(entity) {
            Ok((layers, is_sensor)) => (memberships(layers), is_sensor),
            Err(_) => (LayerMask::layer(0), false),
        }
    }
}

impl SpatialQueries for AvianWorld<'_, '_> {
    fn sweep(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        radius: f32,
        mask: LayerMask,
        excluded: &[Entity],
    ) -> Option<SweepHit> {
        let filter = query_filter(mask, excluded);

        let (entity, distance, point, normal) = if radius > 0.0 {
            let hit = self.spatial_query.cast_shape(
                &Collider::sphere(radius),
                origin,
                Quat::IDENTITY,
                direction,
                &ShapeCastConfig {
                    ignore_origin_penetration: true,
                    ..ShapeCastConfig::from_max_distance(max_distance)
                },
                &filter,
            )?;
            (hit.entity, hit.distance, hit.point1, hit.normal1)
        } else {
            let hit = self
                .spatial_query
                .cast_ray(origin, direction, max_distance, true, &filter)?;
            (hit.entity, hit.distance, origin + *direction * hit.distance, hit.normal)
        };

        let (layers, is_sensor) = self.describe(entity);
        Some(SweepHit {
            entity,
            point,
            normal,
            distance,
            layers,
            is_sensor,
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<TargetProbe> {
        let filter = query_filter(mask, &[]);
        self.spatial_query
            .shape_intersections(&Collider::sphere(radius), center, Quat::IDENTITY, &filter)
            .into_iter()
            .filter_map(|entity| {
                let position = self.transforms.get(entity).ok()?.translation();
                let (layers, _) = self.describe(entity);
                Some(TargetProbe {
                    entity,
                    position,
                    layers,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avian3d::prelude::LayerMask as AvianMask;

    #[test]
    fn test_memberships_default_layer() {
        assert_eq!(memberships(None), LayerMask::layer(0));
    }

    #[test]
    fn test_memberships_from_collision_layers() {
        let layers = CollisionLayers::new(AvianMask(0b1_0010), AvianMask::ALL);
        assert_eq!(memberships(Some(&layers)), LayerMask::layer(1) | LayerMask::layer(4));
    }
}
