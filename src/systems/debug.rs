use bevy::prelude::*;

use crate::components::RicochetProjectile;
use crate::systems::bounce::FlightPhase;

/// Draw debug gizmos for ricochet projectiles.
///
/// Draws each projectile, its velocity, and its bias search sphere right after
/// a bounce.
pub fn draw_ricochet_debug(
    mut gizmos: Gizmos,
    query: Query<&RicochetProjectile>,
    settings: Res<crate::resources::RicochetSettings>,
) {
    if !settings.debug_draw {
        return;
    }

    for projectile in query.iter() {
        let color = match projectile.phase {
            FlightPhase::Bouncing => Color::srgb(1.0, 0.6, 0.0),
            _ => Color::srgb(1.0, 0.0, 0.0),
        };
        gizmos.sphere(projectile.position, 0.05 + projectile.config.probe_radius, color);

        let end = projectile.position + projectile.velocity * 0.1; // Scale down for visibility
        gizmos.line(projectile.position, end, Color::srgb(0.0, 1.0, 0.0));

        if projectile.phase == FlightPhase::Bouncing && projectile.config.bias_active() {
            gizmos.sphere(
                projectile.position,
                projectile.config.target_search_radius,
                Color::srgba(0.2, 0.4, 1.0, 0.3),
            );
        }
    }
}
