//! Pairwise attraction between nearby particles.

use motes_index::{Boundary, NeighborhoodIndex};

use crate::config::AttractConfig;
use crate::particle::Particle;

/// Half-width of the square neighbourhood searched around each particle.
pub const ATTRACTION_HALF_WIDTH: f32 = 200.0;

/// Pull every particle toward its neighbours within the attraction square.
///
/// `positions` must be the snapshot the index was rebuilt from, in particle order.
/// The force is scaled per axis by `rotate_x`/`rotate_y` x 1000 rather than falling
/// off radially.
pub fn apply_attraction(
    attract: &AttractConfig,
    index: &dyn NeighborhoodIndex,
    positions: &[(f32, f32)],
    particles: &mut [Particle],
) {
    if !attract.enable {
        return;
    }
    let scale_x = attract.rotate_x * 1000.0;
    let scale_y = attract.rotate_y * 1000.0;
    for (id, &(x, y)) in positions.iter().enumerate() {
        let range = Boundary::centered(x, y, ATTRACTION_HALF_WIDTH, ATTRACTION_HALF_WIDTH);
        let (mut pull_x, mut pull_y) = (0.0, 0.0);
        index.query_range(&range, &mut |other| {
            if other == id {
                return;
            }
            let (ox, oy) = positions[other];
            pull_x += (x - ox) / scale_x;
            pull_y += (y - oy) / scale_y;
        });
        if let Some(particle) = particles.get_mut(id) {
            particle.vx -= pull_x;
            particle.vy -= pull_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotesConfig;
    use motes_index::QuadTree;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::Arc;

    fn cluster(config: MotesConfig) -> (QuadTree, Vec<(f32, f32)>, Vec<Particle>) {
        let config = Arc::new(config);
        let mut rng = SmallRng::seed_from_u64(11);
        let particles: Vec<Particle> = [(100.0, 100.0), (150.0, 120.0), (390.0, 390.0), (110.0, 95.0)]
            .into_iter()
            .map(|(x, y)| Particle::new(Arc::clone(&config), &mut rng, x, y))
            .collect();
        let positions: Vec<(f32, f32)> = particles.iter().map(|p| (p.x, p.y)).collect();
        let mut index = QuadTree::default();
        index
            .rebuild(Boundary::new(0.0, 0.0, 400.0, 400.0), &positions)
            .expect("valid bounds");
        (index, positions, particles)
    }

    #[test]
    fn disabled_attraction_leaves_velocities_identical() {
        let mut config = MotesConfig::default();
        config.particles.movement.attract.enable = false;
        let (index, positions, mut particles) = cluster(config.clone());
        let before: Vec<(f32, f32)> = particles.iter().map(|p| (p.vx, p.vy)).collect();
        apply_attraction(
            &config.particles.movement.attract,
            &index,
            &positions,
            &mut particles,
        );
        let after: Vec<(f32, f32)> = particles.iter().map(|p| (p.vx, p.vy)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn neighbours_pull_along_each_axis_independently() {
        let mut config = MotesConfig::default();
        config.particles.movement.attract.enable = true;
        config.particles.movement.attract.rotate_x = 1.0;
        config.particles.movement.attract.rotate_y = 2.0;
        let (index, positions, mut particles) = cluster(config.clone());
        let before: Vec<(f32, f32)> = particles.iter().map(|p| (p.vx, p.vy)).collect();
        apply_attraction(
            &config.particles.movement.attract,
            &index,
            &positions,
            &mut particles,
        );

        // Particle 0 sees 1 and 3; particle 2 is outside its square.
        let expected_x = ((100.0 - 150.0) + (100.0 - 110.0)) / 1000.0;
        let expected_y = ((100.0 - 120.0) + (100.0 - 95.0)) / 2000.0;
        assert!((particles[0].vx - (before[0].0 - expected_x)).abs() < 1e-6);
        assert!((particles[0].vy - (before[0].1 - expected_y)).abs() < 1e-6);

        // Particle 2 has no neighbour within 200 on both axes.
        assert_eq!((particles[2].vx, particles[2].vy), before[2]);
    }
}
