// ABOUTME: One-time pool initialization from an injectable seed.
// ABOUTME: Five off-screen dust clusters, band targets, and a wave-staggered spawn delay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::particle::{Particle, STATE_ACTIVE, STATE_WAITING};

/// Per-index linear term of the spawn delay, in seconds
pub const WAVE_DELAY: f32 = 0.0008;
/// Upper bound of the random spawn jitter, in seconds
pub const MAX_RANDOM_DELAY: f32 = 4.0;
/// Delays at or below this spawn immediately
pub const IMMEDIATE_SPAWN: f32 = 0.01;

pub const TARGET_X: (f32, f32) = (0.05, 0.95);
pub const TARGET_Y: (f32, f32) = (0.3, 0.7);

pub const CLUSTER_COUNT: usize = 5;

/// Start position for slot `index`, before it is jittered
fn cluster_start(index: usize, rng: &mut StdRng) -> [f32; 2] {
    match index % CLUSTER_COUNT {
        // Top left cloud
        0 => [
            -0.4 - rng.random_range(0.0..=0.3),
            0.7 + rng.random_range(-0.15..=0.15),
        ],
        // Middle left stream
        1 => [
            -0.5 - rng.random_range(0.0..=0.4),
            0.5 + rng.random_range(-0.2..=0.2),
        ],
        // Bottom left cloud
        2 => [
            -0.3 - rng.random_range(0.0..=0.3),
            0.3 + rng.random_range(-0.15..=0.15),
        ],
        // Far left, scattered
        3 => [-0.8 - rng.random_range(0.0..=0.2), rng.random_range(0.2..=0.8)],
        _ => [-0.2 - rng.random_range(0.0..=0.6), rng.random_range(0.1..=0.9)],
    }
}

pub fn spawn_particle(index: usize, rng: &mut StdRng) -> Particle {
    let target_pos = [
        rng.random_range(TARGET_X.0..=TARGET_X.1),
        rng.random_range(TARGET_Y.0..=TARGET_Y.1),
    ];

    let mut position = cluster_start(index, rng);
    position[0] += rng.random_range(-0.05..=0.05);
    position[1] += rng.random_range(-0.05..=0.05);

    let spawn_delay = index as f32 * WAVE_DELAY + rng.random_range(0.0..=MAX_RANDOM_DELAY);

    let size = rng.random_range(0.001..=0.003);

    // Biased rightward, toward the text
    let angle: f32 = rng.random_range(-0.5..=0.5);
    let magnitude: f32 = rng.random_range(0.03..=0.12);
    let velocity = [
        magnitude * angle.cos() + 0.05 + rng.random_range(-0.01..=0.01),
        magnitude * angle.sin() + rng.random_range(-0.02..=0.01),
    ];

    Particle {
        position,
        velocity,
        size,
        rotation: rng.random_range(0.0..=1.0) * TAU,
        opacity: 0.0,
        _padding: 0.0,
        target_pos,
        state: if spawn_delay <= IMMEDIATE_SPAWN {
            STATE_ACTIVE
        } else {
            STATE_WAITING
        },
        hold_time: spawn_delay,
    }
}

pub fn initialize(count: usize, seed: u64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|i| spawn_particle(i, &mut rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleState;

    #[test]
    fn test_init_states_and_hold_times() {
        let particles = initialize(20_000, 42);
        for (i, p) in particles.iter().enumerate() {
            assert!(p.hold_time >= 0.0);
            assert!(p.state == STATE_WAITING || p.state == STATE_ACTIVE);
            assert_eq!(p.state == STATE_ACTIVE, p.hold_time <= IMMEDIATE_SPAWN, "slot {i}");
            assert!(p.hold_time >= i as f32 * WAVE_DELAY);
            assert_eq!(p.opacity, 0.0);
        }
    }

    #[test]
    fn test_full_pool_invariants() {
        let particles = initialize(500_000, 9);
        assert_eq!(particles.len(), 500_000);
        assert!(particles
            .iter()
            .all(|p| p.hold_time >= 0.0 && matches!(p.state(), ParticleState::Waiting | ParticleState::Active)));
    }

    #[test]
    fn test_ranges() {
        for p in initialize(5_000, 3) {
            assert!((TARGET_X.0..=TARGET_X.1).contains(&p.target_pos[0]));
            assert!((TARGET_Y.0..=TARGET_Y.1).contains(&p.target_pos[1]));
            assert!((0.001..=0.003).contains(&p.size));
            assert!((0.0..=TAU).contains(&p.rotation));
            // Every cluster starts off-screen to the left
            assert!(p.position[0] < 0.0);
            assert!(p.velocity[0] > 0.0);
        }
    }

    #[test]
    fn test_clusters_are_distinct() {
        let particles = initialize(10_000, 11);
        let mean = |cluster: usize| {
            let members: Vec<_> = particles.iter().skip(cluster).step_by(CLUSTER_COUNT).collect();
            let n = members.len() as f32;
            let x = members.iter().map(|p| p.position[0]).sum::<f32>() / n;
            let y = members.iter().map(|p| p.position[1]).sum::<f32>() / n;
            (x, y)
        };
        let (x0, y0) = mean(0);
        let (_, y2) = mean(2);
        let (x3, _) = mean(3);
        assert!(y0 > y2 + 0.3, "top cloud sits above the bottom cloud");
        assert!(x3 < x0 - 0.2, "far-left cluster sits left of the top cloud");
    }

    #[test]
    fn test_same_seed_same_pool() {
        assert_eq!(initialize(1_000, 5), initialize(1_000, 5));
        assert_ne!(initialize(1_000, 5), initialize(1_000, 6));
    }
}
