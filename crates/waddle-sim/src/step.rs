// ABOUTME: Per-particle update law shared by the CPU backend and the compute shader.
// ABOUTME: Spawn countdown, mask-validated retargeting, critically damped seek, and fade-in.

use std::f32::consts::TAU;

use crate::mask::TargetMask;
use crate::particle::{Particle, ParticleState, STATE_ACTIVE, STATE_SETTLED};
use crate::spawn::{TARGET_X, TARGET_Y};

/// Largest step the simulation accepts, in seconds
pub const MAX_DELTA_TIME: f32 = 0.1;
/// Spring angular frequency, 1/s
pub const STIFFNESS: f32 = 4.0;
/// Opacity gained per second while active
pub const FADE_RATE: f32 = 0.8;
/// Distance to target under which a fully faded-in particle parks
pub const SETTLE_DISTANCE: f32 = 0.0015;
/// Candidate targets drawn per frame when the current one is off-glyph
pub const RETARGET_ATTEMPTS: u32 = 8;
/// Rotation gained per unit of distance travelled
pub const SPIN_RATE: f32 = 8.0;

/// PCG hash, identical to `pcg_hash` in particle_update.wgsl
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

fn unit_float(h: u32) -> f32 {
    h as f32 / u32::MAX as f32
}

/// A candidate band target for `index` on `frame`; deterministic in its inputs.
pub fn candidate_target(index: u32, frame: u32, attempt: u32) -> [f32; 2] {
    let h = pcg_hash(index ^ pcg_hash(frame.wrapping_mul(RETARGET_ATTEMPTS).wrapping_add(attempt)));
    let h2 = pcg_hash(h);
    [
        TARGET_X.0 + (TARGET_X.1 - TARGET_X.0) * unit_float(h),
        TARGET_Y.0 + (TARGET_Y.1 - TARGET_Y.0) * unit_float(h2),
    ]
}

pub fn find_target(index: u32, frame: u32, mask: &dyn TargetMask) -> Option<[f32; 2]> {
    (0..RETARGET_ATTEMPTS)
        .map(|attempt| candidate_target(index, frame, attempt))
        .find(|&candidate| mask.covers(candidate))
}

/// Advance one particle by `dt` seconds.
pub fn step_particle(p: &mut Particle, index: u32, dt: f32, frame: u32, mask: &dyn TargetMask) {
    let dt = dt.clamp(0.0, MAX_DELTA_TIME);

    match p.state() {
        ParticleState::Waiting => {
            p.hold_time -= dt;
            if p.hold_time <= 0.0 {
                p.hold_time = 0.0;
                p.state = STATE_ACTIVE;
            }
        }
        ParticleState::Settled => {
            if !mask.covers(p.target_pos) {
                if let Some(target) = find_target(index, frame, mask) {
                    p.target_pos = target;
                    p.state = STATE_ACTIVE;
                }
            }
        }
        ParticleState::Active => {
            if !mask.covers(p.target_pos) {
                if let Some(target) = find_target(index, frame, mask) {
                    p.target_pos = target;
                }
            }

            // Critically damped spring, semi-implicit Euler
            let dx = p.target_pos[0] - p.position[0];
            let dy = p.target_pos[1] - p.position[1];
            let k = STIFFNESS * STIFFNESS;
            let c = 2.0 * STIFFNESS;
            p.velocity[0] += (k * dx - c * p.velocity[0]) * dt;
            p.velocity[1] += (k * dy - c * p.velocity[1]) * dt;
            p.position[0] += p.velocity[0] * dt;
            p.position[1] += p.velocity[1] * dt;

            let speed = (p.velocity[0] * p.velocity[0] + p.velocity[1] * p.velocity[1]).sqrt();
            p.rotation = (p.rotation + speed * dt * SPIN_RATE).rem_euclid(TAU);

            p.opacity = (p.opacity + FADE_RATE * dt).min(1.0);

            let rx = p.target_pos[0] - p.position[0];
            let ry = p.target_pos[1] - p.position[1];
            if p.opacity >= 1.0 && (rx * rx + ry * ry).sqrt() < SETTLE_DISTANCE {
                p.position = p.target_pos;
                p.velocity = [0.0, 0.0];
                p.state = STATE_SETTLED;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{GridMask, OpenMask};
    use crate::particle::STATE_WAITING;
    use crate::spawn::initialize;

    fn waiting(hold_time: f32) -> Particle {
        Particle {
            position: [-0.5, 0.5],
            velocity: [0.05, 0.0],
            size: 0.002,
            target_pos: [0.5, 0.5],
            state: STATE_WAITING,
            hold_time,
            ..Default::default()
        }
    }

    #[test]
    fn test_pcg_hash_known_values() {
        assert_eq!(pcg_hash(0), 129_708_002);
        assert_ne!(pcg_hash(1), pcg_hash(2));
    }

    #[test]
    fn test_candidates_stay_in_band() {
        for i in 0..1_000 {
            let [x, y] = candidate_target(i, i * 7, i % RETARGET_ATTEMPTS);
            assert!((TARGET_X.0..=TARGET_X.1).contains(&x));
            assert!((TARGET_Y.0..=TARGET_Y.1).contains(&y));
        }
    }

    #[test]
    fn test_hold_time_counts_down_then_activates_once() {
        let mut p = waiting(0.5);
        let dt = 1.0 / 60.0;
        let mut previous = p.hold_time;
        let mut transitions = 0;
        let mut was_waiting = true;

        for frame in 0..120 {
            step_particle(&mut p, 0, dt, frame, &OpenMask);
            let waiting_now = p.state() == ParticleState::Waiting;
            if waiting_now {
                assert!(p.hold_time < previous);
                assert!(!was_waiting || p.hold_time > 0.0);
            }
            if was_waiting && !waiting_now {
                transitions += 1;
            }
            assert!(was_waiting || !waiting_now, "never returns to waiting");
            was_waiting = waiting_now;
            previous = p.hold_time;
        }
        assert_eq!(transitions, 1);
        assert_eq!(p.hold_time, 0.0);
    }

    #[test]
    fn test_waiting_particle_does_not_move_or_show() {
        let mut p = waiting(10.0);
        step_particle(&mut p, 0, 0.05, 0, &OpenMask);
        assert_eq!(p.position, [-0.5, 0.5]);
        assert_eq!(p.opacity, 0.0);
    }

    #[test]
    fn test_opacity_is_monotonic_and_caps_at_one() {
        let mut p = waiting(0.0);
        p.state = STATE_ACTIVE;
        let mut previous = p.opacity;
        let mut reached = false;
        for frame in 0..600 {
            step_particle(&mut p, 3, 1.0 / 60.0, frame, &OpenMask);
            assert!(p.opacity >= previous);
            assert!(p.opacity <= 1.0);
            if reached {
                assert_eq!(p.opacity, 1.0);
            }
            reached |= p.opacity == 1.0;
            previous = p.opacity;
        }
        assert!(reached);
    }

    #[test]
    fn test_converges_and_settles() {
        let mut p = waiting(0.0);
        p.state = STATE_ACTIVE;
        let start = 1.0_f32;
        let mut max_overshoot: f32 = 0.0;
        for frame in 0..600 {
            step_particle(&mut p, 0, 1.0 / 60.0, frame, &OpenMask);
            // Starts left of the target, so overshoot means passing x = 0.5
            max_overshoot = max_overshoot.max(p.position[0] - p.target_pos[0]);
        }
        assert_eq!(p.state(), ParticleState::Settled);
        assert_eq!(p.position, p.target_pos);
        assert_eq!(p.velocity, [0.0, 0.0]);
        assert!(max_overshoot < 0.05 * start);
    }

    #[test]
    fn test_step_is_clamped() {
        let mut a = waiting(1.0);
        let mut b = waiting(1.0);
        step_particle(&mut a, 0, 2.0, 0, &OpenMask);
        step_particle(&mut b, 0, MAX_DELTA_TIME, 0, &OpenMask);
        assert_eq!(a, b);
        assert!((a.hold_time - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_off_glyph_target_is_replaced() {
        // Only the right half of the band is inside text
        let mask = GridMask::from_fn(64, 64, |u, _| u > 0.5);
        let mut p = waiting(0.0);
        p.state = STATE_ACTIVE;
        p.target_pos = [0.1, 0.5];
        for frame in 0..10 {
            step_particle(&mut p, 17, 1.0 / 60.0, frame, &mask);
        }
        assert!(p.target_pos[0] > 0.49);
    }

    #[test]
    fn test_settled_particle_moves_when_text_changes() {
        let mut p = waiting(0.0);
        p.state = STATE_SETTLED;
        p.opacity = 1.0;
        p.position = [0.2, 0.5];
        p.target_pos = [0.2, 0.5];

        step_particle(&mut p, 5, 1.0 / 60.0, 0, &OpenMask);
        assert_eq!(p.state(), ParticleState::Settled);

        let mask = GridMask::from_fn(64, 64, |u, _| u > 0.6);
        for frame in 0..10 {
            step_particle(&mut p, 5, 1.0 / 60.0, frame, &mask);
        }
        assert!(p.target_pos[0] > 0.59);
        assert_ne!(p.state(), ParticleState::Waiting);
    }

    #[test]
    fn test_step_does_not_depend_on_neighbours() {
        let mut pool = initialize(64, 1);
        let mut single = pool[10];
        for (i, p) in pool.iter_mut().enumerate() {
            step_particle(p, i as u32, 0.05, 3, &OpenMask);
        }
        step_particle(&mut single, 10, 0.05, 3, &OpenMask);
        assert_eq!(pool[10], single);
    }
}
