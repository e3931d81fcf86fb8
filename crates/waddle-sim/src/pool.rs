// ABOUTME: Fixed-size particle arena, allocated once for the process lifetime.
// ABOUTME: Host-side batch update splits the pool across rayon workers.

use rayon::prelude::*;

use crate::mask::TargetMask;
use crate::particle::{Particle, ParticleState};
use crate::spawn::initialize;
use crate::step::step_particle;

/// Particles per rayon task, matching 64-wide workgroups in multiples
const BATCH_SIZE: usize = 64 * 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub waiting: usize,
    pub active: usize,
    pub settled: usize,
}

impl StateCounts {
    /// Active plus settled
    pub fn spawned(&self) -> usize {
        self.active + self.settled
    }

    pub fn total(&self) -> usize {
        self.waiting + self.active + self.settled
    }
}

pub struct ParticlePool {
    particles: Vec<Particle>,
    seed: u64,
}

impl ParticlePool {
    pub fn new(count: usize, seed: u64) -> Self {
        tracing::info!("Initializing {} particles with seed {}", count, seed);
        Self {
            particles: initialize(count, seed),
            seed,
        }
    }

    /// Seed from OS entropy, logged so a run can be reproduced
    pub fn with_random_seed(count: usize) -> Self {
        Self::new(count, rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    /// Advance every particle by one frame. Each particle reads only itself.
    pub fn step(&mut self, dt: f32, frame: u32, mask: &dyn TargetMask) {
        self.particles
            .par_chunks_mut(BATCH_SIZE)
            .enumerate()
            .for_each(|(batch, chunk)| {
                let base = batch * BATCH_SIZE;
                for (offset, p) in chunk.iter_mut().enumerate() {
                    step_particle(p, (base + offset) as u32, dt, frame, mask);
                }
            });
    }

    pub fn state_counts(&self) -> StateCounts {
        self.particles
            .par_iter()
            .fold(StateCounts::default, |mut counts, p| {
                match p.state() {
                    ParticleState::Waiting => counts.waiting += 1,
                    ParticleState::Active => counts.active += 1,
                    ParticleState::Settled => counts.settled += 1,
                }
                counts
            })
            .reduce(StateCounts::default, |a, b| StateCounts {
                waiting: a.waiting + b.waiting,
                active: a.active + b.active,
                settled: a.settled + b.settled,
            })
    }

    /// Fraction of the pool that has left the waiting state
    pub fn spawned_fraction(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        self.state_counts().spawned() as f32 / self.particles.len() as f32
    }
}
