// ABOUTME: Dust particle simulation that assembles into the rendered text.
// ABOUTME: Pool initialization, the per-particle update law, and the host-side batch step.

pub mod clock;
pub mod mask;
pub mod particle;
pub mod pool;
pub mod spawn;
pub mod step;

pub use clock::{clamp_delta, FrameClock, FrameTiming};
pub use mask::TargetMask;
pub use particle::{Particle, ParticleState, ParticleUniforms};
pub use pool::{ParticlePool, StateCounts};
pub use spawn::initialize;
pub use step::{pcg_hash, step_particle, MAX_DELTA_TIME};
