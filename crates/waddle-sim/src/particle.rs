// ABOUTME: Particle record and per-frame simulation uniforms.
// ABOUTME: Layouts match the WGSL structs in particle_update.wgsl and particle_render.wgsl.

use bytemuck::{Pod, Zeroable};

/// Raw `state` values stored in the pool
pub const STATE_WAITING: f32 = -1.0;
pub const STATE_ACTIVE: f32 = 0.0;
pub const STATE_SETTLED: f32 = 1.0;

/// One dust particle - 48 bytes, vec2 members kept on 8-byte boundaries
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub size: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub _padding: f32,
    pub target_pos: [f32; 2],
    pub state: f32,
    pub hold_time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleState {
    /// Counting down `hold_time`, invisible
    Waiting,
    /// Seeking its target and fading in
    Active,
    /// Parked on its target at full opacity
    Settled,
}

impl ParticleState {
    pub fn from_raw(state: f32) -> Self {
        if state < 0.0 {
            Self::Waiting
        } else if state > 0.5 {
            Self::Settled
        } else {
            Self::Active
        }
    }

    pub fn raw(self) -> f32 {
        match self {
            Self::Waiting => STATE_WAITING,
            Self::Active => STATE_ACTIVE,
            Self::Settled => STATE_SETTLED,
        }
    }
}

impl Particle {
    pub fn state(&self) -> ParticleState {
        ParticleState::from_raw(self.state)
    }

    /// Active or settled
    pub fn has_spawned(&self) -> bool {
        self.state >= 0.0
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub time: f32,
    pub delta_time: f32,
    pub particle_count: u32,
    /// Frame index, feeds the retarget hash
    pub frame: u32,
}
