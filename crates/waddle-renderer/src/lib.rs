// ABOUTME: GPU side of improved-waddle: text mask, particle compute, and composite.
// ABOUTME: Uses wgpu to render MSDF text with assembling dust particles on top.

mod gpu;
mod mask_pipeline;
mod particle_pipeline;
pub mod renderer;
mod text_pipeline;

pub use renderer::{RenderError, Renderer};
pub use text_pipeline::FrameUniform;
