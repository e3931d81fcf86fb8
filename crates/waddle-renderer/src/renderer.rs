// ABOUTME: Frame driver for the text and particle passes.
// ABOUTME: Records mask, particle update, and composite into one encoder per frame.

use std::sync::Arc;
use winit::window::Window;

use waddle_core::{Config, SimulationBackend};
use waddle_sim::{FrameClock, ParticlePool};
use waddle_text::{AtlasProvider, FontAtlas, TextLayout, TextMask};

use crate::gpu::{color_to_wgpu, GpuState};
use crate::mask_pipeline::MaskPipeline;
use crate::particle_pipeline::ParticlePipeline;
use crate::text_pipeline::{FrameUniform, TextPipeline, TextResources};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface reports no supported formats")]
    UnsupportedSurface,

    #[error("Atlas error: {0}")]
    Atlas(#[from] waddle_text::AtlasError),
}

/// Pool plus how it advances each frame
struct ParticleStage {
    pool: ParticlePool,
    pipeline: ParticlePipeline,
    backend: SimulationBackend,
    /// Host copy of the mask, rebuilt on relayout and resize
    cpu_mask: Option<TextMask>,
}

pub struct Renderer {
    gpu: GpuState,
    clear_color: wgpu::Color,
    atlas: Box<dyn FontAtlas>,
    display_text: String,
    layout: TextLayout,
    text_resources: TextResources,
    text_pipeline: TextPipeline,
    mask_pipeline: MaskPipeline,
    particles: Option<ParticleStage>,
    clock: FrameClock,
    frame_count: u32,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        config: &Config,
        provider: &dyn AtlasProvider,
    ) -> Result<Self, RenderError> {
        let gpu = GpuState::new(window).await?;
        let atlas = provider.load_font(&config.font)?;

        let text_resources = TextResources::new(&gpu.device, &gpu.queue, atlas.as_ref());
        let text_pipeline = TextPipeline::new(
            &gpu.device,
            gpu.config.format,
            &text_resources,
            config.text_color.to_array(),
        );
        let mask_pipeline = MaskPipeline::new(&gpu.device, &text_resources);

        let particles = if config.particles.enabled {
            let count = config.particles.count as usize;
            let pool = match config.particles.seed {
                Some(seed) => ParticlePool::new(count, seed),
                None => ParticlePool::with_random_seed(count),
            };
            let pipeline = ParticlePipeline::new(
                &gpu.device,
                gpu.config.format,
                &pool,
                mask_pipeline.view(),
                config.particle_color.to_array(),
                gpu.resolution(),
            );
            let backend = config.particles.backend;
            tracing::info!("Particle simulation on {:?} backend", backend);
            Some(ParticleStage {
                pool,
                pipeline,
                backend,
                cpu_mask: None,
            })
        } else {
            tracing::info!("Particles disabled, rendering text only");
            None
        };

        Ok(Self {
            gpu,
            clear_color: color_to_wgpu(config.background_color),
            atlas,
            display_text: config.display_text.clone(),
            layout: TextLayout::new(),
            text_resources,
            text_pipeline,
            mask_pipeline,
            particles,
            clock: FrameClock::new(),
            frame_count: 0,
        })
    }

    /// Takes effect on the next frame; an unchanged string costs nothing.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.display_text = text.into();
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.gpu.size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        if let Some(stage) = &mut self.particles {
            stage.pipeline.set_resolution(&self.gpu.queue, self.gpu.resolution());
        }
        // Placement depends on the viewport, so the host mask is stale
        self.refresh_cpu_mask();
    }

    fn refresh_cpu_mask(&mut self) {
        let resolution = self.gpu.resolution();
        if let Some(stage) = &mut self.particles {
            if stage.backend == SimulationBackend::Cpu {
                stage.cpu_mask = Some(TextMask::rasterize(&self.layout, self.atlas.as_ref(), resolution));
            }
        }
    }

    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        let timing = self.clock.tick();

        if self.layout.set_text(&self.display_text, self.atlas.as_ref()) {
            self.text_resources.upload_metrics(&self.gpu.queue, &self.layout);
            self.refresh_cpu_mask();
        }

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.text_resources.update_frame(
            &self.gpu.queue,
            FrameUniform {
                resolution: self.gpu.resolution(),
                time: timing.elapsed,
                char_count: self.layout.char_count(),
            },
        );

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.mask_pipeline.encode(&mut encoder, &self.text_resources);

        if let Some(stage) = &mut self.particles {
            stage
                .pipeline
                .update_uniforms(&self.gpu.queue, timing.elapsed, timing.delta, self.frame_count);
            match (stage.backend, &stage.cpu_mask) {
                (SimulationBackend::Gpu, _) => stage.pipeline.encode_update(&mut encoder),
                (SimulationBackend::Cpu, Some(mask)) => {
                    stage.pool.step(timing.delta, self.frame_count, mask);
                    stage.pipeline.upload(&self.gpu.queue, &stage.pool);
                }
                (SimulationBackend::Cpu, None) => {}
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.text_pipeline.render(&mut render_pass, &self.text_resources);
            // Dust sits on top of the letters
            if let Some(stage) = &self.particles {
                stage.pipeline.render(&mut render_pass);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.frame_count = self.frame_count.wrapping_add(1);
        Ok(())
    }
}
