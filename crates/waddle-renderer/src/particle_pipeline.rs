// ABOUTME: Particle compute update and instanced dust rendering.
// ABOUTME: One storage buffer holds the pool; it doubles as the instance buffer for drawing.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use waddle_sim::{Particle, ParticlePool, ParticleUniforms};

use crate::gpu::validated;

pub const WORKGROUP_SIZE: u32 = 64;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct RenderUniforms {
    color: [f32; 4],
    resolution: [f32; 2],
    _padding: [f32; 2],
}

/// Fields of `Particle` the vertex shader reads, at their byte offsets
const INSTANCE_ATTRIBS: [wgpu::VertexAttribute; 5] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: 16,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: 20,
        shader_location: 2,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: 24,
        shader_location: 3,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32,
        offset: 40,
        shader_location: 4,
    },
];

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Particle>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBS,
    }
}

pub fn workgroup_count(particles: u32) -> u32 {
    particles.div_ceil(WORKGROUP_SIZE)
}

fn particle_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct ComputeStage {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

struct DrawStage {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

pub struct ParticlePipeline {
    compute: Option<ComputeStage>,
    draw: Option<DrawStage>,
    particle_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    render_uniform_buffer: wgpu::Buffer,
    color: [f32; 4],
    count: u32,
}

impl ParticlePipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        pool: &ParticlePool,
        mask_view: &wgpu::TextureView,
        color: [f32; 4],
        resolution: [f32; 2],
    ) -> Self {
        let count = pool.len() as u32;

        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: pool.as_bytes(),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ParticleUniforms {
                particle_count: count,
                ..Default::default()
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Render Uniform Buffer"),
            contents: bytemuck::cast_slice(&[RenderUniforms {
                color,
                resolution,
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let compute = validated(device, "Particle update", || {
            Self::create_compute(device, &uniform_buffer, &particle_buffer, mask_view)
        });
        let draw = validated(device, "Particle drawing", || {
            Self::create_draw(device, format, &render_uniform_buffer)
        });

        Self {
            compute,
            draw,
            particle_buffer,
            uniform_buffer,
            render_uniform_buffer,
            color,
            count,
        }
    }

    fn create_compute(
        device: &wgpu::Device,
        uniform_buffer: &wgpu::Buffer,
        particle_buffer: &wgpu::Buffer,
        mask_view: &wgpu::TextureView,
    ) -> ComputeStage {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Update Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/particle_update.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Update Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Text mask, read with textureLoad
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Update Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(mask_view),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Update Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Update Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        ComputeStage {
            pipeline,
            bind_group,
        }
    }

    fn create_draw(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        render_uniform_buffer: &wgpu::Buffer,
    ) -> DrawStage {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Render Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/particle_render.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Render Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Render Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: render_uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[instance_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(particle_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        DrawStage {
            pipeline,
            bind_group,
        }
    }

    pub fn has_compute(&self) -> bool {
        self.compute.is_some()
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, time: f32, delta_time: f32, frame: u32) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[ParticleUniforms {
                time,
                delta_time,
                particle_count: self.count,
                frame,
            }]),
        );
    }

    pub fn set_resolution(&self, queue: &wgpu::Queue, resolution: [f32; 2]) {
        queue.write_buffer(
            &self.render_uniform_buffer,
            0,
            bytemuck::cast_slice(&[RenderUniforms {
                color: self.color,
                resolution,
                _padding: [0.0; 2],
            }]),
        );
    }

    /// Replace the GPU copy of the pool after a host-side step
    pub fn upload(&self, queue: &wgpu::Queue, pool: &ParticlePool) {
        queue.write_buffer(&self.particle_buffer, 0, pool.as_bytes());
    }

    pub fn encode_update(&self, encoder: &mut wgpu::CommandEncoder) {
        let Some(compute) = &self.compute else {
            return;
        };
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle Update Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&compute.pipeline);
        pass.set_bind_group(0, &compute.bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(self.count), 1, 1);
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        let Some(draw) = &self.draw else {
            return;
        };
        if self.count == 0 {
            return;
        }
        render_pass.set_pipeline(&draw.pipeline);
        render_pass.set_bind_group(0, &draw.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.particle_buffer.slice(..));
        render_pass.draw(0..4, 0..self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(0), 0);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(500_000), 7_813);
    }

    #[test]
    fn test_instance_attributes_match_particle_layout() {
        assert_eq!(INSTANCE_ATTRIBS[0].offset, std::mem::offset_of!(Particle, position) as u64);
        assert_eq!(INSTANCE_ATTRIBS[1].offset, std::mem::offset_of!(Particle, size) as u64);
        assert_eq!(INSTANCE_ATTRIBS[2].offset, std::mem::offset_of!(Particle, rotation) as u64);
        assert_eq!(INSTANCE_ATTRIBS[3].offset, std::mem::offset_of!(Particle, opacity) as u64);
        assert_eq!(INSTANCE_ATTRIBS[4].offset, std::mem::offset_of!(Particle, state) as u64);
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 32);
    }

    #[test]
    fn test_particle_blend_factors() {
        let blend = particle_blend();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn test_update_shader_mirrors_host_constants() {
        let src = include_str!("../../../shaders/particle_update.wgsl");
        assert!(src.contains("@workgroup_size(64)"));
        assert!(src.contains("747796405u"));
        assert!(src.contains(&format!("RETARGET_ATTEMPTS: u32 = {}u", waddle_sim::step::RETARGET_ATTEMPTS)));
    }
}
