// ABOUTME: SDF text composite pipeline and the text resources it shares with the mask pass.
// ABOUTME: Draws the centered MSDF line with a fullscreen strip over the background.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use waddle_text::{CharacterMetric, FontAtlas, TextLayout, MAX_CHARACTERS};

pub(crate) const TEXT_COMMON_SHADER: &str = include_str!("../../../shaders/text_common.wgsl");

/// Per-frame values read by both text passes - 16 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct FrameUniform {
    pub resolution: [f32; 2],
    pub time: f32,
    pub char_count: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct TextStyle {
    color: [f32; 4],
}

/// Font uniform, metrics array, and atlas texture bound at group 0 of both text shaders.
pub struct TextResources {
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    frame_buffer: wgpu::Buffer,
    metrics_buffer: wgpu::Buffer,
}

impl TextResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, atlas: &dyn FontAtlas) -> Self {
        let texture = atlas.texture();
        let (atlas_width, atlas_height) = texture.dimensions();
        let atlas_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSDF Atlas"),
            size: wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // Distance values are linear, never sRGB
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texture.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width * 4),
                rows_per_image: Some(atlas_height),
            },
            wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
        );

        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniform {
                resolution: [800.0, 600.0],
                ..Default::default()
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let font_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Font Uniform Buffer"),
            contents: bytemuck::cast_slice(&[atlas.uniform()]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let metrics_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Character Metrics Buffer"),
            contents: bytemuck::cast_slice(&[CharacterMetric::zeroed(); MAX_CHARACTERS]),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Text Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Text Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: font_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: metrics_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        Self {
            bind_group_layout,
            bind_group,
            frame_buffer,
            metrics_buffer,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn update_frame(&self, queue: &wgpu::Queue, frame: FrameUniform) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[frame]));
    }

    /// Upload the full metrics array; called only after a relayout.
    pub fn upload_metrics(&self, queue: &wgpu::Queue, layout: &TextLayout) {
        queue.write_buffer(&self.metrics_buffer, 0, bytemuck::cast_slice(&layout.gpu_metrics()));
    }
}

pub struct TextPipeline {
    pipeline: wgpu::RenderPipeline,
    style_bind_group: wgpu::BindGroup,
}

impl TextPipeline {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        resources: &TextResources,
        color: [f32; 4],
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Text Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(
                [TEXT_COMMON_SHADER, include_str!("../../../shaders/text_composite.wgsl")]
                    .concat()
                    .into(),
            ),
        });

        let style_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Text Style Buffer"),
            contents: bytemuck::cast_slice(&[TextStyle { color }]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let style_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Text Style Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let style_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Text Style Bind Group"),
            layout: &style_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: style_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Text Pipeline Layout"),
            bind_group_layouts: &[resources.bind_group_layout(), &style_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Text Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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

        Self {
            pipeline,
            style_bind_group,
        }
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, resources: &'a TextResources) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, resources.bind_group(), &[]);
        render_pass.set_bind_group(1, &self.style_bind_group, &[]);
        render_pass.draw(0..4, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_uniform_layout() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 16);
        assert_eq!(std::mem::size_of::<TextStyle>(), 16);
    }

    #[test]
    fn test_common_shader_declares_shared_bindings() {
        for decl in ["var<uniform> frame", "var<uniform> font", "array<CharacterMetric, 100>"] {
            assert!(TEXT_COMMON_SHADER.contains(decl), "missing {decl}");
        }
    }
}
