// ABOUTME: Off-screen text mask pass feeding the particle compute shader.
// ABOUTME: Renders glyph coverage into a single-channel 1024x256 texture each frame.

use waddle_text::{MASK_HEIGHT, MASK_WIDTH};

use crate::gpu::validated;
use crate::text_pipeline::{TextResources, TEXT_COMMON_SHADER};

pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

pub struct MaskPipeline {
    /// `None` when the pipeline failed validation; the target is still cleared
    pipeline: Option<wgpu::RenderPipeline>,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MaskPipeline {
    pub fn new(device: &wgpu::Device, resources: &TextResources) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Text Mask"),
            size: wgpu::Extent3d {
                width: MASK_WIDTH,
                height: MASK_HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MASK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let pipeline = validated(device, "Text mask pass", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Text Mask Shader"),
                source: wgpu::ShaderSource::Wgsl(
                    [TEXT_COMMON_SHADER, include_str!("../../../shaders/text_mask.wgsl")]
                        .concat()
                        .into(),
                ),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Text Mask Pipeline Layout"),
                bind_group_layouts: &[resources.bind_group_layout()],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Text Mask Pipeline"),
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
                        format: MASK_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        Self {
            pipeline,
            _texture: texture,
            view,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn is_enabled(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Clear the mask and, if the pipeline is live, draw coverage into it.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, resources: &TextResources) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Text Mask Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(pipeline) = &self.pipeline {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, resources.bind_group(), &[]);
            pass.draw(0..4, 0..1);
        }
    }
}
