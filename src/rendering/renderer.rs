//! Raymarched tunnel renderer.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::framebuffer::{FrameBuffer, FRAME_FORMAT};
use super::gpu::GpuContext;
use super::noise_texture::{NoiseTexture, NOISE_SEED};
use super::{FrameInput, FrameRenderer};
use crate::camera::TubeCamera;
use crate::error::{RenderError, ResourceError};
use crate::params::{CameraPath, RunConfig};

/// Noise features across the wall texture
const NOISE_PERIODS: f64 = 6.0;

/// Uniform buffer for the tunnel shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// Sway x amplitude, x frequency, y amplitude, y frequency
    pub path: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub beat: f32,
    /// Low, mid, high, envelope
    pub bands: [f32; 4],
    pub tube_radius: f32,
    pub _padding: [f32; 3], // Padding for alignment
}

impl Uniforms {
    pub fn new(camera: &TubeCamera, input: &FrameInput, width: u32, height: u32) -> Self {
        let time_s = input.time.as_secs_f32();
        let (view_proj, eye) =
            camera.create_view_proj_matrix(time_s, width as f32 / height as f32);
        let path = camera.path();

        Self {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            path: [
                path.sway_x_amplitude,
                path.sway_x_frequency,
                path.sway_y_amplitude,
                path.sway_y_frequency,
            ],
            resolution: [width as f32, height as f32],
            time: time_s,
            beat: input.beat,
            bands: [
                input.bands.low,
                input.bands.mid,
                input.bands.high,
                input.envelope,
            ],
            tube_radius: path.tube_radius,
            _padding: [0.0; 3],
        }
    }
}

/// Renders the tunnel into an offscreen [`FrameBuffer`]
pub struct IntroRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    camera: TubeCamera,
    target: FrameBuffer,
}

impl IntroRenderer {
    pub fn new(
        gpu: &GpuContext,
        config: &RunConfig,
        path: CameraPath,
    ) -> Result<Self, ResourceError> {
        let device = Arc::clone(&gpu.device);
        let queue = Arc::clone(&gpu.queue);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Intro Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("intro.wgsl").into()),
        });

        let camera = TubeCamera::new(path);
        let target = FrameBuffer::new(
            Arc::clone(&device),
            Arc::clone(&queue),
            config.width(),
            config.height(),
        );

        let uniforms = Uniforms::new(
            &camera,
            &FrameInput {
                time: Default::default(),
                beat: 0.0,
                envelope: 0.0,
                bands: Default::default(),
            },
            config.width(),
            config.height(),
        );
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Intro Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let noise = NoiseTexture::generate(NOISE_SEED, NoiseTexture::SIZE, NOISE_PERIODS);
        let noise_view = noise.upload(&device, &queue);
        let noise_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Wall Noise Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Intro Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Intro Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&noise_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&noise_sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Intro Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Fullscreen triangle, no vertex buffers
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Intro Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FRAME_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ResourceError::Pipeline(err.to_string()));
        }

        log::debug!(
            "Intro renderer ready at {}x{}",
            config.width(),
            config.height()
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            uniform_buffer,
            bind_group,
            camera,
            target,
        })
    }
}

impl FrameRenderer for IntroRenderer {
    type Frame = FrameBuffer;

    fn render(&mut self, input: &FrameInput) -> Result<&FrameBuffer, RenderError> {
        let uniforms = Uniforms::new(
            &self.camera,
            input,
            self.target.width(),
            self.target.height(),
        );

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Intro Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Intro Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target.view(),
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
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(RenderError::Gpu {
                time: input.time,
                message: err.to_string(),
            });
        }

        Ok(&self.target)
    }
}
