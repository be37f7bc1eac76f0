use std::sync::Arc;

use thiserror::Error;
use wgpu::*;

use super::GpuContext;
use crate::controller::FrameReport;
use crate::model::{Camera, Scene};
use crate::ui;
use crate::utils::{Mesh, MeshBuffer, Vertex};

pub const MAX_POINT_LIGHTS: usize = 4;
const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
/// Boxes the mesh buffer holds before its first reallocation.
const INITIAL_BOXES: usize = 16;

/// Anything that can draw the scene. The frame loop only talks to this.
pub trait Renderer {
    type Error;

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), Self::Error>;

    fn resize(&mut self, width: u32, height: u32);

    /// Receives the counters of the frame that was just drawn.
    fn record_frame(&mut self, _report: &FrameReport) {}
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.position.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightUniform {
    /// xyz position, w range
    pub position: [f32; 4],
    /// rgb color, w intensity
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// rgb ambient, w number of active point lights
    pub ambient: [f32; 4],
    pub lights: [PointLightUniform; MAX_POINT_LIGHTS],
}

impl LightingUniform {
    pub fn from_scene(scene: &Scene) -> Self {
        let mut lights = [PointLightUniform::default(); MAX_POINT_LIGHTS];
        let active = scene.lights().len().min(MAX_POINT_LIGHTS);
        for (slot, light) in lights.iter_mut().zip(scene.lights()) {
            *slot = PointLightUniform {
                position: light.position.extend(light.range).to_array(),
                color: [light.color[0], light.color[1], light.color[2], light.intensity],
            };
        }
        let [r, g, b] = scene.ambient;
        Self { ambient: [r, g, b, active as f32], lights }
    }
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Camera and lighting uniforms shared by the scene pipeline.
pub struct SceneResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub bind_group: BindGroup,
}

pub fn create_scene_resources(device: &Device) -> SceneResources {
    let camera_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as BufferAddress,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as BufferAddress,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("scene_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
            uniform_entry(1, ShaderStages::FRAGMENT),
        ],
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("scene_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    SceneResources { camera_buffer, lighting_buffer, bind_group_layout, bind_group }
}

pub fn create_scene_pipeline(device: &Device, format: TextureFormat, bind_group_layout: &BindGroupLayout) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
                step_mode: VertexStepMode::Vertex,
                attributes: &[
                    VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 12, shader_location: 1, format: VertexFormat::Float32x3 },
                    VertexAttribute { offset: 24, shader_location: 2, format: VertexFormat::Float32x4 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// wgpu renderer: lit boxes plus the egui stats overlay.
pub struct WgpuRenderer {
    device: Arc<Device>,
    queue: Arc<Queue>,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    pipeline: RenderPipeline,
    resources: SceneResources,
    depth_view: TextureView,
    scratch: Mesh,
    mesh_buffer: MeshBuffer,
    egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    pixels_per_point: f32,
    last_report: Option<FrameReport>,
}

impl WgpuRenderer {
    pub fn new(gpu: GpuContext, pixels_per_point: f32) -> Self {
        let GpuContext { device, queue, surface, format, config } = gpu;
        let resources = create_scene_resources(&device);
        let mesh_buffer = MeshBuffer::with_capacity(&device, INITIAL_BOXES * 24, INITIAL_BOXES * 36);
        let pipeline = create_scene_pipeline(&device, format, &resources.bind_group_layout);
        let (_, depth_view) = create_depth_texture(&device, config.width, config.height);
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, egui_wgpu::RendererOptions::default());

        Self {
            device,
            queue,
            surface,
            config,
            pipeline,
            resources,
            depth_view,
            scratch: Mesh::empty(),
            mesh_buffer,
            egui_ctx: egui::Context::default(),
            egui_renderer,
            pixels_per_point,
            last_report: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn set_pixels_per_point(&mut self, pixels_per_point: f32) {
        self.pixels_per_point = pixels_per_point;
    }

    fn build_overlay(&mut self) -> (Vec<egui::ClippedPrimitive>, egui::TexturesDelta) {
        let mut raw_input = egui::RawInput::default();
        raw_input.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(
                self.config.width as f32 / self.pixels_per_point,
                self.config.height as f32 / self.pixels_per_point,
            ),
        ));
        self.egui_ctx.set_pixels_per_point(self.pixels_per_point);

        let full_output = ui::build_ui(&self.egui_ctx, raw_input, self.last_report.as_ref());
        let primitives = self.egui_ctx.tessellate(full_output.shapes, self.pixels_per_point);
        (primitives, full_output.textures_delta)
    }
}

impl Renderer for WgpuRenderer {
    type Error = RenderError;

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(SurfaceError::Timeout) => {
                tracing::warn!("surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.queue.write_buffer(
            &self.resources.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(camera)),
        );
        self.queue.write_buffer(
            &self.resources.lighting_buffer,
            0,
            bytemuck::bytes_of(&LightingUniform::from_scene(scene)),
        );

        self.scratch.clear();
        for node in scene.meshes() {
            self.scratch.push_box(node);
        }
        self.mesh_buffer.write(&self.device, &self.queue, &self.scratch);

        let (primitives, textures_delta) = self.build_overlay();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.pixels_per_point,
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let [r, g, b] = scene.background;
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mesh = &self.mesh_buffer;
            if mesh.index_count > 0 {
                rp.set_pipeline(&self.pipeline);
                rp.set_bind_group(0, &self.resources.bind_group, &[]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let egui_commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &primitives,
            &screen_descriptor,
        );

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer.render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(egui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_texture(&self.device, width, height).1;
        tracing::debug!(width, height, "resized surface");
    }

    fn record_frame(&mut self, report: &FrameReport) {
        self.last_report = Some(*report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PointLight;
    use glam::Vec3;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 16 + 32 * MAX_POINT_LIGHTS);
    }

    #[test]
    fn lighting_packs_range_and_intensity() {
        let mut scene = Scene::new([0.6, 0.6, 0.6], [0.0; 3]);
        scene.add_light(PointLight::new(Vec3::new(0.0, 1000.0, 0.0), [1.0; 3], 0.5, 0.0));
        scene.add_light(PointLight::new(Vec3::new(0.0, 1.0, 0.0), [1.0, 0.5, 0.0], 1.0, 0.1));

        let u = LightingUniform::from_scene(&scene);
        assert_eq!(u.ambient, [0.6, 0.6, 0.6, 2.0]);
        assert_eq!(u.lights[0].position, [0.0, 1000.0, 0.0, 0.0]);
        assert_eq!(u.lights[1].position, [0.0, 1.0, 0.0, 0.1]);
        assert_eq!(u.lights[1].color, [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(u.lights[2], PointLightUniform::default());
    }

    #[test]
    fn extra_lights_are_dropped() {
        let mut scene = Scene::default();
        for i in 0..6 {
            scene.add_light(PointLight::new(Vec3::splat(i as f32), [1.0; 3], 1.0, 0.0));
        }
        assert_eq!(LightingUniform::from_scene(&scene).ambient[3], MAX_POINT_LIGHTS as f32);
    }
}
