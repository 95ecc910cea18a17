use crate::camera::{Orientation, Projection, build_view_matrix};
use crate::camera_controller::CameraController;
use crate::config::Config;
use crate::model::{Drawable, InstanceRaw, Material, Model, Vertex, load_gltf, texture};
use crate::simulation::Simulation;
use crate::terrain::{build_terrain_mesh, ensure_fits_buffer_limit};
use crate::world::HeightField;
use anyhow::Context;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    fn update_view_proj(&mut self, eye: Vec3, orientation: &Orientation, projection: &Projection) {
        self.view_proj =
            (projection.build_projection_matrix() * build_view_matrix(eye, orientation)).to_cols_array_2d();
    }
}

struct Decoration {
    model: Model,
    instance_buffer: wgpu::Buffer,
}

pub struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    terrain: Model,
    terrain_instance: wgpu::Buffer,
    decoration: Option<Decoration>,
    simulation: Simulation,
    controller: CameraController,
    projection: Projection,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    last_frame: Instant,
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d { width: config.width, height: config.height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl State {
    pub async fn new(window: Arc<Window>, settings: &Config) -> anyhow::Result<Self> {
        // Terrain validation happens before any GPU work so a bad config never opens a device.
        let terrain_config = settings.terrain()?;
        let height_field = HeightField::new(terrain_config);
        let simulation = Simulation::new(
            height_field,
            Orientation::new(settings.camera.initial_yaw, 0.0),
            (settings.player.spawn_x, settings.player.spawn_z),
            settings.movement(&terrain_config),
        );

        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window).context("creating surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .context("requesting adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                ..Default::default()
            })
            .await
            .context("requesting device")?;

        ensure_fits_buffer_limit(terrain_config.size(), device.limits().max_buffer_size)
            .context("terrain does not fit on this device")?;
        let mesh = build_terrain_mesh(terrain_config.size(), terrain_config.spacing(), &height_field)?;
        log::info!(
            "terrain {}x{} quads, spacing {}, amplitude {} (elevation within +/-{}): {} vertices, {} indices",
            terrain_config.size(),
            terrain_config.size(),
            terrain_config.spacing(),
            terrain_config.amplitude(),
            height_field.max_elevation(),
            mesh.vertices.len(),
            mesh.indices.len()
        );

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let projection = Projection::new(config.width, config.height, settings.camera.fov_degrees, 0.1, 500.0);
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(simulation.eye(), &simulation.orientation, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let depth_view = create_depth_view(&device, &config);

        let texture_bind_group_layout = texture::bind_group_layout(&device);

        let terrain_texture = texture::load_or_placeholder(&device, &queue, &settings.scene.terrain_texture);
        let terrain_material = Material::new(&device, &texture_bind_group_layout, "terrain", terrain_texture);
        let terrain = Model::from_terrain(&device, &mesh, terrain_material);
        let terrain_instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Instance Buffer"),
            contents: bytemuck::cast_slice(&[InstanceRaw::identity()]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let decoration = settings.scene.model.as_ref().and_then(|path| {
            match load_gltf(&device, &queue, path, &texture_bind_group_layout) {
                Ok(model) => {
                    let (x, z) = (settings.scene.model_x, settings.scene.model_z);
                    let anchor = Vec3::new(x, simulation.terrain.height(x, z), z);
                    log::info!("placing {} at {anchor:?}", path.display());
                    let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Decoration Instance Buffer"),
                        contents: bytemuck::cast_slice(&[InstanceRaw::from_placement(
                            anchor,
                            settings.scene.model_scale,
                        )]),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    Some(Decoration { model, instance_buffer })
                }
                Err(e) => {
                    log::warn!("skipping decorative model: {e:#}");
                    None
                }
            }
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc(), InstanceRaw::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            terrain,
            terrain_instance,
            decoration,
            simulation,
            controller: CameraController::new(settings.camera.sensitivity),
            projection,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            depth_view,
            last_frame: Instant::now(),
        })
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.projection.resize(new_size.width, new_size.height);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    pub fn input(&mut self, event: &WindowEvent) -> bool {
        self.controller.process_events(event)
    }

    pub fn mouse_motion(&mut self, (dx, dy): (f64, f64)) {
        self.controller.process_mouse_motion(dx, dy);
    }

    pub fn is_pointer_captured(&self) -> bool {
        self.controller.is_captured()
    }

    pub fn set_pointer_captured(&mut self, captured: bool) {
        self.controller.set_captured(captured);
    }

    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.simulation.step(dt, &mut self.controller);

        self.camera_uniform
            .update_view_proj(self.simulation.eye(), &self.simulation.orientation, &self.projection);
        self.queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.53, g: 0.72, b: 0.9, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.draw_model(&self.terrain, &self.terrain_instance, 1);
            if let Some(decoration) = &self.decoration {
                render_pass.draw_model(&decoration.model, &decoration.instance_buffer, 1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
