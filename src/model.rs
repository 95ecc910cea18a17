use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use std::path::Path;
use wgpu::util::DeviceExt;

use crate::terrain::TerrainMesh;

pub mod texture {
    use super::*;

    const PLACEHOLDER_SIZE: u32 = 2;
    const PLACEHOLDER_PIXELS: [u8; 16] = [
        200, 200, 200, 255, 120, 120, 120, 255,
        120, 120, 120, 255, 200, 200, 200, 255,
    ];

    pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_bind_group_layout"),
        })
    }

    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        (width, height): (u32, u32),
        label: &str,
    ) -> (wgpu::TextureView, wgpu::Sampler) {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        (view, sampler)
    }

    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<(wgpu::TextureView, wgpu::Sampler)> {
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let dimensions = rgba.dimensions();
        Ok(from_rgba(device, queue, &rgba, dimensions, label))
    }

    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> (wgpu::TextureView, wgpu::Sampler) {
        from_rgba(
            device,
            queue,
            &PLACEHOLDER_PIXELS,
            (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE),
            "placeholder_texture",
        )
    }

    /// Decode failures degrade to the checker placeholder instead of failing startup.
    pub fn load_or_placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> (wgpu::TextureView, wgpu::Sampler) {
        let loaded = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))
            .and_then(|bytes| from_bytes(device, queue, &bytes, &path.to_string_lossy()));
        match loaded {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("using placeholder texture: {e:#}");
                placeholder(device, queue)
            }
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub fn from_placement(translation: Vec3, scale: f32) -> Self {
        let matrix = Mat4::from_translation(translation) * Mat4::from_scale(Vec3::splat(scale));
        Self { model: matrix.to_cols_array_2d() }
    }

    pub fn identity() -> Self {
        Self { model: Mat4::IDENTITY.to_cols_array_2d() }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        const ATTRIBS: [wgpu::VertexAttribute; 4] =
            wgpu::vertex_attr_array![5 => Float32x4, 6 => Float32x4, 7 => Float32x4, 8 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBS,
        }
    }
}

pub struct Material {
    pub name: String,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        (view, sampler): (wgpu::TextureView, wgpu::Sampler),
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&sampler) },
            ],
            label: Some(name),
        });
        Self { name: name.to_string(), bind_group }
    }
}

pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub material_index: usize,
}

impl Mesh {
    fn upload(device: &wgpu::Device, name: &str, vertices: &[Vertex], indices: &[u32], material_index: usize) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            material_index,
        }
    }
}

pub trait Drawable<'a> {
    fn draw_model(&mut self, model: &'a Model, instance_buffer: &'a wgpu::Buffer, instances: u32);
}

impl<'a, 'b> Drawable<'a> for wgpu::RenderPass<'b> where 'a: 'b {
    fn draw_model(&mut self, model: &'a Model, instance_buffer: &'a wgpu::Buffer, instances: u32) {
        self.set_vertex_buffer(1, instance_buffer.slice(..));
        for mesh in &model.meshes {
            let Some(material) = model.materials.get(mesh.material_index) else {
                continue;
            };
            self.set_bind_group(1, &material.bind_group, &[]);
            self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.draw_indexed(0..mesh.num_indices, 0, 0..instances);
        }
    }
}

pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn from_terrain(device: &wgpu::Device, mesh: &TerrainMesh, material: Material) -> Self {
        let landscape = Mesh::upload(device, "Landscape", &mesh.vertices, &mesh.indices, 0);
        Self {
            meshes: vec![landscape],
            materials: vec![material],
        }
    }
}

fn expand_to_rgba(image: &gltf::image::Data) -> Option<Vec<u8>> {
    use gltf::image::Format;
    match image.format {
        Format::R8G8B8A8 => Some(image.pixels.clone()),
        Format::R8G8B8 => Some(
            image
                .pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                .collect(),
        ),
        _ => None,
    }
}

/// Imports every mesh primitive of a glTF file. Primitives without positions
/// are skipped; missing normals default to +Y and missing UVs to zero.
pub fn load_gltf<P: AsRef<Path>>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: P,
    layout: &wgpu::BindGroupLayout,
) -> Result<Model> {
    let path = path.as_ref();
    let (doc, buffers, images) =
        gltf::import(path).with_context(|| format!("importing {}", path.display()))?;

    let mut materials = Vec::new();
    for material in doc.materials() {
        let name = material.name().unwrap_or("gltf_material");
        let texture = material
            .pbr_metallic_roughness()
            .base_color_texture()
            .and_then(|info| images.get(info.texture().source().index()))
            .and_then(|image| {
                let rgba = expand_to_rgba(image)?;
                Some(texture::from_rgba(device, queue, &rgba, (image.width, image.height), name))
            })
            .unwrap_or_else(|| texture::placeholder(device, queue));
        materials.push(Material::new(device, layout, name, texture));
    }

    if materials.is_empty() {
        materials.push(Material::new(
            device,
            layout,
            "fallback_material",
            texture::placeholder(device, queue),
        ));
    }

    let mut meshes = Vec::new();
    for scene in doc.scenes() {
        for node in scene.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let Some(positions) = reader.read_positions() else {
                    log::warn!("{}: primitive without positions skipped", path.display());
                    continue;
                };
                let positions: Vec<[f32; 3]> = positions.collect();
                let normals: Vec<[f32; 3]> = match reader.read_normals() {
                    Some(normals) => normals.collect(),
                    None => vec![[0.0, 1.0, 0.0]; positions.len()],
                };
                let tex_coords: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
                    Some(coords) => coords.into_f32().collect(),
                    None => vec![[0.0, 0.0]; positions.len()],
                };

                let vertices: Vec<Vertex> = positions
                    .iter()
                    .zip(normals.iter())
                    .zip(tex_coords.iter())
                    .map(|((pos, norm), tc)| Vertex {
                        position: *pos,
                        normal: *norm,
                        tex_coords: *tc,
                    })
                    .collect();

                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..vertices.len() as u32).collect(),
                };

                let material_index = primitive
                    .material()
                    .index()
                    .filter(|&i| i < materials.len())
                    .unwrap_or(0);
                meshes.push(Mesh::upload(
                    device,
                    mesh.name().unwrap_or("gltf_mesh"),
                    &vertices,
                    &indices,
                    material_index,
                ));
            }
        }
    }

    log::info!(
        "loaded {}: {} meshes, {} materials",
        path.display(),
        meshes.len(),
        materials.len()
    );
    for mesh in &meshes {
        log::debug!("  mesh '{}' uses material '{}'", mesh.name, materials[mesh.material_index].name);
    }

    Ok(Model { meshes, materials })
}
