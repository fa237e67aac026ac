//! GPU renderer for the planetarium scene.
//!
//! Draws lit meshes, world-space line lists and camera-facing point sprites
//! from the scene graph held by a [`SceneContext`].

use std::collections::HashMap;
use std::iter;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::context::SceneContext;
use crate::gpu::mesh::{MeshData, Vertex};
use crate::gpu::pipeline::{self, PointInstance};
use crate::scene_graph::{EntityId, SceneGraph};

/// Maximum number of meshes that can be rendered per frame.
/// Each mesh needs its own uniform slot in the dynamic uniform buffer.
const MAX_MESHES_PER_FRAME: usize = 256;

/// Uniform buffer alignment (WebGPU minUniformBufferOffsetAlignment is typically 256 bytes)
const UNIFORM_ALIGNMENT: usize = 256;

/// Background, a deep blue-black.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0x05 as f64 / 255.0,
    g: 0x1e as f64 / 255.0,
    b: 0x2b as f64 / 255.0,
    a: 1.0,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MeshUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    params: [f32; 4],
    camera_position: [f32; 4],
    // 160 bytes of data + 96 bytes padding
    _padding: [f32; 24],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LineUniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PointUniforms {
    view_proj: [[f32; 4]; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
}

struct MeshGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

/// Vertex buffer that grows to fit each frame's data.
struct DynamicBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl DynamicBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, capacity: u64) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage,
            mapped_at_creation: false,
        });
        Self {
            label,
            usage,
            buffer,
            capacity,
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
        let needed = data.len() as u64;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            log::debug!("Growing {} to {} bytes", self.label, capacity);
            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: capacity,
                usage: self.usage,
                mapped_at_creation: false,
            });
            self.capacity = capacity;
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }
    }
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: wgpu::Extent3d,
    depth_view: wgpu::TextureView,

    // Meshes
    mesh_pipeline: wgpu::RenderPipeline,
    mesh_uniform_buffer: wgpu::Buffer,
    mesh_bind_group: wgpu::BindGroup,
    mesh_geometry: HashMap<EntityId, MeshGeometry>,

    // Lines
    line_pipeline: wgpu::RenderPipeline,
    line_uniform_buffer: wgpu::Buffer,
    line_bind_group: wgpu::BindGroup,
    line_vertices: DynamicBuffer,

    // Point sprites
    point_pipeline: wgpu::RenderPipeline,
    point_uniform_buffer: wgpu::Buffer,
    point_bind_group: wgpu::BindGroup,
    point_instances: DynamicBuffer,
}

fn uniform_layout(device: &wgpu::Device, label: &str, dynamic: bool, size: usize) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    size: usize,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(size as u64),
            }),
        }],
        label: Some(label),
    })
}

fn pipeline_layout(device: &wgpu::Device, label: &str, layout: &wgpu::BindGroupLayout) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    })
}

impl Renderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let depth_view = pipeline::create_depth_texture(&device, size.width, size.height);

        // === Mesh Pipeline Setup ===

        let mesh_uniform_size = std::mem::size_of::<MeshUniforms>();
        let mesh_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Uniform Buffer (Dynamic)"),
            size: (UNIFORM_ALIGNMENT * MAX_MESHES_PER_FRAME) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mesh_layout = uniform_layout(&device, "mesh_bind_group_layout", true, mesh_uniform_size);
        let mesh_bind_group = uniform_bind_group(
            &device,
            "mesh_bind_group",
            &mesh_layout,
            &mesh_uniform_buffer,
            mesh_uniform_size,
        );
        let mesh_pipeline = pipeline::create_mesh_pipeline(
            &device,
            &pipeline_layout(&device, "Mesh Pipeline Layout", &mesh_layout),
            format,
        );

        // === Line Pipeline Setup ===

        let line_uniform_size = std::mem::size_of::<LineUniforms>();
        let line_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Uniform Buffer"),
            size: line_uniform_size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let line_layout = uniform_layout(&device, "line_bind_group_layout", false, line_uniform_size);
        let line_bind_group = uniform_bind_group(
            &device,
            "line_bind_group",
            &line_layout,
            &line_uniform_buffer,
            line_uniform_size,
        );
        let line_pipeline = pipeline::create_line_pipeline(
            &device,
            &pipeline_layout(&device, "Line Pipeline Layout", &line_layout),
            format,
        );
        let line_vertices = DynamicBuffer::new(
            &device,
            "Line Vertex Buffer",
            wgpu::BufferUsages::VERTEX,
            (1024 * std::mem::size_of::<Vertex>()) as u64,
        );

        // === Point Sprite Pipeline Setup ===

        let point_uniform_size = std::mem::size_of::<PointUniforms>();
        let point_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Uniform Buffer"),
            size: point_uniform_size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let point_layout = uniform_layout(&device, "point_bind_group_layout", false, point_uniform_size);
        let point_bind_group = uniform_bind_group(
            &device,
            "point_bind_group",
            &point_layout,
            &point_uniform_buffer,
            point_uniform_size,
        );
        let point_pipeline = pipeline::create_point_pipeline(
            &device,
            &pipeline_layout(&device, "Point Pipeline Layout", &point_layout),
            format,
        );
        let point_instances = DynamicBuffer::new(
            &device,
            "Point Instance Buffer",
            wgpu::BufferUsages::VERTEX,
            (16384 * std::mem::size_of::<PointInstance>()) as u64,
        );

        Self {
            device,
            queue,
            size,
            depth_view,
            mesh_pipeline,
            mesh_uniform_buffer,
            mesh_bind_group,
            mesh_geometry: HashMap::new(),
            line_pipeline,
            line_uniform_buffer,
            line_bind_group,
            line_vertices,
            point_pipeline,
            point_uniform_buffer,
            point_bind_group,
            point_instances,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            };
            self.depth_view = pipeline::create_depth_texture(&self.device, width, height);
        }
    }

    /// Upload geometry for meshes seen for the first time and drop geometry
    /// of entities that left the scene.
    fn sync_mesh_geometry(&mut self, scene: &SceneGraph) {
        self.mesh_geometry.retain(|id, _| scene.is_in_scene(*id));
        for (id, instance) in scene.meshes() {
            if self.mesh_geometry.contains_key(&id) {
                continue;
            }
            let geometry = upload_mesh(&self.device, &instance.mesh);
            self.mesh_geometry.insert(id, geometry);
        }
    }

    pub fn render(&mut self, view: &wgpu::TextureView, ctx: &SceneContext) {
        let scene = &ctx.scene;
        let camera = &ctx.rig.camera;
        let aspect = self.aspect();
        let view_proj = camera.view_projection_matrix(aspect).to_cols_array_2d();

        self.sync_mesh_geometry(scene);

        // Mesh uniforms, one aligned slot per visible mesh
        let mut mesh_draws: Vec<(EntityId, u32)> = Vec::new();
        let mut uniform_bytes = vec![0u8; UNIFORM_ALIGNMENT * MAX_MESHES_PER_FRAME];
        for (id, instance) in scene.meshes().filter(|(_, m)| m.visible) {
            let slot = mesh_draws.len();
            if slot >= MAX_MESHES_PER_FRAME {
                log::warn!("More than {} meshes in scene, skipping the rest", MAX_MESHES_PER_FRAME);
                break;
            }
            let uniforms = MeshUniforms {
                view_proj,
                model: scene.world_matrix(id).to_cols_array_2d(),
                params: [instance.emissive, 0.0, 0.0, 0.0],
                camera_position: camera.position.extend(1.0).to_array(),
                _padding: [0.0; 24],
            };
            let offset = slot * UNIFORM_ALIGNMENT;
            uniform_bytes[offset..offset + std::mem::size_of::<MeshUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
            mesh_draws.push((id, offset as u32));
        }
        if !mesh_draws.is_empty() {
            let used = mesh_draws.len() * UNIFORM_ALIGNMENT;
            self.queue
                .write_buffer(&self.mesh_uniform_buffer, 0, &uniform_bytes[..used]);
        }

        // Lines in world space; flashing edges share the ambient palette
        let edge_color = ctx.ambient.edge_color();
        let line_vertices = collect_line_vertices(scene, edge_color);
        self.queue.write_buffer(
            &self.line_uniform_buffer,
            0,
            bytemuck::bytes_of(&LineUniforms { view_proj }),
        );
        self.line_vertices
            .upload(&self.device, &self.queue, bytemuck::cast_slice(&line_vertices));

        // Point sprites
        let point_instances = collect_point_instances(scene);
        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        self.queue.write_buffer(
            &self.point_uniform_buffer,
            0,
            bytemuck::bytes_of(&PointUniforms {
                view_proj,
                camera_right: right.extend(0.0).to_array(),
                camera_up: up.extend(0.0).to_array(),
            }),
        );
        self.point_instances
            .upload(&self.device, &self.queue, bytemuck::cast_slice(&point_instances));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
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

            // === Meshes ===
            render_pass.set_pipeline(&self.mesh_pipeline);
            for (id, offset) in &mesh_draws {
                let Some(geometry) = self.mesh_geometry.get(id) else {
                    continue;
                };
                render_pass.set_bind_group(0, &self.mesh_bind_group, &[*offset]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.num_indices, 0, 0..1);
            }

            // === Lines ===
            if !line_vertices.is_empty() {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_bind_group(0, &self.line_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.line_vertices.buffer.slice(..));
                render_pass.draw(0..line_vertices.len() as u32, 0..1);
            }

            // === Point sprites (last, additive over everything) ===
            if !point_instances.is_empty() {
                render_pass.set_pipeline(&self.point_pipeline);
                render_pass.set_bind_group(0, &self.point_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.point_instances.buffer.slice(..));
                render_pass.draw(0..6, 0..point_instances.len() as u32);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
    }
}

fn upload_mesh(device: &wgpu::Device, mesh: &MeshData) -> MeshGeometry {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Planet Vertex Buffer"),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Planet Index Buffer"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    MeshGeometry {
        vertex_buffer,
        index_buffer,
        num_indices: mesh.indices.len() as u32,
    }
}

fn transform_point(matrix: &Mat4, point: Vec3) -> [f32; 3] {
    matrix.transform_point3(point).to_array()
}

/// Visible line sets as world-space line-list vertices. A trailing unpaired
/// point is dropped.
fn collect_line_vertices(scene: &SceneGraph, edge_color: [f32; 3]) -> Vec<Vertex> {
    let mut vertices = Vec::new();
    for (id, lines) in scene.lines().filter(|(_, l)| l.visible) {
        let matrix = scene.world_matrix(id);
        let color = if lines.flashing { edge_color } else { lines.color };
        let paired = lines.points.len() / 2 * 2;
        vertices.extend(
            lines.points[..paired]
                .iter()
                .map(|&p| Vertex::unlit(transform_point(&matrix, p), color)),
        );
    }
    vertices
}

fn collect_point_instances(scene: &SceneGraph) -> Vec<PointInstance> {
    let mut instances = Vec::new();
    for (id, cloud) in scene.points().filter(|(_, c)| c.visible) {
        let matrix = scene.world_matrix(id);
        let scale = matrix.to_scale_rotation_translation().0.max_element();
        let color = [cloud.color[0], cloud.color[1], cloud.color[2], cloud.intensity];
        instances.extend(cloud.points.iter().map(|&p| PointInstance {
            position: transform_point(&matrix, p),
            size: cloud.size * scale,
            color,
        }));
    }
    instances
}
