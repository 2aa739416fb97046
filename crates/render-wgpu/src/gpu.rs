use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3};
use orbitview_assets::{LoadedModel, TextureImage};
use orbitview_common::{NodeId, Transform};
use orbitview_render::{FloorPlane, Light, PerspectiveCamera, Scene};
use std::collections::BTreeMap;
use std::ops::Range;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Uniforms {
    view_proj: [[f32; 4]; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    floor_color_a: [f32; 4],
    floor_color_b: [f32; 4],
}

impl Uniforms {
    /// Pack the camera, lights, and floor colors. Only the first light of
    /// each kind is used.
    pub(crate) fn from_scene(scene: &Scene, camera: &PerspectiveCamera) -> Self {
        let mut uniforms = Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            sky_color: [0.0; 4],
            ground_color: [0.0; 4],
            light_dir: [0.0, 1.0, 0.0, 0.0],
            light_color: [0.0; 4],
            floor_color_a: [0.0; 4],
            floor_color_b: [0.0; 4],
        };

        if let Some(Light::Hemisphere {
            sky,
            ground,
            intensity,
        }) = scene
            .lights
            .iter()
            .find(|l| matches!(l, Light::Hemisphere { .. }))
        {
            uniforms.sky_color = [sky[0], sky[1], sky[2], *intensity];
            uniforms.ground_color = [ground[0], ground[1], ground[2], 1.0];
        }

        if let Some(Light::Directional {
            color,
            intensity,
            position,
            target,
        }) = scene
            .lights
            .iter()
            .find(|l| matches!(l, Light::Directional { .. }))
        {
            let dir = (*position - *target).normalize_or_zero();
            uniforms.light_dir = [dir.x, dir.y, dir.z, *intensity];
            uniforms.light_color = [color[0], color[1], color[2], 1.0];
        }

        if let Some(floor) = &scene.floor {
            let (a, b) = (floor.color_a, floor.color_b);
            uniforms.floor_color_a = [a[0], a[1], a[2], 1.0];
            uniforms.floor_color_b = [b[0], b[1], b[2], floor.repeats()];
        }

        uniforms
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ModelVertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 4],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct FloorVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

/// Vertices of one mesh, drawn with one material texture.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawBatch {
    pub(crate) vertices: Range<u32>,
    /// Key into [`LoadedModel::textures`]; `None` draws the flat diffuse color.
    pub(crate) texture: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ModelGeometry {
    pub(crate) vertices: Vec<ModelVertex>,
    pub(crate) batches: Vec<DrawBatch>,
}

/// Flatten every mesh of `model` into world-space vertices with baked
/// material colors, one batch per mesh.
///
/// Meshes without normals get face normals. Texture coordinates are flipped
/// to a top-left origin.
pub(crate) fn model_vertices(model: &LoadedModel, transform: &Transform) -> ModelGeometry {
    let matrix = transform.matrix();
    let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
    let mut out = ModelGeometry {
        vertices: Vec::with_capacity(model.triangle_count() * 3),
        batches: Vec::with_capacity(model.meshes.len()),
    };

    for mesh in &model.meshes {
        let material = model.material_for(mesh);
        let color = material.base_color();
        let texture = model
            .texture_for(&material)
            .and(material.diffuse_map.clone());
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let first = out.vertices.len() as u32;

        for tri in mesh.indices.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let (Some(&a), Some(&b), Some(&c)) = (
                mesh.positions.get(corners[0]),
                mesh.positions.get(corners[1]),
                mesh.positions.get(corners[2]),
            ) else {
                continue;
            };
            let p: [Vec3; 3] = [a, b, c];
            let face_normal = (p[1] - p[0]).cross(p[2] - p[0]);

            for (k, &i) in corners.iter().enumerate() {
                let normal = if has_normals {
                    mesh.normals[i]
                } else {
                    face_normal
                };
                let uv = mesh.uvs.get(i).map_or([0.0, 0.0], |uv| [uv.x, 1.0 - uv.y]);
                out.vertices.push(ModelVertex {
                    position: matrix.transform_point3(p[k]).to_array(),
                    normal: (normal_matrix * normal).normalize_or_zero().to_array(),
                    color,
                    uv,
                });
            }
        }

        let last = out.vertices.len() as u32;
        if last > first {
            out.batches.push(DrawBatch {
                vertices: first..last,
                texture,
            });
        }
    }
    out
}

/// Two triangles covering the floor on y = 0.
pub(crate) fn floor_mesh(floor: &FloorPlane) -> (Vec<FloorVertex>, Vec<u16>) {
    let h = floor.size * 0.5;
    #[rustfmt::skip]
    let vertices = vec![
        FloorVertex { position: [-h, 0.0, -h], uv: [0.0, 0.0] },
        FloorVertex { position: [ h, 0.0, -h], uv: [1.0, 0.0] },
        FloorVertex { position: [ h, 0.0,  h], uv: [1.0, 1.0] },
        FloorVertex { position: [-h, 0.0,  h], uv: [0.0, 1.0] },
    ];
    let indices = vec![0, 2, 1, 0, 3, 2];
    (vertices, indices)
}

struct GpuModel {
    vertex_buffer: wgpu::Buffer,
    batches: Vec<DrawBatch>,
    textures: BTreeMap<String, wgpu::BindGroup>,
}

struct GpuFloor {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    size: f32,
}

/// wgpu-based scene renderer: checkered floor plus lit, textured model meshes.
pub struct WgpuRenderer {
    model_pipeline: wgpu::RenderPipeline,
    floor_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Bound for untextured materials so one pipeline serves both.
    white_texture: wgpu::BindGroup,
    floor: Option<GpuFloor>,
    models: BTreeMap<NodeId, GpuModel>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("diffuse_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white_texture = Self::create_texture_bind_group(
            device,
            queue,
            &texture_layout,
            &sampler,
            &TextureImage::new(1, 1, vec![255; 4]),
            "white_texture",
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("floor_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let model_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("model_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout, &texture_layout],
                push_constant_ranges: &[],
            });

        let depth_stencil = wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        };

        // Model pipeline
        let model_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("model_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::model_shader().into()),
        });

        let model_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("model_pipeline"),
            layout: Some(&model_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &model_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ModelVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x4,
                        3 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &model_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // OBJ winding is not reliable across exporters
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_stencil.clone()),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Floor pipeline
        let floor_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("floor_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::floor_shader().into()),
        });

        let floor_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("floor_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &floor_shader,
                entry_point: Some("vs_floor"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<FloorVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &floor_shader,
                entry_point: Some("fs_floor"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // visible from below as well
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_stencil),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            model_pipeline,
            floor_pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            sampler,
            white_texture,
            floor: None,
            models: BTreeMap::new(),
            depth_texture,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn uploaded_models(&self) -> usize {
        self.models.len()
    }

    /// Upload GPU buffers for scene content that appeared since the last call
    /// and release buffers for content that is gone.
    pub fn sync_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
    ) {
        match &scene.floor {
            Some(floor) if self.floor.as_ref().map(|f| f.size) != Some(floor.size) => {
                let (vertices, indices) = floor_mesh(floor);
                self.floor = Some(GpuFloor {
                    vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("floor_vertex_buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("floor_index_buffer"),
                        contents: bytemuck::cast_slice(&indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: indices.len() as u32,
                    size: floor.size,
                });
            }
            Some(_) => {}
            None => self.floor = None,
        }

        self.models
            .retain(|id, _| scene.models().iter().any(|node| node.id == *id));

        for node in scene.models() {
            if self.models.contains_key(&node.id) {
                continue;
            }
            let geometry = model_vertices(&node.model, &node.transform);
            if geometry.vertices.is_empty() {
                continue;
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("model_vertex_buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let mut textures = BTreeMap::new();
            for key in geometry.batches.iter().filter_map(|b| b.texture.as_ref()) {
                if textures.contains_key(key) {
                    continue;
                }
                let image = node.model.textures.get(key);
                if let Some(image) = image.filter(|i| i.width > 0 && i.height > 0) {
                    let bind_group = Self::create_texture_bind_group(
                        device,
                        queue,
                        &self.texture_layout,
                        &self.sampler,
                        image,
                        key,
                    );
                    textures.insert(key.clone(), bind_group);
                }
            }

            tracing::debug!(
                node = %node.id.short(),
                vertices = geometry.vertices.len(),
                batches = geometry.batches.len(),
                textures = textures.len(),
                "model uploaded"
            );
            self.models.insert(
                node.id,
                GpuModel {
                    vertex_buffer,
                    batches: geometry.batches,
                    textures,
                },
            );
        }
    }

    /// Render one frame: floor, then models.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms::from_scene(scene, camera)),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let bg = scene.background;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg[0] as f64,
                            g: bg[1] as f64,
                            b: bg[2] as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(floor) = &self.floor {
                pass.set_pipeline(&self.floor_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, floor.vertex_buffer.slice(..));
                pass.set_index_buffer(floor.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..floor.index_count, 0, 0..1);
            }

            if !self.models.is_empty() {
                pass.set_pipeline(&self.model_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                for model in self.models.values() {
                    pass.set_vertex_buffer(0, model.vertex_buffer.slice(..));
                    for batch in &model.batches {
                        let texture = batch
                            .texture
                            .as_ref()
                            .and_then(|key| model.textures.get(key))
                            .unwrap_or(&self.white_texture);
                        pass.set_bind_group(1, texture, &[]);
                        pass.draw(batch.vertices.clone(), 0..1);
                    }
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_texture_bind_group(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        image: &TextureImage,
        label: &str,
    ) -> wgpu::BindGroup {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let view = texture.create_view(&Default::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
