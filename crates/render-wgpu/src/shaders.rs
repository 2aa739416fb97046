/// Shared uniform block. Must match `gpu::Uniforms` field for field.
const UNIFORMS: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    // rgb + intensity in w
    sky_color: vec4<f32>,
    ground_color: vec4<f32>,
    // direction the light travels *from*, normalized, intensity in w
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    floor_color_a: vec4<f32>,
    // rgb + repeat count in w
    floor_color_b: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

fn shade(normal: vec3<f32>, albedo: vec3<f32>) -> vec3<f32> {
    let n = normalize(normal);
    let hemi_t = n.y * 0.5 + 0.5;
    let hemi = mix(uniforms.ground_color.rgb, uniforms.sky_color.rgb, hemi_t) * uniforms.sky_color.w;
    let diffuse = max(dot(n, uniforms.light_dir.xyz), 0.0) * uniforms.light_dir.w;
    return albedo * (hemi + uniforms.light_color.rgb * diffuse);
}
"#;

const MODEL_BODY: &str = r#"
// 1x1 white when the material has no map_Kd
@group(1) @binding(0)
var diffuse_texture: texture_2d<f32>;
@group(1) @binding(1)
var diffuse_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.world_normal = vertex.normal;
    out.color = vertex.color;
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = in.color * textureSample(diffuse_texture, diffuse_sampler, in.uv);
    return vec4<f32>(shade(in.world_normal, albedo.rgb), albedo.a);
}
"#;

const FLOOR_BODY: &str = r#"
struct FloorVertex {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct FloorOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_floor(vertex: FloorVertex) -> FloorOutput {
    var out: FloorOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.uv * uniforms.floor_color_b.w;
    return out;
}

@fragment
fn fs_floor(in: FloorOutput) -> @location(0) vec4<f32> {
    // 2x2 checker per repeat, nearest-filtered
    let cell = floor(in.uv * 2.0);
    let parity = (i32(cell.x) + i32(cell.y)) & 1;
    var albedo = uniforms.floor_color_a.rgb;
    if (parity == 1) {
        albedo = uniforms.floor_color_b.rgb;
    }
    return vec4<f32>(shade(vec3<f32>(0.0, 1.0, 0.0), albedo), 1.0);
}
"#;

/// WGSL source for lit, textured model meshes.
pub fn model_shader() -> String {
    format!("{UNIFORMS}{MODEL_BODY}")
}

/// WGSL source for the checkered floor.
pub fn floor_shader() -> String {
    format!("{UNIFORMS}{FLOOR_BODY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_shader_samples_the_material_texture() {
        let src = model_shader();
        assert!(src.contains("@location(3) uv: vec2<f32>"));
        assert!(src.contains("@group(1) @binding(0)"));
        assert!(src.contains("textureSample(diffuse_texture, diffuse_sampler, in.uv)"));
    }

    #[test]
    fn floor_shader_has_no_texture_group() {
        assert!(!floor_shader().contains("@group(1)"));
    }
}
