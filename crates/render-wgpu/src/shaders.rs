/// WGSL for every scene material. One vertex stage, one fragment entry point per shader kind.
pub const SCENE_SHADER: &str = r#"
struct FrameUniforms {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
    camera_position: vec4<f32>,
    // xy canvas size, z seconds, w light count
    viewport: vec4<f32>,
    light_positions: array<vec4<f32>, 4>,
    // rgb colour, a intensity
    light_colors: array<vec4<f32>, 4>,
};

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    // rgb glow colour, a glow intensity
    glow: vec4<f32>,
    // xyz per-channel index of refraction, w refraction strength
    ior: vec4<f32>,
    // fresnel power, chromatic aberration, saturation, shininess
    shading: vec4<f32>,
    // xyz light direction, w diffuseness
    light: vec4<f32>,
    // bands, speed
    params: vec4<f32>,
    // xy resolution, z time
    resolution: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u_frame: FrameUniforms;

@group(1) @binding(0)
var<uniform> u_object: ObjectUniforms;

@group(2) @binding(0)
var t_source: texture_2d<f32>;
@group(2) @binding(1)
var s_source: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world_pos = u_object.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = u_frame.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = normalize((u_object.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    return out;
}

fn facing_normal(n: vec3<f32>, is_front: bool) -> vec3<f32> {
    return select(-n, n, is_front);
}

fn to_eye(world_position: vec3<f32>) -> vec3<f32> {
    return normalize(u_frame.camera_position.xyz - world_position);
}

fn fresnel(eye: vec3<f32>, normal: vec3<f32>, power: f32) -> f32 {
    return pow(1.0 - clamp(dot(eye, normal), 0.0, 1.0), power);
}

fn adjust_saturation(rgb: vec3<f32>, amount: f32) -> vec3<f32> {
    let grey = vec3<f32>(dot(rgb, vec3<f32>(0.2125, 0.7154, 0.0721)));
    return mix(grey, rgb, amount);
}

fn point_lighting(world_position: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    var total = vec3<f32>(0.0);
    let count = u32(u_frame.viewport.w);
    for (var i = 0u; i < 4u; i = i + 1u) {
        if (i >= count) {
            break;
        }
        let to_light = u_frame.light_positions[i].xyz - world_position;
        let dist = length(to_light);
        let ndotl = max(dot(normal, to_light / max(dist, 0.0001)), 0.0);
        let attenuation = 1.0 / (1.0 + 0.09 * dist * dist);
        total = total + u_frame.light_colors[i].rgb * u_frame.light_colors[i].a * ndotl * attenuation;
    }
    return total;
}

@fragment
fn fs_refraction(in: VertexOutput, @builtin(front_facing) is_front: bool) -> @location(0) vec4<f32> {
    let resolution = max(u_object.resolution.xy, vec2<f32>(1.0));
    let uv = in.clip_position.xy / resolution;
    let normal = facing_normal(normalize(in.world_normal), is_front);

    let view_normal = normalize((u_frame.view * vec4<f32>(normal, 0.0)).xyz);
    let view_position = (u_frame.view * vec4<f32>(in.world_position, 1.0)).xyz;
    let incident = normalize(view_position);
    let ior = max(u_object.ior.xyz, vec3<f32>(0.001));
    let strength = u_object.ior.w;
    let spread = u_object.shading.y;

    // texture v grows downward, view-space y grows upward
    let flip = vec2<f32>(1.0, -1.0);
    let ray_r = refract(incident, view_normal, 1.0 / ior.x).xy * flip;
    let ray_g = refract(incident, view_normal, 1.0 / ior.y).xy * flip;
    let ray_b = refract(incident, view_normal, 1.0 / ior.z).xy * flip;
    let r = textureSample(t_source, s_source, uv + ray_r * strength * (1.0 + spread)).r;
    let g = textureSample(t_source, s_source, uv + ray_g * strength).g;
    let b = textureSample(t_source, s_source, uv + ray_b * strength * (1.0 - spread)).b;
    var colour = adjust_saturation(vec3<f32>(r, g, b), u_object.shading.z);

    let eye = to_eye(in.world_position);
    let light_dir = normalize(u_object.light.xyz);
    let half_dir = normalize(light_dir + eye);
    let specular = pow(max(dot(normal, half_dir), 0.0), max(u_object.shading.w, 1.0));
    let rim = fresnel(eye, normal, u_object.shading.x);
    colour = colour + vec3<f32>(specular + rim * 0.5);
    return vec4<f32>(colour, 1.0);
}

@fragment
fn fs_glow(in: VertexOutput, @builtin(front_facing) is_front: bool) -> @location(0) vec4<f32> {
    let normal = facing_normal(normalize(in.world_normal), is_front);
    let eye = to_eye(in.world_position);
    let light_dir = normalize(u_object.light.xyz);
    let diffuse = mix(1.0, max(dot(normal, light_dir), 0.0), u_object.light.w);
    let lit = u_object.color.rgb * (diffuse + point_lighting(in.world_position, normal));
    let rim = fresnel(eye, normal, u_object.shading.x) * u_object.glow.a;
    return vec4<f32>(lit + u_object.glow.rgb * rim, 1.0);
}

@fragment
fn fs_iridescence(in: VertexOutput, @builtin(front_facing) is_front: bool) -> @location(0) vec4<f32> {
    let normal = facing_normal(normalize(in.world_normal), is_front);
    let eye = to_eye(in.world_position);
    let rim = fresnel(eye, normal, u_object.shading.x);
    let phase = dot(normal, eye) * u_object.params.x + u_object.resolution.z * u_object.params.y;
    let palette = 0.5 + 0.5 * cos(6.28318 * (vec3<f32>(phase) + vec3<f32>(0.0, 0.33, 0.67)));
    return vec4<f32>(mix(palette * 0.6, palette, rim) + vec3<f32>(rim * 0.3), 1.0);
}

@fragment
fn fs_normals(in: VertexOutput, @builtin(front_facing) is_front: bool) -> @location(0) vec4<f32> {
    let normal = facing_normal(normalize(in.world_normal), is_front);
    let t = u_object.resolution.z;
    let shift = vec3<f32>(sin(t), sin(t + 2.094), sin(t + 4.188)) * 0.15;
    let rgb = clamp(normal * 0.5 + 0.5 + shift, vec3<f32>(0.0), vec3<f32>(1.0)) * u_object.color.rgb;
    return vec4<f32>(adjust_saturation(rgb, u_object.shading.z), 1.0);
}

@fragment
fn fs_lambert(in: VertexOutput, @builtin(front_facing) is_front: bool) -> @location(0) vec4<f32> {
    let normal = facing_normal(normalize(in.world_normal), is_front);
    let sky = 0.35 * max(dot(normal, normalize(vec3<f32>(0.3, 1.0, 0.5))), 0.0);
    let lit = 0.15 + sky + point_lighting(in.world_position, normal);
    return vec4<f32>(u_object.color.rgb * lit, 1.0);
}

@fragment
fn fs_emissive(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(u_object.color.rgb * u_object.glow.a, 1.0);
}
"#;

/// WGSL for the full-screen post chain.
pub const POST_SHADER: &str = r#"
struct PostUniforms {
    // xy texel size, zw blur direction
    texel: vec4<f32>,
    // x threshold / strength / intensity, y seconds
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u_post: PostUniforms;
@group(0) @binding(1)
var t_input: texture_2d<f32>;
@group(0) @binding(2)
var t_extra: texture_2d<f32>;
@group(0) @binding(3)
var s_linear: sampler;

struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    var out: FullscreenOutput;
    out.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, y);
    return out;
}

fn luminance(rgb: vec3<f32>) -> f32 {
    return dot(rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
}

@fragment
fn fs_bloom_extract(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let rgb = textureSampleLevel(t_input, s_linear, in.uv, 0.0).rgb;
    let threshold = u_post.params.x;
    let weight = smoothstep(threshold, threshold + 0.25, luminance(rgb));
    return vec4<f32>(rgb * weight, 1.0);
}

@fragment
fn fs_blur(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let stride = u_post.texel.xy * u_post.texel.zw;
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    var sum = textureSampleLevel(t_input, s_linear, in.uv, 0.0).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let delta = stride * f32(i);
        sum = sum + textureSampleLevel(t_input, s_linear, in.uv + delta, 0.0).rgb * weights[i];
        sum = sum + textureSampleLevel(t_input, s_linear, in.uv - delta, 0.0).rgb * weights[i];
    }
    return vec4<f32>(sum, 1.0);
}

@fragment
fn fs_bloom_composite(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let source_rgb = textureSampleLevel(t_input, s_linear, in.uv, 0.0).rgb;
    let glow = textureSampleLevel(t_extra, s_linear, in.uv, 0.0).rgb;
    return vec4<f32>(source_rgb + glow * u_post.params.x, 1.0);
}

fn grain_noise(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

@fragment
fn fs_grain(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let source_rgb = textureSampleLevel(t_input, s_linear, in.uv, 0.0).rgb;
    let seed = vec2<f32>(u_post.params.y * 61.0, u_post.params.y * 17.0);
    let noise = grain_noise(in.position.xy + seed) - 0.5;
    return vec4<f32>(source_rgb + vec3<f32>(noise * u_post.params.x), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|e| {
            panic!("WGSL parse error:\n{}", e.emit_to_string(source));
        });
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("WGSL validation error: {e:?}"));
        module
    }

    fn entry_points(module: &naga::Module) -> Vec<&str> {
        module.entry_points.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn scene_shader_validates() {
        let module = validate(SCENE_SHADER);
        let entries = entry_points(&module);
        for name in [
            "vs_main",
            "fs_refraction",
            "fs_glow",
            "fs_iridescence",
            "fs_normals",
            "fs_lambert",
            "fs_emissive",
        ] {
            assert!(entries.contains(&name), "missing entry point {name}");
        }
    }

    #[test]
    fn post_shader_validates() {
        let module = validate(POST_SHADER);
        let entries = entry_points(&module);
        for name in [
            "vs_fullscreen",
            "fs_bloom_extract",
            "fs_blur",
            "fs_bloom_composite",
            "fs_grain",
        ] {
            assert!(entries.contains(&name), "missing entry point {name}");
        }
    }
}
