//! Shared WGSL snippets and shader validation.
//!
//! The generated shaders are assembled from these pieces with `format!`.
//!
//! # Available Snippets
//!
//! - [`FULLSCREEN_VERTEX_WGSL`] - `vs_fullscreen`, a single triangle that covers
//!   the whole render target, with the matching `FullscreenOutput` struct
//! - [`RANDOM_WGSL`] - `hash(n: u32) -> u32` and `rand(seed: u32) -> f32`
//! - [`NOISE_WGSL`] - `noise3(p: vec3<f32>) -> f32`, 3D simplex noise in [-1, 1]
//!
//! Every generated module goes through [`validate_wgsl`] before it reaches
//! wgpu, so a broken shader surfaces as an [`InitError`] with naga's
//! diagnostic instead of a device-level validation panic.

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::InitError;

/// Full-screen triangle vertex stage.
///
/// Three vertices, no vertex buffers. Draw with `draw(0..3, 0..1)`.
pub const FULLSCREEN_VERTEX_WGSL: &str = r#"
struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    // Oversized triangle, clipped to the viewport
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0)
    );

    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}
"#;

/// WGSL code for hash functions.
pub const RANDOM_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

// Random float in [0, 1)
fn rand(seed: u32) -> f32 {
    return f32(hash(seed)) / 4294967295.0;
}
"#;

/// WGSL code for 3D simplex noise.
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.79284291400159 - 0.85373472095314 * r;
}

fn noise3(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0/6.0, 1.0/3.0);
    let D = vec4<f32>(0.0, 0.5, 1.0, 2.0);

    // First corner
    var i = floor(v + dot(v, vec3(C.y)));
    let x0 = v - i + dot(i, vec3(C.x));

    // Other corners
    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - D.yyy;

    // Permutations
    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    // Gradients
    let n_ = 0.142857142857;
    let ns = n_ * D.wyz - D.xzx;

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0,p0), dot(p1,p1), dot(p2,p2), dot(p3,p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    var m = max(0.6 - vec4<f32>(dot(x0,x0), dot(x1,x1), dot(x2,x2), dot(x3,x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m*m, vec4<f32>(dot(p0,x0), dot(p1,x1), dot(p2,x2), dot(p3,x3)));
}
"#;

/// Parse and validate a WGSL module with naga.
///
/// `stage` names the program in the returned error ("Position", "Particle",
/// "PassThrough").
pub fn validate_wgsl(source: &str, stage: &'static str) -> Result<(), InitError> {
    let module = wgsl::parse_str(source).map_err(|err| InitError::ShaderCompilation {
        stage,
        message: err.emit_to_string(source),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| InitError::ShaderCompilation {
            stage,
            message: format!("{}", err),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullscreen_vertex_validates() {
        validate_wgsl(
            &format!(
                "{}\n@fragment\nfn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {{ return vec4<f32>(in.uv, 0.0, 1.0); }}",
                FULLSCREEN_VERTEX_WGSL
            ),
            "Test",
        )
        .unwrap();
    }

    #[test]
    fn test_noise_validates() {
        let src = format!(
            "{}{}\n@fragment\nfn fs_main(@builtin(position) p: vec4<f32>) -> @location(0) vec4<f32> {{ return vec4<f32>(noise3(p.xyz), rand(hash(1u)), 0.0, 1.0); }}",
            RANDOM_WGSL, NOISE_WGSL
        );
        validate_wgsl(&src, "Test").unwrap();
    }

    #[test]
    fn test_parse_error_reports_stage() {
        let err = validate_wgsl("fn broken( {", "Position").unwrap_err();
        match err {
            InitError::ShaderCompilation { stage, message } => {
                assert_eq!(stage, "Position");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_error_is_reported() {
        // Parses, but returns the wrong type
        let err = validate_wgsl("fn f() -> f32 { return 1u; }", "Position");
        assert!(err.is_err());
    }
}
