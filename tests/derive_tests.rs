//! Integration tests for the `#[derive(UniformBlock)]` macro.
//!
//! These tests verify the generated GPU structs, WGSL text and conversions by
//! using the derived implementations from outside the crate, and feed the
//! WGSL through naga to make sure it is accepted in the uniform address space.

use glam::{Mat4, Vec2, Vec3, Vec4};
use rtps::shader_utils::validate_wgsl;
use rtps::UniformBlock;

// ============================================================================
// Basic scalar blocks
// ============================================================================

#[derive(UniformBlock, Clone, Copy)]
struct Scalars {
    a: f32,
    b: u32,
    c: i32,
}

#[test]
fn test_scalars_pad_to_sixteen() {
    assert_eq!(Scalars::SIZE, 16);
    assert_eq!(std::mem::size_of::<ScalarsGpu>(), 16);
}

#[test]
fn test_scalars_wgsl_struct() {
    assert_eq!(Scalars::WGSL_NAME, "Scalars");
    assert!(Scalars::WGSL_STRUCT.contains("a: f32,"));
    assert!(Scalars::WGSL_STRUCT.contains("b: u32,"));
    assert!(Scalars::WGSL_STRUCT.contains("c: i32,"));
    assert!(Scalars::WGSL_STRUCT.contains("_pad0: f32,"));
}

#[test]
fn test_scalars_to_gpu() {
    let block = Scalars { a: 1.5, b: 7, c: -3 };
    let gpu = block.to_gpu();
    assert_eq!(gpu.a, 1.5);
    assert_eq!(gpu.b, 7);
    assert_eq!(gpu.c, -3);
}

// ============================================================================
// Alignment
// ============================================================================

#[derive(UniformBlock, Clone, Copy)]
struct Aligned {
    scale: f32,
    center: Vec3,
    tint: Vec4,
}

#[test]
fn test_vec3_aligns_to_sixteen() {
    // scale, 3 pads, center (12) + 1 pad, tint
    assert_eq!(Aligned::SIZE, 48);
    assert_eq!(std::mem::size_of::<AlignedGpu>(), 48);

    let gpu = Aligned {
        scale: 2.0,
        center: Vec3::new(1.0, 2.0, 3.0),
        tint: Vec4::ONE,
    }
    .to_gpu();
    let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
    assert_eq!(floats[0], 2.0);
    assert_eq!(&floats[4..7], &[1.0, 2.0, 3.0]);
    assert_eq!(&floats[8..12], &[1.0; 4]);
}

#[derive(UniformBlock, Clone, Copy)]
struct Vec2Pair {
    a: f32,
    b: Vec2,
}

#[test]
fn test_vec2_aligns_to_eight() {
    let gpu = Vec2Pair {
        a: 1.0,
        b: Vec2::new(5.0, 6.0),
    }
    .to_gpu();
    let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&gpu));
    assert_eq!(floats, &[1.0, 0.0, 5.0, 6.0]);
}

#[derive(UniformBlock, Clone, Copy)]
#[wgsl(name = "Camera")]
struct CameraBlock {
    view_proj: Mat4,
    eye: glam::Vec3,
}

#[test]
fn test_renamed_struct_and_matrix() {
    assert_eq!(CameraBlock::WGSL_NAME, "Camera");
    assert!(CameraBlock::WGSL_STRUCT.starts_with("struct Camera {"));
    assert_eq!(CameraBlock::SIZE, 80);

    let m = Mat4::from_cols_array(&[
        1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
    ]);
    let gpu = CameraBlock {
        view_proj: m,
        eye: Vec3::Z,
    }
    .to_gpu();
    assert_eq!(gpu.view_proj[0], [1.0, 2.0, 3.0, 4.0]);
    assert_eq!(gpu.view_proj[3], [13.0, 14.0, 15.0, 16.0]);
    assert_eq!(gpu.eye, [0.0, 0.0, 1.0]);
}

// ============================================================================
// WGSL acceptance
// ============================================================================

fn uniform_module<T: UniformBlock>() -> String {
    format!(
        "{}\n@group(0) @binding(0) var<uniform> block: {};\n@fragment\nfn fs_main() -> @location(0) vec4<f32> {{ return vec4<f32>(0.0); }}",
        T::WGSL_STRUCT,
        T::WGSL_NAME
    )
}

#[test]
fn test_generated_structs_validate_as_uniforms() {
    validate_wgsl(&uniform_module::<Scalars>(), "Test").unwrap();
    validate_wgsl(&uniform_module::<Aligned>(), "Test").unwrap();
    validate_wgsl(&uniform_module::<Vec2Pair>(), "Test").unwrap();
    validate_wgsl(&uniform_module::<CameraBlock>(), "Test").unwrap();
}

#[test]
fn test_simulation_blocks_validate_as_uniforms() {
    use rtps::gpu::particle_pass::RenderParams;
    use rtps::gpu::position_pass::SimParams;

    validate_wgsl(&uniform_module::<SimParams>(), "Test").unwrap();
    validate_wgsl(&uniform_module::<RenderParams>(), "Test").unwrap();
}
