//! Benchmarks for CPU-side layout work and shader generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use rtps::gpu::{particle_pass, position_pass};
use rtps::layout::{build_initial_textures, texel_uvs, texture_size};
use rtps::{Config, ParticleLayout};

fn bench_texture_size(c: &mut Criterion) {
    c.bench_function("texture_size", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for n in (1..100_000u32).step_by(97) {
                acc = acc.wrapping_add(texture_size(black_box(n)).unwrap_or(0));
            }
            acc
        })
    });
}

fn bench_initial_textures(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_initial_textures");

    for n in [1_000u32, 10_000, 100_000] {
        let size = texture_size(n).unwrap();
        let seeds: Vec<Vec3> = (0..n)
            .map(|i| Vec3::new(i as f32, (i * 3) as f32, 0.0))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_initial_textures(n, size, &seeds).unwrap()))
        });
    }

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for (width, height) in [(64u32, 64u32), (320, 240), (640, 480)] {
        let config = Config::new().with_scene_size(width, height);
        group.bench_with_input(
            BenchmarkId::new("new", format!("{width}x{height}")),
            &config,
            |b, config| b.iter(|| black_box(ParticleLayout::new(width * height, config).unwrap())),
        );
    }

    group.bench_function("texel_uvs_65536", |b| {
        b.iter(|| black_box(texel_uvs(65_536, 256).unwrap()))
    });

    group.finish();
}

fn bench_shader_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_generation");

    group.bench_function("position_pass", |b| {
        b.iter(|| black_box(position_pass::generate_shader()))
    });

    group.bench_function("particle_pass", |b| {
        b.iter(|| black_box(particle_pass::generate_shader()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_texture_size,
    bench_initial_textures,
    bench_layout,
    bench_shader_generation,
);

criterion_main!(benches);
