//! Property tests for particle layout through the public API.
//!
//! Inputs are drawn from a seeded RNG so failures reproduce.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtps::layout::{build_initial_textures, locate, texture_size, TexelLocation};
use rtps::ping_pong::{FrameParity, PingPong};
use rtps::{Config, ConfigError, ParticleLayout};

#[test]
fn test_texture_size_random_counts() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2000 {
        let n: u32 = rng.gen_range(1..=4_000_000);
        let s = texture_size(n).unwrap() as u64;
        assert!(s * s >= n as u64, "s={s} too small for n={n}");
        assert!((s - 1) * (s - 1) < n as u64, "s={s} not minimal for n={n}");
    }
}

#[test]
fn test_texture_size_perfect_squares() {
    for s in [1u32, 2, 3, 100, 1024, 4096, 46340] {
        assert_eq!(texture_size(s * s).unwrap(), s);
        assert_eq!(texture_size(s * s + 1).unwrap(), s + 1);
    }
}

#[test]
fn test_locate_random_indices_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..2000 {
        let size: u32 = rng.gen_range(1..=2048);
        let index: u32 = rng.gen_range(0..size * size);
        let loc = locate(index, size).unwrap();
        assert_eq!(loc.col, index % size);
        assert_eq!(loc.row, index / size);
        assert!(loc.uv.x > 0.0 && loc.uv.x < 1.0);
        assert!(loc.uv.y > 0.0 && loc.uv.y < 1.0);
        assert_eq!(TexelLocation::from_uv(loc.uv, size).unwrap().index, index);
    }
}

#[test]
fn test_random_seeds_land_on_their_texels() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let n: u32 = rng.gen_range(1..500);
        let size = texture_size(n).unwrap();
        let seeds: Vec<Vec3> = (0..n)
            .map(|_| Vec3::new(rng.gen(), rng.gen(), rng.gen()))
            .collect();

        let textures = build_initial_textures(n, size, &seeds).unwrap();
        for (i, seed) in seeds.iter().enumerate() {
            let loc = locate(i as u32, size).unwrap();
            let default = textures.default.texel(loc.col, loc.row);
            let initial = textures.initial.texel(loc.col, loc.row);
            assert_eq!(default, [seed.x, seed.y, seed.z, 1.0]);
            assert_eq!(initial[..3], default[..3]);
            assert!((0.0..1.0).contains(&initial[3]));
        }
        for i in n..size * size {
            let loc = locate(i, size).unwrap();
            assert_eq!(textures.default.texel(loc.col, loc.row), [0.0; 4]);
        }
    }
}

#[test]
fn test_end_to_end_counts() {
    let config = Config::new().with_scene_size(20, 30);
    let layout = ParticleLayout::new(600, &config).unwrap();
    assert_eq!(layout.particle_count(), 100);
    assert_eq!(layout.texture_size(), 10);

    let textures = layout.initial_textures().unwrap();
    assert_eq!(textures.default.size(), 10);
    assert_eq!(textures.default.texel(0, 0)[..3], layout.seeds()[0].to_array());
    assert_eq!(textures.default.texel(9, 9)[..3], layout.seeds()[99].to_array());
}

#[test]
fn test_zero_points_is_a_config_error() {
    let err = ParticleLayout::new(0, &Config::new()).unwrap_err();
    assert!(matches!(err, ConfigError::ZeroParticles));
}

#[test]
fn test_uv_table_never_addresses_padding() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let width: u32 = rng.gen_range(6..200);
        let height: u32 = rng.gen_range(6..200);
        let config = Config::new().with_scene_size(width, height);
        let layout = ParticleLayout::new(width * height, &config).unwrap();
        let n = layout.particle_count();
        let s = layout.texture_size();

        for (i, uv) in layout.texel_uvs().iter().enumerate() {
            let texel = TexelLocation::from_uv(Vec2::from_array(*uv), s).unwrap();
            assert_eq!(texel.index, i as u32);
            assert!(texel.index < n);
        }
    }
}

#[test]
fn test_ping_pong_never_aliases() {
    let pair = PingPong::new('a', 'b');
    let mut parity = FrameParity::new();
    let mut last_write = None;
    for _ in 0..1000 {
        parity.advance();
        let (read, write) = pair.targets(parity);
        assert_ne!(read, write);
        if let Some(prev) = last_write {
            assert_eq!(*read, prev);
        }
        last_write = Some(*write);
    }
    assert_eq!(parity.frame(), 1000);
}
