//! Texture layout for particle state.
//!
//! Every particle owns exactly one texel of a square floating-point texture.
//! Particles are laid out row-major, so particle `i` lives at column
//! `i % size` and row `i / size`. Texels past the last particle are padding:
//! they are zero-filled and never addressed by a particle's texel UV.
//!
//! ```text
//! size = 3, particle_count = 7
//!
//!   row 0:  [0] [1] [2]
//!   row 1:  [3] [4] [5]
//!   row 2:  [6]  .   .     <- padding
//! ```
//!
//! UVs point at texel centers (`(col + 0.5) / size`), which is what a
//! nearest-neighbor sampler needs to hit the right texel on every GPU.

use glam::{Vec2, Vec3};

use crate::config::Config;
use crate::error::ConfigError;

/// Number of particles simulated for a grid of `num_points` points.
///
/// One particle per `decimation` grid points, rounded to nearest.
pub fn particle_count(num_points: u32, decimation: u32) -> Result<u32, ConfigError> {
    if decimation == 0 {
        return Err(ConfigError::InvalidScene("decimation must be at least 1".into()));
    }
    let count = (num_points as f64 / decimation as f64).round() as u32;
    if count == 0 {
        return Err(ConfigError::ZeroParticles);
    }
    Ok(count)
}

/// Smallest side length `s` with `s * s >= n`.
pub fn texture_size(n: u32) -> Result<u32, ConfigError> {
    if n == 0 {
        return Err(ConfigError::ZeroParticles);
    }
    let n = n as u64;
    let mut s = (n as f64).sqrt() as u64;
    // Correct for float rounding in either direction
    while s * s < n {
        s += 1;
    }
    while s > 1 && (s - 1) * (s - 1) >= n {
        s -= 1;
    }
    Ok(s as u32)
}

/// Where a particle lives in the position texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexelLocation {
    /// Particle index.
    pub index: u32,
    /// Texel column.
    pub col: u32,
    /// Texel row.
    pub row: u32,
    /// Normalized texel-center coordinate.
    pub uv: Vec2,
}

impl TexelLocation {
    /// Nearest texel for a normalized coordinate.
    ///
    /// Returns `None` for coordinates outside `[0, 1]` or a zero size.
    pub fn from_uv(uv: Vec2, size: u32) -> Option<Self> {
        if size == 0 || !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return None;
        }
        let s = size as f32;
        let col = ((uv.x * s).floor() as u32).min(size - 1);
        let row = ((uv.y * s).floor() as u32).min(size - 1);
        locate(row * size + col, size).ok()
    }
}

/// Map a particle index to its texel.
pub fn locate(index: u32, size: u32) -> Result<TexelLocation, ConfigError> {
    if size == 0 || index as u64 >= size as u64 * size as u64 {
        return Err(ConfigError::IndexOutOfRange { index, size });
    }
    let col = index % size;
    let row = index / size;
    let s = size as f32;
    Ok(TexelLocation {
        index,
        col,
        row,
        uv: Vec2::new((col as f32 + 0.5) / s, (row as f32 + 0.5) / s),
    })
}

/// CPU-side contents of a square RGBA float texture.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionData {
    size: u32,
    texels: Vec<[f32; 4]>,
}

impl PositionData {
    /// A zero-filled `size x size` texture.
    pub fn zeroed(size: u32) -> Self {
        Self {
            size,
            texels: vec![[0.0; 4]; size as usize * size as usize],
        }
    }

    /// Wrap row-major texels of a `size x size` texture.
    pub fn from_texels(size: u32, texels: Vec<[f32; 4]>) -> Result<Self, ConfigError> {
        let expected = size as usize * size as usize;
        if texels.len() != expected {
            return Err(ConfigError::TextureSizeMismatch {
                expected: size,
                actual: (texels.len() as f64).sqrt() as u32,
            });
        }
        Ok(Self { size, texels })
    }

    /// Side length in texels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel at a column and row.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the texture.
    pub fn texel(&self, col: u32, row: u32) -> [f32; 4] {
        assert!(col < self.size && row < self.size, "texel ({col}, {row}) out of bounds");
        self.texels[(row * self.size + col) as usize]
    }

    /// Raw bytes for a `Rgba32Float` upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    fn set(&mut self, location: &TexelLocation, value: [f32; 4]) {
        let i = (location.row * self.size + location.col) as usize;
        self.texels[i] = value;
    }
}

/// The two immutable reference textures of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialTextures {
    /// Seed positions, `w` holds a per-particle phase in `[0, 1)`.
    pub initial: PositionData,
    /// Seed positions as rest state, `w = 1`.
    pub default: PositionData,
}

/// Deterministic per-particle phase in `[0, 1)`.
pub fn particle_phase(index: u32) -> f32 {
    let mut n = index.wrapping_mul(374761393).wrapping_add(668265263);
    n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    n ^= n >> 16;
    (n >> 8) as f32 / (1u32 << 24) as f32
}

/// Build the initial and default position textures.
///
/// Texel `locate(i)` receives `seeds[i]` for every particle; padding texels
/// stay zero. The output depends only on the inputs.
pub fn build_initial_textures(
    n: u32,
    size: u32,
    seeds: &[Vec3],
) -> Result<InitialTextures, ConfigError> {
    if n == 0 {
        return Err(ConfigError::ZeroParticles);
    }
    if (size as u64) * (size as u64) < n as u64 {
        return Err(ConfigError::TextureSizeMismatch {
            expected: texture_size(n)?,
            actual: size,
        });
    }
    if seeds.len() != n as usize {
        return Err(ConfigError::SeedCountMismatch {
            expected: n as usize,
            actual: seeds.len(),
        });
    }

    let mut initial = PositionData::zeroed(size);
    let mut default = PositionData::zeroed(size);

    for (i, seed) in seeds.iter().enumerate() {
        let location = locate(i as u32, size)?;
        initial.set(&location, [seed.x, seed.y, seed.z, particle_phase(i as u32)]);
        default.set(&location, [seed.x, seed.y, seed.z, 1.0]);
    }

    Ok(InitialTextures { initial, default })
}

/// Per-instance grid offsets, `(i * step) % width` and `(i * step) / width`.
///
/// Fails with [`ConfigError::InvalidScene`] when `width` is zero.
pub fn grid_offsets(n: u32, step: u32, width: u32) -> Result<Vec<[f32; 3]>, ConfigError> {
    if width == 0 {
        return Err(ConfigError::InvalidScene("grid width must be positive".into()));
    }
    Ok((0..n as u64)
        .map(|i| {
            let cell = i * step as u64;
            [
                (cell % width as u64) as f32,
                (cell / width as u64) as f32,
                0.0,
            ]
        })
        .collect())
}

/// Per-instance texel UVs, `uvs[i] == locate(i, size).uv`.
pub fn texel_uvs(n: u32, size: u32) -> Result<Vec<[f32; 2]>, ConfigError> {
    (0..n)
        .map(|i| locate(i, size).map(|loc| loc.uv.to_array()))
        .collect()
}

/// Everything the GPU passes need to know about particle placement.
///
/// Built once per simulation, entirely on the CPU. Constructing a layout is
/// the first thing simulation init does, so invalid counts fail before any
/// GPU allocation.
#[derive(Debug, Clone)]
pub struct ParticleLayout {
    particle_count: u32,
    texture_size: u32,
    grid_size: (u32, u32),
    offsets: Vec<[f32; 3]>,
    texel_uvs: Vec<[f32; 2]>,
    seeds: Vec<Vec3>,
}

impl ParticleLayout {
    /// Derive the layout for `num_points` grid points.
    ///
    /// Seeds default to the grid offsets mapped into normalized device space.
    pub fn new(num_points: u32, config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let particle_count = particle_count(num_points, config.particles.decimation)?;
        let texture_size = texture_size(particle_count)?;

        let width = config.scene.width;
        let height = config.scene.height;
        let offsets = grid_offsets(particle_count, config.particles.step, width)?;
        let texel_uvs = texel_uvs(particle_count, texture_size)?;
        let seeds = offsets
            .iter()
            .map(|o| {
                Vec3::new(
                    o[0] / width as f32 * 2.0 - 1.0,
                    1.0 - o[1] / height as f32 * 2.0,
                    0.0,
                )
            })
            .collect();

        Ok(Self {
            particle_count,
            texture_size,
            grid_size: (width, height),
            offsets,
            texel_uvs,
            seeds,
        })
    }

    /// Replace the seed positions.
    pub fn with_seeds(mut self, seeds: Vec<Vec3>) -> Result<Self, ConfigError> {
        if seeds.len() != self.particle_count as usize {
            return Err(ConfigError::SeedCountMismatch {
                expected: self.particle_count as usize,
                actual: seeds.len(),
            });
        }
        self.seeds = seeds;
        Ok(self)
    }

    /// Number of simulated particles.
    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Side length of the position textures.
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Scene grid `(width, height)`.
    pub fn grid_size(&self) -> (u32, u32) {
        self.grid_size
    }

    /// Per-instance grid offsets.
    pub fn offsets(&self) -> &[[f32; 3]] {
        &self.offsets
    }

    /// Per-instance texel UVs.
    pub fn texel_uvs(&self) -> &[[f32; 2]] {
        &self.texel_uvs
    }

    /// Seed positions.
    pub fn seeds(&self) -> &[Vec3] {
        &self.seeds
    }

    /// Build the reference textures for this layout.
    pub fn initial_textures(&self) -> Result<InitialTextures, ConfigError> {
        build_initial_textures(self.particle_count, self.texture_size, &self.seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_size_examples() {
        assert_eq!(texture_size(100).unwrap(), 10);
        assert_eq!(texture_size(101).unwrap(), 11);
        assert_eq!(texture_size(1).unwrap(), 1);
        assert_eq!(texture_size(2).unwrap(), 2);
        assert_eq!(texture_size(u32::MAX).unwrap(), 65536);
    }

    #[test]
    fn test_texture_size_is_minimal() {
        for n in 1..5000u32 {
            let s = texture_size(n).unwrap();
            assert!(s * s >= n, "s={s} too small for n={n}");
            assert!((s - 1) * (s - 1) < n, "s={s} not minimal for n={n}");
        }
    }

    #[test]
    fn test_texture_size_zero() {
        assert!(matches!(texture_size(0), Err(ConfigError::ZeroParticles)));
    }

    #[test]
    fn test_particle_count_rounds() {
        assert_eq!(particle_count(600, 6).unwrap(), 100);
        assert_eq!(particle_count(3, 6).unwrap(), 1);
        assert_eq!(particle_count(604, 6).unwrap(), 101);
        assert!(matches!(particle_count(2, 6), Err(ConfigError::ZeroParticles)));
        assert!(matches!(particle_count(0, 6), Err(ConfigError::ZeroParticles)));
    }

    #[test]
    fn test_locate_row_major() {
        let loc = locate(23, 10).unwrap();
        assert_eq!((loc.col, loc.row), (3, 2));
        assert!((loc.uv.x - 0.35).abs() < 1e-6);
        assert!((loc.uv.y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_locate_out_of_range() {
        assert!(locate(100, 10).is_err());
        assert!(locate(0, 0).is_err());
        assert!(locate(99, 10).is_ok());
    }

    #[test]
    fn test_locate_bijective_with_uv_round_trip() {
        for size in [1u32, 2, 7, 10, 33] {
            let mut seen = vec![false; (size * size) as usize];
            for i in 0..size * size {
                let loc = locate(i, size).unwrap();
                assert_eq!(loc.col, i % size);
                assert_eq!(loc.row, i / size);
                let cell = (loc.row * size + loc.col) as usize;
                assert!(!seen[cell], "texel visited twice");
                seen[cell] = true;

                let back = TexelLocation::from_uv(loc.uv, size).unwrap();
                assert_eq!(back.index, i);
            }
            assert!(seen.iter().all(|&v| v));
        }
    }

    #[test]
    fn test_from_uv_rejects_outside() {
        assert!(TexelLocation::from_uv(Vec2::new(-0.1, 0.5), 4).is_none());
        assert!(TexelLocation::from_uv(Vec2::new(0.5, 1.1), 4).is_none());
        // The far edge snaps to the last texel
        assert_eq!(TexelLocation::from_uv(Vec2::ONE, 4).unwrap().index, 15);
    }

    #[test]
    fn test_build_initial_textures_places_seeds() {
        let seeds: Vec<Vec3> = (0..7).map(|i| Vec3::new(i as f32, -(i as f32), 0.5)).collect();
        let textures = build_initial_textures(7, 3, &seeds).unwrap();

        assert_eq!(textures.default.texel(0, 0), [0.0, 0.0, 0.5, 1.0]);
        assert_eq!(textures.default.texel(0, 2), [6.0, -6.0, 0.5, 1.0]);
        assert_eq!(textures.initial.texel(1, 1)[..3], [4.0, -4.0, 0.5]);

        // Padding texels stay zero
        assert_eq!(textures.default.texel(1, 2), [0.0; 4]);
        assert_eq!(textures.initial.texel(2, 2), [0.0; 4]);
    }

    #[test]
    fn test_build_initial_textures_deterministic() {
        let seeds: Vec<Vec3> = (0..50).map(|i| Vec3::splat(i as f32 * 0.1)).collect();
        let a = build_initial_textures(50, 8, &seeds).unwrap();
        let b = build_initial_textures(50, 8, &seeds).unwrap();
        assert_eq!(a.initial.as_bytes(), b.initial.as_bytes());
        assert_eq!(a.default.as_bytes(), b.default.as_bytes());
    }

    #[test]
    fn test_build_initial_textures_errors() {
        let seeds = vec![Vec3::ZERO; 10];
        assert!(matches!(
            build_initial_textures(0, 4, &[]),
            Err(ConfigError::ZeroParticles)
        ));
        assert!(matches!(
            build_initial_textures(10, 3, &seeds),
            Err(ConfigError::TextureSizeMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            build_initial_textures(10, 4, &seeds[..9]),
            Err(ConfigError::SeedCountMismatch { expected: 10, actual: 9 })
        ));
    }

    #[test]
    fn test_from_texels_checks_length() {
        assert!(PositionData::from_texels(2, vec![[1.0; 4]; 4]).is_ok());
        assert!(matches!(
            PositionData::from_texels(3, vec![[0.0; 4]; 4]),
            Err(ConfigError::TextureSizeMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_particle_phase_range() {
        for i in 0..10_000 {
            let p = particle_phase(i);
            assert!((0.0..1.0).contains(&p));
        }
        assert_ne!(particle_phase(1), particle_phase(2));
    }

    #[test]
    fn test_grid_offsets() {
        let offsets = grid_offsets(5, 6, 20).unwrap();
        assert_eq!(offsets[0], [0.0, 0.0, 0.0]);
        assert_eq!(offsets[3], [18.0, 0.0, 0.0]);
        assert_eq!(offsets[4], [4.0, 1.0, 0.0]);
    }

    #[test]
    fn test_grid_offsets_zero_width() {
        let err = grid_offsets(5, 6, 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScene(_)));
    }

    #[test]
    fn test_layout_end_to_end_sizes() {
        let config = Config::new().with_scene_size(20, 30);
        let layout = ParticleLayout::new(600, &config).unwrap();
        assert_eq!(layout.particle_count(), 100);
        assert_eq!(layout.texture_size(), 10);
        assert_eq!(layout.offsets().len(), 100);
        assert_eq!(layout.texel_uvs().len(), 100);

        let textures = layout.initial_textures().unwrap();
        let s0 = layout.seeds()[0];
        let s99 = layout.seeds()[99];
        assert_eq!(textures.default.texel(0, 0)[..3], s0.to_array());
        assert_eq!(textures.default.texel(9, 9)[..3], s99.to_array());
    }

    #[test]
    fn test_layout_seeds_in_ndc() {
        let config = Config::new().with_scene_size(60, 60);
        let layout = ParticleLayout::new(3600, &config).unwrap();
        assert_eq!(layout.seeds()[0], Vec3::new(-1.0, 1.0, 0.0));
        for seed in layout.seeds() {
            assert!((-1.0..=1.0).contains(&seed.x));
            assert!((-1.0..=1.0).contains(&seed.y));
        }
    }

    #[test]
    fn test_layout_uvs_never_hit_padding() {
        let config = Config::new().with_scene_size(31, 17);
        let layout = ParticleLayout::new(31 * 17, &config).unwrap();
        let n = layout.particle_count();
        let s = layout.texture_size();
        assert!(s * s > n, "pick a count that leaves padding");

        for (i, uv) in layout.texel_uvs().iter().enumerate() {
            let texel = TexelLocation::from_uv(Vec2::from_array(*uv), s).unwrap();
            assert_eq!(texel.index, i as u32);
            assert!(texel.index < n);
        }
    }

    #[test]
    fn test_layout_zero_points() {
        let config = Config::new();
        assert!(matches!(
            ParticleLayout::new(0, &config),
            Err(ConfigError::ZeroParticles)
        ));
    }

    #[test]
    fn test_with_seeds_length_checked() {
        let config = Config::new().with_scene_size(20, 30);
        let layout = ParticleLayout::new(600, &config).unwrap();
        assert!(layout.clone().with_seeds(vec![Vec3::ZERO; 99]).is_err());
        let layout = layout.with_seeds(vec![Vec3::ONE; 100]).unwrap();
        assert_eq!(layout.seeds()[42], Vec3::ONE);
    }
}
