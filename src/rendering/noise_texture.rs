//! Seamlessly tiling noise texture for the tube walls.
//!
//! Generated once on the CPU from a fixed seed so every run samples
//! identical texels.

use std::f64::consts::TAU;

use noise::{NoiseFn, OpenSimplex};
use wgpu::util::DeviceExt;

/// Seed for the wall texture
pub const NOISE_SEED: u32 = 0x1e57;

/// RGBA8 noise image; each channel is an independent noise field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseTexture {
    size: u32,
    pixels: Vec<u8>,
}

impl NoiseTexture {
    /// Texture edge length used by the renderer
    pub const SIZE: u32 = 256;

    /// Generate a `size`×`size` texture with `periods` noise features across.
    ///
    /// Both axes are mapped onto circles in 4D noise space, so opposite
    /// edges meet without a seam.
    pub fn generate(seed: u32, size: u32, periods: f64) -> Self {
        let simplex = OpenSimplex::new(seed);
        let radius = periods / TAU;
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);

        for y in 0..size {
            let b = TAU * f64::from(y) / f64::from(size);
            for x in 0..size {
                let a = TAU * f64::from(x) / f64::from(size);
                let p = [a.cos() * radius, a.sin() * radius, b.cos() * radius, b.sin() * radius];

                let base = simplex.get(p);
                let shifted = simplex.get([p[0] + 17.3, p[1] - 4.1, p[2] + 9.7, p[3]]);
                let detail = simplex.get(p.map(|c| c * 2.0))
                    + 0.5 * simplex.get(p.map(|c| c * 4.0 + 31.0));

                pixels.extend_from_slice(&[
                    to_byte(base),
                    to_byte(shifted),
                    to_byte(detail / 1.5),
                    255,
                ]);
            }
        }

        Self { size, pixels }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Upload as a linear (non-sRGB) texture
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Wall Noise Texture"),
                size: wgpu::Extent3d {
                    width: self.size,
                    height: self.size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &self.pixels,
        );
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// Map noise from [-1, 1] to [0, 255]
fn to_byte(value: f64) -> u8 {
    ((value + 1.0) * 127.5).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red(tex: &NoiseTexture, x: u32, y: u32) -> f32 {
        tex.pixels[((y * tex.size + x) * 4) as usize] as f32
    }

    #[test]
    fn generation_is_reproducible() {
        let a = NoiseTexture::generate(NOISE_SEED, 32, 3.0);
        let b = NoiseTexture::generate(NOISE_SEED, 32, 3.0);
        assert_eq!(a, b);
        assert_eq!(a.pixels().len(), 32 * 32 * 4);
        assert!(a.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn seeds_change_the_pattern() {
        let a = NoiseTexture::generate(1, 32, 3.0);
        let b = NoiseTexture::generate(2, 32, 3.0);
        assert_ne!(a, b);
    }

    #[test]
    fn opposite_edges_are_continuous() {
        let size = 64;
        let tex = NoiseTexture::generate(NOISE_SEED, size, 3.0);

        // Wrapping from the last column to the first is a one-texel step,
        // so it should look like any neighbouring pair, not a distant one.
        let mut wrap = 0.0;
        let mut far = 0.0;
        for y in 0..size {
            wrap += (red(&tex, size - 1, y) - red(&tex, 0, y)).abs();
            far += (red(&tex, size / 2, y) - red(&tex, 0, y)).abs();
        }
        assert!(wrap < far, "wrap {wrap} far {far}");
    }
}
