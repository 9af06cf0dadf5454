//! Textures: pure functions of surface coordinates `(u, v)` and hit point `p`.

use std::sync::Arc;

use noise::{NoiseFn, OpenSimplex, Perlin, SuperSimplex, Value};
use raytracey_core::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{Color, Vec3};

/// Spatial frequency of a checker pattern unless told otherwise.
const DEFAULT_CHECKER_FREQUENCY: f32 = 10.0;

/// Color source for a material.
pub enum Texture {
    /// Constant color.
    Solid(Color),
    /// 3D checker: the sign of `sin(f·x)·sin(f·y)·sin(f·z)` picks a side.
    Checker {
        even: Arc<Texture>,
        odd: Arc<Texture>,
        frequency: f32,
    },
    /// Gray procedural noise.
    Noise(NoiseTexture),
    /// Bitmap looked up by UV.
    Image(ImageTexture),
}

impl Texture {
    pub fn solid(color: Color) -> Self {
        Texture::Solid(color)
    }

    /// Checker with the default frequency of 10.
    pub fn checker(even: Arc<Texture>, odd: Arc<Texture>) -> Self {
        Self::checker_with_frequency(even, odd, DEFAULT_CHECKER_FREQUENCY)
    }

    pub fn checker_with_frequency(even: Arc<Texture>, odd: Arc<Texture>, frequency: f32) -> Self {
        Texture::Checker {
            even,
            odd,
            frequency,
        }
    }

    pub fn noise(kind: NoiseKind, seed: u32) -> Self {
        Texture::Noise(NoiseTexture::new(kind, seed))
    }

    pub fn image(image: Arc<RgbaImage>) -> Self {
        Texture::Image(ImageTexture::new(image))
    }

    /// Color at surface coordinates `(u, v)` and point `p`.
    pub fn value(&self, u: f32, v: f32, p: Vec3) -> Color {
        match self {
            Texture::Solid(color) => *color,
            Texture::Checker {
                even,
                odd,
                frequency,
            } => {
                let f = *frequency;
                let sines = (f * p.x).sin() * (f * p.y).sin() * (f * p.z).sin();
                if sines < 0.0 {
                    odd.value(u, v, p)
                } else {
                    even.value(u, v, p)
                }
            }
            Texture::Noise(noise) => noise.value(p),
            Texture::Image(image) => image.value(u, v),
        }
    }
}

impl From<Color> for Texture {
    fn from(color: Color) -> Self {
        Texture::Solid(color)
    }
}

/// Noise function behind a [`NoiseTexture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    #[default]
    Perlin,
    OpenSimplex,
    SuperSimplex,
    Value,
}

enum Generator {
    Perlin(Perlin),
    OpenSimplex(OpenSimplex),
    SuperSimplex(SuperSimplex),
    Value(Value),
}

impl Generator {
    fn new(kind: NoiseKind, seed: u32) -> Self {
        match kind {
            NoiseKind::Perlin => Generator::Perlin(Perlin::new(seed)),
            NoiseKind::OpenSimplex => Generator::OpenSimplex(OpenSimplex::new(seed)),
            NoiseKind::SuperSimplex => Generator::SuperSimplex(SuperSimplex::new(seed)),
            NoiseKind::Value => Generator::Value(Value::new(seed)),
        }
    }

    fn get(&self, point: [f64; 3]) -> f64 {
        match self {
            Generator::Perlin(n) => n.get(point),
            Generator::OpenSimplex(n) => n.get(point),
            Generator::SuperSimplex(n) => n.get(point),
            Generator::Value(n) => n.get(point),
        }
    }
}

/// Gray noise: white scaled by the noise value remapped from [-1, 1] to [0, 1].
pub struct NoiseTexture {
    kind: NoiseKind,
    scale: f32,
    generator: Generator,
}

impl NoiseTexture {
    pub fn new(kind: NoiseKind, seed: u32) -> Self {
        Self {
            kind,
            scale: 1.0,
            generator: Generator::new(kind, seed),
        }
    }

    /// Multiply input points by `scale` before sampling (higher is busier).
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    pub fn value(&self, p: Vec3) -> Color {
        let q = (p * self.scale).as_dvec3();
        let n = self.generator.get(q.to_array());
        Color::ONE * ((n as f32 + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

/// Nearest-neighbour lookup into a bitmap. `v = 0` is the bottom row.
pub struct ImageTexture {
    image: Arc<RgbaImage>,
}

impl ImageTexture {
    pub fn new(image: Arc<RgbaImage>) -> Self {
        Self { image }
    }

    pub fn value(&self, u: f32, v: f32) -> Color {
        let u = u.clamp(0.0, 1.0);
        let v = 1.0 - v.clamp(0.0, 1.0);

        // Pixel lookup clamps, so u = 1 lands on the last column
        let x = (u * self.image.width() as f32) as u32;
        let y = (v * self.image.height() as f32) as u32;
        let [r, g, b, _] = self.image.pixel(x, y);

        Color::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b))
    }
}

/// Convert sRGB component to linear.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
