//! Recursive Monte Carlo path integrator.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::random::gen_f32;
use crate::{Camera, Color, Hittable, Interval, Ray, RenderConfig};

/// Smallest accepted hit distance; keeps bounced rays off their own surface.
pub const HIT_EPSILON: f32 = 0.001;

/// Radiance for rays that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    /// Vertical blend from `horizon` (looking down) to `zenith` (looking up).
    Gradient { horizon: Color, zenith: Color },
    /// Constant color; black for scenes lit only by emitters.
    Solid { color: Color },
}

impl Default for Background {
    fn default() -> Self {
        Background::Gradient {
            horizon: Color::ONE,
            zenith: Color::new(0.3, 0.5, 1.0),
        }
    }
}

impl Background {
    pub fn radiance(&self, ray: &Ray) -> Color {
        match *self {
            Background::Gradient { horizon, zenith } => {
                let t = 0.5 * (ray.direction().y + 1.0);
                horizon.lerp(zenith, t)
            }
            Background::Solid { color } => color,
        }
    }
}

/// Radiance arriving along `ray`.
///
/// `depth` counts bounces so far; recursion stops once it reaches
/// `config.max_depth`, returning only what the last surface emits.
pub fn ray_color(
    ray: &Ray,
    world: &Hittable,
    depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let Some(rec) = world.hit(ray, Interval::new(HIT_EPSILON, f32::INFINITY)) else {
        return config.background.radiance(ray);
    };

    let emitted = rec.material.emitted(rec.u, rec.v, rec.p);
    if depth >= config.max_depth {
        return emitted;
    }

    match rec.material.scatter(ray, &rec, rng) {
        Some(scatter) => {
            emitted
                + scatter.attenuation
                    * ray_color(&scatter.scattered, world, depth + 1, config, rng)
        }
        None => emitted,
    }
}

/// Average of `config.samples_per_pixel` jittered samples through pixel
/// `(x, y)`, linear color. Row 0 is the top of the image.
pub fn render_pixel(
    camera: &Camera,
    world: &Hittable,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let width = config.width as f32;
    let height = config.height as f32;
    let flipped_y = config.height.saturating_sub(y + 1) as f32;

    let mut color = Color::ZERO;
    for _ in 0..config.samples_per_pixel {
        let u = (x as f32 + gen_f32(rng)) / width;
        let v = (flipped_y + gen_f32(rng)) / height;
        let ray = camera.get_ray(u, v, rng);
        color += ray_color(&ray, world, 0, config, rng);
    }

    color / config.samples_per_pixel.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HittableList, Material, Sphere, Vec3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn config() -> RenderConfig {
        RenderConfig {
            width: 4,
            height: 2,
            samples_per_pixel: 8,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_miss_returns_background() {
        let world: Hittable = HittableList::new().into();
        let mut rng = StdRng::seed_from_u64(0);
        let config = config();

        let up = Ray::new(Vec3::ZERO, Vec3::Y, 0.0);
        let down = Ray::new(Vec3::ZERO, Vec3::NEG_Y, 0.0);

        let sky = ray_color(&up, &world, 0, &config, &mut rng);
        assert!((sky - Color::new(0.3, 0.5, 1.0)).length() < 1e-6);
        assert_eq!(ray_color(&down, &world, 0, &config, &mut rng), Color::ONE);
    }

    #[test]
    fn test_depth_cap_returns_emission_only() {
        let mut list = HittableList::new();
        list.add(Sphere::new(
            Vec3::new(0.0, 0.0, -2.0),
            0.5,
            Arc::new(Material::lambertian(Color::ONE)),
        ));
        let world: Hittable = list.into();
        let mut rng = StdRng::seed_from_u64(1);
        let config = config();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let capped = ray_color(&ray, &world, config.max_depth, &config, &mut rng);
        assert_eq!(capped, Color::ZERO);

        let lit = ray_color(&ray, &world, 0, &config, &mut rng);
        assert!(lit.max_element() > 0.0);
    }

    #[test]
    fn test_light_in_black_scene() {
        let mut list = HittableList::new();
        list.add(Sphere::new(
            Vec3::new(0.0, 0.0, -2.0),
            0.5,
            Arc::new(Material::diffuse_light(Color::splat(3.0))),
        ));
        let world: Hittable = list.into();
        let config = RenderConfig {
            background: Background::Solid { color: Color::ZERO },
            ..config()
        };
        let mut rng = StdRng::seed_from_u64(2);

        let toward = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        let away = Ray::new(Vec3::ZERO, Vec3::Z, 0.0);

        assert_eq!(ray_color(&toward, &world, 0, &config, &mut rng), Color::splat(3.0));
        assert_eq!(ray_color(&away, &world, 0, &config, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_render_pixel_is_deterministic() {
        let world: Hittable = HittableList::new().into();
        let camera = Camera::default();
        let config = config();

        let a = render_pixel(&camera, &world, 1, 0, &config, &mut StdRng::seed_from_u64(3));
        let b = render_pixel(&camera, &world, 1, 0, &config, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);

        // Top row looks up at the sky, bottom row down towards the horizon
        let top = render_pixel(&camera, &world, 2, 0, &config, &mut StdRng::seed_from_u64(4));
        let bottom = render_pixel(&camera, &world, 2, 1, &config, &mut StdRng::seed_from_u64(4));
        assert!(top.x < bottom.x);
    }

    #[test]
    fn test_background_from_json() {
        let solid: Background = serde_json::from_str(r#"{ "type": "solid", "color": [0, 0, 0] }"#).unwrap();
        assert_eq!(solid, Background::Solid { color: Color::ZERO });
    }
}
