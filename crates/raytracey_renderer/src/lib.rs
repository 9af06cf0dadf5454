//! Raytracey renderer - CPU path tracing of implicit surfaces.
//!
//! A Monte Carlo path tracer over spheres (static or moving), accelerated by
//! a random-axis BVH and parallelized per pixel or per row through the
//! [`JobManager`](raytracey_core::JobManager).
//!
//! Scene assembly is left to the caller: build a `Vec<Hittable>`, wrap it in
//! a [`Scene`] together with a [`Camera`], and hand it to a [`Renderer`].

mod random;
mod hittable;
mod sphere;
mod bvh;
mod texture;
mod material;
mod camera;
mod integrator;
mod config;
mod scene;
mod renderer;

pub use hittable::{HitRecord, Hittable, HittableList};
pub use sphere::Sphere;
pub use bvh::{Bvh, BvhChild, BvhNode};
pub use texture::{ImageTexture, NoiseKind, NoiseTexture, Texture};
pub use material::{
    refract, schlick, Dielectric, DiffuseLight, Lambertian, Material, Metal, ScatterResult,
};
pub use camera::{Camera, CameraSettings, Shutter};
pub use integrator::{ray_color, render_pixel, Background, HIT_EPSILON};
pub use config::{ConfigError, JobGranularity, RenderConfig};
pub use scene::{three_spheres, Scene, SceneError};
pub use renderer::{color_to_rgb8, linear_to_gamma, Renderer};
pub use random::pixel_rng;

/// Re-export vector and geometry types from raytracey_math
pub use raytracey_math::{Aabb, Color, Interval, Ray, Vec3};
