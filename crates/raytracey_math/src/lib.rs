//! Raytracey math - value types shared by the renderer.
//!
//! Vector algebra comes straight from `glam`; this crate adds the ray,
//! parametric interval and bounding box types used for intersection.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Linear RGB color, one channel per component.
pub type Color = Vec3;
