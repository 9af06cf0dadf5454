//! Sphere primitive, optionally moving at constant velocity.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use crate::{HitRecord, Material, Ray};
use raytracey_math::{Aabb, Interval, Vec3};

/// Time spans shorter than this are treated as a single instant.
const TIME_EPSILON: f32 = 1e-6;

/// A sphere primitive.
///
/// A negative radius keeps the same surface but flips the normal inward,
/// which is how hollow glass (a bubble inside a glass ball) is modelled.
pub struct Sphere {
    /// Center at time 0
    center: Vec3,
    /// Displacement per unit of time
    velocity: Vec3,
    radius: f32,
    material: Arc<Material>,
}

impl Sphere {
    /// Create a stationary sphere.
    pub fn new(center: Vec3, radius: f32, material: Arc<Material>) -> Self {
        Self::moving(center, Vec3::ZERO, radius, material)
    }

    /// Create a sphere whose center at time `t` is `center + velocity * t`.
    pub fn moving(center: Vec3, velocity: Vec3, radius: f32, material: Arc<Material>) -> Self {
        Self {
            center,
            velocity,
            radius,
            material,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Center of the sphere at the given time.
    #[inline]
    pub fn center_at(&self, time: f32) -> Vec3 {
        self.center + self.velocity * time
    }

    /// UV coordinates for a point on the unit sphere centered at origin.
    ///
    /// u wraps around the Y axis, v runs from the south pole (0) to the
    /// north pole (1).
    fn sphere_uv(p: Vec3) -> (f32, f32) {
        let phi = p.z.atan2(p.x);
        let theta = p.y.clamp(-1.0, 1.0).asin();

        let u = 1.0 - (phi + PI) / (2.0 * PI);
        let v = (theta + FRAC_PI_2) / PI;
        (u, v)
    }

    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        let a = ray.direction().length_squared();
        if a == 0.0 {
            return None;
        }

        let center = self.center_at(ray.time());
        let oc = ray.origin() - center;
        let half_b = oc.dot(ray.direction());
        let c = oc.length_squared() - self.radius * self.radius;

        // Tangent rays count as misses
        let discriminant = half_b * half_b - a * c;
        if discriminant <= 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (-half_b - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (-half_b + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let p = ray.at(root);
        let outward_normal = (p - center) / self.radius;
        Some(HitRecord::new(
            ray,
            root,
            p,
            outward_normal,
            Self::sphere_uv(outward_normal),
            &self.material,
        ))
    }

    /// Box covering the sphere wherever it is between `time0` and `time1`.
    pub fn bounding_box(&self, time0: f32, time1: f32) -> Aabb {
        let rvec = Vec3::splat(self.radius.abs());
        let at = |time: f32| {
            let center = self.center_at(time);
            Aabb::from_points(center - rvec, center + rvec)
        };

        let start = at(time0);
        if (time1 - time0).abs() < TIME_EPSILON {
            return start;
        }
        Aabb::surrounding(&start, &at(time1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    fn gray() -> Arc<Material> {
        Arc::new(Material::lambertian(Color::new(0.5, 0.5, 0.5)))
    }

    fn unit_sphere_at(center: Vec3, radius: f32) -> Sphere {
        Sphere::new(center, radius, gray())
    }

    const FORWARD: Interval = Interval {
        min: 0.001,
        max: f32::INFINITY,
    };

    #[test]
    fn test_sphere_hit_down_negative_z() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let rec = sphere.hit(&ray, FORWARD).unwrap();
        assert!((rec.t - 0.5).abs() < 1e-4);
        assert!((rec.normal - Vec3::Z).length() < 1e-4);
        assert!(rec.front_face);
    }

    #[test]
    fn test_sphere_returns_smaller_root() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let rec = sphere.hit(&ray, FORWARD).unwrap();
        assert!((rec.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_sphere_falls_back_to_larger_root() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        // Smaller root (4) excluded by the interval, larger (6) inside it
        let rec = sphere.hit(&ray, Interval::new(4.5, 100.0)).unwrap();
        assert!((rec.t - 6.0).abs() < 1e-4);
        assert!(!rec.front_face);

        // Both roots outside
        assert!(sphere.hit(&ray, Interval::new(6.5, 100.0)).is_none());
        assert!(sphere.hit(&ray, Interval::new(0.001, 3.9)).is_none());
    }

    #[test]
    fn test_sphere_miss_and_tangent() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0), 0.5);

        let away = Ray::new(Vec3::ZERO, Vec3::Y, 0.0);
        assert!(sphere.hit(&away, FORWARD).is_none());

        let grazing = Ray::new(Vec3::new(0.5, 0.0, 0.0), Vec3::NEG_Z, 0.0);
        assert!(sphere.hit(&grazing, FORWARD).is_none());

        let degenerate = Ray::new(Vec3::ZERO, Vec3::ZERO, 0.0);
        assert!(sphere.hit(&degenerate, FORWARD).is_none());
    }

    #[test]
    fn test_negative_radius_flips_normal() {
        let sphere = unit_sphere_at(Vec3::new(0.0, 0.0, -1.0), -0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let rec = sphere.hit(&ray, FORWARD).unwrap();
        assert!((rec.t - 0.5).abs() < 1e-4);
        assert!((rec.normal - Vec3::NEG_Z).length() < 1e-4);
        assert!(!rec.front_face);
    }

    #[test]
    fn test_moving_sphere_uses_ray_time() {
        let sphere = Sphere::moving(Vec3::new(0.0, 0.0, -2.0), Vec3::new(2.0, 0.0, 0.0), 0.5, gray());

        let at_start = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        assert!(sphere.hit(&at_start, FORWARD).is_some());

        // By t=1 the center moved to x=2
        let at_end = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 1.0);
        assert!(sphere.hit(&at_end, FORWARD).is_none());
        let offset = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z, 1.0);
        assert!(sphere.hit(&offset, FORWARD).is_some());
    }

    #[test]
    fn test_sphere_uv() {
        let (u, v) = Sphere::sphere_uv(Vec3::X);
        assert!((u - 0.5).abs() < 1e-6);
        assert!((v - 0.5).abs() < 1e-6);

        let (_, v) = Sphere::sphere_uv(Vec3::Y);
        assert!((v - 1.0).abs() < 1e-6);
        let (_, v) = Sphere::sphere_uv(Vec3::NEG_Y);
        assert!(v.abs() < 1e-6);

        let (u, _) = Sphere::sphere_uv(Vec3::Z);
        assert!((u - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_static() {
        let sphere = unit_sphere_at(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let bbox = sphere.bounding_box(0.0, 0.0);

        assert_eq!(bbox.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(bbox.max(), Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn test_bounding_box_covers_motion() {
        let sphere = Sphere::moving(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 1.0, gray());
        let bbox = sphere.bounding_box(0.0, 1.0);

        assert_eq!(bbox.min(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bbox.max(), Vec3::new(5.0, 1.0, 1.0));
    }

    #[test]
    fn test_zero_radius_bounding_box_is_legal() {
        let sphere = unit_sphere_at(Vec3::ONE, 0.0);
        let bbox = sphere.bounding_box(0.0, 0.0);

        assert!(bbox.min().cmple(bbox.max()).all());
    }
}
