//! Intersectable scene objects and the record of a ray hit.

use crate::{Bvh, Material, Ray, Sphere};
use raytracey_math::{Aabb, Interval, Vec3};

/// Record of a ray-object intersection.
///
/// The material is borrowed from the scene, which owns every material for
/// the whole render.
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Unit surface normal, pointing out of the object
    pub normal: Vec3,
    /// UV texture coordinates
    pub u: f32,
    pub v: f32,
    /// Whether the ray arrived from the side the normal points to
    pub front_face: bool,
    pub material: &'a Material,
}

impl<'a> HitRecord<'a> {
    /// Build a record from the outward normal at `p`.
    pub fn new(
        ray: &Ray,
        t: f32,
        p: Vec3,
        outward_normal: Vec3,
        (u, v): (f32, f32),
        material: &'a Material,
    ) -> Self {
        Self {
            t,
            p,
            normal: outward_normal,
            u,
            v,
            front_face: ray.direction().dot(outward_normal) < 0.0,
            material,
        }
    }

    /// The normal flipped, if needed, to face against the incoming ray.
    pub fn facing_normal(&self) -> Vec3 {
        if self.front_face {
            self.normal
        } else {
            -self.normal
        }
    }
}

/// Anything a ray can be intersected with.
///
/// Closed set: a scene is a tree of these, and every query is a single
/// `match` rather than a virtual call.
pub enum Hittable {
    Sphere(Sphere),
    List(HittableList),
    Bvh(Bvh),
}

impl Hittable {
    /// Closest intersection with `t` strictly inside `ray_t`.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        match self {
            Hittable::Sphere(sphere) => sphere.hit(ray, ray_t),
            Hittable::List(list) => list.hit(ray, ray_t),
            Hittable::Bvh(bvh) => bvh.hit(ray, ray_t),
        }
    }

    /// Box enclosing the object over the time span `[time0, time1]`.
    ///
    /// `None` means the object cannot be bounded (or is empty) and so cannot
    /// go into a BVH.
    pub fn bounding_box(&self, time0: f32, time1: f32) -> Option<Aabb> {
        match self {
            Hittable::Sphere(sphere) => Some(sphere.bounding_box(time0, time1)),
            Hittable::List(list) => list.bounding_box(time0, time1),
            Hittable::Bvh(bvh) => bvh.bounding_box_over(time0, time1),
        }
    }
}

impl From<Sphere> for Hittable {
    fn from(sphere: Sphere) -> Self {
        Hittable::Sphere(sphere)
    }
}

impl From<HittableList> for Hittable {
    fn from(list: HittableList) -> Self {
        Hittable::List(list)
    }
}

impl From<Bvh> for Hittable {
    fn from(bvh: Bvh) -> Self {
        Hittable::Bvh(bvh)
    }
}

/// A flat list of hittable objects, scanned linearly.
#[derive(Default)]
pub struct HittableList {
    objects: Vec<Hittable>,
}

impl HittableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: impl Into<Hittable>) {
        self.objects.push(object.into());
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[Hittable] {
        &self.objects
    }

    /// Hand the objects over, e.g. to build a BVH from them.
    pub fn into_objects(self) -> Vec<Hittable> {
        self.objects
    }

    /// Closest hit over all members. A degenerate interval finds nothing.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        if ray_t.is_degenerate() {
            return None;
        }

        let mut closest = None;
        let mut closest_so_far = ray_t.max;

        for object in &self.objects {
            if let Some(rec) = object.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = rec.t;
                closest = Some(rec);
            }
        }

        closest
    }

    /// Union of every member's box; `None` if empty or any member is unbounded.
    pub fn bounding_box(&self, time0: f32, time1: f32) -> Option<Aabb> {
        let (first, rest) = self.objects.split_first()?;
        rest.iter().try_fold(first.bounding_box(time0, time1)?, |acc, object| {
            object
                .bounding_box(time0, time1)
                .map(|bbox| Aabb::surrounding(&acc, &bbox))
        })
    }
}

impl From<Vec<Hittable>> for HittableList {
    fn from(objects: Vec<Hittable>) -> Self {
        Self { objects }
    }
}

impl FromIterator<Hittable> for HittableList {
    fn from_iter<I: IntoIterator<Item = Hittable>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use std::sync::Arc;

    fn gray() -> Arc<Material> {
        Arc::new(Material::lambertian(Color::splat(0.5)))
    }

    fn sphere_at(z: f32) -> Hittable {
        Sphere::new(Vec3::new(0.0, 0.0, z), 0.5, gray()).into()
    }

    #[test]
    fn test_list_returns_nearest() {
        // Far sphere first so the narrowing has to replace an earlier hit
        let list: HittableList = vec![sphere_at(-5.0), sphere_at(-2.0), sphere_at(-8.0)].into();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        let rec = list.hit(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((rec.t - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_list_degenerate_interval_is_noop() {
        let list: HittableList = vec![sphere_at(-2.0)].into();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);

        assert!(list.hit(&ray, Interval::new(1.5, 1.5)).is_none());
        assert!(list.hit(&ray, Interval::new(3.0, 1.0)).is_none());
    }

    #[test]
    fn test_list_bounding_box() {
        let mut list = HittableList::new();
        assert!(list.bounding_box(0.0, 0.0).is_none());

        list.add(Sphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0, gray()));
        list.add(Sphere::new(Vec3::new(3.0, 1.0, 0.0), 0.5, gray()));
        let bbox = list.bounding_box(0.0, 0.0).unwrap();

        assert_eq!(bbox.min(), Vec3::new(-3.0, -1.0, -1.0));
        assert_eq!(bbox.max(), Vec3::new(3.5, 1.5, 1.0));
    }

    #[test]
    fn test_empty_member_makes_list_unbounded() {
        let mut list = HittableList::new();
        list.add(Sphere::new(Vec3::ZERO, 1.0, gray()));
        list.add(HittableList::new());

        assert!(list.bounding_box(0.0, 1.0).is_none());
    }

    #[test]
    fn test_front_face() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        let material = Material::lambertian(Color::ONE);

        let outside = HitRecord::new(&ray, 1.0, Vec3::NEG_Z, Vec3::Z, (0.0, 0.0), &material);
        assert!(outside.front_face);
        assert_eq!(outside.facing_normal(), Vec3::Z);

        let inside = HitRecord::new(&ray, 1.0, Vec3::NEG_Z, Vec3::NEG_Z, (0.0, 0.0), &material);
        assert!(!inside.front_face);
        assert_eq!(inside.facing_normal(), Vec3::Z);
    }
}
