//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A binary tree over the scene's primitives. The [`Bvh`] owns the primitive
//! list; tree nodes refer to primitives by index, so a node is either an
//! owned subtree or a leaf slot and never needs to be inspected at runtime
//! to find out which.

use rand::{Rng, RngCore};

use crate::{HitRecord, Hittable, Ray, SceneError};
use raytracey_math::{Aabb, Interval};

/// One side of a BVH node.
pub enum BvhChild {
    /// Index into the primitive list owned by the [`Bvh`].
    Leaf(usize),
    /// Owned subtree.
    Node(Box<BvhNode>),
}

/// Internal node: a box enclosing both children.
pub struct BvhNode {
    pub left: BvhChild,
    pub right: BvhChild,
    pub bbox: Aabb,
}

/// A BVH together with the primitives it indexes.
///
/// Built once, then only read, so it can be shared between render threads.
pub struct Bvh {
    objects: Vec<Hittable>,
    root: BvhNode,
    time0: f32,
    time1: f32,
}

/// Primitive index paired with its box over the build time span.
type Entry = (usize, Aabb);

impl Bvh {
    /// Build a BVH over `objects`, bounding moving primitives over
    /// `[time0, time1]`.
    ///
    /// Split axes are drawn from `rng`. Fails if the list is empty or any
    /// primitive has no bounding box.
    pub fn new(
        objects: Vec<Hittable>,
        time0: f32,
        time1: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Self, SceneError> {
        if objects.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        let mut entries = objects
            .iter()
            .enumerate()
            .map(|(index, object)| {
                object
                    .bounding_box(time0, time1)
                    .map(|bbox| (index, bbox))
                    .ok_or(SceneError::Unbounded { index })
            })
            .collect::<Result<Vec<Entry>, _>>()?;

        let root = Self::build(&mut entries, rng);
        let bvh = Self {
            objects,
            root,
            time0,
            time1,
        };

        log::debug!(
            "Built BVH over {} primitives (depth {})",
            bvh.objects.len(),
            bvh.depth()
        );
        Ok(bvh)
    }

    /// Recursive construction: sort along a random axis, split in half.
    fn build(entries: &mut [Entry], rng: &mut dyn RngCore) -> BvhNode {
        let axis = rng.gen_range(0..3);
        entries.sort_by(|(_, a), (_, b)| {
            a.axis_interval(axis)
                .min
                .total_cmp(&b.axis_interval(axis).min)
        });

        match *entries {
            [(i, bbox)] => BvhNode {
                left: BvhChild::Leaf(i),
                right: BvhChild::Leaf(i),
                bbox,
            },
            [(a, box_a), (b, box_b)] => BvhNode {
                left: BvhChild::Leaf(a),
                right: BvhChild::Leaf(b),
                bbox: Aabb::surrounding(&box_a, &box_b),
            },
            _ => {
                let mid = entries.len() / 2;
                let (left_entries, right_entries) = entries.split_at_mut(mid);
                let left = Self::build(left_entries, rng);
                let right = Self::build(right_entries, rng);

                BvhNode {
                    bbox: Aabb::surrounding(&left.bbox, &right.bbox),
                    left: BvhChild::Node(Box::new(left)),
                    right: BvhChild::Node(Box::new(right)),
                }
            }
        }
    }

    /// Closest hit in the hierarchy.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord<'_>> {
        self.root.hit(&self.objects, ray, ray_t)
    }

    /// Box around everything in the hierarchy over the build time span.
    pub fn bounding_box(&self) -> Aabb {
        self.root.bbox
    }

    /// Box around everything in the hierarchy over `[time0, time1]`.
    ///
    /// Spans inside the build span reuse the root box; wider ones are
    /// recomputed from the primitives.
    pub fn bounding_box_over(&self, time0: f32, time1: f32) -> Option<Aabb> {
        if time0 >= self.time0 && time1 <= self.time1 {
            return Some(self.root.bbox);
        }

        let (first, rest) = self.objects.split_first()?;
        rest.iter().try_fold(first.bounding_box(time0, time1)?, |acc, object| {
            object
                .bounding_box(time0, time1)
                .map(|bbox| Aabb::surrounding(&acc, &bbox))
        })
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn objects(&self) -> &[Hittable] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always false: construction rejects empty lists.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Box of a child over the build time span.
    pub fn child_box(&self, child: &BvhChild) -> Option<Aabb> {
        match child {
            BvhChild::Leaf(index) => self
                .objects
                .get(*index)?
                .bounding_box(self.time0, self.time1),
            BvhChild::Node(node) => Some(node.bbox),
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl BvhNode {
    fn hit<'a>(&self, objects: &'a [Hittable], ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        if !self.bbox.hit(ray, ray_t) {
            return None;
        }

        let left = self.left.hit(objects, ray, ray_t);

        // Only check right up to the closest hit so far
        let right_max = left.as_ref().map_or(ray_t.max, |rec| rec.t);
        let right = self.right.hit(objects, ray, ray_t.with_max(right_max));

        right.or(left)
    }

    fn depth(&self) -> usize {
        1 + self.left.depth().max(self.right.depth())
    }
}

impl BvhChild {
    fn hit<'a>(&self, objects: &'a [Hittable], ray: &Ray, ray_t: Interval) -> Option<HitRecord<'a>> {
        match self {
            BvhChild::Leaf(index) => objects.get(*index)?.hit(ray, ray_t),
            BvhChild::Node(node) => node.hit(objects, ray, ray_t),
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhChild::Leaf(_) => 0,
            BvhChild::Node(node) => node.depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, HittableList, Material, Sphere, Vec3};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn random_spheres(count: usize, seed: u64) -> Vec<Hittable> {
        let material = Arc::new(Material::lambertian(Color::splat(0.5)));
        let mut rng = StdRng::seed_from_u64(seed);

        (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-30.0..-5.0),
                );
                let radius = rng.gen_range(0.1..0.8);
                Sphere::new(center, radius, Arc::clone(&material)).into()
            })
            .collect()
    }

    fn test_rays(count: usize) -> Vec<Ray> {
        let mut rng = StdRng::seed_from_u64(99);
        (0..count)
            .map(|_| {
                let dir = Vec3::new(rng.gen_range(-0.6..0.6), rng.gen_range(-0.6..0.6), -1.0);
                Ray::new(Vec3::ZERO, dir, 0.0)
            })
            .collect()
    }

    fn check_unions(bvh: &Bvh, node: &BvhNode) {
        let left = bvh.child_box(&node.left).unwrap();
        let right = bvh.child_box(&node.right).unwrap();
        assert_eq!(node.bbox, Aabb::surrounding(&left, &right));

        for child in [&node.left, &node.right] {
            if let BvhChild::Node(inner) = child {
                check_unions(bvh, inner);
            }
        }
    }

    const FORWARD: Interval = Interval {
        min: 0.001,
        max: f32::INFINITY,
    };

    #[test]
    fn test_node_box_is_union_of_children() {
        let mut rng = StdRng::seed_from_u64(1);
        let bvh = Bvh::new(random_spheres(200, 5), 0.0, 1.0, &mut rng).unwrap();

        check_unions(&bvh, bvh.root());
    }

    #[test]
    fn test_bvh_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(2);
        let list: HittableList = random_spheres(150, 6).into();
        let bvh = Bvh::new(random_spheres(150, 6), 0.0, 0.0, &mut rng).unwrap();

        for ray in test_rays(500) {
            let expected = list.hit(&ray, FORWARD).map(|rec| rec.t);
            let actual = bvh.hit(&ray, FORWARD).map(|rec| rec.t);
            assert_eq!(expected, actual);
        }
    }

    #[test]
    fn test_permutation_and_seed_invariance() {
        let mut objects = random_spheres(120, 7);
        let bvh_a = Bvh::new(random_spheres(120, 7), 0.0, 0.0, &mut StdRng::seed_from_u64(10)).unwrap();

        objects.shuffle(&mut StdRng::seed_from_u64(11));
        let bvh_b = Bvh::new(objects, 0.0, 0.0, &mut StdRng::seed_from_u64(12)).unwrap();

        let mut hits = 0;
        for ray in test_rays(500) {
            let a = bvh_a.hit(&ray, FORWARD);
            let b = bvh_b.hit(&ray, FORWARD);
            assert_eq!(a.is_some(), b.is_some());

            if let (Some(a), Some(b)) = (a, b) {
                hits += 1;
                assert_eq!(a.t, b.t);
                assert_eq!(a.p, b.p);
                assert_eq!(a.normal, b.normal);
            }
        }
        assert!(hits > 0, "ray set should hit something");
    }

    #[test]
    fn test_depth_is_logarithmic() {
        let mut rng = StdRng::seed_from_u64(3);
        let bvh = Bvh::new(random_spheres(1000, 8), 0.0, 0.0, &mut rng).unwrap();

        assert_eq!(bvh.len(), 1000);
        assert!(bvh.depth() <= 11, "depth {}", bvh.depth());
    }

    #[test]
    fn test_single_primitive_leaf_twice() {
        let mut rng = StdRng::seed_from_u64(4);
        let bvh = Bvh::new(random_spheres(1, 9), 0.0, 0.0, &mut rng).unwrap();

        assert!(matches!(
            bvh.root(),
            BvhNode {
                left: BvhChild::Leaf(0),
                right: BvhChild::Leaf(0),
                ..
            }
        ));
        assert_eq!(bvh.depth(), 1);
    }

    #[test]
    fn test_box_miss_skips_children() {
        let mut rng = StdRng::seed_from_u64(5);
        let bvh = Bvh::new(random_spheres(50, 10), 0.0, 0.0, &mut rng).unwrap();

        let away = Ray::new(Vec3::ZERO, Vec3::Z, 0.0);
        assert!(!bvh.bounding_box().hit(&away, FORWARD));
        assert!(bvh.hit(&away, FORWARD).is_none());
    }

    #[test]
    fn test_bounds_widen_with_time_span() {
        let material = Arc::new(Material::lambertian(Color::ONE));
        let sphere = Sphere::moving(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 1.0, material);
        let mut rng = StdRng::seed_from_u64(7);
        let bvh = Bvh::new(vec![sphere.into()], 0.0, 0.0, &mut rng).unwrap();

        assert_eq!(bvh.bounding_box_over(0.0, 0.0), Some(bvh.bounding_box()));

        let nested: Hittable = bvh.into();
        let wide = nested.bounding_box(0.0, 1.0).unwrap();
        assert!(wide.max().x >= 5.0, "box should cover the sphere at t = 1, got {:?}", wide.max());
        assert!(wide.min().x <= -1.0);
    }

    #[test]
    fn test_construction_errors() {
        let mut rng = StdRng::seed_from_u64(6);
        assert!(matches!(
            Bvh::new(Vec::new(), 0.0, 0.0, &mut rng),
            Err(SceneError::EmptyScene)
        ));

        let mut objects = random_spheres(3, 11);
        objects.push(HittableList::new().into());
        assert!(matches!(
            Bvh::new(objects, 0.0, 0.0, &mut rng),
            Err(SceneError::Unbounded { index: 3 })
        ));
    }
}
