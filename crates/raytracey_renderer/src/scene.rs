//! Scene assembly: primitives plus a camera, ready to render.

use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;

use crate::{Bvh, Camera, CameraSettings, Color, Hittable, Material, Sphere, Vec3};

/// Errors from building a scene's acceleration structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Scene has no primitives")]
    EmptyScene,

    #[error("Primitive {index} has no bounding box")]
    Unbounded { index: usize },
}

/// Everything a frame needs besides its settings. Immutable once built and
/// shared by every render job.
pub struct Scene {
    world: Hittable,
    camera: Camera,
}

impl Scene {
    /// Build a BVH over `objects` covering the exposure `[time0, time1]`.
    pub fn new(
        objects: Vec<Hittable>,
        camera: Camera,
        time0: f32,
        time1: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Self, SceneError> {
        let bvh = Bvh::new(objects, time0, time1, rng)?;
        log::info!("Scene ready: {} primitives", bvh.len());

        Ok(Self {
            world: bvh.into(),
            camera,
        })
    }

    /// Wrap an already assembled world without building a BVH over it.
    pub fn from_world(world: Hittable, camera: Camera) -> Self {
        Self { world, camera }
    }

    pub fn world(&self) -> &Hittable {
        &self.world
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}

/// Three spheres on a large ground sphere: diffuse red in the middle, rough
/// gold metal on the right, and a hollow glass ball on the left.
///
/// Viewed from (3, 3, 2) with a 45 degree lens focused on the middle sphere.
pub fn three_spheres(aspect_ratio: f32, rng: &mut dyn RngCore) -> Result<Scene, SceneError> {
    let glass = Arc::new(Material::dielectric(1.5));
    let objects: Vec<Hittable> = vec![
        Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::lambertian(Color::new(0.8, 0.3, 0.3))),
        )
        .into(),
        Sphere::new(
            Vec3::new(0.0, -100.5, -1.0),
            100.0,
            Arc::new(Material::lambertian(Color::new(0.8, 0.8, 0.3))),
        )
        .into(),
        Sphere::new(
            Vec3::new(1.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::metal(Color::new(0.8, 0.6, 0.2), 0.3)),
        )
        .into(),
        Sphere::new(Vec3::new(-1.0, 0.0, -1.0), 0.5, Arc::clone(&glass)).into(),
        // Negative radius: inner wall of the glass shell
        Sphere::new(Vec3::new(-1.0, 0.0, -1.0), -0.45, glass).into(),
    ];

    let settings = CameraSettings::default()
        .with_position(Vec3::new(3.0, 3.0, 2.0), Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
        .with_lens(45.0, 0.2, 1.0)
        .with_aspect_ratio(aspect_ratio)
        .focused_on_target();

    Scene::new(objects, Camera::new(&settings), 0.0, 0.0, rng)
}
