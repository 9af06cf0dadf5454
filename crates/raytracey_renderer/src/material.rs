//! Surface materials: how light scatters off, or is emitted by, a hit.

use std::sync::Arc;

use rand::RngCore;

use crate::random::{gen_f32, random_in_unit_sphere};
use crate::{Color, HitRecord, Ray, Texture, Vec3};

/// Outcome of a scatter event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterResult {
    /// Per-channel throughput multiplier
    pub attenuation: Color,
    pub scattered: Ray,
}

/// Material attached to a surface.
pub enum Material {
    Lambertian(Lambertian),
    Metal(Metal),
    Dielectric(Dielectric),
    DiffuseLight(DiffuseLight),
}

impl Material {
    /// Diffuse surface with a constant color.
    pub fn lambertian(albedo: Color) -> Self {
        Material::Lambertian(Lambertian::new(Arc::new(Texture::solid(albedo))))
    }

    /// Metal with a constant color and roughness in [0, 1].
    pub fn metal(albedo: Color, roughness: f32) -> Self {
        Material::Metal(Metal::new(Arc::new(Texture::solid(albedo)), roughness))
    }

    pub fn dielectric(ior: f32) -> Self {
        Material::Dielectric(Dielectric::new(ior))
    }

    /// Light source with a constant emission color.
    pub fn diffuse_light(emit: Color) -> Self {
        Material::DiffuseLight(DiffuseLight::new(Arc::new(Texture::solid(emit))))
    }

    /// Scatter an incoming ray.
    ///
    /// Returns `None` if the ray is absorbed.
    pub fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        match self {
            Material::Lambertian(m) => Some(m.scatter(ray_in, rec, rng)),
            Material::Metal(m) => m.scatter(ray_in, rec, rng),
            Material::Dielectric(m) => Some(m.scatter(ray_in, rec, rng)),
            Material::DiffuseLight(_) => None,
        }
    }

    /// Light emitted at the hit point; black for everything but lights.
    pub fn emitted(&self, u: f32, v: f32, p: Vec3) -> Color {
        match self {
            Material::DiffuseLight(light) => light.emit.value(u, v, p),
            _ => Color::ZERO,
        }
    }
}

/// Lambertian (diffuse) material.
pub struct Lambertian {
    albedo: Arc<Texture>,
}

impl Lambertian {
    pub fn new(albedo: Arc<Texture>) -> Self {
        Self { albedo }
    }

    fn scatter(&self, ray_in: &Ray, rec: &HitRecord<'_>, rng: &mut dyn RngCore) -> ScatterResult {
        let normal = rec.facing_normal();
        let mut direction = normal + random_in_unit_sphere(rng);

        // Catch degenerate scatter direction
        if direction.length_squared() < 1e-8 {
            direction = normal;
        }

        ScatterResult {
            attenuation: self.albedo.value(rec.u, rec.v, rec.p),
            scattered: Ray::new(rec.p, direction, ray_in.time()),
        }
    }
}

impl From<Lambertian> for Material {
    fn from(m: Lambertian) -> Self {
        Material::Lambertian(m)
    }
}

/// Metal (specular) material.
pub struct Metal {
    albedo: Arc<Texture>,
    roughness: f32,
}

impl Metal {
    /// - `roughness`: 0.0 = perfect mirror, 1.0 = very rough (clamped)
    pub fn new(albedo: Arc<Texture>, roughness: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    fn scatter(
        &self,
        ray_in: &Ray,
        rec: &HitRecord<'_>,
        rng: &mut dyn RngCore,
    ) -> Option<ScatterResult> {
        let normal = rec.facing_normal();
        let reflected = reflect(ray_in.direction(), normal);
        let direction = reflected + self.roughness * random_in_unit_sphere(rng);

        // Fuzz pushed the ray under the surface
        if direction.dot(normal) <= 0.0 {
            return None;
        }

        Some(ScatterResult {
            attenuation: self.albedo.value(rec.u, rec.v, rec.p),
            scattered: Ray::new(rec.p, direction, ray_in.time()),
        })
    }
}

impl From<Metal> for Material {
    fn from(m: Metal) -> Self {
        Material::Metal(m)
    }
}

/// Dielectric (glass) material.
pub struct Dielectric {
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    ior: f32,
}

impl Dielectric {
    pub fn new(ior: f32) -> Self {
        Self { ior }
    }

    pub fn ior(&self) -> f32 {
        self.ior
    }

    /// Surface normal facing the side the ray comes from, relative index of
    /// refraction, and the cosine Schlick's approximation is evaluated with.
    fn orient(&self, direction: Vec3, outward_normal: Vec3) -> (Vec3, f32, f32) {
        let d = direction.dot(outward_normal);
        if d > 0.0 {
            // Leaving the medium
            (-outward_normal, self.ior, self.ior * d)
        } else {
            (outward_normal, 1.0 / self.ior, -d)
        }
    }

    /// Chance that a ray along `direction` reflects rather than refracts at a
    /// surface with outward normal `outward_normal`. 1.0 under total internal
    /// reflection.
    pub fn reflect_probability(&self, direction: Vec3, outward_normal: Vec3) -> f32 {
        let direction = direction.normalize_or_zero();
        let (normal, ratio, cosine) = self.orient(direction, outward_normal);

        match refract(direction, normal, ratio) {
            Some(_) => schlick(cosine, self.ior).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    fn scatter(&self, ray_in: &Ray, rec: &HitRecord<'_>, rng: &mut dyn RngCore) -> ScatterResult {
        let direction = ray_in.direction();
        let (normal, ratio, cosine) = self.orient(direction, rec.normal);

        let scattered = match refract(direction, normal, ratio) {
            Some(refracted) if gen_f32(rng) >= schlick(cosine, self.ior) => refracted,
            _ => reflect(direction, rec.normal),
        };

        ScatterResult {
            attenuation: Color::ONE,
            scattered: Ray::new(rec.p, scattered, ray_in.time()),
        }
    }
}

impl From<Dielectric> for Material {
    fn from(m: Dielectric) -> Self {
        Material::Dielectric(m)
    }
}

/// Diffuse light emitter.
pub struct DiffuseLight {
    emit: Arc<Texture>,
}

impl DiffuseLight {
    pub fn new(emit: Arc<Texture>) -> Self {
        Self { emit }
    }
}

impl From<DiffuseLight> for Material {
    fn from(m: DiffuseLight) -> Self {
        Material::DiffuseLight(m)
    }
}

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract `v` through a surface with unit normal `n` facing against it.
///
/// `ratio` is n_incident / n_transmitted. Returns `None` on total internal
/// reflection.
pub fn refract(v: Vec3, n: Vec3, ratio: f32) -> Option<Vec3> {
    let uv = v.normalize_or_zero();
    let dt = uv.dot(n);
    let discriminant = 1.0 - ratio * ratio * (1.0 - dt * dt);
    if discriminant > 0.0 {
        Some(ratio * (uv - n * dt) - n * discriminant.sqrt())
    } else {
        None
    }
}

/// Schlick's approximation of Fresnel reflectance.
pub fn schlick(cosine: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
