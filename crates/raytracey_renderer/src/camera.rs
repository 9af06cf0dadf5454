//! Camera for ray generation.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::random::{gen_f32, random_in_unit_disk};
use crate::{Ray, Vec3};

/// Exposure window; rays get times uniformly spread across it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shutter {
    pub open: f32,
    pub close: f32,
}

/// Everything needed to place a [`Camera`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Width over height
    pub aspect_ratio: f32,
    /// Lens diameter; 0 is a pinhole
    pub aperture: f32,
    /// Distance from camera to plane of perfect focus
    pub focus_dist: f32,
    pub shutter: Option<Shutter>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 2.0,
            aperture: 0.0,
            focus_dist: 1.0,
            shutter: None,
        }
    }
}

impl CameraSettings {
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_dist = focus_dist;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_shutter(mut self, open: f32, close: f32) -> Self {
        self.shutter = Some(Shutter { open, close });
        self
    }

    /// Focus on the look-at point.
    pub fn focused_on_target(mut self) -> Self {
        self.focus_dist = (self.look_from - self.look_at).length();
        self
    }
}

/// Thin-lens camera.
///
/// Immutable once built; every call to [`Camera::get_ray`] draws its
/// randomness from the caller's generator, so one camera serves all threads.
#[derive(Debug, Clone)]
pub struct Camera {
    origin: Vec3,
    lower_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
    shutter: Option<Shutter>,
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        let theta = settings.vfov.to_radians();
        let half_height = (theta / 2.0).tan();
        let half_width = settings.aspect_ratio * half_height;
        let focus = settings.focus_dist;

        // Orthonormal basis
        let w = (settings.look_from - settings.look_at).normalize();
        let u = settings.vup.cross(w).normalize();
        let v = w.cross(u);

        let origin = settings.look_from;
        Self {
            origin,
            lower_left: origin - half_width * focus * u - half_height * focus * v - focus * w,
            horizontal: 2.0 * half_width * focus * u,
            vertical: 2.0 * half_height * focus * v,
            u,
            v,
            w,
            lens_radius: settings.aperture / 2.0,
            shutter: settings.shutter,
        }
    }

    /// Ray through normalized image coordinates `(s, t)`, where `(0, 0)` is
    /// the lower-left corner of the view.
    pub fn get_ray(&self, s: f32, t: f32, rng: &mut dyn RngCore) -> Ray {
        let offset = if self.lens_radius > 0.0 {
            let rd = self.lens_radius * random_in_unit_disk(rng);
            self.u * rd.x + self.v * rd.y
        } else {
            Vec3::ZERO
        };

        let time = match self.shutter {
            Some(Shutter { open, close }) => open + gen_f32(rng) * (close - open),
            None => 0.0,
        };

        let origin = self.origin + offset;
        let target = self.lower_left + s * self.horizontal + t * self.vertical;
        Ray::new(origin, target - origin, time)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Camera basis: right, up, backward.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.u, self.v, self.w)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraSettings::default())
    }
}
