//! Sampling helpers.
//!
//! Nothing here owns a generator: every function draws from the RNG handle
//! passed in, so each job can carry its own independently seeded stream.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use raytracey_math::Vec3;

/// Odd 64-bit constant used to spread pixel indices across the seed space.
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Uniform f32 in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// Uniform point strictly inside the unit sphere (rejection sampled).
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = 2.0 * Vec3::new(gen_f32(rng), gen_f32(rng), gen_f32(rng)) - Vec3::ONE;
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniform point strictly inside the unit disk in the XY plane.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(2.0 * gen_f32(rng) - 1.0, 2.0 * gen_f32(rng) - 1.0, 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Generator for one unit of render work (a pixel or a row).
///
/// Streams depend only on the frame seed and the unit's index, so a frame
/// renders identically however the jobs land on threads.
pub fn pixel_rng(seed: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ index.wrapping_add(1).wrapping_mul(SEED_SPREAD))
}
