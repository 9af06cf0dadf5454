//! Frame renderer: splits a frame into scheduler jobs and feeds a pixel sink.
//!
//! Every pixel draws from its own generator, seeded from the frame seed and
//! the pixel index, so the output does not depend on how jobs are split or
//! which thread runs them.

use std::sync::Arc;
use std::time::Instant;

use raytracey_core::{JobManager, PixelSink};

use crate::integrator::render_pixel;
use crate::random::pixel_rng;
use crate::{Color, JobGranularity, RenderConfig, Scene};

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Gamma-correct a linear color and quantize it to 8 bits per channel.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let quantize = |c: f32| (255.99 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [quantize(color.x), quantize(color.y), quantize(color.z)]
}

/// Renders frames of one scene through a [`JobManager`].
///
/// Cheap to clone; jobs hold their own handles to the scene and settings.
#[derive(Clone)]
pub struct Renderer {
    scene: Arc<Scene>,
    config: Arc<RenderConfig>,
    seed: u64,
}

impl Renderer {
    pub fn new(scene: Arc<Scene>, config: RenderConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        log::debug!("Renderer seed: {}", seed);

        Self {
            scene,
            config: Arc::new(config),
            seed,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Render and deliver one row, blocking until it is done.
    ///
    /// Rows past the bottom of the image are ignored.
    pub fn render_row<S>(&self, jobs: &JobManager, sink: &Arc<S>, y: u32)
    where
        S: PixelSink + 'static,
    {
        if y >= self.config.height {
            log::warn!("Row {} outside {}-row frame", y, self.config.height);
            return;
        }

        self.queue_row(jobs, sink, y);
        jobs.wait();
    }

    /// Render and deliver a whole frame, blocking until it is done.
    pub fn render_frame<S>(&self, jobs: &JobManager, sink: &Arc<S>)
    where
        S: PixelSink + 'static,
    {
        let start = Instant::now();

        for y in 0..self.config.height {
            self.queue_row(jobs, sink, y);
        }
        jobs.wait();

        let elapsed = start.elapsed();
        let pixels = self.config.pixel_count();
        log::info!(
            "Rendered {}x{} @ {} spp in {:.2}s ({:.0} pixels/s)",
            self.config.width,
            self.config.height,
            self.config.samples_per_pixel,
            elapsed.as_secs_f64(),
            pixels as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
    }

    fn queue_row<S>(&self, jobs: &JobManager, sink: &Arc<S>, y: u32)
    where
        S: PixelSink + 'static,
    {
        match self.config.granularity {
            JobGranularity::Pixel => {
                for x in 0..self.config.width {
                    let renderer = self.clone();
                    let sink = Arc::clone(sink);
                    jobs.add_job(move || renderer.shade(sink.as_ref(), x, y));
                }
            }
            JobGranularity::Row => {
                let renderer = self.clone();
                let sink = Arc::clone(sink);
                jobs.add_job(move || {
                    for x in 0..renderer.config.width {
                        renderer.shade(sink.as_ref(), x, y);
                    }
                });
            }
        }
    }

    /// Render one pixel and hand it to the sink.
    fn shade(&self, sink: &dyn PixelSink, x: u32, y: u32) {
        let index = u64::from(y) * u64::from(self.config.width) + u64::from(x);
        let mut rng = pixel_rng(self.seed, index);

        let color = render_pixel(
            self.scene.camera(),
            self.scene.world(),
            x,
            y,
            &self.config,
            &mut rng,
        );
        sink.set_pixel(x, y, color_to_rgb8(color));
    }
}
