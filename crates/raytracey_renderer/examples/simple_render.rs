//! Simple path tracer example.
//!
//! Renders the three-sphere scene row by row into an in-memory frame and
//! reports progress. Pass a JSON render config path to override the defaults.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use raytracey_core::{FrameBuffer, JobManager};
use raytracey_renderer::{three_spheres, RenderConfig, Renderer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => RenderConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => RenderConfig {
            samples_per_pixel: 16,
            ..RenderConfig::default()
        },
    };

    // Build the scene
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or(0));
    let scene = three_spheres(config.aspect_ratio(), &mut rng).context("building scene")?;
    log::info!("Scene built in {:?}", start.elapsed());

    let mut jobs = match config.threads {
        Some(threads) => JobManager::with_threads(threads),
        None => JobManager::new(),
    };
    jobs.init();

    let frame = Arc::new(FrameBuffer::new(config.width, config.height));
    let renderer = Renderer::new(Arc::new(scene), config);
    let height = renderer.config().height;

    log::info!(
        "Rendering {}x{} @ {} spp on {} workers...",
        renderer.config().width,
        height,
        renderer.config().samples_per_pixel,
        jobs.worker_count()
    );

    // Progressive: one row at a time, as a viewer would present it
    let start = Instant::now();
    let step = (height / 10).max(1);
    for y in 0..height {
        renderer.render_row(&jobs, &frame, y);
        if (y + 1) % step == 0 {
            log::info!("{:>3}% ({:.1}s)", (y + 1) * 100 / height, start.elapsed().as_secs_f32());
        }
    }
    log::info!("Rendered in {:?}", start.elapsed());

    jobs.release();

    let image = frame.to_image();
    let rgb: Vec<f64> = image
        .as_bytes()
        .chunks_exact(4)
        .flat_map(|px| px[..3].iter().map(|&c| f64::from(c)))
        .collect();
    log::info!("Mean RGB value: {:.1}", rgb.iter().sum::<f64>() / rgb.len().max(1) as f64);

    Ok(())
}
