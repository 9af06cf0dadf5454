//! Raytracey Core - the plumbing around the path tracer.
//!
//! This crate provides:
//!
//! - **Job scheduling**: [`JobManager`], a fixed worker pool fed by a shared
//!   queue with a pending-job barrier
//! - **Pixel sinks**: the [`PixelSink`] contract the renderer writes into, and
//!   a lock-free [`FrameBuffer`] implementation
//! - **Image sources**: [`RgbaImage`] bitmaps loaded through [`ImageSource`]
//!
//! # Example
//!
//! ```ignore
//! use raytracey_core::JobManager;
//!
//! let mut jobs = JobManager::new();
//! jobs.init();
//! for row in 0..height {
//!     jobs.add_job(move || render_row(row));
//! }
//! jobs.wait();
//! jobs.release();
//! ```

pub mod frame;
pub mod bitmap;
pub mod jobs;

// Re-export commonly used types
pub use frame::{FrameBuffer, PixelSink};
pub use bitmap::{FileImageSource, ImageCache, ImageError, ImageResult, ImageSource, RgbaImage};
pub use jobs::{JobManager, SchedulerState};
