//! Pixel sinks: where finished pixels go.
//!
//! The renderer hands each pixel to a [`PixelSink`] exactly once per frame,
//! already gamma-corrected and quantized. Jobs write disjoint pixels, so a
//! sink only needs interior mutability per cell, not a lock.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::RgbaImage;

/// Destination for rendered 8-bit RGB pixels. Row 0 is the top of the image.
pub trait PixelSink: Send + Sync {
    fn set_pixel(&self, x: u32, y: u32, rgb: [u8; 3]);
}

/// In-memory frame with one atomic cell per pixel.
///
/// Writes use relaxed ordering; readers are expected to synchronize through
/// the job barrier before reading the frame back.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    cells: Vec<AtomicU32>,
}

impl FrameBuffer {
    /// Create a black frame.
    pub fn new(width: u32, height: u32) -> Self {
        let cells = (0..width as usize * height as usize)
            .map(|_| AtomicU32::new(0))
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read back a pixel; out-of-range coordinates read as black.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.index(x, y)
            .map(|i| unpack(self.cells[i].load(Ordering::Relaxed)))
            .unwrap_or([0, 0, 0])
    }

    /// Reset every pixel to black.
    pub fn clear(&self) {
        for cell in &self.cells {
            cell.store(0, Ordering::Relaxed);
        }
    }

    /// Copy the frame into an opaque RGBA bitmap.
    pub fn to_image(&self) -> RgbaImage {
        let pixels = self
            .cells
            .iter()
            .map(|cell| {
                let [r, g, b] = unpack(cell.load(Ordering::Relaxed));
                [r, g, b, 255]
            })
            .collect();
        RgbaImage::from_parts(self.width, self.height, pixels)
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }
}

impl PixelSink for FrameBuffer {
    fn set_pixel(&self, x: u32, y: u32, rgb: [u8; 3]) {
        match self.index(x, y) {
            Some(i) => self.cells[i].store(pack(rgb), Ordering::Relaxed),
            None => log::warn!(
                "Pixel ({}, {}) outside {}x{} frame",
                x,
                y,
                self.width,
                self.height
            ),
        }
    }
}

#[inline]
fn pack([r, g, b]: [u8; 3]) -> u32 {
    u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)
}

#[inline]
fn unpack(packed: u32) -> [u8; 3] {
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get_pixel() {
        let frame = FrameBuffer::new(4, 3);
        frame.set_pixel(2, 1, [10, 200, 255]);

        assert_eq!(frame.get_pixel(2, 1), [10, 200, 255]);
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let frame = FrameBuffer::new(2, 2);
        frame.set_pixel(5, 0, [1, 2, 3]);

        assert_eq!(frame.get_pixel(5, 0), [0, 0, 0]);
    }

    #[test]
    fn test_disjoint_rows_from_threads() {
        let frame = Arc::new(FrameBuffer::new(8, 8));
        let handles: Vec<_> = (0..8u32)
            .map(|y| {
                let frame = Arc::clone(&frame);
                thread::spawn(move || {
                    for x in 0..8 {
                        frame.set_pixel(x, y, [x as u8, y as u8, 7]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frame.get_pixel(3, 5), [3, 5, 7]);
        assert_eq!(frame.get_pixel(7, 7), [7, 7, 7]);
    }

    #[test]
    fn test_to_image_is_opaque() {
        let frame = FrameBuffer::new(2, 1);
        frame.set_pixel(1, 0, [9, 8, 7]);
        let image = frame.to_image();

        assert_eq!(image.width(), 2);
        assert_eq!(image.pixel(1, 0), [9, 8, 7, 255]);
        assert_eq!(image.pixel(0, 0), [0, 0, 0, 255]);

        frame.clear();
        assert_eq!(frame.get_pixel(1, 0), [0, 0, 0]);
    }
}
