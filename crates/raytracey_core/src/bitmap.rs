//! RGBA8 bitmaps and the sources that load them.
//!
//! Image textures sample an [`RgbaImage`]. Decoding happens behind the
//! [`ImageSource`] trait so the renderer never touches file formats itself;
//! [`FileImageSource`] is the default implementation on top of the `image`
//! crate, and [`ImageCache`] shares loaded bitmaps between textures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while loading or constructing a bitmap.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to load image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

pub type ImageResult<T> = Result<T, ImageError>;

/// A non-empty RGBA8 bitmap, row-major, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl RgbaImage {
    /// Wrap a raw RGBA8 byte buffer, checking that it matches the dimensions.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> ImageResult<Self> {
        let expected = expected_len(width, height)? * 4;
        if bytes.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }

        let pixels = bytemuck::cast_slice::<u8, [u8; 4]>(&bytes).to_vec();
        Ok(Self::from_parts(width, height, pixels))
    }

    /// Build a bitmap from per-pixel RGBA values.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> ImageResult<Self> {
        let expected = expected_len(width, height)?;
        if pixels.len() != expected {
            return Err(ImageError::BufferSize {
                width,
                height,
                expected: expected * 4,
                actual: pixels.len() * 4,
            });
        }
        Ok(Self::from_parts(width, height, pixels))
    }

    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at integer coordinates, clamped to the image edges.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1)) as usize;
        let y = y.min(self.height.saturating_sub(1)) as usize;
        self.pixels
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or([0, 0, 0, 255])
    }

    /// The whole buffer as tightly packed RGBA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

fn expected_len(width: u32, height: u32) -> ImageResult<usize> {
    let len = width as usize * height as usize;
    if len == 0 {
        return Err(ImageError::Empty { width, height });
    }
    Ok(len)
}

/// Anything that can produce RGBA8 bitmaps from a path.
pub trait ImageSource: Send + Sync {
    fn load_image(&self, path: &Path) -> ImageResult<RgbaImage>;
}

/// Loads bitmaps from disk through the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl FileImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageSource for FileImageSource {
    fn load_image(&self, path: &Path) -> ImageResult<RgbaImage> {
        let full_path = self.resolve_path(path);

        let decoded = ::image::open(&full_path).map_err(|source| ImageError::Decode {
            path: full_path.clone(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        RgbaImage::from_raw(width, height, rgba.into_raw())
    }
}

/// Cache of loaded bitmaps keyed by the path they were requested with.
pub struct ImageCache<S: ImageSource> {
    source: S,
    images: HashMap<PathBuf, Arc<RgbaImage>>,
}

impl<S: ImageSource> ImageCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            images: HashMap::new(),
        }
    }

    /// Load a bitmap, reusing the cached copy when there is one.
    pub fn load(&mut self, path: impl AsRef<Path>) -> ImageResult<Arc<RgbaImage>> {
        let path = path.as_ref();
        if let Some(image) = self.images.get(path) {
            return Ok(Arc::clone(image));
        }

        let image = Arc::new(self.source.load_image(path)?);
        log::debug!(
            "Loaded image: {} ({}x{}, {:.1} KB)",
            path.display(),
            image.width(),
            image.height(),
            image.as_bytes().len() as f32 / 1024.0
        );

        self.images.insert(path.to_path_buf(), Arc::clone(&image));
        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}
