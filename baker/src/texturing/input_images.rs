use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base::defs::{Error, ErrorKind::*, IntoResult, Result};
use image::Rgb32FImage;
use indexmap::IndexMap;
use log::debug;

use crate::texturing::misc::*;

/// Source photographs, one per camera.
pub trait ImageSource: Sync {
    fn image(&self, camera: CameraId) -> Result<Arc<Rgb32FImage>>;
}

#[derive(Clone, Debug)]
pub enum ImageOrigin {
    File(PathBuf),
    Memory(Arc<Rgb32FImage>),
}

/// Keeps at most `capacity` decoded images, evicting the least recently
/// used one. Evicted images are decoded again on the next request.
pub struct ImageCache {
    origins: IndexMap<CameraId, ImageOrigin>,
    capacity: usize,
    loaded: Mutex<IndexMap<CameraId, Arc<Rgb32FImage>>>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> ImageCache {
        ImageCache {
            origins: IndexMap::new(),
            capacity: capacity.max(1),
            loaded: Mutex::new(IndexMap::new()),
        }
    }

    pub fn insert(&mut self, camera: CameraId, origin: ImageOrigin) {
        self.origins.insert(camera, origin);
        self.lock().shift_remove(&camera);
    }

    pub fn num_loaded(&self) -> usize {
        self.lock().len()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, IndexMap<CameraId, Arc<Rgb32FImage>>> {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self, camera: CameraId) -> Result<Arc<Rgb32FImage>> {
        let origin = self.origins.get(&camera).ok_or_else(|| {
            let desc = format!("no image for camera {}", camera);
            Error::new(BadOperation, desc)
        })?;

        match origin {
            ImageOrigin::Memory(image) => Ok(image.clone()),
            ImageOrigin::File(path) => {
                debug!("loading image {:?} of camera {}", path, camera);
                let image = image::open(path).into_result_as(ImageError, || {
                    format!("failed to load image {:?}", path)
                })?;
                Ok(Arc::new(image.into_rgb32f()))
            }
        }
    }
}

impl ImageSource for ImageCache {
    fn image(&self, camera: CameraId) -> Result<Arc<Rgb32FImage>> {
        {
            let mut loaded = self.lock();
            if let Some(image) = loaded.shift_remove(&camera) {
                loaded.insert(camera, image.clone());
                return Ok(image);
            }
        }

        // Decoding happens outside of the lock.
        let image = self.load(camera)?;

        let mut loaded = self.lock();
        loaded.insert(camera, image.clone());
        while loaded.len() > self.capacity {
            loaded.shift_remove_index(0);
        }
        Ok(image)
    }
}

/// Bilinearly interpolates `image` at `pixel`, integer coordinates being
/// pixel corners. Samples outside of the image are clamped to its border.
pub fn sample_pixel(image: &Rgb32FImage, pixel: &Point2) -> Color {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Color::zeros();
    }
    let x = pixel.x.clamp(0.0, (w - 1) as f64);
    let y = pixel.y.clamp(0.0, (h - 1) as f64);
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (dx, dy) = (x - x0 as f64, y - y0 as f64);

    let get = |x, y| {
        let p = image.get_pixel(x, y);
        Color::new(p[0] as f64, p[1] as f64, p[2] as f64)
    };
    let top = get(x0, y0) * (1.0 - dx) + get(x1, y0) * dx;
    let bottom = get(x0, y1) * (1.0 - dx) + get(x1, y1) * dx;
    top * (1.0 - dy) + bottom * dy
}
