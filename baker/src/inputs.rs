use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use base::defs::{ErrorKind::*, IntoResult, Result};
use base::util::fs;

use crate::mesh::{CameraId, Visibility};
use crate::texturing::input_images::{ImageCache, ImageOrigin};
use crate::texturing::input_projection::{
    CameraSet, Matrix3x4, PinholeCamera,
};
use crate::texturing::output_packing::ChartPacking;

/// Calibrated camera as stored in a cameras JSON-file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CameraDesc {
    pub id: CameraId,
    pub width: u32,
    pub height: u32,
    /// Row-major 3x4 projection matrix mapping world points to pixels.
    pub projection: [[f64; 4]; 3],
    /// Image path, relative ones are resolved against the JSON-file folder.
    pub image: PathBuf,
}

impl CameraDesc {
    pub fn camera(&self) -> PinholeCamera {
        let rows: Vec<f64> =
            self.projection.iter().flatten().cloned().collect();
        PinholeCamera {
            projection: Matrix3x4::from_row_slice(&rows),
            width: self.width,
            height: self.height,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data = fs::read_file(path)?;
    serde_json::from_slice(&data).into_result_as(MalformedData, || {
        format!("malformed {} {:?}", what, path)
    })
}

pub fn parse_cameras(
    descs: &[CameraDesc],
    image_dir: &Path,
    cache_capacity: usize,
) -> (CameraSet, ImageCache) {
    let mut cameras = CameraSet::new();
    let mut images = ImageCache::new(cache_capacity);
    for desc in descs {
        cameras.insert(desc.id, desc.camera());
        let path = image_dir.join(&desc.image);
        images.insert(desc.id, ImageOrigin::File(path));
    }
    (cameras, images)
}

pub fn read_cameras<P: AsRef<Path>>(
    path: P,
    cache_capacity: usize,
) -> Result<(CameraSet, ImageCache)> {
    let path = path.as_ref();
    let descs: Vec<CameraDesc> = read_json(path, "cameras file")?;
    info!("read {} cameras from {:?}", descs.len(), path);
    let image_dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parse_cameras(&descs, image_dir, cache_capacity))
}

/// Reads per vertex lists of cameras.
pub fn read_visibilities<P: AsRef<Path>>(path: P) -> Result<Vec<Visibility>> {
    read_json(path.as_ref(), "visibilities file")
}

pub fn read_packing<P: AsRef<Path>>(path: P) -> Result<ChartPacking> {
    let path = path.as_ref();
    let packing: ChartPacking = read_json(path, "packing file")?;
    info!(
        "read packing of {} atlases from {:?}",
        packing.atlases.len(),
        path
    );
    Ok(packing)
}
