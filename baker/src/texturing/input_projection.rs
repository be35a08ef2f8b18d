use indexmap::IndexMap;

use crate::texturing::misc::*;

pub type Matrix3x4 = nalgebra::Matrix3x4<f64>;

/// Calibrated cameras which photographed the surface.
pub trait CameraModel: Sync {
    /// Projects `point` into the image of `camera`. Returns `None` for
    /// unknown cameras and for points behind the camera.
    fn project(&self, camera: CameraId, point: &Point3) -> Option<Point2>;

    fn is_pixel_in_image(&self, camera: CameraId, pixel: &Point2) -> bool;

    fn project_into_image(
        &self,
        camera: CameraId,
        point: &Point3,
    ) -> Option<Point2> {
        self.project(camera, point)
            .filter(|pixel| self.is_pixel_in_image(camera, pixel))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PinholeCamera {
    pub projection: Matrix3x4,
    pub width: u32,
    pub height: u32,
}

impl PinholeCamera {
    pub fn project(&self, point: &Point3) -> Option<Point2> {
        let h = self.projection * point.to_homogeneous();
        if h.z <= 0.0 {
            return None;
        }
        Some(Point2::new(h.x / h.z, h.y / h.z))
    }

    pub fn contains(&self, pixel: &Point2) -> bool {
        0.0 <= pixel.x
            && pixel.x < self.width as f64
            && 0.0 <= pixel.y
            && pixel.y < self.height as f64
    }
}

#[derive(Clone, Debug, Default)]
pub struct CameraSet {
    pub cameras: IndexMap<CameraId, PinholeCamera>,
}

impl CameraSet {
    pub fn new() -> CameraSet {
        CameraSet::default()
    }

    pub fn insert(&mut self, id: CameraId, camera: PinholeCamera) {
        self.cameras.insert(id, camera);
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

impl CameraModel for CameraSet {
    fn project(&self, camera: CameraId, point: &Point3) -> Option<Point2> {
        self.cameras.get(&camera)?.project(point)
    }

    fn is_pixel_in_image(&self, camera: CameraId, pixel: &Point2) -> bool {
        self.cameras
            .get(&camera)
            .map_or(false, |c| c.contains(pixel))
    }
}
