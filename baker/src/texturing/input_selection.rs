use std::collections::{BTreeMap, BTreeSet};

use crate::texturing::misc::*;

/// Triangles of an atlas grouped by the cameras which saw any of their
/// corners. Cameras are ascending, triangles keep the atlas order.
pub type CameraTriangles = BTreeMap<CameraId, Vec<usize>>;

pub fn camera_triangles(
    atlas: &[usize],
    mesh: &Mesh,
    visibilities: &[Visibility],
) -> CameraTriangles {
    let mut result = CameraTriangles::new();
    for &triangle in atlas {
        let cameras: BTreeSet<CameraId> = mesh.faces[triangle]
            .iter()
            .flat_map(|&v| visibilities[v].iter().copied())
            .collect();
        for camera in cameras {
            result.entry(camera).or_default().push(triangle);
        }
    }
    result
}
