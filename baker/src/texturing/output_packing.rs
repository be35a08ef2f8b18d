use std::collections::HashMap;

use base::defs::{Error, ErrorKind::*, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::texturing::input_projection::CameraModel;
use crate::texturing::misc::*;
use crate::texturing::TexturedMesh;

/// Group of triangles placed as a whole into an atlas. Pixels of the
/// reference camera image are moved by `target_lu - source_lu` to get
/// atlas pixels.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Chart {
    pub triangles: Vec<usize>,
    #[serde(default)]
    pub ref_camera: Option<CameraId>,
    #[serde(default)]
    pub source_lu: [i64; 2],
    #[serde(default)]
    pub target_lu: [i64; 2],
}

impl Chart {
    pub fn offset(&self) -> Vector2 {
        Vector2::new(
            (self.target_lu[0] - self.source_lu[0]) as f64,
            (self.target_lu[1] - self.source_lu[1]) as f64,
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChartPacking {
    pub atlases: Vec<Vec<Chart>>,
}

/// Lays out mesh triangles into charts of square atlases.
pub trait ChartPacker {
    fn pack(
        &self,
        mesh: &Mesh,
        visibilities: &[Visibility],
        cameras: &dyn CameraModel,
        texture_side: u32,
        padding: u32,
    ) -> Result<ChartPacking>;
}

/// Packing computed beforehand, e.g. loaded from a file.
pub struct PrecomputedPacking(pub ChartPacking);

impl ChartPacker for PrecomputedPacking {
    fn pack(
        &self,
        mesh: &Mesh,
        _visibilities: &[Visibility],
        _cameras: &dyn CameraModel,
        _texture_side: u32,
        _padding: u32,
    ) -> Result<ChartPacking> {
        let num_packed: usize = self
            .0
            .atlases
            .iter()
            .flatten()
            .map(|c| c.triangles.len())
            .sum();
        if num_packed != mesh.faces.len() {
            warn!(
                "packing covers {} triangles of {}",
                num_packed,
                mesh.faces.len()
            );
        }
        Ok(self.0.clone())
    }
}

fn chart_uv(
    chart: &Chart,
    point: &Point3,
    cameras: &dyn CameraModel,
    texture_side: u32,
) -> Point2 {
    let camera = match chart.ref_camera {
        Some(camera) => camera,
        None => return Point2::origin(),
    };
    let pixel = match cameras.project_into_image(camera, point) {
        Some(pixel) => pixel,
        None => return Point2::origin(),
    };

    let mut uv = (pixel + chart.offset()) / texture_side as f64;
    uv.y = 1.0 - uv.y;
    if (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y) {
        uv
    } else {
        Point2::origin()
    }
}

/// Rebuilds the mesh in packing order. Vertices are shared across the
/// whole mesh while UV coordinates are only shared inside a chart.
pub fn remap_atlas_triangles(
    mesh: &Mesh,
    visibilities: &[Visibility],
    packing: &ChartPacking,
    cameras: &dyn CameraModel,
    texture_side: u32,
) -> Result<TexturedMesh> {
    let mut result = TexturedMesh {
        atlases: vec![vec![]; packing.atlases.len()],
        ..Default::default()
    };
    let mut vertex_cache: HashMap<usize, usize> = HashMap::new();

    for (atlas_id, charts) in packing.atlases.iter().enumerate() {
        for chart in charts {
            let mut uv_cache: HashMap<usize, usize> = HashMap::new();

            for &triangle in &chart.triangles {
                let face = mesh.faces.get(triangle).ok_or_else(|| {
                    let desc = format!(
                        "packing references unknown triangle {} ({} triangles)",
                        triangle,
                        mesh.faces.len()
                    );
                    Error::new(MalformedData, desc)
                })?;
                result.atlases[atlas_id].push(result.mesh.faces.len());

                let mut new_face = [0; 3];
                let mut uv_idxs = [0; 3];
                for k in 0..3 {
                    let src = face[k];
                    let point = mesh.vertices[src];

                    let dst = *vertex_cache.entry(src).or_insert_with(|| {
                        result.mesh.vertices.push(point);
                        result.visibilities.push(visibilities[src].clone());
                        result.mesh.vertices.len() - 1
                    });
                    new_face[k] = dst;

                    uv_idxs[k] = *uv_cache.entry(dst).or_insert_with(|| {
                        let uv = chart_uv(chart, &point, cameras, texture_side);
                        result.uv_coords.push(uv);
                        result.uv_coords.len() - 1
                    });
                }
                result.mesh.faces.push(new_face);
                result.uv_idxs.push(uv_idxs);
            }
        }
    }

    info!(
        "remapped {} triangles into {} atlases ({} -> {} vertices)",
        result.mesh.faces.len(),
        result.atlases.len(),
        mesh.vertices.len(),
        result.mesh.vertices.len()
    );
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    use base::assert_eq_f32;

    use crate::texturing::input_projection::{
        CameraSet, Matrix3x4, PinholeCamera,
    };

    // Camera looking down at the XY plane, one pixel per 1/8 unit.
    fn new_cameras() -> CameraSet {
        #[rustfmt::skip]
        let projection = Matrix3x4::new(
            8.0, 0.0, 0.0, 0.0,
            0.0, 8.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let mut cameras = CameraSet::new();
        cameras.insert(
            0,
            PinholeCamera {
                projection,
                width: 16,
                height: 16,
            },
        );
        cameras
    }

    // Two squares sharing vertices 1 and 4.
    fn new_mesh() -> (Mesh, Vec<Visibility>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.5, 0.0),
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(1.0, 0.5, 0.0),
        ];
        let faces = vec![[0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4]];
        let visibilities = (0..6).map(|i| vec![i]).collect();
        (Mesh { vertices, faces }, visibilities)
    }

    fn new_chart(triangles: Vec<usize>, ref_camera: Option<usize>) -> Chart {
        Chart {
            triangles,
            ref_camera,
            source_lu: [0, 0],
            target_lu: [0, 0],
        }
    }

    #[test]
    fn test_single_chart_keeps_vertices() {
        let (mesh, visibilities) = new_mesh();
        let packing = ChartPacking {
            atlases: vec![vec![new_chart(vec![0, 1, 2, 3], Some(0))]],
        };
        let textured = remap_atlas_triangles(
            &mesh,
            &visibilities,
            &packing,
            &new_cameras(),
            8,
        )
        .unwrap();

        assert_eq!(textured.mesh.vertices.len(), 6);
        assert_eq!(textured.visibilities.len(), 6);
        assert_eq!(textured.uv_coords.len(), 6);
        assert_eq!(
            textured.mesh.faces,
            vec![[0, 1, 2], [0, 2, 3], [1, 4, 5], [1, 5, 2]]
        );
        assert_eq!(textured.visibilities[2], vec![4]);
        assert_eq!(textured.atlases, vec![vec![0, 1, 2, 3]]);

        // Vertex (0.5, 0.5) projects to pixel (4, 4).
        let uv = textured.uv_coords[textured.uv_idxs[0][2]];
        assert_eq_f32!(uv.x, 0.5);
        assert_eq_f32!(uv.y, 0.5);
        let uv = textured.uv_coords[textured.uv_idxs[2][1]];
        assert_eq_f32!(uv.x, 1.0);
        assert_eq_f32!(uv.y, 1.0);
    }

    #[test]
    fn test_charts_split_uvs_not_vertices() {
        let (mesh, visibilities) = new_mesh();
        let mut right = new_chart(vec![2, 3], Some(0));
        right.source_lu = [4, 0];
        right.target_lu = [0, 4];
        let packing = ChartPacking {
            atlases: vec![
                vec![new_chart(vec![0, 1], Some(0))],
                vec![right, new_chart(vec![], None)],
            ],
        };
        let textured = remap_atlas_triangles(
            &mesh,
            &visibilities,
            &packing,
            &new_cameras(),
            8,
        )
        .unwrap();

        assert!(textured.mesh.vertices.len() <= mesh.vertices.len());
        assert_eq!(textured.mesh.vertices.len(), 6);
        assert_eq!(textured.visibilities.len(), 6);
        // Shared vertices get one UV per chart.
        assert_eq!(textured.uv_coords.len(), 8);
        assert_eq!(textured.atlases, vec![vec![0, 1], vec![2, 3]]);

        // Vertex (0.5, 0) is pixel (4, 0), moved to (0, 4) in the second
        // chart.
        let uv = textured.uv_coords[textured.uv_idxs[2][0]];
        assert_eq_f32!(uv.x, 0.0);
        assert_eq_f32!(uv.y, 0.5);
    }

    #[test]
    fn test_uvs_without_camera() {
        let (mesh, visibilities) = new_mesh();
        let mut shifted = new_chart(vec![2, 3], Some(0));
        shifted.target_lu = [8, 0];
        let packing = ChartPacking {
            atlases: vec![vec![new_chart(vec![0, 1], None), shifted]],
        };
        let textured = remap_atlas_triangles(
            &mesh,
            &visibilities,
            &packing,
            &new_cameras(),
            8,
        )
        .unwrap();

        // No camera at all, and UVs moved out of the unit square.
        for uv_idxs in &textured.uv_idxs[0..2] {
            for &i in uv_idxs {
                assert_eq!(textured.uv_coords[i], Point2::origin());
            }
        }
        let uv = textured.uv_coords[textured.uv_idxs[2][1]];
        assert_eq!(uv, Point2::origin());
    }

    #[test]
    fn test_unknown_triangle() {
        let (mesh, visibilities) = new_mesh();
        let packing = ChartPacking {
            atlases: vec![vec![new_chart(vec![0, 4], Some(0))]],
        };
        let err = remap_atlas_triangles(
            &mesh,
            &visibilities,
            &packing,
            &new_cameras(),
            8,
        )
        .unwrap_err();
        assert_eq!(err.kind, MalformedData);
    }

    #[test]
    fn test_parse_packing() {
        let json = r#"{"atlases": [[
            {"triangles": [1, 0], "ref_camera": 3,
             "source_lu": [1, 2], "target_lu": [5, 4]},
            {"triangles": [2]}
        ]]}"#;
        let packing: ChartPacking = serde_json::from_str(json).unwrap();
        let charts = &packing.atlases[0];
        assert_eq!(charts[0].ref_camera, Some(3));
        assert_eq!(charts[0].offset(), Vector2::new(4.0, 2.0));
        assert_eq!(charts[1].ref_camera, None);
        assert_eq!(charts[1].offset(), Vector2::zeros());
    }
}
