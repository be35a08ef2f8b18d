use base::defs::{Error, ErrorKind::*, Result};

pub type Point2 = nalgebra::Point2<f64>;
pub type Point3 = nalgebra::Point3<f64>;
pub type CameraId = usize;

/// Cameras which observed a single mesh vertex.
pub type Visibility = Vec<CameraId>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3>,
    pub faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn validate(&self) -> Result<()> {
        for (i, face) in self.faces.iter().enumerate() {
            if face.iter().any(|&v| v >= self.vertices.len()) {
                let desc = format!(
                    "face {} references unknown vertex ({} vertices)",
                    i,
                    self.vertices.len()
                );
                return Err(Error::new(MalformedData, desc));
            }
        }
        Ok(())
    }

    pub fn invert_orientations(&mut self) {
        for face in self.faces.iter_mut() {
            face.swap(1, 2);
        }
    }
}

pub fn validate_visibilities(
    mesh: &Mesh,
    visibilities: &[Visibility],
) -> Result<()> {
    if visibilities.len() != mesh.vertices.len() {
        let desc = format!(
            "mesh has {} vertices but visibilities cover {}",
            mesh.vertices.len(),
            visibilities.len()
        );
        return Err(Error::new(InconsistentState, desc));
    }
    Ok(())
}
