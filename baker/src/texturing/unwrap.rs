use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use log::{debug, info};
use uuid::Uuid;

use base::defs::{Error, ErrorKind::*, IntoResult, Result};
use base::util::fs;

use crate::export_to_obj::write_plain_obj;
use crate::import_obj::{read_obj_file, ObjMesh};
use crate::texturing::misc::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnwrapMethod {
    /// Charts projected from their reference cameras.
    Basic,
    /// Angle based flattening.
    Abf,
    /// Least squares conformal maps.
    Lscm,
}

impl Default for UnwrapMethod {
    fn default() -> Self {
        UnwrapMethod::Basic
    }
}

impl FromStr for UnwrapMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Basic" => Ok(UnwrapMethod::Basic),
            "ABF" => Ok(UnwrapMethod::Abf),
            "LSCM" => Ok(UnwrapMethod::Lscm),
            _ => {
                let desc = format!("unknown unwrap method '{}'", s);
                Err(Error::new(BadConfiguration, desc))
            }
        }
    }
}

impl fmt::Display for UnwrapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnwrapMethod::Basic => "Basic",
            UnwrapMethod::Abf => "ABF",
            UnwrapMethod::Lscm => "LSCM",
        };
        write!(f, "{}", name)
    }
}

/// Computes globally optimized texture coordinates for a mesh.
pub trait Parameterizer {
    fn parameterize(
        &self,
        mesh: &Mesh,
        method: UnwrapMethod,
    ) -> Result<ObjMesh>;
}

pub struct NoParameterizer;

impl Parameterizer for NoParameterizer {
    fn parameterize(
        &self,
        _mesh: &Mesh,
        method: UnwrapMethod,
    ) -> Result<ObjMesh> {
        let desc = format!("no parameterizer available for {} unwrap", method);
        Err(Error::new(UnsupportedFeature, desc))
    }
}

/// Runs `<program> <method> <input.obj> <output.obj>`, the output being
/// expected to carry texture coordinates. Both files live in `work_dir`.
pub struct ExternalParameterizer {
    pub program: PathBuf,
    pub work_dir: PathBuf,
}

impl ExternalParameterizer {
    pub fn new(program: PathBuf) -> ExternalParameterizer {
        ExternalParameterizer {
            program,
            work_dir: std::env::temp_dir(),
        }
    }

    fn run(
        &self,
        method: UnwrapMethod,
        input: &Path,
        output: &Path,
    ) -> Result<ObjMesh> {
        info!("running {:?} for {} unwrap", self.program, method);
        let status = Command::new(&self.program)
            .arg(method.to_string())
            .arg(input)
            .arg(output)
            .status()
            .into_result(|| format!("failed to run {:?}", self.program))?;
        if !status.success() {
            let desc = format!("{:?} exited with {}", self.program, status);
            return Err(Error::new(IoError, desc));
        }

        let obj = read_obj_file(output)?;
        if !obj.has_uvs() {
            let desc = "parameterized mesh lacks texture coordinates";
            return Err(Error::new(MalformedData, desc.to_string()));
        }
        Ok(obj)
    }
}

impl Parameterizer for ExternalParameterizer {
    fn parameterize(
        &self,
        mesh: &Mesh,
        method: UnwrapMethod,
    ) -> Result<ObjMesh> {
        let id = Uuid::new_v4();
        let input = self.work_dir.join(format!("{}-in.obj", id));
        let output = self.work_dir.join(format!("{}-out.obj", id));

        let mut data = Vec::new();
        write_plain_obj(mesh, &mut data)?;
        fs::write_file(&input, &data)?;

        let res = self.run(method, &input, &output);

        for path in [&input, &output] {
            if path.exists() {
                if let Err(err) = fs::delete_file(path) {
                    debug!("{}", err);
                }
            }
        }
        res
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unwrap_method_names() {
        use UnwrapMethod::*;
        for method in [Basic, Abf, Lscm] {
            let name = method.to_string();
            assert_eq!(name.parse::<UnwrapMethod>().unwrap(), method);
        }
        assert_eq!(UnwrapMethod::Abf.to_string(), "ABF");
        assert_eq!("LSCM".parse::<UnwrapMethod>().unwrap(), UnwrapMethod::Lscm);

        for name in ["spectral", "lscm", "basic", "Abf"] {
            let err = name.parse::<UnwrapMethod>().unwrap_err();
            assert_eq!(err.kind, BadConfiguration);
            let desc = format!("unknown unwrap method '{}'", name);
            assert_eq!(err.description, desc);
        }
    }

    #[test]
    fn test_no_parameterizer() {
        let err = NoParameterizer
            .parameterize(&Mesh::default(), UnwrapMethod::Abf)
            .unwrap_err();
        assert_eq!(err.kind, UnsupportedFeature);
    }

    #[test]
    fn test_missing_external_program() {
        let parameterizer =
            ExternalParameterizer::new(PathBuf::from("/nonexistent/unwrap"));
        let err = parameterizer
            .parameterize(&Mesh::default(), UnwrapMethod::Lscm)
            .unwrap_err();
        assert_eq!(err.kind, IoError);
    }

    // Adds a single texture coordinate to every face corner.
    #[cfg(unix)]
    const UNWRAP_SCRIPT: &str = r#"#!/bin/sh
[ "$1" = "LSCM" ] || exit 2
{
    grep '^v ' "$2"
    echo 'vt 0.5 0.5'
    grep '^f ' "$2" | sed 's/\([0-9][0-9]*\)/\1\/1/g'
} > "$3"
"#;

    #[cfg(unix)]
    #[test]
    fn test_external_program() {
        use std::os::unix::fs::PermissionsExt;

        use crate::mesh::Point3;

        let dir = std::env::temp_dir().join(Uuid::new_v4().to_string());
        fs::create_dir(&dir).unwrap();
        let program = dir.join("unwrap.sh");
        fs::write_file(&program, UNWRAP_SCRIPT.as_bytes()).unwrap();
        let permissions = std::fs::Permissions::from_mode(0o755);
        std::fs::set_permissions(&program, permissions).unwrap();

        let mesh = Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2]],
        };
        let parameterizer = ExternalParameterizer {
            program: program.clone(),
            work_dir: dir.clone(),
        };

        let obj = parameterizer
            .parameterize(&mesh, UnwrapMethod::Lscm)
            .unwrap();
        assert_eq!(obj.mesh, mesh);
        assert_eq!(obj.uv_coords, vec![Point2::new(0.5, 0.5)]);
        assert_eq!(obj.uv_idxs, vec![[0, 0, 0]]);

        let err = parameterizer
            .parameterize(&mesh, UnwrapMethod::Abf)
            .unwrap_err();
        assert_eq!(err.kind, IoError);

        // Only the program is left behind.
        let entries: Vec<PathBuf> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![program]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
