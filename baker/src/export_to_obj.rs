use std::io;
use std::path::Path;

use base::defs::{IntoResult, Result};

use crate::mesh::Mesh;
use crate::texturing::output_assembly::{texture_file_name, ImageFileType};
use crate::texturing::TexturedMesh;

pub fn atlas_material_name(atlas: usize) -> String {
    format!("TextureAtlas_{}", atlas)
}

/// Writes the textured mesh into `writer` and its materials, one per atlas,
/// into `<basename>.mtl` inside `mtl_dir`.
pub fn export_to_obj<F: Fn(&Path, &[u8]) -> Result<()>>(
    textured: &TexturedMesh,
    writer: &mut dyn io::Write,
    write_file: F,
    mtl_dir: &Path,
    basename: &str,
    texture_type: ImageFileType,
) -> Result<()> {
    let write_err = || "failed to write OBJ-file".to_string();
    let mtl_name = format!("{}.mtl", basename);

    for line in ["#", "# Wavefront OBJ file", "# Created by baker", "#"] {
        writeln!(writer, "{}", line).into_result(write_err)?;
    }
    writeln!(writer, "mtllib {}\n", mtl_name).into_result(write_err)?;
    writeln!(writer, "g TexturedMesh").into_result(write_err)?;

    for v in &textured.mesh.vertices {
        writeln!(writer, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)
            .into_result(write_err)?;
    }

    for uv in &textured.uv_coords {
        writeln!(writer, "vt {:.6} {:.6}", uv.x, uv.y)
            .into_result(write_err)?;
    }

    let mut mtl_content =
        "#\n# Wavefront material file\n# Created by baker\n#\n".to_string();

    for (atlas, triangles) in textured.atlases.iter().enumerate() {
        let material = atlas_material_name(atlas);
        writeln!(writer, "usemtl {}", material).into_result(write_err)?;
        for &triangle in triangles {
            let f = textured.mesh.faces[triangle];
            let t = textured.uv_idxs[triangle];
            #[rustfmt::skip]
            writeln!(writer, "f {}/{} {}/{} {}/{}",
                f[0] + 1, t[0] + 1,
                f[1] + 1, t[1] + 1,
                f[2] + 1, t[2] + 1,
            ).into_result(write_err)?;
        }

        mtl_content += format!("\nnewmtl {}\n", material).as_str();
        mtl_content += "Ka  0.6 0.6 0.6\n";
        mtl_content += "Kd  0.6 0.6 0.6\n";
        mtl_content += "Ks  0.0 0.0 0.0\n";
        mtl_content += "d  1.0\n";
        mtl_content += "Ns  0.0\n";
        mtl_content += "illum 2\n";
        mtl_content += format!(
            "map_Kd {}\n",
            texture_file_name(atlas, texture_type)
        )
        .as_str();
    }

    write_file(&mtl_dir.join(&mtl_name), mtl_content.as_bytes())
}

/// Writes bare geometry, without texture coordinates and materials.
pub fn write_plain_obj(mesh: &Mesh, writer: &mut dyn io::Write) -> Result<()> {
    let write_err = || "failed to write OBJ-file".to_string();

    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z).into_result(write_err)?;
    }

    for f in &mesh.faces {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)
            .into_result(write_err)?;
    }

    Ok(())
}
