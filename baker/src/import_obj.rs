use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use indexmap::IndexSet;

use base::defs::{Error, ErrorKind::*, IntoResult, Result};
use base::util::fs;

use crate::mesh::{Mesh, Point2, Point3};

const MAX_NUM_FACE_VERTICES: usize = 10;

/// Triangle mesh read from a Wavefront .obj file. Texture coordinates are
/// either given for every face or for none of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjMesh {
    pub mesh: Mesh,
    pub uv_coords: Vec<Point2>,
    pub uv_idxs: Vec<[usize; 3]>,
    pub face_materials: Vec<usize>,
    pub materials: Vec<String>,
}

impl ObjMesh {
    pub fn has_uvs(&self) -> bool {
        !self.uv_idxs.is_empty()
    }

    /// Groups faces by material, a single group if there are no materials.
    pub fn material_groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![vec![]; self.materials.len().max(1)];
        for (face, &material) in self.face_materials.iter().enumerate() {
            groups[material].push(face);
        }
        groups
    }

    pub fn invert_orientations(&mut self) {
        self.mesh.invert_orientations();
        for uv_idxs in self.uv_idxs.iter_mut() {
            uv_idxs.swap(1, 2);
        }
    }
}

pub fn read_obj_file<P: AsRef<Path>>(path: P) -> Result<ObjMesh> {
    import_obj(fs::open_file(path)?)
}

pub fn import_obj<R: Read>(obj_reader: R) -> Result<ObjMesh> {
    let mut state = ImportState::default();

    for line_res in BufReader::new(obj_reader).lines() {
        let line = line_res.into_result(|| {
            format!("failed to read OBJ-file at line {}", state.line + 1)
        })?;
        state.line += 1;

        let parts: Vec<&str> = line.split_whitespace().collect();
        if !parts.is_empty() {
            match parts[0] {
                "f" => import_f(&mut state, &parts)?,
                "usemtl" => import_usemtl(&mut state, &parts)?,
                "v" => import_v(&mut state, &parts)?,
                "vt" => import_vt(&mut state, &parts)?,
                _ => (),
            }
        }
    }

    let mut obj = state.obj;
    obj.materials = state.materials.into_iter().collect();
    if state.textured != Some(true) {
        obj.uv_coords.clear();
    }
    Ok(obj)
}

#[derive(Default)]
struct ImportState {
    line: usize,
    obj: ObjMesh,
    materials: IndexSet<String>,
    material: usize,
    textured: Option<bool>,
}

fn import_f(state: &mut ImportState, parts: &[&str]) -> Result<()> {
    let num_vertices_err_res = |kind, prop| {
        let msg = "number of vertices in f-statement at line";
        Err(Error::new(kind, format!("{} {} {}", prop, msg, state.line)))
    };
    if parts.len() < 4 {
        return num_vertices_err_res(MalformedData, "bad");
    } else if parts.len() > MAX_NUM_FACE_VERTICES + 1 {
        return num_vertices_err_res(UnsupportedFeature, "unsupported");
    }

    let mut face_vertices = [(0, None); MAX_NUM_FACE_VERTICES];
    for (i, part) in parts[1..].iter().enumerate() {
        let mut iter = part.split('/');
        let vertex = parse_f_component(state.line, &mut iter, i + 1)?;
        let texture = match iter.next() {
            None | Some("") => None,
            Some(s) => Some(parse_index(state.line, s, i + 1)?),
        };
        face_vertices[i] = (vertex, texture);
    }

    let len = parts.len() - 1;
    let textured = face_vertices[0].1.is_some();
    if face_vertices[..len].iter().any(|(_, t)| t.is_some() != textured)
        || *state.textured.get_or_insert(textured) != textured
    {
        let desc = format!(
            "inconsistent texture coordinates in f-statement at line {}",
            state.line
        );
        return Err(Error::new(MalformedData, desc));
    }

    for &(v, t) in &face_vertices[..len] {
        check_reference(state, "vertex", v, state.obj.mesh.vertices.len())?;
        if let Some(t) = t {
            let num = state.obj.uv_coords.len();
            check_reference(state, "texture coordinate", t, num)?;
        }
    }

    for i in 0..len - 2 {
        let corners = [i, i + 1, len - 1].map(|k| face_vertices[k]);
        state.obj.mesh.faces.push(corners.map(|(v, _)| v - 1));
        if textured {
            let uv_idxs = corners.map(|(_, t)| t.unwrap_or(1) - 1);
            state.obj.uv_idxs.push(uv_idxs);
        }
        state.obj.face_materials.push(state.material);
    }

    Ok(())
}

fn check_reference(
    state: &ImportState,
    what: &str,
    index: usize,
    len: usize,
) -> Result<()> {
    if index > len {
        let desc = format!(
            "reference to unknown {} {} in f-statement at line {}",
            what, index, state.line
        );
        return Err(Error::new(InconsistentState, desc));
    }
    Ok(())
}

fn parse_f_component(
    line: usize,
    iter: &mut std::str::Split<char>,
    vnum: usize,
) -> Result<usize> {
    let component: &str = iter.next().unwrap_or_default();
    parse_index(line, component, vnum)
}

fn parse_index(line: usize, component: &str, vnum: usize) -> Result<usize> {
    let num = component.parse::<usize>().unwrap_or_default();
    if num != 0 {
        Ok(num)
    } else {
        let desc = format!(
            "malformed vertex {} in f-statement at line {}",
            vnum, line
        );
        Err(Error::new(MalformedData, desc))
    }
}

fn import_usemtl(state: &mut ImportState, parts: &[&str]) -> Result<()> {
    if parts.len() != 2 {
        let desc = format!("malformed usemtl-statement at line {}", state.line);
        return Err(Error::new(MalformedData, desc));
    }

    state.material = state.materials.insert_full(parts[1].to_string()).0;
    Ok(())
}

fn import_v(state: &mut ImportState, parts: &[&str]) -> Result<()> {
    if parts.len() < 4 || parts.len() > 5 {
        return Err(Error::new(
            MalformedData,
            format!("malformed v-statement at line {}", state.line),
        ));
    }

    let x = parse_coord("x-coordinate of v-statement", state.line, parts[1])?;
    let y = parse_coord("y-coordinate of v-statement", state.line, parts[2])?;
    let z = parse_coord("z-coordinate of v-statement", state.line, parts[3])?;

    state.obj.mesh.vertices.push(Point3::new(x, y, z));

    Ok(())
}

fn import_vt(state: &mut ImportState, parts: &[&str]) -> Result<()> {
    if parts.len() < 3 || parts.len() > 4 {
        return Err(Error::new(
            MalformedData,
            format!("malformed vt-statement at line {}", state.line),
        ));
    }

    let x = parse_coord("x-coordinate of vt-statement", state.line, parts[1])?;
    let y = parse_coord("y-coordinate of vt-statement", state.line, parts[2])?;

    state.obj.uv_coords.push(Point2::new(x, y));

    Ok(())
}

fn parse_coord(what: &str, line: usize, str: &str) -> Result<f64> {
    match str.parse::<f64>() {
        Ok(val) => Ok(val),
        Err(_) => Err(Error::new(
            MalformedData,
            format!("failed to parse {} at line {}", what, line),
        )),
    }
}
