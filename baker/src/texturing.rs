pub mod input_images;
pub mod input_projection;
pub mod input_selection;

pub mod output_assembly;
pub mod output_baking;
pub mod output_packing;

pub mod misc;
pub mod unwrap;

use std::io::{BufWriter, Write};
use std::path::Path;

use image::Rgb32FImage;
use kiddo::distance::squared_euclidean;
use kiddo::KdTree;
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use structopt::StructOpt;

use base::defs::{Error, ErrorKind::*, IntoResult, Result};
use base::util::fs;

use crate::export_to_obj::export_to_obj;
use crate::import_obj::ObjMesh;
use crate::mesh::validate_visibilities;

use input_images::ImageSource;
use input_projection::CameraModel;
use input_selection::camera_triangles;
use misc::*;
use output_assembly::{
    assemble, downscale, fill_holes, texture_file_name, write_texture,
    ImageFileType,
};
use output_baking::{
    extrapolate_gutter, TextureAccumulator, MAX_TEXTURE_SIDE,
};
use output_packing::{remap_atlas_triangles, ChartPacker};
use unwrap::{Parameterizer, UnwrapMethod};

fn parse_positive(s: &str) -> Result<u32> {
    match s.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => {
            let desc = format!("expected positive integer, got '{}'", s);
            Err(Error::new(BadConfiguration, desc))
        }
    }
}

#[derive(Clone, Debug, PartialEq, StructOpt)]
pub struct TexturingParams {
    #[structopt(
        help = "Side of atlas textures in pixels",
        long,
        default_value = "8192",
        parse(try_from_str = parse_positive)
    )]
    pub texture_side: u32,

    #[structopt(
        help = "Width of gutters grown around painted areas",
        long,
        default_value = "15"
    )]
    pub padding: u32,

    #[structopt(
        help = "Factor textures are reduced by before writing",
        long,
        default_value = "2",
        parse(try_from_str = parse_positive)
    )]
    pub downscale: u32,

    #[structopt(help = "Fill unpainted areas instead of padding", long)]
    pub fill_holes: bool,

    #[structopt(
        help = "Texture file type (png, jpg, tiff or exr)",
        long,
        default_value = "png"
    )]
    pub texture_type: ImageFileType,

    #[structopt(
        help = "Number of atlases baked at once",
        long,
        default_value = "1",
        parse(try_from_str = parse_positive)
    )]
    pub jobs: u32,
}

impl TexturingParams {
    pub fn validate(&self) -> Result<()> {
        if self.texture_side == 0 || self.downscale == 0 || self.jobs == 0 {
            let desc = format!(
                "texture side ({}), downscale ({}) and jobs ({}) must be \
                 positive",
                self.texture_side, self.downscale, self.jobs
            );
            return Err(Error::new(BadConfiguration, desc));
        }
        if self.texture_side > MAX_TEXTURE_SIDE {
            let desc = format!(
                "texture side {} exceeds {}",
                self.texture_side, MAX_TEXTURE_SIDE
            );
            return Err(Error::new(BadConfiguration, desc));
        }
        Ok(())
    }
}

impl Default for TexturingParams {
    fn default() -> Self {
        TexturingParams {
            texture_side: 8192,
            padding: 15,
            downscale: 2,
            fill_holes: false,
            texture_type: ImageFileType::Png,
            jobs: 1,
        }
    }
}

/// Mesh with per vertex visibilities, per triangle texture coordinates and
/// triangles grouped by atlases.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TexturedMesh {
    pub mesh: Mesh,
    pub visibilities: Vec<Visibility>,
    pub uv_coords: Vec<Point2>,
    pub uv_idxs: Vec<[usize; 3]>,
    pub atlases: Vec<Vec<usize>>,
}

impl TexturedMesh {
    pub fn has_uvs(&self) -> bool {
        self.uv_idxs.len() == self.mesh.faces.len()
    }

    fn from_obj(mut obj: ObjMesh, flip_normals: bool) -> Result<TexturedMesh> {
        obj.mesh.validate()?;
        let num_uvs = obj.uv_coords.len();
        if obj.uv_idxs.iter().flatten().any(|&i| i >= num_uvs) {
            let desc = format!(
                "texture coordinate index out of range ({} coordinates)",
                num_uvs
            );
            return Err(Error::new(MalformedData, desc));
        }

        if flip_normals {
            obj.invert_orientations();
        }

        let atlases = obj.material_groups();
        let visibilities = vec![vec![]; obj.mesh.vertices.len()];
        Ok(TexturedMesh {
            mesh: obj.mesh,
            visibilities,
            uv_coords: obj.uv_coords,
            uv_idxs: obj.uv_idxs,
            atlases,
        })
    }
}

/// Assigns every vertex the visibility of the nearest reference vertex.
fn remap_visibilities(
    reference: &TexturedMesh,
    vertices: &[Point3],
) -> Result<Vec<Visibility>> {
    if reference.mesh.vertices.is_empty() {
        return Ok(vec![vec![]; vertices.len()]);
    }

    let kdtree_err = |e: kiddo::ErrorKind| {
        let desc = format!("failed to index reference vertices: {:?}", e);
        Error::new(MalformedData, desc)
    };

    let mut kdtree = KdTree::new();
    for (i, v) in reference.mesh.vertices.iter().enumerate() {
        kdtree.add(v.coords.as_ref(), i).map_err(kdtree_err)?;
    }

    vertices
        .par_iter()
        .map(|v| {
            let (_, &nearest) = kdtree
                .nearest_one(v.coords.as_ref(), &squared_euclidean)
                .map_err(kdtree_err)?;
            Ok(reference.visibilities[nearest].clone())
        })
        .collect()
}

/// Texturing session. Operations replacing the mesh build a new snapshot
/// and keep the previous one if they fail.
pub struct Texturing {
    pub params: TexturingParams,
    textured: Option<TexturedMesh>,
}

impl Texturing {
    pub fn new(params: TexturingParams) -> Result<Texturing> {
        params.validate()?;
        Ok(Texturing {
            params,
            textured: None,
        })
    }

    pub fn textured(&self) -> Option<&TexturedMesh> {
        self.textured.as_ref()
    }

    fn current(&self) -> Result<&TexturedMesh> {
        self.textured.as_ref().ok_or_else(|| {
            Error::new(BadOperation, "no mesh is loaded".to_string())
        })
    }

    fn current_with_uvs(&self) -> Result<&TexturedMesh> {
        let textured = self.current()?;
        if !textured.has_uvs() {
            let desc = "mesh has no texture coordinates".to_string();
            return Err(Error::new(BadOperation, desc));
        }
        Ok(textured)
    }

    /// Installs a reconstructed mesh along with its vertex visibilities.
    pub fn load_mesh(
        &mut self,
        mesh: Mesh,
        visibilities: Vec<Visibility>,
    ) -> Result<()> {
        mesh.validate()?;
        validate_visibilities(&mesh, &visibilities)?;
        info!(
            "loaded mesh with {} vertices and {} triangles",
            mesh.vertices.len(),
            mesh.faces.len()
        );
        self.textured = Some(TexturedMesh {
            mesh,
            visibilities,
            ..Default::default()
        });
        Ok(())
    }

    /// Installs a mesh read from an OBJ-file, one atlas per material.
    pub fn load_from_obj(
        &mut self,
        obj: ObjMesh,
        flip_normals: bool,
    ) -> Result<()> {
        let textured = TexturedMesh::from_obj(obj, flip_normals)?;
        info!(
            "loaded OBJ mesh with {} triangles in {} atlases",
            textured.mesh.faces.len(),
            textured.atlases.len()
        );
        self.textured = Some(textured);
        Ok(())
    }

    /// Sets visibilities of the current mesh vertices.
    pub fn attach_visibilities(
        &mut self,
        visibilities: Vec<Visibility>,
    ) -> Result<()> {
        let current = self.current()?;
        validate_visibilities(&current.mesh, &visibilities)?;
        self.textured = Some(TexturedMesh {
            visibilities,
            ..current.clone()
        });
        Ok(())
    }

    /// Substitutes another mesh for the current one, keeping visibilities.
    pub fn replace_mesh(
        &mut self,
        obj: ObjMesh,
        flip_normals: bool,
    ) -> Result<()> {
        let reference = self.current()?;
        let mut textured = TexturedMesh::from_obj(obj, flip_normals)?;
        textured.visibilities =
            remap_visibilities(reference, &textured.mesh.vertices)?;
        info!(
            "replaced mesh of {} vertices with one of {}",
            reference.mesh.vertices.len(),
            textured.mesh.vertices.len()
        );
        self.textured = Some(textured);
        Ok(())
    }

    /// Generates texture coordinates from a chart packing.
    pub fn generate_uvs(
        &mut self,
        cameras: &dyn CameraModel,
        packer: &dyn ChartPacker,
    ) -> Result<()> {
        let current = self.current()?;
        info!(
            "generating UVs (texture side: {}, padding: {})",
            self.params.texture_side, self.params.padding
        );
        let packing = packer.pack(
            &current.mesh,
            &current.visibilities,
            cameras,
            self.params.texture_side,
            self.params.padding,
        )?;
        let textured = remap_atlas_triangles(
            &current.mesh,
            &current.visibilities,
            &packing,
            cameras,
            self.params.texture_side,
        )?;
        self.textured = Some(textured);
        Ok(())
    }

    pub fn unwrap(
        &mut self,
        method: UnwrapMethod,
        cameras: &dyn CameraModel,
        packer: &dyn ChartPacker,
        parameterizer: &dyn Parameterizer,
    ) -> Result<()> {
        if method == UnwrapMethod::Basic {
            return self.generate_uvs(cameras, packer);
        }

        let current = self.current()?;
        info!("starting {} mesh atlasing", method);
        let obj = parameterizer.parameterize(&current.mesh, method)?;
        self.replace_mesh(obj, false)
    }

    /// Paints an atlas with colors from all cameras seeing its triangles.
    pub fn accumulate_atlas(
        &self,
        atlas: usize,
        cameras: &dyn CameraModel,
        images: &dyn ImageSource,
    ) -> Result<TextureAccumulator> {
        let textured = self.current_with_uvs()?;
        let triangles = textured.atlases.get(atlas).ok_or_else(|| {
            let desc = format!("invalid atlas ID {}", atlas);
            Error::new(BadOperation, desc)
        })?;

        info!(
            "generating texture for atlas {}/{} ({} triangles)",
            atlas + 1,
            textured.atlases.len(),
            triangles.len()
        );
        if triangles.is_empty() {
            warn!("atlas {} has no triangles", atlas);
        }

        let index =
            camera_triangles(triangles, &textured.mesh, &textured.visibilities);
        let mut accu = TextureAccumulator::new(self.params.texture_side);
        for (camera, triangles) in index {
            debug!("camera {} ({} triangles)", camera, triangles.len());
            let image = images.image(camera)?;
            accu.accumulate_camera(
                textured, &triangles, cameras, camera, &image,
            );
        }
        Ok(accu)
    }

    /// Produces the final image of an atlas.
    pub fn bake_atlas(
        &self,
        atlas: usize,
        cameras: &dyn CameraModel,
        images: &dyn ImageSource,
    ) -> Result<Rgb32FImage> {
        let mut accu = self.accumulate_atlas(atlas, cameras, images)?;
        let params = &self.params;

        if !params.fill_holes && params.padding > 0 {
            debug!("edge padding ({} pixels)", params.padding);
            extrapolate_gutter(&mut accu.refs, accu.side, params.padding);
        }

        let (mut image, mask) = assemble(&accu, params.fill_holes);
        if let Some(mask) = mask {
            debug!("filling texture holes");
            fill_holes(&mut image, &mask);
        }
        if params.downscale > 1 {
            debug!("downscaling texture ({}x)", params.downscale);
            image = downscale(&image, params.downscale)?;
        }
        Ok(image)
    }

    pub fn generate_texture(
        &self,
        atlas: usize,
        cameras: &dyn CameraModel,
        images: &dyn ImageSource,
        out_dir: &Path,
    ) -> Result<()> {
        let image = self.bake_atlas(atlas, cameras, images)?;
        let file_type = self.params.texture_type;
        let path = out_dir.join(texture_file_name(atlas, file_type));
        info!("writing texture file {:?}", path);
        write_texture(image, &path, file_type)
    }

    /// Bakes all atlases, at most `jobs` of them at once.
    pub fn generate_textures(
        &self,
        cameras: &dyn CameraModel,
        images: &dyn ImageSource,
        out_dir: &Path,
    ) -> Result<()> {
        let num_atlases = self.current_with_uvs()?.atlases.len();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.params.jobs as usize)
            .build()
            .into_result(|| "failed to start texturing threads".to_string())?;
        debug!("baking {} atlases in {} jobs", num_atlases, self.params.jobs);

        pool.install(|| {
            (0..num_atlases)
                .into_par_iter()
                .map(|atlas| {
                    self.generate_texture(atlas, cameras, images, out_dir)
                })
                .collect()
        })
    }

    /// Writes `<basename>.obj` and `<basename>.mtl` into `out_dir`.
    pub fn save_as_obj(&self, out_dir: &Path, basename: &str) -> Result<()> {
        let textured = self.current_with_uvs()?;
        let obj_path = out_dir.join(format!("{}.obj", basename));
        info!("writing OBJ-file {:?}", obj_path);

        let mut writer = BufWriter::new(fs::create_file(&obj_path)?);
        export_to_obj(
            textured,
            &mut writer,
            |p, d| fs::write_file(p, d),
            out_dir,
            basename,
            self.params.texture_type,
        )?;
        writer
            .flush()
            .into_result(|| format!("failed to write {:?}", obj_path))
    }
}
