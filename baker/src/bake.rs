use std::path::PathBuf;

use log::info;
use structopt::StructOpt;

use base::defs::{Error, ErrorKind::*, Result};
use base::util::fs;

use crate::import_obj::read_obj_file;
use crate::inputs::{read_cameras, read_packing, read_visibilities};
use crate::texturing::output_packing::PrecomputedPacking;
use crate::texturing::unwrap::{
    ExternalParameterizer, NoParameterizer, Parameterizer, UnwrapMethod,
};
use crate::texturing::{Texturing, TexturingParams};

#[derive(StructOpt)]
#[structopt(about = "Bake texture atlases for a reconstructed mesh")]
pub struct BakeCommand {
    #[structopt(help = "Input OBJ-file", long, short = "m")]
    mesh: PathBuf,

    #[structopt(help = "Per vertex camera visibilities (JSON)", long)]
    visibilities: PathBuf,

    #[structopt(help = "Calibrated cameras (JSON)", long, short = "c")]
    cameras: PathBuf,

    #[structopt(help = "Precomputed chart packing (JSON)", long)]
    packing: Option<PathBuf>,

    #[structopt(help = "Mesh to texture instead of the input one", long)]
    other_mesh: Option<PathBuf>,

    #[structopt(help = "Invert orientations of loaded triangles", long)]
    flip_normals: bool,

    #[structopt(
        help = "Unwrap method (Basic, ABF or LSCM)",
        long,
        default_value = "Basic"
    )]
    unwrap_method: UnwrapMethod,

    #[structopt(help = "Program computing ABF or LSCM unwraps", long)]
    parameterizer: Option<PathBuf>,

    #[structopt(help = "Output directory", long, short = "o")]
    out_dir: PathBuf,

    #[structopt(
        help = "Base name of output OBJ and MTL files",
        long,
        default_value = "texturedMesh"
    )]
    basename: String,

    #[structopt(
        help = "Number of decoded images kept in memory",
        long,
        default_value = "8"
    )]
    image_cache_size: usize,

    #[structopt(flatten)]
    params: TexturingParams,
}

impl BakeCommand {
    pub fn run(&self) -> Result<()> {
        let mut texturing = Texturing::new(self.params.clone())?;
        let (cameras, images) =
            read_cameras(&self.cameras, self.image_cache_size)?;
        let visibilities = read_visibilities(&self.visibilities)?;

        let obj = read_obj_file(&self.mesh)?;
        let has_uvs = obj.has_uvs();
        if has_uvs {
            texturing.load_from_obj(obj, self.flip_normals)?;
            texturing.attach_visibilities(visibilities)?;
        } else {
            let mut mesh = obj.mesh;
            if self.flip_normals {
                mesh.invert_orientations();
            }
            texturing.load_mesh(mesh, visibilities)?;
        }

        if let Some(path) = &self.other_mesh {
            let other = read_obj_file(path)?;
            texturing.replace_mesh(other, self.flip_normals)?;
        }

        let has_uvs = texturing.textured().map_or(false, |t| t.has_uvs());
        if !has_uvs
            || self.packing.is_some()
            || self.unwrap_method != UnwrapMethod::Basic
        {
            let packing = match &self.packing {
                Some(path) => read_packing(path)?,
                None if self.unwrap_method == UnwrapMethod::Basic => {
                    let desc = "basic unwrap requires chart packing";
                    return Err(Error::new(BadConfiguration, desc.to_string()));
                }
                None => Default::default(),
            };
            let parameterizer: Box<dyn Parameterizer> =
                match &self.parameterizer {
                    Some(program) => {
                        Box::new(ExternalParameterizer::new(program.clone()))
                    }
                    None => Box::new(NoParameterizer),
                };
            texturing.unwrap(
                self.unwrap_method,
                &cameras,
                &PrecomputedPacking(packing),
                parameterizer.as_ref(),
            )?;
        }

        fs::create_dir(&self.out_dir)?;
        texturing.generate_textures(&cameras, &images, &self.out_dir)?;
        texturing.save_as_obj(&self.out_dir, &self.basename)?;
        info!("textured mesh is written into {:?}", self.out_dir);
        Ok(())
    }
}
