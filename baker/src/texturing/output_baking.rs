use base::defs::{Error, ErrorKind::*, Result};
use derive_more::{Add, AddAssign};
use image::Rgb32FImage;

use crate::texturing::input_images::sample_pixel;
use crate::texturing::input_projection::CameraModel;
use crate::texturing::misc::*;
use crate::texturing::TexturedMesh;

/// Running sum of the colors sampled for one pixel. Sums are kept in single
/// precision as atlases hold tens of millions of pixels.
#[derive(Add, AddAssign, Clone, Copy, Debug, PartialEq)]
pub struct AccuColor {
    pub sum: nalgebra::Vector3<f32>,
    pub count: u32,
}

impl AccuColor {
    pub fn new() -> AccuColor {
        AccuColor {
            sum: nalgebra::Vector3::zeros(),
            count: 0,
        }
    }

    pub fn add_sample(&mut self, color: Color) -> u32 {
        self.sum += color.cast::<f32>();
        self.count += 1;
        self.count
    }

    pub fn average(&self) -> Color {
        let sum = self.sum.cast::<f64>();
        if self.count > 0 {
            sum / self.count as f64
        } else {
            sum
        }
    }
}

impl Default for AccuColor {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the color of a texture pixel comes from. Indices are linear pixel
/// indices, textures never exceed `MAX_TEXTURE_SIDE` pixels per side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelRef {
    Unpopulated,
    Sample(u32),
    AliasOf(u32),
}

pub const MAX_TEXTURE_SIDE: u32 = u16::MAX as u32;

/// Colors of a single atlas texture, rows going from top to bottom.
pub struct TextureAccumulator {
    pub side: u32,
    pub colors: Vec<AccuColor>,
    pub refs: Vec<PixelRef>,
}

impl TextureAccumulator {
    pub fn new(side: u32) -> TextureAccumulator {
        let size = side as usize * side as usize;
        TextureAccumulator {
            side,
            colors: vec![AccuColor::new(); size],
            refs: vec![PixelRef::Unpopulated; size],
        }
    }

    /// Paints `triangles` with the colors seen by `camera`.
    pub fn accumulate_camera(
        &mut self,
        textured: &TexturedMesh,
        triangles: &[usize],
        cameras: &dyn CameraModel,
        camera: CameraId,
        image: &Rgb32FImage,
    ) {
        let side = self.side as usize;
        let scale = self.side as f64;

        for &triangle in triangles {
            let face = textured.mesh.faces[triangle];
            let uv_idxs = textured.uv_idxs[triangle];
            let pts = face.map(|v| textured.mesh.vertices[v]);
            let pixs = uv_idxs.map(|i| textured.uv_coords[i] * scale);

            let bound = |v: f64| (v as i64).clamp(0, side as i64) as usize;
            let min = |f: fn(&Point2) -> f64| {
                bound(pixs.iter().map(f).fold(f64::MAX, f64::min).floor())
            };
            let max = |f: fn(&Point2) -> f64| {
                bound(pixs.iter().map(f).fold(f64::MIN, f64::max).ceil())
            };
            let (lu_x, lu_y) = (min(|p| p.x), min(|p| p.y));
            let (rd_x, rd_y) = (max(|p| p.x), max(|p| p.y));

            for y in lu_y..rd_y {
                for x in lu_x..rd_x {
                    let (inside, bary) =
                        point_in_triangle(&pixs, (x as u32, y as u32));
                    if !inside {
                        continue;
                    }

                    let point = barycentric_to_cartesian(&pts, &bary);
                    let pixel = match cameras.project_into_image(camera, &point)
                    {
                        Some(pixel) => pixel,
                        None => continue,
                    };

                    let idx = (side - 1 - y) * side + x;
                    self.colors[idx].add_sample(sample_pixel(image, &pixel));
                    self.refs[idx] = PixelRef::Sample(idx as u32);
                }
            }
        }
    }

    /// Adds samples accumulated independently for the same atlas.
    pub fn merge(&mut self, other: TextureAccumulator) -> Result<()> {
        if other.side != self.side {
            let desc = format!(
                "can't merge {}px texture into {}px one",
                other.side, self.side
            );
            return Err(Error::new(BadOperation, desc));
        }

        let pixels = self.colors.iter_mut().zip(self.refs.iter_mut());
        let others = other.colors.into_iter().zip(other.refs.into_iter());
        for (idx, ((color, pref), (other_color, other_pref))) in
            pixels.zip(others).enumerate()
        {
            *color += other_color;
            if *pref == PixelRef::Unpopulated
                && other_pref != PixelRef::Unpopulated
            {
                *pref = PixelRef::Sample(idx as u32);
            }
        }
        Ok(())
    }

    /// Returns the averaged color of a pixel unless it was never painted.
    pub fn color(&self, idx: usize) -> Option<Color> {
        match self.refs[idx] {
            PixelRef::Unpopulated => None,
            PixelRef::Sample(src) => Some(self.colors[src as usize].average()),
            PixelRef::AliasOf(src) => match self.refs[src as usize] {
                PixelRef::Sample(src) => {
                    Some(self.colors[src as usize].average())
                }
                _ => None,
            },
        }
    }

    pub fn num_populated(&self) -> usize {
        self.refs
            .iter()
            .filter(|r| **r != PixelRef::Unpopulated)
            .count()
    }
}

/// Grows painted areas by `padding` pixels. Each step copies a painted
/// neighbour (left, right, next row, previous row) into unpainted
/// non-border pixels.
pub fn extrapolate_gutter(refs: &mut [PixelRef], side: u32, padding: u32) {
    let side = side as usize;
    let is_sample = |r: &PixelRef| matches!(r, PixelRef::Sample(_));

    for _ in 0..padding {
        for y in 1..side.saturating_sub(1) {
            for x in 1..side - 1 {
                let idx = y * side + x;
                if is_sample(&refs[idx]) {
                    continue;
                }
                let neighbour = [idx - 1, idx + 1, idx + side, idx - side]
                    .into_iter()
                    .find(|&n| is_sample(&refs[n]));
                if let Some(n) = neighbour {
                    refs[idx] = PixelRef::AliasOf(n as u32);
                }
            }
        }

        for idx in 0..refs.len() {
            if let PixelRef::AliasOf(src) = refs[idx] {
                refs[idx] = refs[src as usize];
            }
        }
    }
}
