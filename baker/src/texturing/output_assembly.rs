use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base::defs::{Error, ErrorKind::*, IntoResult, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, Rgb32FImage};

use crate::texturing::misc::*;
use crate::texturing::output_baking::TextureAccumulator;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageFileType {
    Png,
    Jpeg,
    Tiff,
    Exr,
}

impl ImageFileType {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFileType::Png => "png",
            ImageFileType::Jpeg => "jpg",
            ImageFileType::Tiff => "tif",
            ImageFileType::Exr => "exr",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageFileType::Png => ImageFormat::Png,
            ImageFileType::Jpeg => ImageFormat::Jpeg,
            ImageFileType::Tiff => ImageFormat::Tiff,
            ImageFileType::Exr => ImageFormat::OpenExr,
        }
    }
}

impl Default for ImageFileType {
    fn default() -> Self {
        ImageFileType::Png
    }
}

impl FromStr for ImageFileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ImageFileType::Png),
            "jpg" | "jpeg" => Ok(ImageFileType::Jpeg),
            "tif" | "tiff" => Ok(ImageFileType::Tiff),
            "exr" => Ok(ImageFileType::Exr),
            _ => {
                let desc = format!("unknown texture file type '{}'", s);
                Err(Error::new(BadConfiguration, desc))
            }
        }
    }
}

impl fmt::Display for ImageFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Per pixel opacity, 1 for painted pixels and 0 for holes.
pub type AlphaMask = Vec<f32>;

/// Converts accumulated colors into an image. The opacity mask is only
/// produced when holes are going to be filled.
pub fn assemble(
    accu: &TextureAccumulator,
    with_mask: bool,
) -> (Rgb32FImage, Option<AlphaMask>) {
    let side = accu.side;
    let mut image = Rgb32FImage::new(side, side);
    let mut mask = if with_mask {
        Some(vec![0.0; side as usize * side as usize])
    } else {
        None
    };

    for (idx, pixel) in image.pixels_mut().enumerate() {
        if let Some(color) = accu.color(idx) {
            *pixel = Rgb([color.x as f32, color.y as f32, color.z as f32]);
            if let Some(mask) = mask.as_mut() {
                mask[idx] = 1.0;
            }
        }
    }
    (image, mask)
}

struct Level {
    width: u32,
    height: u32,
    colors: Vec<Color>,
    weights: Vec<f64>,
}

impl Level {
    fn idx(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn pull(&self) -> Level {
        let width = (self.width + 1) / 2;
        let height = (self.height + 1) / 2;
        let size = width as usize * height as usize;
        let mut level = Level {
            width,
            height,
            colors: vec![Color::zeros(); size],
            weights: vec![0.0; size],
        };

        for y in 0..self.height {
            for x in 0..self.width {
                let (src, dst) = (self.idx(x, y), level.idx(x / 2, y / 2));
                level.colors[dst] += self.colors[src] * self.weights[src];
                level.weights[dst] += self.weights[src];
            }
        }
        for (color, weight) in level.colors.iter_mut().zip(&mut level.weights)
        {
            if *weight > 0.0 {
                *color /= *weight;
            }
            *weight = weight.min(1.0);
        }
        level
    }

    fn push(&mut self, coarse: &Level) {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.idx(x, y);
                let weight = self.weights[idx];
                if weight < 1.0 {
                    let fill = coarse.colors[coarse.idx(x / 2, y / 2)];
                    self.colors[idx] =
                        self.colors[idx] * weight + fill * (1.0 - weight);
                    self.weights[idx] = 1.0;
                }
            }
        }
    }
}

/// Fills transparent pixels by pull-push interpolation of the opaque ones.
pub fn fill_holes(image: &mut Rgb32FImage, mask: &[f32]) {
    let (width, height) = image.dimensions();
    let mut levels = vec![Level {
        width,
        height,
        colors: image
            .pixels()
            .map(|p| Color::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect(),
        weights: mask.iter().map(|&a| a.clamp(0.0, 1.0) as f64).collect(),
    }];
    while let Some(last) = levels.last() {
        if last.width <= 1 && last.height <= 1 {
            break;
        }
        let next = last.pull();
        levels.push(next);
    }

    for i in (0..levels.len() - 1).rev() {
        let (fine, coarse) = levels.split_at_mut(i + 1);
        fine[i].push(&coarse[0]);
    }

    for (pixel, color) in image.pixels_mut().zip(&levels[0].colors) {
        *pixel = Rgb([color.x as f32, color.y as f32, color.z as f32]);
    }
}

pub fn downscale(image: &Rgb32FImage, factor: u32) -> Result<Rgb32FImage> {
    if factor == 0 {
        let desc = "downscale factor must be positive".to_string();
        return Err(Error::new(BadConfiguration, desc));
    }
    if factor == 1 {
        return Ok(image.clone());
    }
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    Ok(imageops::resize(image, width, height, FilterType::Triangle))
}

pub fn texture_file_name(atlas: usize, file_type: ImageFileType) -> String {
    format!("texture_{}.{}", atlas, file_type)
}

pub fn write_texture(
    image: Rgb32FImage,
    path: &Path,
    file_type: ImageFileType,
) -> Result<()> {
    let image = DynamicImage::ImageRgb32F(image);
    let image = match file_type {
        ImageFileType::Exr => image,
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    };
    image
        .save_with_format(path, file_type.format())
        .into_result_as(ImageError, || {
            format!("failed to write texture {:?}", path)
        })
}
