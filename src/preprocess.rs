//! Turns uploaded image bytes into the input tensor the model expects.

use clap::ValueEnum;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

use crate::error::{AppError, Result};

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Memory layout of the input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// `[1, H, W, 3]`, what Keras exports
    Nhwc,
    /// `[1, 3, H, W]`, what PyTorch exports
    Nchw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Normalization {
    /// Pixel values scaled to `[0, 1]`
    Unit,
    /// `[0, 1]` scaling followed by ImageNet mean/std standardization
    Imagenet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResizeMode {
    /// Resize to exactly `size x size`, ignoring the aspect ratio
    Stretch,
    /// Keep the aspect ratio and pad the rest of the square with black
    Letterbox,
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    pub size: u32,
    pub layout: Layout,
    pub normalization: Normalization,
    pub resize: ResizeMode,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            size: 224,
            layout: Layout::Nhwc,
            normalization: Normalization::Unit,
            resize: ResizeMode::Stretch,
        }
    }
}

impl Preprocessor {
    pub fn input_shape(&self) -> [usize; 4] {
        let size = self.size as usize;
        match self.layout {
            Layout::Nhwc => [1, size, size, 3],
            Layout::Nchw => [1, 3, size, size],
        }
    }

    /// Decode `bytes` and build a batch-of-one tensor.
    pub fn tensor(&self, bytes: &[u8]) -> Result<Array4<f32>> {
        let img =
            image::load_from_memory(bytes).map_err(|e| AppError::InvalidImage(e.to_string()))?;
        let rgb = self.resize(&img);
        Ok(self.normalize(&rgb))
    }

    fn resize(&self, img: &DynamicImage) -> RgbImage {
        match self.resize {
            ResizeMode::Stretch => img
                .resize_exact(self.size, self.size, FilterType::Triangle)
                .to_rgb8(),
            ResizeMode::Letterbox => {
                let resized = img.resize(self.size, self.size, FilterType::Triangle);
                let (width, height) = resized.dimensions();
                let pad_x = (self.size - width) / 2;
                let pad_y = (self.size - height) / 2;

                let mut canvas = RgbImage::new(self.size, self.size);
                image::imageops::replace(
                    &mut canvas,
                    &resized.to_rgb8(),
                    i64::from(pad_x),
                    i64::from(pad_y),
                );
                canvas
            }
        }
    }

    fn normalize(&self, rgb: &RgbImage) -> Array4<f32> {
        let mut tensor = Array4::zeros(self.input_shape());
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let mut value = f32::from(pixel[c]) / 255.0;
                if self.normalization == Normalization::Imagenet {
                    value = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
                match self.layout {
                    Layout::Nhwc => tensor[[0, y, x, c]] = value,
                    Layout::Nchw => tensor[[0, c, y, x]] = value,
                }
            }
        }
        tensor
    }
}
