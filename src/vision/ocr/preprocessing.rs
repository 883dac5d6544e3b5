// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the text detector and the line recognizer

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the text detector
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Letterbox padding value (Ultralytics default gray)
pub const LETTERBOX_FILL: u8 = 114;

/// Recognizer input height
pub const REC_INPUT_HEIGHT: u32 = 32;

/// Recognizer input width
pub const REC_INPUT_WIDTH: u32 = 128;

/// Single-channel normalization for the recognizer: (x - 0.5) / 0.5
pub const REC_MEAN: f32 = 0.5;
pub const REC_STD: f32 = 0.5;

/// Scale and padding applied by [`letterbox`]
///
/// Used to map detector coordinates back onto the uploaded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Calculate letterbox geometry for an image of the given size
    pub fn new(orig_w: u32, orig_h: u32, target_size: u32) -> Self {
        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let (new_w, new_h) = scaled_dims(orig_w, orig_h, scale);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a coordinate from letterboxed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

fn scaled_dims(orig_w: u32, orig_h: u32, scale: f32) -> (u32, u32) {
    let new_w = ((orig_w as f32 * scale).round() as u32).max(1);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(1);
    (new_w, new_h)
}

/// Resize with aspect ratio preserved and pad to a `target_size` square
///
/// The resized image is centered on a gray (114) canvas.
pub fn letterbox(image: &RgbImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let info = LetterboxInfo::new(orig_w, orig_h, target_size);

    let mut output = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if orig_w == 0 || orig_h == 0 {
        return (output, info);
    }

    let (new_w, new_h) = scaled_dims(orig_w, orig_h, info.scale);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    (output, info)
}

/// Preprocess an image for the text detector
///
/// Steps:
/// 1. Letterbox to DETECTION_INPUT_SIZE
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &RgbImage) -> (Array4<f32>, LetterboxInfo) {
    let (padded, info) = letterbox(image, DETECTION_INPUT_SIZE);
    let size = DETECTION_INPUT_SIZE as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in padded.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
        }
    }

    (tensor, info)
}

/// ITU-R 601-2 luma, rounded like PIL's "L" conversion
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let l = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    l.round().clamp(0.0, 255.0) as u8
}

/// Preprocess a cropped text region for the recognizer
///
/// Steps:
/// 1. Resize to exactly 32x128 (bilinear, aspect ratio not preserved)
/// 2. Convert to grayscale
/// 3. Scale to [0, 1], then normalize with mean 0.5 / std 0.5
/// 4. Convert to NCHW tensor format [1, 1, 32, 128]
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, REC_INPUT_WIDTH, REC_INPUT_HEIGHT, FilterType::Triangle);

    let mut tensor = Array4::zeros((
        1,
        1,
        REC_INPUT_HEIGHT as usize,
        REC_INPUT_WIDTH as usize,
    ));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let value = f32::from(luma(pixel)) / 255.0;
        tensor[[0, 0, y as usize, x as usize]] = (value - REC_MEAN) / REC_STD;
    }

    tensor
}

/// Cut a region out of the image; `None` if the rectangle is empty or outside
pub fn crop_region(
    image: &RgbImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Option<DynamicImage> {
    let (img_w, img_h) = image.dimensions();
    if width == 0 || height == 0 || x >= img_w || y >= img_h {
        return None;
    }
    let width = width.min(img_w - x);
    let height = height.min(img_h - y);
    let cropped = imageops::crop_imm(image, x, y, width, height).to_image();
    Some(DynamicImage::ImageRgb8(cropped))
}
