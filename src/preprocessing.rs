/// Preprocessing of uploaded images for the MRI classifier.
/// The pipeline mirrors what the model saw during training: RGB, 128x128, channels-last,
/// values scaled to [0, 1]. Do not use these functions to prepare images for anything else.

use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::{Array, Array4};

use crate::error::Result;

pub const IMAGE_INPUT_SIZE: usize = 128;
pub const IMAGE_CHANNELS: usize = 3;

/// Decodes an encoded image of any format the `image` crate can sniff from its content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage>
{
    Ok(image::load_from_memory(bytes)?)
}

/// Forces three channels (dropping alpha, expanding grayscale) and resizes to the
/// model's fixed input grid. Aspect ratio is not preserved.
pub fn resize_image(image: &DynamicImage) -> RgbImage
{
    let rgb = image.to_rgb8();
    image::imageops::resize(
        &rgb,
        IMAGE_INPUT_SIZE as u32,
        IMAGE_INPUT_SIZE as u32,
        FilterType::CatmullRom)
}

// Converts to the [batch, height, width, channel] layout the model expects, with a batch of one.
pub fn image_to_model_format(image: &RgbImage) -> Array4<f32>
{
    let (width, height) = image.dimensions();
    let mut image_input = Array::zeros((1, height as usize, width as usize, IMAGE_CHANNELS));
    for (x, y, pixel) in image.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        image_input[[0, y, x, 0]] = (r as f32) / 255.;
        image_input[[0, y, x, 1]] = (g as f32) / 255.;
        image_input[[0, y, x, 2]] = (b as f32) / 255.;
    }

    image_input
}

/// The whole pipeline, from uploaded bytes to a model-ready batch.
pub fn load_image_bytes(bytes: &[u8]) -> Result<Array4<f32>>
{
    let image = decode_image(bytes)?;
    let resized = resize_image(&image);
    Ok(image_to_model_format(&resized))
}

#[cfg(test)]
pub(crate) mod tests
{
    use std::io::Cursor;

    use image::{GrayImage, ImageBuffer, ImageFormat, Luma, Rgba};

    use super::*;

    pub(crate) fn encode_png(image: &DynamicImage) -> Vec<u8>
    {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn produces_single_channels_last_batch()
    {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(300, 200, image::Rgb([255, 0, 51])));
        let input = load_image_bytes(&encode_png(&image)).unwrap();

        assert_eq!(input.shape(), &[1, IMAGE_INPUT_SIZE, IMAGE_INPUT_SIZE, IMAGE_CHANNELS]);
        for y in [0, 64, 127] {
            for x in [0, 64, 127] {
                approx::assert_abs_diff_eq!(input[[0, y, x, 0]], 1.0, epsilon = 1e-6);
                approx::assert_abs_diff_eq!(input[[0, y, x, 1]], 0.0, epsilon = 1e-6);
                approx::assert_abs_diff_eq!(input[[0, y, x, 2]], 0.2, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn values_are_scaled_to_unit_range()
    {
        let gradient = ImageBuffer::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 255, 128]));
        let input = load_image_bytes(&encode_png(&DynamicImage::ImageRgba8(gradient))).unwrap();
        assert!(input.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn grayscale_is_expanded_to_three_channels()
    {
        let gray: GrayImage = ImageBuffer::from_pixel(16, 16, Luma([102]));
        let input = load_image_bytes(&encode_png(&DynamicImage::ImageLuma8(gray))).unwrap();

        assert_eq!(input.shape()[3], IMAGE_CHANNELS);
        approx::assert_abs_diff_eq!(input[[0, 10, 10, 0]], 0.4, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(input[[0, 10, 10, 1]], 0.4, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(input[[0, 10, 10, 2]], 0.4, epsilon = 1e-6);
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image()
    {
        assert!(load_image_bytes(b"definitely not an image").is_err());
        assert!(load_image_bytes(&[]).is_err());
    }
}
