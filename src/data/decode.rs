use image::ImageFormat;
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Turns encoded file bytes into a raster of `f32` pixel values.
///
/// The returned array is expected to be laid out as (height, width,
/// channels); the reader checks rank and channel count, so an implementation
/// only has to report what it actually decoded.
pub trait RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ArrayD<f32>, DecodeError>;
}

/// Single-channel PNG decoder backed by the `image` crate.
///
/// Colour and 16-bit inputs are reduced to 8-bit luma. RGB is weighted with
/// Rec. 709 coefficients (the `image` crate's `to_luma8`), so grey values of
/// colour PNGs can differ by a few levels from Rec. 601 based decoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder;

impl RasterDecoder for PngDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ArrayD<f32>, DecodeError> {
        let luma = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_luma8();
        let (width, height) = luma.dimensions();
        let values: Vec<f32> = luma.into_raw().into_iter().map(f32::from).collect();
        let raster = ArrayD::from_shape_vec(IxDyn(&[height as usize, width as usize, 1]), values)?;
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(img: &image::DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png)
            .expect("encode png");
        bytes.into_inner()
    }

    #[test]
    fn png_decoder_yields_hw1_floats() {
        let gray = image::GrayImage::from_fn(3, 2, |x, y| image::Luma([(y * 3 + x) as u8 * 10]));
        let bytes = encode_png(&image::DynamicImage::ImageLuma8(gray));

        let raster = PngDecoder.decode(&bytes).expect("decode");
        assert_eq!(raster.shape(), &[2, 3, 1]);
        assert_eq!(raster[[0, 0, 0]], 0.0);
        assert_eq!(raster[[1, 2, 0]], 50.0);
    }

    #[test]
    fn png_decoder_reduces_rgb_to_one_channel() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        let bytes = encode_png(&image::DynamicImage::ImageRgb8(rgb));

        let raster = PngDecoder.decode(&bytes).expect("decode");
        assert_eq!(raster.shape(), &[2, 2, 1]);
        assert_eq!(raster[[1, 1, 0]], 255.0);
    }

    #[test]
    fn png_decoder_rejects_garbage() {
        let err = PngDecoder.decode(b"not a png").unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }
}
