use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::art::Raster;
use crate::error::EncodingError;
use crate::format::ImageFormat;

/// Serializes a raster into file bytes. Implementations are shared by every worker thread.
pub trait Encoder: Send + Sync {
    /// `quality` is in `[0, 1]` and only meaningful for lossy formats.
    fn encode(
        &self,
        raster: &Raster,
        format: ImageFormat,
        quality: f64,
    ) -> Result<Vec<u8>, EncodingError>;
}

/// PNG and baseline JPEG through the `image` codecs.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdEncoder;

impl Encoder for StdEncoder {
    fn encode(
        &self,
        raster: &Raster,
        format: ImageFormat,
        quality: f64,
    ) -> Result<Vec<u8>, EncodingError> {
        let (width, height) = (raster.width(), raster.height());
        let rgb = raster.to_rgb8();

        let mut buf = Vec::new();
        let result = match format {
            ImageFormat::Png => PngEncoder::new(&mut buf).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            ),
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8),
        };
        result.map_err(|source| EncodingError::Codec { format, source })?;
        Ok(buf)
    }
}

/// Maps `[0, 1]` onto the codec's `1..=100` scale.
pub fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::art::compose;
    use crate::geometry::Size;
    use crate::rand::Rng;
    use hex_literal::hex;

    const PNG_SIGNATURE: [u8; 8] = hex!("89504e470d0a1a0a");
    const JPEG_SOI: [u8; 3] = hex!("ffd8ff");

    #[test]
    fn test_quality_mapping() {
        assert_eq!(jpeg_quality(0.65), 65);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.004), 1);
    }

    #[test]
    fn test_png_is_lossless() {
        let raster = compose(Size::new(33, 17), &mut Rng::from_seed(4)).unwrap();
        let bytes = StdEncoder.encode(&raster, ImageFormat::Png, 0.65).unwrap();
        assert_eq!(bytes[..8], PNG_SIGNATURE);

        let decoded = image::load_from_memory(&bytes).unwrap().into_rgb8();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
        assert_eq!(decoded.into_raw(), raster.to_rgb8());
    }

    #[test]
    fn test_jpeg_decodes_to_same_size() {
        let raster = compose(Size::new(64, 48), &mut Rng::from_seed(4)).unwrap();
        let bytes = StdEncoder.encode(&raster, ImageFormat::Jpeg, 0.65).unwrap();
        assert_eq!(bytes[..3], JPEG_SOI);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let raster = compose(Size::new(256, 256), &mut Rng::from_seed(9)).unwrap();
        let high = StdEncoder.encode(&raster, ImageFormat::Jpeg, 1.0).unwrap();
        let low = StdEncoder.encode(&raster, ImageFormat::Jpeg, 0.1).unwrap();
        assert!(low.len() < high.len(), "{} >= {}", low.len(), high.len());
    }
}
