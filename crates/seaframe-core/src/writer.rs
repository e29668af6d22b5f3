use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Digits in the zero-padded output index. Lexical order of output file
/// names matches numeric order only while every index fits.
pub const INDEX_WIDTH: usize = 5;

const MAX_INDEX: u32 = 99_999;

/// `<prefix>_<index>.png` with the index zero-padded to [`INDEX_WIDTH`].
pub fn frame_file_name(prefix: &str, index: u32) -> Result<String> {
    if index > MAX_INDEX {
        return Err(Error::IndexOverflow {
            index,
            width: INDEX_WIDTH,
        });
    }
    Ok(format!("{prefix}_{index:0width$}.png", width = INDEX_WIDTH))
}

/// Downscale factor that brings `width` within `max_width`. Never upscales.
pub fn scale_factor(width: u32, max_width: u32) -> f64 {
    if width == 0 {
        return 1.0;
    }
    (max_width as f64 / width as f64).min(1.0)
}

/// Output dimensions after clamping to `max_width`, aspect ratio preserved
/// to rounding error.
pub fn clamp_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let scale = scale_factor(width, max_width);
    if scale >= 1.0 {
        return (width, height);
    }
    let w = (width as f64 * scale).round().max(1.0) as u32;
    let h = (height as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Persists kept frames as numbered PNG files.
pub struct FrameWriter {
    dir: PathBuf,
    prefix: String,
    max_width: Option<u32>,
}

impl FrameWriter {
    /// Create the output directory if absent.
    pub fn new(dir: &Path, prefix: &str, max_width: Option<u32>) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        info!(?dir, prefix, ?max_width, "frame output directory ready");
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            max_width,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the frame with `output_index` is written to.
    pub fn path_for(&self, output_index: u32) -> Result<PathBuf> {
        Ok(self.dir.join(frame_file_name(&self.prefix, output_index)?))
    }

    /// Write one frame, downscaling first if it is wider than the clamp.
    /// An existing file with the same name is overwritten.
    pub fn write(&self, image: &DynamicImage, output_index: u32) -> Result<PathBuf> {
        let path = self.path_for(output_index)?;
        let prepared = self.prepare(image);

        prepared
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| match e {
                ImageError::IoError(source) => Error::io(&path, source),
                other => Error::Encode {
                    path: path.clone(),
                    source: other,
                },
            })?;

        debug!(?path, output_index, width = prepared.width(), height = prepared.height(), "wrote frame");
        Ok(path)
    }

    fn prepare<'a>(&self, image: &'a DynamicImage) -> Cow<'a, DynamicImage> {
        let mut prepared = Cow::Borrowed(image);

        if let Some(max_width) = self.max_width {
            let (width, height) = (image.width(), image.height());
            let (w, h) = clamp_dimensions(width, height, max_width);
            if (w, h) != (width, height) {
                debug!(width, height, new_width = w, new_height = h, "downscaling frame");
                prepared = Cow::Owned(image.resize_exact(w, h, FilterType::Lanczos3));
            }
        }

        // PNG has no float channels; HDR sources are clamped to 8-bit.
        if matches!(*prepared, DynamicImage::ImageRgb32F(_)) {
            return Cow::Owned(DynamicImage::ImageRgb8(prepared.to_rgb8()));
        }
        if matches!(*prepared, DynamicImage::ImageRgba32F(_)) {
            return Cow::Owned(DynamicImage::ImageRgba8(prepared.to_rgba8()));
        }
        prepared
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, Rgb32FImage, RgbImage, Rgba, Rgba32FImage};

    use super::*;

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(frame_file_name("frame", 0).unwrap(), "frame_00000.png");
        assert_eq!(frame_file_name("video_frame", 42).unwrap(), "video_frame_00042.png");
        assert_eq!(frame_file_name("frame", 99_999).unwrap(), "frame_99999.png");
    }

    #[test]
    fn file_name_overflow_is_an_error() {
        let err = frame_file_name("frame", 100_000).unwrap_err();
        assert!(matches!(err, Error::IndexOverflow { index: 100_000, width: 5 }));
    }

    #[test]
    fn lexical_order_matches_numeric_order() {
        let mut names: Vec<String> = [10, 2, 100, 1, 99_999]
            .iter()
            .map(|&i| frame_file_name("f", i).unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["f_00001.png", "f_00002.png", "f_00010.png", "f_00100.png", "f_99999.png"]
        );
    }

    #[test]
    fn scale_never_exceeds_one() {
        assert_eq!(scale_factor(1920, 4096), 1.0);
        assert_eq!(scale_factor(4096, 4096), 1.0);
        assert_eq!(scale_factor(8192, 4096), 0.5);
        for width in [1, 100, 4095, 4097, 10_000, 16_384] {
            assert!(scale_factor(width, 4096) <= 1.0);
        }
    }

    #[test]
    fn clamp_preserves_aspect_ratio() {
        assert_eq!(clamp_dimensions(8192, 4096, 4096), (4096, 2048));
        assert_eq!(clamp_dimensions(1920, 1080, 4096), (1920, 1080));
        // 4096 / 6000 * 3001 = 2048.68 -> 2049
        assert_eq!(clamp_dimensions(6000, 3001, 4096), (4096, 2049));

        let (w, h) = clamp_dimensions(10_000, 7_000, 4096);
        let before = 10_000.0 / 7_000.0;
        let after = w as f64 / h as f64;
        assert!((before - after).abs() < 0.01);
    }

    #[test]
    fn clamp_keeps_at_least_one_pixel() {
        assert_eq!(clamp_dimensions(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn writes_numbered_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let writer = FrameWriter::new(&out, "frame", None).unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([1, 2, 3])));
        let path = writer.write(&image, 7).unwrap();

        assert_eq!(path, out.join("frame_00007.png"));
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (8, 4));
    }

    #[test]
    fn oversized_frames_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::new(dir.path(), "frame", Some(16)).unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 32));
        let path = writer.write(&image, 0).unwrap();

        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (16, 8));
    }

    #[test]
    fn float_frames_are_written_as_eight_bit() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::new(dir.path(), "frame", Some(4096)).unwrap();

        let hdr = Rgb32FImage::from_pixel(4, 4, Rgb([0.5, 2.0, 0.0]));
        let path = writer.write(&DynamicImage::ImageRgb32F(hdr), 0).unwrap();

        let back = image::open(&path).unwrap();
        assert!(matches!(back, DynamicImage::ImageRgb8(_)));
        let px = back.to_rgb8().get_pixel(0, 0).0;
        assert_eq!(px[1], 255);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn float_frames_with_alpha_keep_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::new(dir.path(), "frame", None).unwrap();

        let hdr = Rgba32FImage::from_pixel(2, 2, Rgba([1.0, 0.0, 0.0, 0.0]));
        let path = writer.write(&DynamicImage::ImageRgba32F(hdr), 0).unwrap();

        let back = image::open(&path).unwrap();
        assert!(matches!(back, DynamicImage::ImageRgba8(_)));
        assert_eq!(back.to_rgba8().get_pixel(1, 1).0, [255, 0, 0, 0]);
    }

    #[test]
    fn unchanged_frames_are_borrowed() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FrameWriter::new(dir.path(), "frame", Some(4096)).unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 4));
        assert!(matches!(writer.prepare(&image), Cow::Borrowed(_)));

        let wide = DynamicImage::ImageRgb8(RgbImage::new(8192, 2));
        assert!(matches!(writer.prepare(&wide), Cow::Owned(_)));
    }

    #[test]
    fn output_path_that_is_a_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("frames");
        std::fs::write(&file, b"not a directory").unwrap();

        let err = FrameWriter::new(&file, "frame", None).err().unwrap();
        assert!(matches!(err, Error::Io { ref path, .. } if *path == file));
    }

    #[test]
    fn vanished_output_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let writer = FrameWriter::new(&out, "frame", None).unwrap();
        std::fs::remove_dir(&out).unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let err = writer.write(&image, 0).unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if *path == out.join("frame_00000.png")));
    }

    #[test]
    fn directory_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        FrameWriter::new(dir.path(), "frame", None).unwrap();
        FrameWriter::new(dir.path(), "frame", None).unwrap();
    }
}
