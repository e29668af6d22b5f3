use image::DynamicImage;

/// A single decoded frame with its position in the source.
pub struct Frame {
    /// The frame's image data.
    pub image: DynamicImage,
    /// Position in the original, undownsampled source (0-based).
    pub source_index: u32,
}
