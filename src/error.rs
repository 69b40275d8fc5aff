#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Degenerate buffer dimensions or pixel data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Thresholding produced no usable contour. Expected outcome in a live
    /// scanning loop; retry with the next frame.
    #[error("no paper detected")]
    NoPaperDetected,

    /// The quadrilateral is incomplete at rectification time.
    #[error("quadrilateral is missing one or more corners")]
    MissingCorners,

    #[error("image error: {0}")]
    Image(String),
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        ScanError::Image(err.to_string())
    }
}
