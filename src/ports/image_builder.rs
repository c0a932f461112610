use std::path::PathBuf;

use crate::domain::AppError;

/// Port for the image-building pipeline.
pub trait ImageBuilder {
    /// Build a disk image from serialized descriptor text.
    ///
    /// Blocks until the build finishes and returns the produced image file.
    fn build(&self, descriptor: &str) -> Result<PathBuf, AppError>;
}
