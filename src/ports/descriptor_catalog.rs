use std::path::PathBuf;

use crate::domain::AppError;

/// Port for locating build descriptors by image identifier.
pub trait DescriptorCatalog {
    /// Path of the descriptor for `image_id`, or `AppError::DescriptorNotFound`.
    fn locate(&self, image_id: &str) -> Result<PathBuf, AppError>;
}
