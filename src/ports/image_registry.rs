//! Image registry port definition.

use std::path::Path;

use crate::domain::{AppError, ImageRecord, NewImage};

/// Port for image registry operations.
pub trait ImageRegistry {
    /// Human-readable location of the registry, used in log and error messages.
    fn location(&self) -> String;

    /// Fetch a record by id. A missing record is a `RegistryError` with status 404.
    fn get_image(&self, id: &str) -> Result<ImageRecord, AppError>;

    /// List up to `limit` records, starting after `marker` when given.
    fn list_images(&self, limit: usize, marker: Option<&str>) -> Result<Vec<ImageRecord>, AppError>;

    /// Create a record and upload `payload` as its image data.
    fn add_image(&self, image: &NewImage, payload: &Path) -> Result<ImageRecord, AppError>;

    /// Delete a record by id.
    fn delete_image(&self, id: &str) -> Result<(), AppError>;
}
