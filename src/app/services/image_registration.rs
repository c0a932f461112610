//! Registry lookups and image registration on top of the [`ImageRegistry`] port.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::domain::{AppError, ImageRecord, NewImage};
use crate::ports::ImageRegistry;

/// Id that never names a real image; probing it should answer "not found".
pub const LIVENESS_PROBE_ID: &str = "prebake-liveness-probe";

/// Records requested per listing page.
pub const LIST_PAGE_SIZE: usize = 10;

/// True when the registry answers the liveness probe with "not found".
///
/// Any other outcome, including a successful lookup, counts as not connected.
pub fn is_connected<R: ImageRegistry>(registry: &R) -> bool {
    match registry.get_image(LIVENESS_PROBE_ID) {
        Err(err) if err.is_not_found() => true,
        Err(err) => {
            debug!("Liveness probe against {} failed: {}", registry.location(), err);
            false
        }
        Ok(_) => false,
    }
}

/// Find the first record whose name matches exactly.
///
/// Pages through the whole listing using the last id of each page as the marker.
pub fn find_image_by_name<R: ImageRegistry>(
    registry: &R,
    name: &str,
) -> Result<Option<ImageRecord>, AppError> {
    let mut marker: Option<String> = None;

    loop {
        let page = registry.list_images(LIST_PAGE_SIZE, marker.as_deref())?;
        if let Some(found) = page.iter().find(|image| image.name.as_deref() == Some(name)) {
            return Ok(Some(found.clone()));
        }

        match page.last() {
            Some(last) if page.len() >= LIST_PAGE_SIZE => {
                if marker.as_deref() == Some(last.id.as_str()) {
                    return Err(AppError::registry_error(
                        format!("Image listing did not advance past marker {}", last.id),
                        None,
                    ));
                }
                marker = Some(last.id.clone());
            }
            _ => return Ok(None),
        }
    }
}

/// Upload `image_file` under `name`, replacing any record with the same name.
///
/// The old record is deleted before the upload starts; if the upload then
/// fails, no record with that name remains. Returns the new record's id.
pub fn register_image<R: ImageRegistry>(
    registry: &R,
    name: &str,
    image_file: &Path,
    owner: &str,
) -> Result<String, AppError> {
    let size = fs::metadata(image_file)?.len();
    let existing = find_image_by_name(registry, name)?;
    let image = NewImage::public_qcow2(name, owner, size);

    if let Some(existing) = existing {
        info!("Deleting existing image {} ({})", name, existing.id);
        registry.delete_image(&existing.id)?;
    }

    info!("Uploading {} as {} ({} bytes)", image_file.display(), name, size);
    let record = registry.add_image(&image, image_file)?;
    info!("Registered {} with id {}", name, record.id);
    Ok(record.id)
}
