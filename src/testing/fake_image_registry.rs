use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::domain::{AppError, ImageRecord, NewImage};
use crate::ports::ImageRegistry;

/// Registry call as observed by [`FakeImageRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Get(String),
    List { limit: usize, marker: Option<String> },
    Add { name: String, payload: PathBuf },
    Delete(String),
}

/// In-memory registry that records every call.
#[derive(Clone, Default)]
pub struct FakeImageRegistry {
    pub images: Arc<Mutex<Vec<ImageRecord>>>,
    pub uploads: Arc<Mutex<Vec<NewImage>>>,
    pub calls: Arc<Mutex<Vec<RegistryCall>>>,
    pub next_id: Arc<Mutex<u32>>,
    pub fail_uploads: bool,
    pub unreachable: bool,
    /// Answer every listing from the start, as a registry without marker support would.
    pub ignores_marker: bool,
}

impl FakeImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(names: &[&str]) -> Self {
        let registry = Self::new();
        {
            let mut images = registry.images.lock().unwrap();
            for (index, name) in names.iter().enumerate() {
                images.push(ImageRecord {
                    id: format!("existing-{}", index),
                    name: Some(name.to_string()),
                    size: Some(1),
                    owner: None,
                });
            }
        }
        registry
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn image_names(&self) -> Vec<String> {
        self.images.lock().unwrap().iter().filter_map(|i| i.name.clone()).collect()
    }

    fn record(&self, call: RegistryCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_reachable(&self) -> Result<(), AppError> {
        if self.unreachable {
            return Err(AppError::registry_error("connection refused", None));
        }
        Ok(())
    }
}

impl ImageRegistry for FakeImageRegistry {
    fn location(&self) -> String {
        "fake://registry".to_string()
    }

    fn get_image(&self, id: &str) -> Result<ImageRecord, AppError> {
        self.record(RegistryCall::Get(id.to_string()));
        self.check_reachable()?;
        self.images
            .lock()
            .unwrap()
            .iter()
            .find(|image| image.id == id)
            .cloned()
            .ok_or_else(|| AppError::registry_error("Image not found", Some(404)))
    }

    fn list_images(&self, limit: usize, marker: Option<&str>) -> Result<Vec<ImageRecord>, AppError> {
        self.record(RegistryCall::List { limit, marker: marker.map(str::to_string) });
        self.check_reachable()?;
        let images = self.images.lock().unwrap();
        let start = match marker {
            Some(marker) if !self.ignores_marker => {
                images.iter().position(|i| i.id == marker).map_or(images.len(), |p| p + 1)
            }
            _ => 0,
        };
        Ok(images.iter().skip(start).take(limit).cloned().collect())
    }

    fn add_image(&self, image: &NewImage, payload: &Path) -> Result<ImageRecord, AppError> {
        self.record(RegistryCall::Add { name: image.name.clone(), payload: payload.to_path_buf() });
        self.check_reachable()?;
        if self.fail_uploads {
            return Err(AppError::registry_error("upload rejected", Some(500)));
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let record = ImageRecord {
            id: format!("image-{}", next_id),
            name: Some(image.name.clone()),
            size: Some(image.size),
            owner: Some(image.owner.clone()),
        };
        self.images.lock().unwrap().push(record.clone());
        self.uploads.lock().unwrap().push(image.clone());
        Ok(record)
    }

    fn delete_image(&self, id: &str) -> Result<(), AppError> {
        self.record(RegistryCall::Delete(id.to_string()));
        self.check_reachable()?;
        let mut images = self.images.lock().unwrap();
        let before = images.len();
        images.retain(|image| image.id != id);
        if images.len() == before {
            return Err(AppError::registry_error("Image not found", Some(404)));
        }
        Ok(())
    }
}
