use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::domain::AppError;
use crate::domain::descriptor::descriptor_name;
use crate::ports::ImageBuilder;

/// Builder that writes each descriptor to `<output_dir>/<name>.qcow2` and records it.
#[derive(Clone)]
pub struct FakeImageBuilder {
    pub output_dir: PathBuf,
    pub descriptors: Arc<Mutex<Vec<String>>>,
    /// Fail the build whose zero-based index matches.
    pub fail_on: Option<usize>,
}

impl FakeImageBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), descriptors: Arc::new(Mutex::new(vec![])), fail_on: None }
    }

    pub fn descriptors(&self) -> Vec<String> {
        self.descriptors.lock().unwrap().clone()
    }
}

impl ImageBuilder for FakeImageBuilder {
    fn build(&self, descriptor: &str) -> Result<PathBuf, AppError> {
        let mut descriptors = self.descriptors.lock().unwrap();
        if self.fail_on == Some(descriptors.len()) {
            return Err(AppError::BuildFailed { command: "fake".into(), details: "boom".into() });
        }
        descriptors.push(descriptor.to_string());

        let image = self.output_dir.join(format!("{}.qcow2", descriptor_name(descriptor)?));
        fs::write(&image, descriptor)?;
        Ok(image)
    }
}
