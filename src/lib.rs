//! prebake: convert infrastructure templates to boot from pre-built images.
//!
//! Each compute instance's build descriptor is augmented with the instance
//! metadata, built into a disk image, uploaded to the image registry, and the
//! template is rewritten to reference the uploaded image by name.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use app::api::{ConvertOptions, ConvertResult, RegisteredImage, convert};
pub use domain::{AppError, Settings, SettingsOverrides, parse_user_parameters};
