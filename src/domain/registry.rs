use serde::Deserialize;

pub const DISK_FORMAT: &str = "qcow2";
pub const CONTAINER_FORMAT: &str = "bare";

/// An image record as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Metadata for an image about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub name: String,
    pub is_public: bool,
    pub disk_format: String,
    pub container_format: String,
    pub min_disk: u64,
    pub min_ram: u64,
    pub owner: String,
    pub size: u64,
}

impl NewImage {
    /// Public qcow2 image with no minimum disk or memory.
    pub fn public_qcow2(name: impl Into<String>, owner: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_public: true,
            disk_format: DISK_FORMAT.to_string(),
            container_format: CONTAINER_FORMAT.to_string(),
            min_disk: 0,
            min_ram: 0,
            owner: owner.into(),
            size,
        }
    }
}

/// Registry name for an instance image: `<template>/<resource>/<image-id>`.
pub fn composite_image_name(template_basename: &str, resource: &str, image_id: &str) -> String {
    format!("{}/{}/{}", template_basename, resource, image_id)
}
