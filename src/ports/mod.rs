mod descriptor_catalog;
mod image_builder;
mod image_registry;

pub use descriptor_catalog::DescriptorCatalog;
pub use image_builder::ImageBuilder;
pub use image_registry::ImageRegistry;
