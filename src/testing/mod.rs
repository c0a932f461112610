mod fake_image_builder;
mod fake_image_registry;

pub use fake_image_builder::FakeImageBuilder;
pub use fake_image_registry::{FakeImageRegistry, RegistryCall};
