pub mod descriptor_filesystem;
pub mod glance_client_http;
pub mod image_builder_command;
pub mod keystone_auth;

pub use descriptor_filesystem::FilesystemDescriptorCatalog;
pub use glance_client_http::HttpGlanceClient;
pub use image_builder_command::CommandImageBuilder;
