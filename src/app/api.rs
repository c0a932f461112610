//! API Facade for the application.
//!
//! This module exposes high-level functions that glue together context creation
//! and command execution.

use std::path::Path;

use tracing::info;

use crate::adapters::{CommandImageBuilder, FilesystemDescriptorCatalog, HttpGlanceClient};
use crate::app::services::image_registration::is_connected;
use crate::app::{AppContext, commands::convert};
use crate::domain::{Settings, parse_user_parameters};
use crate::ports::ImageRegistry;

pub use crate::app::commands::convert::{ConvertOptions, ConvertResult, RegisteredImage};
pub use crate::domain::AppError;

/// Create an `AppContext` wired to the real collaborators.
fn create_context(
    settings: &Settings,
    registry: HttpGlanceClient,
) -> AppContext<FilesystemDescriptorCatalog, CommandImageBuilder, HttpGlanceClient> {
    let catalog = FilesystemDescriptorCatalog::new(&settings.descriptor_dir);
    let builder = CommandImageBuilder::new(
        &settings.build_command,
        &settings.convert_command,
        &settings.image_dir,
    );
    AppContext::new(catalog, builder, registry)
}

/// Convert the template at `input`, writing the result to `output`.
///
/// Checks registry connectivity before touching the template.
pub fn convert(settings: &Settings, input: &Path, output: &Path) -> Result<ConvertResult, AppError> {
    let parameters = parse_user_parameters(&settings.parameters)?;

    let registry = HttpGlanceClient::connect(settings)?;
    info!("Using image registry at {}", registry.location());
    if !is_connected(&registry) {
        return Err(AppError::RegistryUnavailable(registry.location()));
    }

    let ctx = create_context(settings, registry);
    let options = ConvertOptions {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        parameters,
        owner: settings.owner().to_string(),
    };
    convert::execute(&ctx, &options)
}
