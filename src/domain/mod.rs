pub mod descriptor;
pub mod error;
pub mod parameters;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod template;

pub use error::AppError;
pub use parameters::{UserParameters, parse_user_parameters};
pub use registry::{ImageRecord, NewImage, composite_image_name};
pub use resolver::{ResolvedInstance, StaticResolver};
pub use settings::{AuthStrategy, RegistryEndpoint, Settings, SettingsOverrides};
pub use template::{COMPUTE_INSTANCE_TYPE, ComputeInstance, Template, TemplateRewriter};
