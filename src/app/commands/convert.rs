//! Convert command: bake image contents ahead of time and rewrite the template.

use std::path::PathBuf;

use tracing::info;

use crate::app::AppContext;
use crate::app::services::image_registration::register_image;
use crate::domain::descriptor::update_tdl;
use crate::domain::{
    AppError, ResolvedInstance, StaticResolver, Template, UserParameters, composite_image_name,
};
use crate::ports::{DescriptorCatalog, ImageBuilder, ImageRegistry};

/// Options for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Template to read.
    pub input: PathBuf,
    /// Where the rewritten template is written.
    pub output: PathBuf,
    /// Operator-supplied parameter overrides.
    pub parameters: UserParameters,
    /// Owner recorded on uploaded images.
    pub owner: String,
}

/// An instance image that was built and uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredImage {
    pub resource: String,
    pub image_id: String,
    pub registry_name: String,
    pub registry_id: String,
}

/// Result of a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub output: PathBuf,
    pub images: Vec<RegisteredImage>,
}

/// An instance with everything needed to start its build.
struct PlannedBuild {
    instance: ResolvedInstance,
    descriptor: PathBuf,
}

/// Execute the convert command.
///
/// Every instance is resolved and matched to a descriptor before the first
/// build starts. The output file is written only after all images are registered.
pub fn execute<C, B, R>(ctx: &AppContext<C, B, R>, options: &ConvertOptions) -> Result<ConvertResult, AppError>
where
    C: DescriptorCatalog,
    B: ImageBuilder,
    R: ImageRegistry,
{
    let template = Template::load(&options.input)?;
    let plan = plan_builds(ctx, &template, &options.parameters)?;
    info!("Resolved {} compute instance(s) in {}", plan.len(), options.input.display());

    let mut rewriter = template.rewriter();
    let mut images = Vec::with_capacity(plan.len());

    for PlannedBuild { instance, descriptor } in plan {
        info!("Updating descriptor {} for {}", descriptor.display(), instance.name);
        let descriptor_text = update_tdl(&descriptor, &instance.metadata)?;

        info!("Building image {} for {}", instance.image_id, instance.name);
        let image_file = ctx.builder().build(&descriptor_text)?;
        info!("Built {}", image_file.display());

        let registry_name = composite_image_name(template.basename(), &instance.name, &instance.image_id);
        let registry_id = register_image(ctx.registry(), &registry_name, &image_file, &options.owner)?;

        rewriter.set_image_id(&instance.name, &registry_name)?;
        images.push(RegisteredImage {
            resource: instance.name,
            image_id: instance.image_id,
            registry_name,
            registry_id,
        });
    }

    rewriter.write_to(&options.output)?;
    Ok(ConvertResult { output: options.output.clone(), images })
}

fn plan_builds<C, B, R>(
    ctx: &AppContext<C, B, R>,
    template: &Template,
    parameters: &UserParameters,
) -> Result<Vec<PlannedBuild>, AppError>
where
    C: DescriptorCatalog,
    B: ImageBuilder,
    R: ImageRegistry,
{
    let resolved = StaticResolver::new(template, parameters).resolve_instances()?;

    resolved
        .into_iter()
        .map(|instance| -> Result<PlannedBuild, AppError> {
            let descriptor = ctx.catalog().locate(&instance.image_id)?;
            info!("{}: image {} uses descriptor {}", instance.name, instance.image_id, descriptor.display());
            Ok(PlannedBuild { instance, descriptor })
        })
        .collect()
}
