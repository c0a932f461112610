//! Template documents: loading, instance extraction and rewriting.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::domain::AppError;

/// Type tag of resources that launch a virtual machine from an image.
pub const COMPUTE_INSTANCE_TYPE: &str = "AWS::EC2::Instance";

const RESOURCES: &str = "Resources";
const PROPERTIES: &str = "Properties";
const IMAGE_ID: &str = "ImageId";
const METADATA: &str = "Metadata";

/// A parsed template document. Never mutated after loading.
#[derive(Debug, Clone)]
pub struct Template {
    document: Value,
    basename: String,
}

/// A compute-instance resource extracted from a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeInstance {
    pub name: String,
    /// Unevaluated `Properties.ImageId` expression.
    pub image_ref: Value,
    /// `Metadata` mapping, or an empty object when absent.
    pub metadata: Value,
}

impl Template {
    /// Read and parse a JSON template from disk.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidTemplate(format!("{} is not valid JSON: {}", path.display(), e))
        })?;
        Self::from_value(document, basename_of(path))
    }

    pub fn from_value(document: Value, basename: impl Into<String>) -> Result<Self, AppError> {
        if !document.is_object() {
            return Err(AppError::InvalidTemplate("top level must be a JSON object".into()));
        }
        Ok(Self { document, basename: basename.into() })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// File name of the template without its extension.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Top-level section such as `Parameters` or `Mappings`.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.document.get(name).and_then(Value::as_object)
    }

    /// All resources whose `Type` is [`COMPUTE_INSTANCE_TYPE`], in document order.
    pub fn compute_instances(&self) -> Result<Vec<ComputeInstance>, AppError> {
        let Some(resources) = self.document.get(RESOURCES) else {
            return Ok(Vec::new());
        };
        let resources = resources
            .as_object()
            .ok_or_else(|| AppError::InvalidTemplate(format!("{} must be an object", RESOURCES)))?;

        let mut instances = Vec::new();
        for (name, resource) in resources {
            if resource.get("Type").and_then(Value::as_str) != Some(COMPUTE_INSTANCE_TYPE) {
                continue;
            }

            let image_ref = resource.get(PROPERTIES).and_then(|p| p.get(IMAGE_ID)).ok_or_else(|| {
                AppError::InvalidTemplate(format!("resource '{}' has no {}.{}", name, PROPERTIES, IMAGE_ID))
            })?;
            let metadata = resource
                .get(METADATA)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));

            instances.push(ComputeInstance {
                name: name.clone(),
                image_ref: image_ref.clone(),
                metadata,
            });
        }

        Ok(instances)
    }

    /// Start a rewrite on a deep copy of this template.
    pub fn rewriter(&self) -> TemplateRewriter {
        TemplateRewriter { document: self.document.clone() }
    }
}

/// Owns the only mutable copy of a template.
#[derive(Debug)]
pub struct TemplateRewriter {
    document: Value,
}

impl TemplateRewriter {
    /// Point a resource's `Properties.ImageId` at a registry image name.
    pub fn set_image_id(&mut self, resource: &str, image_name: &str) -> Result<(), AppError> {
        let properties = self
            .document
            .get_mut(RESOURCES)
            .and_then(|resources| resources.get_mut(resource))
            .and_then(|r| r.get_mut(PROPERTIES))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                AppError::InvalidTemplate(format!("resource '{}' has no {}", resource, PROPERTIES))
            })?;
        properties.insert(IMAGE_ID.to_string(), Value::String(image_name.to_string()));
        Ok(())
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Serialize the rewritten template as indented JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), AppError> {
        let mut content = serde_json::to_string_pretty(&self.document)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }
}

fn basename_of(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}
