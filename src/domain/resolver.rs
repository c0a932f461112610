//! Static-data resolution of image references.
//!
//! Only the intrinsics that can be evaluated without a running stack are
//! supported: `Ref` to parameters, `Fn::FindInMap`, `Fn::Join` and `Fn::Select`.

use serde_json::Value;

use crate::domain::{AppError, ComputeInstance, Template, UserParameters};

const PSEUDO_STACK_NAME: &str = "AWS::StackName";
const PSEUDO_REGION: &str = "AWS::Region";
const DEFAULT_REGION: &str = "ap-southeast-1";

/// A compute instance whose image reference has been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    pub name: String,
    pub image_id: String,
    pub metadata: Value,
}

/// Evaluates template expressions against user and declared parameters.
pub struct StaticResolver<'a> {
    template: &'a Template,
    parameters: &'a UserParameters,
}

impl<'a> StaticResolver<'a> {
    pub fn new(template: &'a Template, parameters: &'a UserParameters) -> Self {
        Self { template, parameters }
    }

    /// Resolve every compute instance. The first failure aborts the whole set.
    pub fn resolve_instances(&self) -> Result<Vec<ResolvedInstance>, AppError> {
        self.template.compute_instances()?.into_iter().map(|i| self.resolve_instance(i)).collect()
    }

    pub fn resolve_instance(&self, instance: ComputeInstance) -> Result<ResolvedInstance, AppError> {
        let image_id = self.resolve_string(&instance.image_ref).map_err(|e| match e {
            AppError::InvalidTemplate(msg) => {
                AppError::InvalidTemplate(format!("{}.ImageId: {}", instance.name, msg))
            }
            other => other,
        })?;
        Ok(ResolvedInstance { name: instance.name, image_id, metadata: instance.metadata })
    }

    /// Resolve an expression that must produce a scalar.
    pub fn resolve_string(&self, expr: &Value) -> Result<String, AppError> {
        match self.resolve(expr)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(AppError::InvalidTemplate(format!("expected a string, got {}", other))),
        }
    }

    pub fn resolve(&self, expr: &Value) -> Result<Value, AppError> {
        let Value::Object(map) = expr else {
            return Ok(expr.clone());
        };
        if map.len() != 1 {
            return Err(AppError::InvalidTemplate(format!("cannot evaluate {}", expr)));
        }

        match map.iter().next() {
            Some((key, arg)) if key == "Ref" => self.parameter(&self.resolve_string(arg)?),
            Some((key, arg)) if key == "Fn::FindInMap" => self.find_in_map(arg),
            Some((key, arg)) if key == "Fn::Join" => self.join(arg),
            Some((key, arg)) if key == "Fn::Select" => self.select(arg),
            _ => Err(AppError::InvalidTemplate(format!("unsupported expression {}", expr))),
        }
    }

    fn parameter(&self, name: &str) -> Result<Value, AppError> {
        if let Some(value) = self.parameters.get(name) {
            return Ok(Value::String(value.clone()));
        }

        let declared = self.template.section("Parameters").and_then(|params| params.get(name));
        if let Some(default) = declared.and_then(|decl| decl.get("Default")) {
            return Ok(default.clone());
        }

        match name {
            PSEUDO_STACK_NAME => Ok(Value::String(self.template.basename().to_string())),
            PSEUDO_REGION => Ok(Value::String(DEFAULT_REGION.to_string())),
            _ => Err(AppError::MissingParameter(name.to_string())),
        }
    }

    fn find_in_map(&self, arg: &Value) -> Result<Value, AppError> {
        let [map_name, top_key, second_key] = args::<3>(arg, "Fn::FindInMap")?;
        let map_name = self.resolve_string(map_name)?;
        let top_key = self.resolve_string(top_key)?;
        let second_key = self.resolve_string(second_key)?;

        self.template
            .section("Mappings")
            .and_then(|mappings| mappings.get(&map_name))
            .and_then(|map| map.get(&top_key))
            .and_then(|entry| entry.get(&second_key))
            .cloned()
            .ok_or_else(|| {
                AppError::InvalidTemplate(format!(
                    "mapping {}[{}][{}] not found",
                    map_name, top_key, second_key
                ))
            })
    }

    fn join(&self, arg: &Value) -> Result<Value, AppError> {
        let [separator, parts] = args::<2>(arg, "Fn::Join")?;
        let separator = self.resolve_string(separator)?;
        let parts = match self.resolve(parts)? {
            Value::Array(items) => items,
            _ => return Err(AppError::InvalidTemplate("Fn::Join expects a list".into())),
        };

        let pieces = parts.iter().map(|p| self.resolve_string(p)).collect::<Result<Vec<_>, _>>()?;
        Ok(Value::String(pieces.join(&separator)))
    }

    fn select(&self, arg: &Value) -> Result<Value, AppError> {
        let [index, items] = args::<2>(arg, "Fn::Select")?;
        let index = self.resolve_string(index)?;
        let index: usize = index
            .parse()
            .map_err(|_| AppError::InvalidTemplate(format!("Fn::Select index '{}'", index)))?;

        match self.resolve(items)? {
            Value::Array(items) => items.get(index).map(|item| self.resolve(item)).unwrap_or_else(|| {
                Err(AppError::InvalidTemplate(format!("Fn::Select index {} out of range", index)))
            }),
            _ => Err(AppError::InvalidTemplate("Fn::Select expects a list".into())),
        }
    }
}

fn args<'v, const N: usize>(arg: &'v Value, function: &str) -> Result<[&'v Value; N], AppError> {
    let invalid = || AppError::InvalidTemplate(format!("{} expects {} arguments", function, N));
    let items = arg.as_array().ok_or_else(invalid)?;
    let refs: Vec<&Value> = items.iter().collect();
    refs.try_into().map_err(|_| invalid())
}
