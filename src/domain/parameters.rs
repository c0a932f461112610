use std::collections::BTreeMap;

use crate::domain::AppError;

/// Operator-supplied parameter overrides.
pub type UserParameters = BTreeMap<String, String>;

/// Parse a `KEY=VALUE;KEY=VALUE` list.
///
/// Empty segments are skipped, each segment is split on its first `=`, and
/// keys and values are trimmed.
pub fn parse_user_parameters(text: &str) -> Result<UserParameters, AppError> {
    let mut parameters = UserParameters::new();

    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (key, value) =
            segment.split_once('=').ok_or_else(|| AppError::InvalidParameter(segment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::InvalidParameter(segment.to_string()));
        }

        parameters.insert(key.to_string(), value.trim().to_string());
    }

    Ok(parameters)
}
