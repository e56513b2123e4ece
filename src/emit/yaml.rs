use serde::Serialize;

/// Emit any plan or report as YAML.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn emit_yaml<T: Serialize>(value: &T) -> Result<String, String> {
    serde_yaml::to_string(value).map_err(|e| format!("yaml serialization failed: {e}"))
}
