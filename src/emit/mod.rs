pub mod json;
pub mod yaml;

#[cfg(test)]
pub(crate) mod test_plans;

/// Serialize `value` in the named format (`yaml` or `json`).
///
/// # Errors
///
/// Returns an error for an unknown format or a serialization failure.
pub fn emit<T: serde::Serialize>(value: &T, format: &str) -> Result<String, String> {
    match format {
        "yaml" | "yml" => yaml::emit_yaml(value),
        "json" => json::emit_json(value),
        other => Err(format!("unknown format '{other}' (expected: yaml, json)")),
    }
}
