use serde::Serialize;

/// Emit any plan or report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn emit_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| format!("json serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::test_plans::shop_plan;

    #[test]
    fn emits_orderings_as_arrays() {
        let json = emit_json(&shop_plan()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["orderings"][0][0], "login");
        assert_eq!(value["orderings"][0][1], "checkout");
        assert_eq!(value["plan"]["steps_total"], 2);
    }

    #[test]
    fn ends_with_newline() {
        assert!(emit_json(&shop_plan()).unwrap().ends_with('\n'));
    }
}
